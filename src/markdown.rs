use std::borrow::Cow;

/// Escape characters that break Markdown link syntax: `[`, `]`, `(`, `)`.
pub(crate) fn escape_md_link(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '[' | ']' | '(' | ')') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Flatten user input onto one line so it can sit in a heading or list item.
pub(crate) fn sanitize_heading(s: &str) -> String {
    s.split(['\n', '\r'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cut `s` to at most `max` bytes on a char boundary, marking the cut.
pub(crate) fn truncate_chars(s: &str, max: usize) -> Cow<'_, str> {
    if s.len() <= max {
        return Cow::Borrowed(s);
    }
    let end = s.floor_char_boundary(max);
    Cow::Owned(format!("{}... (truncated)", &s[..end]))
}

/// Wrap `body` in a fenced code block, widening the fence if `body` contains one.
pub(crate) fn code_fence(lang: &str, body: &str) -> String {
    let mut fence = String::from("```");
    while body.contains(fence.as_str()) {
        fence.push('`');
    }
    format!("{fence}{lang}\n{body}\n{fence}\n")
}
