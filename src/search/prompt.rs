use crate::markdown::truncate_chars;

const MAX_RESULTS_CHARS: usize = 30_000;
const MAX_CONTEXT_ITEM_CHARS: usize = 2_000;

pub fn summary_prompt(query: &str, results_json: &str, context: &[String]) -> String {
    let mut prompt = format!(
        "You are a career research assistant. Using only the research findings below, \
write a concise Markdown summary for someone exploring \"{query}\".\n\n\
Use these sections:\n\
## Overview\n\
## Key Skills\n\
## Learning Path\n\
## Resources\n\
## Related Questions\n\n\
If the findings do not cover a section, say so briefly instead of guessing. \
Prefer roadmap.sh content for the learning path.\n\n\
### Findings\n\n```json\n{}\n```\n",
        truncate_chars(results_json, MAX_RESULTS_CHARS)
    );

    if !context.is_empty() {
        prompt.push_str("\n### Earlier findings from this session\n\n");
        for item in context {
            prompt.push_str("- ");
            prompt.push_str(&truncate_chars(item, MAX_CONTEXT_ITEM_CHARS).replace('\n', " "));
            prompt.push('\n');
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn includes_query_and_findings() {
        let prompt = summary_prompt("Data Science", r#"{"roadmap_sh": []}"#, &[]);

        assert!(prompt.contains("\"Data Science\""));
        assert!(prompt.contains(r#"{"roadmap_sh": []}"#));
        assert!(prompt.contains("## Learning Path"));
        assert!(!prompt.contains("Earlier findings"));
    }

    #[test]
    fn lists_context_on_single_lines() {
        let context = vec!["first\nline".to_string(), "second".to_string()];
        let prompt = summary_prompt("q", "{}", &context);

        assert!(prompt.contains("### Earlier findings from this session"));
        assert!(prompt.contains("- first line\n"));
        assert!(prompt.contains("- second\n"));
    }

    #[test]
    fn truncates_oversized_results() {
        let huge = "x".repeat(MAX_RESULTS_CHARS * 2);
        let prompt = summary_prompt("q", &huge, &[]);

        assert!(prompt.len() < MAX_RESULTS_CHARS + 2_000);
        assert!(prompt.contains("(truncated)"));
    }
}
