use crate::markdown::{code_fence, escape_md_link, sanitize_heading, truncate_chars};
use crate::search::engine::{ResearchReport, Summary, WebSearchOutcome};
use crate::serp::types::{organic_link, related_question};
use crate::site::extractor::LinkKind;

const SITE_EXCERPT_CHARS: usize = 280;

pub fn format_report(report: &ResearchReport, query: &str, show_results: bool) -> String {
    let mut output = format!("# Research: {}\n\n", sanitize_heading(query));

    match &report.summary {
        Summary::Text(text) => {
            output.push_str(text.trim_end());
            output.push_str("\n\n");
        }
        Summary::Empty { finish_reason } => {
            output.push_str(&format!(
                "> Note: the model returned no summary (finish reason: {}). Showing collected results.\n\n",
                finish_reason.as_deref().unwrap_or("unknown")
            ));
        }
        Summary::Failed(reason) => {
            output.push_str(&format!(
                "> Note: summary unavailable ({reason}). Showing collected results.\n\n"
            ));
        }
    }

    let combined = &report.combined;

    if !combined.roadmap_sh.is_empty() {
        output.push_str("---\n\n## roadmap.sh\n\n");
        for hit in &combined.roadmap_sh {
            let label = match hit.kind {
                LinkKind::Roadmap => "Roadmap",
                LinkKind::Guide => "Guide",
            };
            output.push_str(&format!("- **{label}: {}**", sanitize_heading(&hit.title)));
            if !hit.content.is_empty() {
                output.push_str(&format!(
                    ": {}",
                    truncate_chars(&hit.content, SITE_EXCERPT_CHARS)
                ));
            }
            output.push('\n');
        }
        output.push('\n');
    }

    match &combined.web_search {
        WebSearchOutcome::Results(record) => {
            let links: Vec<_> = record.organic_results.iter().filter_map(organic_link).collect();
            if !links.is_empty() {
                output.push_str("## Web Sources\n\n");
                for (title, link) in links {
                    output.push_str(&format!(
                        "- [{}]({})\n",
                        escape_md_link(title),
                        escape_md_link(link)
                    ));
                }
                output.push('\n');
            }

            let questions: Vec<_> = record
                .related_questions
                .iter()
                .filter_map(related_question)
                .collect();
            if !questions.is_empty() {
                output.push_str("## Related Questions\n\n");
                for question in questions {
                    output.push_str(&format!("- {}\n", sanitize_heading(question)));
                }
                output.push('\n');
            }
        }
        WebSearchOutcome::Failed { error } => {
            output.push_str(&format!("> Note: {error}\n\n"));
        }
    }

    if !combined.failed_pages.is_empty() {
        output.push_str("## Failed Pages\n\n");
        for failed in &combined.failed_pages {
            output.push_str(&format!("- {} ({})\n", failed.url, failed.reason));
        }
        output.push('\n');
    }

    if show_results {
        output.push_str("## Raw Results\n\n");
        output.push_str(&code_fence("json", &report.results_json));
    }

    output
}
