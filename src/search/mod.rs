//! Search orchestration: web search plus site crawl, storage, summary prompt, and report formatting.

pub(crate) mod engine;
mod prompt;
pub(crate) mod report;
