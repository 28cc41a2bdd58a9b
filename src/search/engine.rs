use serde::Serialize;
use tracing::{info, warn};

use crate::gemini::Summarizer;
use crate::search::prompt::summary_prompt;
use crate::serp::{SearchRecord, WebSearch};
use crate::site::{FailedPage, SiteHit, SiteSearch};
use crate::store::{ResearchMemory, StoreError, StoreFactory};

/// Merged web-search and site-crawl output; serializes to
/// `{"web_search": ..., "roadmap_sh": [...]}`.
#[derive(Debug, Serialize)]
pub struct CombinedResult {
    pub web_search: WebSearchOutcome,
    pub roadmap_sh: Vec<SiteHit>,
    #[serde(skip)]
    pub failed_pages: Vec<FailedPage>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum WebSearchOutcome {
    Results(SearchRecord),
    Failed { error: String },
}

pub struct ResearchRequest<'a> {
    pub query: &'a str,
    pub result_count: u8,
}

#[derive(Debug, PartialEq)]
pub enum Summary {
    Text(String),
    /// The model answered without text (e.g. a safety stop).
    Empty { finish_reason: Option<String> },
    Failed(String),
}

#[derive(Debug)]
pub struct ResearchReport {
    pub combined: CombinedResult,
    /// The serialized `combined` exactly as stored and summarized.
    pub results_json: String,
    /// Similar findings from earlier queries in the session.
    pub context: Vec<String>,
    pub summary: Summary,
}

#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("cannot serialize results: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One search call plus the site crawl. Never fails: a search error is
/// embedded in place of the results and the crawl still runs.
pub async fn combined_search(
    web: &impl WebSearch,
    site: &mut impl SiteSearch,
    query: &str,
    result_count: u8,
) -> CombinedResult {
    let web_search = match web.search(query, result_count).await {
        Ok(record) => WebSearchOutcome::Results(record),
        Err(e) => {
            warn!(error = %e, "web search failed, continuing with site search");
            WebSearchOutcome::Failed {
                error: format!("Error searching web: {e}"),
            }
        }
    };

    let site_results = site.search_site(query).await;

    CombinedResult {
        web_search,
        roadmap_sh: site_results.hits,
        failed_pages: site_results.failed,
    }
}

pub async fn research<F: StoreFactory>(
    web: &impl WebSearch,
    site: &mut impl SiteSearch,
    memory: &mut ResearchMemory<F>,
    llm: &impl Summarizer,
    req: &ResearchRequest<'_>,
) -> Result<ResearchReport, ResearchError> {
    let combined = combined_search(web, site, req.query, req.result_count).await;
    let results_json = serde_json::to_string_pretty(&combined)?;

    let context = memory.retrieve(req.query).await;
    memory.store(&results_json).await?;

    let prompt = summary_prompt(req.query, &results_json, &context);
    let summary = match llm.complete(&prompt).await {
        Ok(completion) => match completion.text() {
            Some(text) => Summary::Text(text.to_string()),
            None => Summary::Empty {
                finish_reason: completion.finish_reason().map(str::to_string),
            },
        },
        Err(e) => {
            warn!(error = %e, "summary failed, reporting raw results");
            Summary::Failed(e.to_string())
        }
    };

    info!(
        query = req.query,
        site_hits = combined.roadmap_sh.len(),
        failed_pages = combined.failed_pages.len(),
        context = context.len(),
        summarized = matches!(summary, Summary::Text(_)),
        "research complete"
    );

    Ok(ResearchReport {
        combined,
        results_json,
        context,
        summary,
    })
}
