//! Shallow, keyword-filtered crawl of the roadmap site: the root page plus one
//! hop into links whose title contains the query.

pub mod extractor;

use std::collections::HashSet;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::fetch::{self, FetchError};
use extractor::{LinkKind, PageContent, extract_page};

pub const DEFAULT_BASE_URL: &str = "https://roadmap.sh";
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum FetchOutcome {
    Fetched(PageContent),
    /// The URL was fetched earlier by this crawler; no request was made.
    AlreadyVisited,
    Failed(FetchError),
}

/// A matched roadmap or guide page.
#[derive(Debug, Clone, Serialize)]
pub struct SiteHit {
    #[serde(rename = "type")]
    pub kind: LinkKind,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct FailedPage {
    pub url: String,
    pub reason: String,
}

/// Hits in discovery order (roadmaps before guides) plus the pages that could
/// not be fetched. No hits and no failures means nothing matched.
#[derive(Debug, Default)]
pub struct SiteResults {
    pub hits: Vec<SiteHit>,
    pub failed: Vec<FailedPage>,
}

/// Keyword search over a documentation site.
/// Implemented by `SiteCrawler`; stubs are used in tests.
pub trait SiteSearch {
    async fn search_site(&mut self, query: &str) -> SiteResults;
}

pub struct SiteCrawler {
    http: Client,
    base: Url,
    visited: HashSet<Url>,
}

impl SiteCrawler {
    pub fn new(http: Client, base: Url) -> Self {
        Self {
            http,
            base,
            visited: HashSet::new(),
        }
    }

    /// Fetch `path` (relative to the base URL, or absolute) at most once.
    /// Failures are logged and returned as `FetchOutcome::Failed`.
    pub async fn fetch_page(&mut self, path: &str) -> FetchOutcome {
        let url = match self.base.join(path) {
            Ok(url) => url,
            Err(e) => {
                warn!(path, error = %e, "cannot resolve page path");
                return FetchOutcome::Failed(e.into());
            }
        };

        if !self.visited.insert(url.clone()) {
            debug!(url = %url, "already visited, skipping");
            return FetchOutcome::AlreadyVisited;
        }

        match fetch::download(&self.http, &url, FETCH_TIMEOUT).await {
            Ok(page) => FetchOutcome::Fetched(extract_page(&page.html, page.final_url, &self.base)),
            Err(e) => {
                warn!(url = %url, error = %e, "page fetch failed");
                FetchOutcome::Failed(e)
            }
        }
    }
}

impl SiteSearch for SiteCrawler {
    async fn search_site(&mut self, query: &str) -> SiteResults {
        let mut results = SiteResults::default();

        let root = match self.fetch_page("").await {
            FetchOutcome::Fetched(page) => page,
            FetchOutcome::AlreadyVisited => return results,
            FetchOutcome::Failed(e) => {
                results.failed.push(FailedPage {
                    url: self.base.to_string(),
                    reason: e.to_string(),
                });
                return results;
            }
        };
        debug!(
            url = %root.url,
            title = %root.title,
            roadmaps = root.roadmaps.len(),
            guides = root.guides.len(),
            "root page parsed"
        );

        let needle = query.to_lowercase();
        let candidates = root
            .roadmaps
            .iter()
            .map(|link| (LinkKind::Roadmap, link))
            .chain(root.guides.iter().map(|link| (LinkKind::Guide, link)));

        for (kind, link) in candidates {
            if !link.title.to_lowercase().contains(&needle) {
                continue;
            }
            match self.fetch_page(link.url.as_str()).await {
                FetchOutcome::Fetched(page) => {
                    debug!(url = %page.url, page_title = %page.title, "matched page fetched");
                    results.hits.push(SiteHit {
                        kind,
                        title: link.title.clone(),
                        content: page.text,
                    });
                }
                FetchOutcome::AlreadyVisited => {}
                FetchOutcome::Failed(e) => results.failed.push(FailedPage {
                    url: link.url.to_string(),
                    reason: e.to_string(),
                }),
            }
        }

        info!(
            query,
            hits = results.hits.len(),
            failed = results.failed.len(),
            "site search complete"
        );
        results
    }
}
