use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use tracing::debug;
use url::Url;

const ROADMAP_PREFIX: &str = "/roadmaps/";
const GUIDE_PREFIX: &str = "/guides/";

static TEXT_BLOCKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6, p").expect("static selector"));
static ANCHORS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector"));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("static selector"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Roadmap,
    Guide,
}

impl LinkKind {
    fn from_href(href: &str) -> Option<Self> {
        if href.starts_with(ROADMAP_PREFIX) {
            Some(LinkKind::Roadmap)
        } else if href.starts_with(GUIDE_PREFIX) {
            Some(LinkKind::Guide)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    pub title: String,
    pub url: Url,
}

#[derive(Debug, Clone)]
pub struct PageContent {
    pub url: Url,
    pub title: String,
    pub text: String,
    pub roadmaps: Vec<LinkRecord>,
    pub guides: Vec<LinkRecord>,
}

/// Parse a page body. Links are resolved against `base`, not against the
/// page URL, so every harvested link lives on the crawled site.
pub(super) fn extract_page(html: &str, url: Url, base: &Url) -> PageContent {
    let doc = Html::parse_document(html);

    let title = doc
        .select(&TITLE)
        .next()
        .map(collapse_whitespace)
        .unwrap_or_default();

    let text = doc
        .select(&TEXT_BLOCKS)
        .map(collapse_whitespace)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let mut roadmaps = Vec::new();
    let mut guides = Vec::new();
    for anchor in doc.select(&ANCHORS) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(kind) = LinkKind::from_href(href) else {
            continue;
        };
        let Ok(link_url) = base.join(href) else {
            debug!(href, "skipping unresolvable link");
            continue;
        };
        let record = LinkRecord {
            title: collapse_whitespace(anchor),
            url: link_url,
        };
        match kind {
            LinkKind::Roadmap => roadmaps.push(record),
            LinkKind::Guide => guides.push(record),
        }
    }

    debug!(
        url = %url,
        roadmaps = roadmaps.len(),
        guides = guides.len(),
        "page parsed"
    );

    PageContent {
        url,
        title,
        text,
        roadmaps,
        guides,
    }
}

fn collapse_whitespace(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
