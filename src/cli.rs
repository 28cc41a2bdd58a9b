use std::path::PathBuf;

use clap::Parser;
use url::Url;

use crate::site::DEFAULT_BASE_URL;

/// Career research from the terminal: web search, roadmap.sh, and a Gemini summary.
///
/// Reads `SERPAPI_API_KEY` and `GEMINI_API_KEY` (or `GOOGLE_API_KEY`) from the
/// environment or a `.env` file.
#[derive(Parser, Debug)]
#[command(name = "career-scout", version, about)]
pub struct Args {
    /// Research query. Omit to read one query per line from stdin.
    pub query: Option<String>,

    /// Number of web search results to request (1-20)
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u8).range(1..=20))]
    pub results: u8,

    /// Directory holding vector store collections
    #[arg(long, default_value = "vector_store")]
    pub store_dir: PathBuf,

    /// Base URL of the roadmap site to crawl
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub site_url: Url,

    /// Append the combined search results as JSON
    #[arg(long)]
    pub show_results: bool,
}
