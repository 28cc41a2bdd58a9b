//! SerpApi (Google engine) web search.

pub mod client;
pub mod types;

pub use client::{SerpClient, SerpError, WebSearch};
pub use types::SearchRecord;
