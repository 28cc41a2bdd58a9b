//! Gemini API: text completion for summaries and embeddings for the vector store.

pub mod client;
pub mod completion;
pub mod types;

pub use client::{Embedder, GeminiClient, GeminiError, Summarizer};
pub use completion::Completion;
