//! Session memory over a vector store: write-with-one-retry and
//! never-failing retrieval.

pub mod local;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::gemini::GeminiError;

pub use local::LocalStoreFactory;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] GeminiError),

    #[error("vector store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt vector store record: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("invalid collection name: {0:?}")]
    InvalidCollection(String),
}

/// A named collection of texts searchable by similarity.
pub trait VectorStore {
    fn collection(&self) -> &str;
    async fn add_text(&mut self, text: &str) -> Result<(), StoreError>;
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<String>, StoreError>;
}

/// Opens collections by name.
pub trait StoreFactory {
    type Store: VectorStore;
    fn open(&self, collection: &str) -> Result<Self::Store, StoreError>;
}

/// Fresh collection identifier: UTC timestamp plus a random suffix.
pub fn new_collection_id() -> String {
    format!(
        "research_{}_{:04x}",
        Utc::now().format("%Y%m%d_%H%M%S"),
        fastrand::u16(..)
    )
}

pub struct ResearchMemory<F: StoreFactory> {
    factory: F,
    store: F::Store,
    top_k: usize,
}

impl<F: StoreFactory> ResearchMemory<F> {
    pub fn open(factory: F, top_k: usize) -> Result<Self, StoreError> {
        let store = factory.open(&new_collection_id())?;
        info!(collection = store.collection(), "vector store collection opened");
        Ok(Self {
            factory,
            store,
            top_k,
        })
    }

    pub fn collection(&self) -> &str {
        self.store.collection()
    }

    /// Add `text` to the current collection. A failed write switches to a new
    /// collection and is retried once; the retry's error is returned.
    pub async fn store(&mut self, text: &str) -> Result<(), StoreError> {
        match self.store.add_text(text).await {
            Ok(()) => {
                debug!(collection = self.store.collection(), bytes = text.len(), "text stored");
                Ok(())
            }
            Err(e) => {
                warn!(
                    collection = self.store.collection(),
                    error = %e,
                    "store failed, retrying in a new collection"
                );
                self.store = self.factory.open(&new_collection_id())?;
                self.store.add_text(text).await?;
                info!(collection = self.store.collection(), "text stored after retry");
                Ok(())
            }
        }
    }

    /// Texts most similar to `query`. Failures yield an empty list.
    pub async fn retrieve(&self, query: &str) -> Vec<String> {
        match self.store.similarity_search(query, self.top_k).await {
            Ok(texts) => texts,
            Err(e) => {
                warn!(collection = self.store.collection(), error = %e, "retrieve failed");
                Vec::new()
            }
        }
    }
}
