//! JSON-lines vector store: one `<collection>.jsonl` file per collection
//! under a local directory, searched by brute-force cosine similarity.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{StoreError, StoreFactory, VectorStore};
use crate::gemini::Embedder;

#[derive(Debug, Serialize, Deserialize)]
struct StoredText {
    id: String,
    text: String,
    embedding: Vec<f32>,
}

pub struct LocalVectorStore<E> {
    collection: String,
    path: PathBuf,
    embedder: E,
}

impl<E: Embedder> LocalVectorStore<E> {
    async fn load(&self) -> Result<Vec<StoredText>, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(StoreError::from))
            .collect()
    }
}

impl<E: Embedder> VectorStore for LocalVectorStore<E> {
    fn collection(&self) -> &str {
        &self.collection
    }

    async fn add_text(&mut self, text: &str) -> Result<(), StoreError> {
        let embedding = self.embedder.embed(text).await?;
        let record = StoredText {
            id: format!("{:016x}", fastrand::u64(..)),
            text: text.to_string(),
            embedding,
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!(collection = %self.collection, id = %record.id, "text appended");
        Ok(())
    }

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<String>, StoreError> {
        let records = self.load().await?;
        if records.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;
        let mut scored: Vec<(f32, StoredText)> = records
            .into_iter()
            .map(|r| (cosine_similarity(&query_embedding, &r.embedding), r))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored.into_iter().take(k).map(|(_, r)| r.text).collect())
    }
}

#[derive(Clone)]
pub struct LocalStoreFactory<E> {
    dir: PathBuf,
    embedder: E,
}

impl<E> LocalStoreFactory<E> {
    pub fn new(dir: impl AsRef<Path>, embedder: E) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            embedder,
        }
    }
}

impl<E: Embedder + Clone> StoreFactory for LocalStoreFactory<E> {
    type Store = LocalVectorStore<E>;

    fn open(&self, collection: &str) -> Result<Self::Store, StoreError> {
        let valid = !collection.is_empty()
            && collection
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidCollection(collection.to_string()));
        }
        Ok(LocalVectorStore {
            collection: collection.to_string(),
            path: self.dir.join(format!("{collection}.jsonl")),
            embedder: self.embedder.clone(),
        })
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
