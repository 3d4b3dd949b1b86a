//! Best-effort retrieval-augmented context.
//!
//! Any failure here degrades to "no passages"; nothing propagates to the
//! request.

pub mod embeddings;
pub mod vector;

pub use crate::store::RetrievedPassage;
pub use embeddings::{EmbeddingProvider, OpenAiEmbedding};

use crate::config::RetrievalConfig;
use crate::error::RetrievalError;
use crate::store::PassageIndex;
use std::sync::Arc;
use std::time::Duration;

pub struct RetrievalAugmenter {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn PassageIndex>,
    top_k: usize,
    min_relevance: f32,
    embed_timeout: Duration,
    search_timeout: Duration,
}

impl RetrievalAugmenter {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn PassageIndex>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            top_k: config.top_k,
            min_relevance: config.min_relevance,
            embed_timeout: Duration::from_secs(config.embedding_timeout_secs),
            search_timeout: Duration::from_secs(config.search_timeout_secs),
        }
    }

    /// Passages relevant to `query`, best first. Empty on any failure.
    pub async fn retrieve(&self, query: &str) -> Vec<RetrievedPassage> {
        match self.try_retrieve(query).await {
            Ok(passages) => {
                tracing::debug!(
                    embedder = self.embedder.name(),
                    passages = passages.len(),
                    "Retrieval finished"
                );
                passages
            }
            Err(error) => {
                tracing::warn!(%error, "Retrieval failed; continuing without reference material");
                Vec::new()
            }
        }
    }

    async fn try_retrieve(&self, query: &str) -> Result<Vec<RetrievedPassage>, RetrievalError> {
        let embedding = tokio::time::timeout(self.embed_timeout, self.embedder.embed_one(query))
            .await
            .map_err(|_| RetrievalError::Timeout { stage: "embedding" })?
            .map_err(|e| RetrievalError::Embedding(format!("{e:#}")))?;

        let mut passages = tokio::time::timeout(
            self.search_timeout,
            self.index
                .similarity_search(&embedding, self.min_relevance, self.top_k),
        )
        .await
        .map_err(|_| RetrievalError::Timeout {
            stage: "similarity search",
        })?
        .map_err(|e| RetrievalError::Search(format!("{e:#}")))?;

        passages.retain(|p| p.relevance_score >= self.min_relevance);
        passages.truncate(self.top_k);
        Ok(passages)
    }
}
