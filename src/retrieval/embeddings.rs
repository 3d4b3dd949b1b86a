use crate::providers::http_client::build_provider_client_with_timeout;
use crate::providers::sanitize_api_error;
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Turns query text into a vector comparable with stored passage embeddings.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>>;

    async fn embed_one(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut results = self.embed(&[text]).await?;
        results
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Empty embedding result"))
    }
}

/// `POST {base}/v1/embeddings` against an OpenAI-compatible endpoint.
pub struct OpenAiEmbedding {
    client: reqwest::Client,
    endpoint: String,
    bearer: Option<String>,
    model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedding {
    pub fn new(base_url: &str, api_key: Option<&str>, model: &str, timeout: Duration) -> Self {
        Self {
            client: build_provider_client_with_timeout(timeout.as_secs().max(1)),
            endpoint: format!("{}/v1/embeddings", base_url.trim_end_matches('/')),
            bearer: api_key
                .filter(|key| !key.is_empty())
                .map(|key| format!("Bearer {key}")),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    fn name(&self) -> &str {
        "openai"
    }

    async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let Some(bearer) = self.bearer.as_deref() else {
            anyhow::bail!("OpenAI API key not set for embeddings");
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", bearer)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| anyhow::anyhow!(sanitize_api_error(&e.to_string())))
            .context("embedding request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("embedding API error {status}: {}", sanitize_api_error(&body));
        }

        let mut parsed: EmbeddingResponse =
            response.json().await.context("decode embedding response")?;
        if parsed.data.len() != texts.len() {
            anyhow::bail!(
                "embedding count mismatch: sent {}, got {}",
                texts.len(),
                parsed.data.len()
            );
        }
        parsed.data.sort_by_key(|item| item.index);
        Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
    }
}
