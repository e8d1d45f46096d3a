//! OpenAI embeddings client.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const EMBEDDING_MODEL: &str = "text-embedding-ada-002";
const EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: [&'a str; 1],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

/// Client for requesting text embeddings.
pub struct EmbeddingClient {
    http: reqwest::Client,
    api_key: String,
}

impl EmbeddingClient {
    pub fn new(api_key: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, api_key })
    }

    /// Request one embedding vector for `text`.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            input: [text.trim()],
            model: EMBEDDING_MODEL,
        };

        let response: EmbeddingResponse = self
            .http
            .post(EMBEDDINGS_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("embedding request failed")?
            .error_for_status()
            .context("embedding request rejected")?
            .json()
            .await
            .context("failed to parse embedding response")?;

        Ok(response
            .data
            .into_iter()
            .next()
            .context("embedding response contained no data")?
            .embedding)
    }
}
