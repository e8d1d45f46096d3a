//! Pinecone index client.

use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Duration;

/// Vectors per upsert request.
pub const UPSERT_BATCH_SIZE: usize = 100;

/// One `(id, values, metadata)` triple for the index.
#[derive(Debug, Clone, Serialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: VectorMetadata,
}

/// Per-course metadata stored alongside the vector, used to render search
/// results without a second lookup.
#[derive(Debug, Clone, Serialize)]
pub struct VectorMetadata {
    pub title: String,
    pub course_code: String,
    pub description: String,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
}

/// Client for upserting vectors into a Pinecone-style index.
pub struct PineconeClient {
    http: reqwest::Client,
    api_key: String,
    index_host: String,
}

impl PineconeClient {
    pub fn new(api_key: String, index_host: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            api_key,
            index_host: index_host.trim_end_matches('/').to_owned(),
        })
    }

    /// Upsert one batch of vectors.
    pub async fn upsert(&self, vectors: &[VectorRecord]) -> Result<()> {
        if vectors.is_empty() {
            return Ok(());
        }

        self.http
            .post(format!("{}/vectors/upsert", self.index_host))
            .header("Api-Key", &self.api_key)
            .json(&UpsertRequest { vectors })
            .send()
            .await
            .context("vector upsert request failed")?
            .error_for_status()
            .context("vector upsert rejected")?;
        Ok(())
    }
}
