//! Embedding and vector-index pipeline.
//!
//! Derives one text string per course, requests embeddings, and upserts the
//! vectors in batches. Individual embedding failures never abort the run:
//! failed course ids are queued and retried in a second pass, and bulk
//! requests pause periodically to respect provider rate limits.

pub mod embeddings;
pub mod pinecone;

use crate::catalog::{Catalog, CourseRecord};
use anyhow::Result;
use embeddings::EmbeddingClient;
use pinecone::{PineconeClient, UPSERT_BATCH_SIZE, VectorMetadata, VectorRecord};
use std::time::Duration;
use tracing::{info, warn};

/// Pause after this many embedding requests.
const RATE_LIMIT_EVERY: usize = 1500;
/// How long to pause.
const RATE_LIMIT_PAUSE: Duration = Duration::from_secs(30);
/// Second-pass attempts per failed course before giving up on it.
const RETRY_ATTEMPTS: u32 = 3;

/// The text embedded for one course.
pub fn course_text(record: &CourseRecord) -> String {
    format!(
        "{} {} {}",
        record.department_name, record.title, record.description
    )
}

/// Embed every course in the catalog.
///
/// First pass walks the catalog in order; failures are queued. The second
/// pass retries the queue a bounded number of times per course, so a course
/// the provider keeps rejecting is dropped with a warning instead of
/// looping forever.
pub async fn build_vectors(catalog: &Catalog, embedder: &EmbeddingClient) -> Result<Vec<VectorRecord>> {
    let mut vectors = Vec::with_capacity(catalog.len());
    let mut failed: Vec<(u32, u32)> = Vec::new();
    let mut requests = 0usize;

    for (course_id, record) in catalog {
        pace(&mut requests).await;
        match embed_course(embedder, *course_id, record).await {
            Ok(vector) => vectors.push(vector),
            Err(e) => {
                warn!(course_id, error = ?e, "failed to embed course, queuing for retry");
                failed.push((*course_id, 0));
            }
        }
        if vectors.len() % 500 == 0 && !vectors.is_empty() {
            info!(embedded = vectors.len(), total = catalog.len(), "embedding progress");
        }
    }

    while let Some((course_id, attempts)) = failed.pop() {
        let record = &catalog[&course_id];
        pace(&mut requests).await;
        match embed_course(embedder, course_id, record).await {
            Ok(vector) => vectors.push(vector),
            Err(e) if attempts + 1 < RETRY_ATTEMPTS => {
                warn!(course_id, attempts = attempts + 1, error = ?e, "retry failed, requeuing");
                failed.push((course_id, attempts + 1));
            }
            Err(e) => {
                warn!(course_id, error = ?e, "giving up on course after repeated failures");
            }
        }
    }

    info!(vectors = vectors.len(), total = catalog.len(), "embedding complete");
    Ok(vectors)
}

async fn embed_course(
    embedder: &EmbeddingClient,
    course_id: u32,
    record: &CourseRecord,
) -> Result<VectorRecord> {
    let values = embedder.embed(&course_text(record)).await?;
    Ok(VectorRecord {
        id: course_id.to_string(),
        values,
        metadata: VectorMetadata {
            title: record.title.clone(),
            course_code: record.course_code.clone(),
            description: record.description.clone(),
        },
    })
}

async fn pace(requests: &mut usize) {
    *requests += 1;
    if *requests % RATE_LIMIT_EVERY == 0 {
        info!(
            requests = *requests,
            pause_secs = RATE_LIMIT_PAUSE.as_secs(),
            "pausing for provider rate limits"
        );
        tokio::time::sleep(RATE_LIMIT_PAUSE).await;
    }
}

/// Embed the catalog and upsert everything into the index in batches.
/// Returns the number of vectors upserted.
pub async fn index_catalog(
    catalog: &Catalog,
    embedder: &EmbeddingClient,
    index: &PineconeClient,
) -> Result<usize> {
    let vectors = build_vectors(catalog, embedder).await?;

    for batch in vectors.chunks(UPSERT_BATCH_SIZE) {
        index.upsert(batch).await?;
        info!(batch = batch.len(), "vector batch upserted");
    }

    Ok(vectors.len())
}
