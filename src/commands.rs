//! Top-level command implementations.

use crate::catalog::aggregate::aggregate;
use crate::catalog::client::{self, HttpPageSource};
use crate::catalog::departments::{DepartmentRegistry, JsonFileCache};
use crate::catalog::progress::LogProgress;
use crate::config::Config;
use crate::utils::fmt_duration;
use crate::{catalog, data, vector};
use anyhow::{Context, Result};
use sqlx::mysql::MySqlPoolOptions;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Scrape the whole catalog and write the artifact.
pub async fn scrape(config: &Config, output: Option<PathBuf>) -> Result<()> {
    let start = Instant::now();

    let source = Arc::new(HttpPageSource::new()?);
    let cache = JsonFileCache::new(config.data_dir.clone());
    let registry = DepartmentRegistry::load(
        source.as_ref(),
        &cache,
        &config.catalog_base_url,
        config.catoid,
        config.department_navoid,
    )
    .await
    .context("failed to build department registry")?;
    info!(departments = registry.len(), "department registry ready");

    let pairs = client::page_pairs(
        &config.catalog_base_url,
        config.catoid,
        config.navoid,
        config.page_count,
    )?;
    let catalog = aggregate(source, Arc::new(registry), pairs, Arc::new(LogProgress)).await?;

    let path = output.unwrap_or_else(|| config.catalog_path.clone());
    catalog::write_artifact(&path, &catalog)?;
    info!(
        courses = catalog.len(),
        path = %path.display(),
        duration = fmt_duration(start.elapsed()),
        "catalog scrape complete"
    );
    Ok(())
}

/// Load a previously scraped artifact into the relational store.
pub async fn load_db(config: &Config, input: Option<PathBuf>) -> Result<()> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set for load-db")?;
    let path = input.unwrap_or_else(|| config.catalog_path.clone());
    let catalog = catalog::read_artifact(&path)?;

    let pool = MySqlPoolOptions::new()
        .max_connections(4)
        .connect(database_url)
        .await
        .context("failed to connect to database")?;

    data::courses::init_table(&pool).await?;
    let inserted = data::courses::insert_courses(&pool, &catalog).await?;
    info!(inserted, "courses loaded into database");
    Ok(())
}

/// Embed a previously scraped artifact and upsert it into the vector index.
pub async fn index(config: &Config, input: Option<PathBuf>) -> Result<()> {
    let start = Instant::now();

    let api_key = config
        .openai_api_key
        .clone()
        .context("OPENAI_API_KEY must be set for index")?;
    let pinecone_key = config
        .pinecone_api_key
        .clone()
        .context("PINECONE_API_KEY must be set for index")?;
    let index_host = config
        .pinecone_index_host
        .clone()
        .context("PINECONE_INDEX_HOST must be set for index")?;

    let path = input.unwrap_or_else(|| config.catalog_path.clone());
    let catalog = catalog::read_artifact(&path)?;

    let embedder = vector::embeddings::EmbeddingClient::new(api_key)?;
    let pinecone = vector::pinecone::PineconeClient::new(pinecone_key, index_host)?;
    let upserted = vector::index_catalog(&catalog, &embedder, &pinecone).await?;

    info!(
        upserted,
        duration = fmt_duration(start.elapsed()),
        "catalog indexed"
    );
    Ok(())
}
