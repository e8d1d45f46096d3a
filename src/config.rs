//! Environment-backed configuration.

use anyhow::{Context, Result};
use figment::{Figment, providers::Env};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the catalog's `content.php` endpoint.
    #[serde(default = "default_base_url")]
    pub catalog_base_url: String,
    /// Catalog id, from the catalog URL's query params.
    #[serde(default = "default_catoid")]
    pub catoid: u32,
    /// Navigation id of the course listing.
    #[serde(default = "default_navoid")]
    pub navoid: u32,
    /// Navigation id of the "Prefix and Course Index" reference page.
    #[serde(default = "default_department_navoid")]
    pub department_navoid: u32,
    /// Number of listing pages in the catalog.
    #[serde(default = "default_page_count")]
    pub page_count: usize,
    /// Directory for the department cache and default artifact location.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Default path of the catalog artifact.
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// MySQL connection string for the `load-db` command.
    #[serde(default)]
    pub database_url: Option<String>,
    /// Credentials for the `index` command.
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub pinecone_api_key: Option<String>,
    /// Index host, e.g. `https://tuffysearch-xyz.svc.gcp-starter.pinecone.io`.
    #[serde(default)]
    pub pinecone_index_host: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Figment::new()
            .merge(Env::raw())
            .extract()
            .context("failed to load config from environment")
    }
}

fn default_base_url() -> String {
    "https://catalog.fullerton.edu/content.php".to_owned()
}

fn default_catoid() -> u32 {
    80
}

fn default_navoid() -> u32 {
    11056
}

fn default_department_navoid() -> u32 {
    11034
}

fn default_page_count() -> usize {
    39
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/catalog.json")
}

fn default_log_level() -> String {
    "info".to_owned()
}
