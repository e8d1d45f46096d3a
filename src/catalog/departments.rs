//! Department abbreviation registry.
//!
//! Built from the catalog's "Prefix and Course Index" reference page, which
//! lays out two independent (abbreviation, name) entries per physical table
//! row. The registry is immutable for the run and cached to disk so reruns
//! skip the network fetch; stale caches from a prior catalog year must be
//! deleted by the operator.

use crate::catalog::client::{self, PageSource};
use crate::catalog::{CatalogError, table};
use anyhow::{Context, Result};
use html_scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;
use tracing::{debug, info};

/// Sentinel name for codes absent from the registry.
pub const UNKNOWN_DEPARTMENT: &str = "UNKNOWN";

static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static DATA_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());

/// Persistence for a built abbreviation map, keyed by the registry's two
/// identifying catalog numbers. Injected so the registry is testable without
/// a real filesystem.
pub trait RegistryCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<BTreeMap<String, String>>>;
    fn put(&self, key: &str, map: &BTreeMap<String, String>) -> Result<()>;
}

/// [`RegistryCache`] writing `{key}.json` under a data directory.
pub struct JsonFileCache {
    dir: PathBuf,
}

impl JsonFileCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl RegistryCache for JsonFileCache {
    fn get(&self, key: &str) -> Result<Option<BTreeMap<String, String>>> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)
            .with_context(|| format!("failed to read department cache {}", path.display()))?;
        let map = serde_json::from_slice(&bytes)
            .with_context(|| format!("corrupt department cache {}", path.display()))?;
        Ok(Some(map))
    }

    fn put(&self, key: &str, map: &BTreeMap<String, String>) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        let path = self.path(key);
        let json = serde_json::to_vec_pretty(map).context("failed to serialize department map")?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write department cache {}", path.display()))?;
        Ok(())
    }
}

/// Mapping from department abbreviation to full name.
pub struct DepartmentRegistry {
    names: BTreeMap<String, String>,
}

impl DepartmentRegistry {
    /// Build the registry, preferring the cache over the network.
    ///
    /// On a cache miss the reference page is fetched and parsed, one known
    /// missing code is patched in, and the result is persisted before
    /// returning.
    pub async fn load(
        source: &dyn PageSource,
        cache: &dyn RegistryCache,
        base_url: &str,
        catoid: u32,
        navoid: u32,
    ) -> Result<Self> {
        let key = format!("{navoid}_{catoid}");
        if let Some(names) = cache.get(&key)? {
            info!(key, departments = names.len(), "using cached department map");
            return Ok(Self { names });
        }

        debug!(key, "building department map from reference page");
        let url = client::department_index_url(base_url, catoid, navoid)?;
        let markup = source.fetch(&url).await?;
        let mut names = parse_department_index(&markup)?;

        // EGEC is missing from the reference page regardless of catalog year.
        names.insert(
            "EGEC".to_owned(),
            "Electrical and Computer Engineering".to_owned(),
        );

        cache.put(&key, &names)?;
        info!(key, departments = names.len(), "department map built");
        Ok(Self { names })
    }

    /// Construct directly from a prebuilt map.
    pub fn from_map(names: BTreeMap<String, String>) -> Self {
        Self { names }
    }

    /// Resolve an abbreviation to its full name, or [`UNKNOWN_DEPARTMENT`].
    /// Never fails: one bad code must not abort catalog ingestion.
    pub fn resolve(&self, code: &str) -> &str {
        self.names
            .get(code)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_DEPARTMENT)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Parse the reference page into an abbreviation map.
///
/// The page nests the index inside the last `table_default`; each data row
/// carries two entries laid out as `[abbr1, name1, spacer, name2, abbr2]`.
/// One row nests a whole table inside a cell, so rows with fewer than five
/// descendant cells are layout chrome and skipped.
fn parse_department_index(markup: &str) -> Result<BTreeMap<String, String>, CatalogError> {
    let doc = Html::parse_document(markup);
    let outer = table::courses_table(&doc)?;
    let inner = outer
        .select(&TABLE)
        .find(|t| t.id() != outer.id())
        .ok_or_else(|| {
            CatalogError::MalformedRow("department index has no inner table".to_owned())
        })?;

    let mut names = BTreeMap::new();
    for row in inner.select(&ROW) {
        let cells: Vec<_> = row.select(&DATA_CELL).collect();
        if cells.len() < 5 {
            continue;
        }

        insert_entry(&mut names, &cells[0], &cells[1]);
        insert_entry(&mut names, &cells[cells.len() - 1], &cells[cells.len() - 2]);
    }

    Ok(names)
}

fn insert_entry(
    names: &mut BTreeMap<String, String>,
    abbr_cell: &ElementRef<'_>,
    name_cell: &ElementRef<'_>,
) {
    let abbr = cell_text(abbr_cell);
    let name = cell_text(name_cell);
    if !abbr.is_empty() && !name.is_empty() {
        names.insert(abbr, name);
    }
}

fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_owned()
}
