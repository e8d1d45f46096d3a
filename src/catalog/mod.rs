//! Acalog course catalog scraping pipeline.
//!
//! The catalog renders each listing page in two modes: an "expanded" page
//! carrying full course descriptions and an "unexpanded" page carrying the
//! stable `coid` course identifiers in its links. Both enumerate the same
//! rows in the same order, so the pipeline fetches each page-pair, extracts
//! the rows of the final courses table from both documents, and reconciles
//! them positionally into normalized [`CourseRecord`]s.

pub mod aggregate;
pub mod client;
pub mod departments;
pub mod errors;
pub mod progress;
pub mod reconcile;
pub mod table;

pub use errors::CatalogError;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use url::Url;

/// One merged catalog entry.
///
/// Serialized field names follow the published artifact format:
/// `department_abbr` for the short code, `department` for the full name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    /// Stable identifier from the unexpanded page's `coid=` link target.
    pub course_id: u32,
    pub title: String,
    pub description: String,
    #[serde(rename = "department_abbr")]
    pub department_code: String,
    #[serde(rename = "department")]
    pub department_name: String,
    /// Department code + number as printed on the page, e.g. "ACCT 201A".
    pub course_code: String,
}

/// The two URLs addressing the same logical catalog page, plus the 1-based
/// page index. The index is used only for progress labeling; ordering across
/// page-pairs is irrelevant because course ids are globally unique.
#[derive(Debug, Clone)]
pub struct PagePair {
    pub index: usize,
    pub expanded: Url,
    pub unexpanded: Url,
}

/// The output artifact: course id -> record. serde_json writes integer map
/// keys as strings, so the artifact is a keyed object, not an array.
pub type Catalog = BTreeMap<u32, CourseRecord>;

/// Write the catalog artifact as JSON.
///
/// Writes to a sibling temp file and renames on success, so a failed run
/// never clobbers a previously good artifact.
pub fn write_artifact(path: &Path, catalog: &Catalog) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let json = serde_json::to_vec_pretty(catalog).context("failed to serialize catalog")?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to move artifact into place at {}", path.display()))?;
    Ok(())
}

/// Read a previously written catalog artifact.
pub fn read_artifact(path: &Path) -> Result<Catalog> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read catalog artifact {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse catalog artifact {}", path.display()))
}
