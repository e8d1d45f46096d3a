//! Courses table extraction.

use crate::catalog::CatalogError;
use html_scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static DEFAULT_TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.table_default").unwrap());
static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());

/// Locate the courses table in a catalog page.
///
/// Catalog pages render several `table_default` tables (navigation, filter
/// chrome); the courses table is always the last one.
pub fn courses_table(doc: &Html) -> Result<ElementRef<'_>, CatalogError> {
    doc.select(&DEFAULT_TABLE)
        .last()
        .ok_or(CatalogError::MissingCoursesTable)
}

/// Extract the courses table's row elements in document order.
///
/// Section-header rows are included; the reconciler decides what is a course
/// row by cell count, and skip-eligibility has to be judged per row pair.
pub fn extract_rows(doc: &Html) -> Result<Vec<ElementRef<'_>>, CatalogError> {
    let table = courses_table(doc)?;
    Ok(table.select(&ROW).collect())
}
