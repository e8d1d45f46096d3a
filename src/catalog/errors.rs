//! Error types for the catalog scraping pipeline.

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Transport failure: connection error or non-success status. Never
    /// retried automatically; the operator re-runs the job and the cached
    /// department registry keeps reruns cheap.
    #[error("request for {url} failed")]
    RequestFailed {
        url: String,
        #[source]
        source: anyhow::Error,
    },
    /// No `table.table_default` on the page. The courses table is always the
    /// last such table, so its absence signals a catalog layout change.
    #[error("no course table (table.table_default) found in page")]
    MissingCoursesTable,
    /// The expanded and unexpanded renderings enumerate different row counts.
    /// Positional pairing would be silently wrong, so the whole page fails.
    #[error("expanded and unexpanded pages list different row counts ({expanded} vs {unexpanded})")]
    RowCountMismatch { expanded: usize, unexpanded: usize },
    /// A course row failed structural extraction (missing heading, missing
    /// coid marker, malformed split). Fatal for the enclosing page-pair:
    /// partial per-page data is worse than a visible failure.
    #[error("malformed course row: {0}")]
    MalformedRow(String),
}
