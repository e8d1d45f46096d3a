//! Catalog page retrieval and URL construction.
//!
//! Page fetching sits behind the [`PageSource`] trait so the aggregator and
//! the department registry can be exercised against canned markup in tests.

use crate::catalog::{CatalogError, PagePair};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// Retrieves one catalog page's raw markup.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the page at `url`. Fails with [`CatalogError::RequestFailed`] on
    /// connection failure or non-success status; never retries.
    async fn fetch(&self, url: &Url) -> Result<String, CatalogError>;
}

/// [`PageSource`] backed by a real HTTP client.
pub struct HttpPageSource {
    http: reqwest::Client,
}

impl HttpPageSource {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, url: &Url) -> Result<String, CatalogError> {
        let failed = |source: reqwest::Error| CatalogError::RequestFailed {
            url: url.to_string(),
            source: source.into(),
        };

        let response = self.http.get(url.clone()).send().await.map_err(failed)?;
        let response = response.error_for_status().map_err(failed)?;
        response.text().await.map_err(failed)
    }
}

/// Build one page's expanded/unexpanded URL pair.
///
/// The filter parameters mirror the catalog's own course-filter form; the
/// only difference between the two renderings is `expand=1`.
fn course_page_urls(base_url: &str, catoid: u32, navoid: u32, page: usize) -> Result<(Url, Url)> {
    let expanded = course_page_url(base_url, catoid, navoid, page, true)?;
    let unexpanded = course_page_url(base_url, catoid, navoid, page, false)?;
    Ok((expanded, unexpanded))
}

fn course_page_url(
    base_url: &str,
    catoid: u32,
    navoid: u32,
    page: usize,
    expand: bool,
) -> Result<Url> {
    let mut url = Url::parse(base_url)
        .with_context(|| format!("invalid catalog base URL: {base_url}"))?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("catoid", &catoid.to_string())
            .append_pair("navoid", &navoid.to_string())
            .append_pair("filter[27]", "-1")
            .append_pair("filter[29]", "")
            .append_pair("filter[keyword]", "")
            .append_pair("filter[32]", "1")
            .append_pair("filter[cpage]", &page.to_string())
            .append_pair("filter[exact_match]", "1")
            .append_pair("filter[item_type]", "3")
            .append_pair("filter[only_active]", "1")
            .append_pair("filter[3]", "1");
        if expand {
            query.append_pair("expand", "1");
        }
        query.append_key_only("print");
    }
    url.set_fragment(Some("acalog_template_course_filter"));
    Ok(url)
}

/// Build all page-pairs for a catalog, pages 1..=page_count.
pub fn page_pairs(
    base_url: &str,
    catoid: u32,
    navoid: u32,
    page_count: usize,
) -> Result<Vec<PagePair>> {
    (1..=page_count)
        .map(|index| {
            let (expanded, unexpanded) = course_page_urls(base_url, catoid, navoid, index)?;
            Ok(PagePair {
                index,
                expanded,
                unexpanded,
            })
        })
        .collect()
}

/// URL of the "Prefix and Course Index" reference page that maps department
/// abbreviations to their full names. Its navoid differs from the course
/// listing's.
pub fn department_index_url(base_url: &str, catoid: u32, navoid: u32) -> Result<Url> {
    let mut url = Url::parse(base_url)
        .with_context(|| format!("invalid catalog base URL: {base_url}"))?;
    url.query_pairs_mut()
        .append_pair("catoid", &catoid.to_string())
        .append_pair("navoid", &navoid.to_string())
        .append_key_only("print");
    Ok(url)
}
