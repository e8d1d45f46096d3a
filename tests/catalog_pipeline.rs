//! End-to-end pipeline test: department registry build (with cache), page
//! aggregation over a fake page source, and artifact round-trip.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::Mutex;
use tuffysearch::catalog::aggregate::aggregate;
use tuffysearch::catalog::client::{self, PageSource};
use tuffysearch::catalog::departments::{DepartmentRegistry, RegistryCache};
use tuffysearch::catalog::progress::NoProgress;
use tuffysearch::catalog::{self, CatalogError};
use url::Url;

const BASE: &str = "https://catalog.test/content.php";

/// Serves canned markup and counts fetches.
struct FakeSource {
    pages: HashMap<String, String>,
    fetches: Mutex<usize>,
}

impl FakeSource {
    fn new() -> Self {
        Self {
            pages: HashMap::new(),
            fetches: Mutex::new(0),
        }
    }

    fn add(&mut self, url: &Url, body: String) {
        self.pages.insert(url.to_string(), body);
    }

    fn fetch_count(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

#[async_trait]
impl PageSource for FakeSource {
    async fn fetch(&self, url: &Url) -> Result<String, CatalogError> {
        *self.fetches.lock().unwrap() += 1;
        self.pages
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| CatalogError::RequestFailed {
                url: url.to_string(),
                source: anyhow::anyhow!("no such page"),
            })
    }
}

/// In-memory registry cache.
#[derive(Default)]
struct MemoryCache {
    entries: Mutex<HashMap<String, BTreeMap<String, String>>>,
}

impl RegistryCache for MemoryCache {
    fn get(&self, key: &str) -> anyhow::Result<Option<BTreeMap<String, String>>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn put(&self, key: &str, map: &BTreeMap<String, String>) -> anyhow::Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_owned(), map.clone());
        Ok(())
    }
}

fn department_index_page() -> String {
    r#"<table class="table_default"><tr><td>
        <table>
            <tr><td colspan="5">Prefix and Course Index</td></tr>
            <tr>
                <td>ACCT</td><td>Accounting</td><td> </td>
                <td>Computer Science</td><td>CPSC</td>
            </tr>
        </table>
    </td></tr></table>"#
        .to_owned()
}

fn expanded_page(courses: &[(&str, &str)]) -> String {
    let rows: String = courses
        .iter()
        .map(|(heading, description)| {
            format!("<tr><td>1</td><td><h3>{heading}</h3><hr>{description}</td></tr>")
        })
        .collect();
    format!(r#"<table class="table_default"><tr><td colspan="2">Courses</td></tr>{rows}</table>"#)
}

fn unexpanded_page(coids: &[u32]) -> String {
    let rows: String = coids
        .iter()
        .map(|coid| {
            format!(
                r#"<tr><td>1</td><td><a href="preview_course.php?catoid=80&coid={coid}">c</a></td></tr>"#
            )
        })
        .collect();
    format!(r#"<table class="table_default"><tr><td colspan="2">Courses</td></tr>{rows}</table>"#)
}

#[tokio::test]
async fn scrapes_two_pages_into_an_artifact() {
    let mut source = FakeSource::new();

    source.add(
        &client::department_index_url(BASE, 80, 11034).unwrap(),
        department_index_page(),
    );

    let pairs = client::page_pairs(BASE, 80, 11056, 2).unwrap();
    source.add(
        &pairs[0].expanded,
        expanded_page(&[
            ("ACCT 201A - Financial Accounting (3)", "Accounting concepts."),
            ("ACCT 201B - Managerial Accounting (3)", "Cost analysis."),
        ]),
    );
    source.add(&pairs[0].unexpanded, unexpanded_page(&[537360, 537361]));
    source.add(
        &pairs[1].expanded,
        expanded_page(&[("CPSC 121 - Object-Oriented Programming (3)", "Classes and objects.")]),
    );
    source.add(&pairs[1].unexpanded, unexpanded_page(&[540001]));

    let source: Arc<dyn PageSource> = Arc::new(source);
    let cache = MemoryCache::default();
    let registry = DepartmentRegistry::load(&*source, &cache, BASE, 80, 11034)
        .await
        .unwrap();
    // Parsed entries plus the hardcoded EGEC correction.
    assert_eq!(registry.resolve("ACCT"), "Accounting");
    assert_eq!(registry.resolve("EGEC"), "Electrical and Computer Engineering");

    let catalog = aggregate(
        Arc::clone(&source),
        Arc::new(registry),
        pairs,
        Arc::new(NoProgress),
    )
    .await
    .unwrap();

    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog[&537360].title, "Financial Accounting");
    assert_eq!(catalog[&537360].department_name, "Accounting");
    assert_eq!(catalog[&540001].course_code, "CPSC 121");
    assert_eq!(catalog[&540001].department_name, "Computer Science");

    // Artifact round-trip through disk.
    let dir = std::env::temp_dir().join(format!("tuffysearch-pipeline-{}", std::process::id()));
    let path = dir.join("catalog.json");
    catalog::write_artifact(&path, &catalog).unwrap();
    let restored = catalog::read_artifact(&path).unwrap();
    assert_eq!(restored, catalog);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn cached_registry_skips_the_network() {
    let source = FakeSource::new();
    let cache = MemoryCache::default();
    cache
        .put(
            "11034_80",
            &[("ACCT".to_owned(), "Accounting".to_owned())].into(),
        )
        .unwrap();

    let registry = DepartmentRegistry::load(&source, &cache, BASE, 80, 11034)
        .await
        .unwrap();

    assert_eq!(source.fetch_count(), 0);
    assert_eq!(registry.resolve("ACCT"), "Accounting");
}

#[tokio::test]
async fn registry_build_populates_the_cache() {
    let mut source = FakeSource::new();
    source.add(
        &client::department_index_url(BASE, 80, 11034).unwrap(),
        department_index_page(),
    );
    let cache = MemoryCache::default();

    DepartmentRegistry::load(&source, &cache, BASE, 80, 11034)
        .await
        .unwrap();
    assert_eq!(source.fetch_count(), 1);

    // A fresh registry from the same identifying numbers needs no network.
    let rebuilt = DepartmentRegistry::load(&source, &cache, BASE, 80, 11034)
        .await
        .unwrap();
    assert_eq!(source.fetch_count(), 1);
    assert_eq!(rebuilt.resolve("CPSC"), "Computer Science");
}
