//! Concurrent aggregation of all page-pairs into one catalog.

use crate::catalog::client::PageSource;
use crate::catalog::departments::DepartmentRegistry;
use crate::catalog::progress::{Phase, ProgressSink};
use crate::catalog::{Catalog, CatalogError, CourseRecord, PagePair, reconcile, table};
use anyhow::{Context, Result};
use dashmap::DashMap;
use html_scraper::Html;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Worker-pool size: the host's available parallelism. No explicit cap
/// beyond the page-pair count is imposed.
fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Scrape every page-pair concurrently and merge the results into one
/// mapping keyed by course id.
///
/// One task is spawned per page-pair, gated by a semaphore sized to the
/// host's parallelism. Within a task the two fetches are sequential. A
/// failing page does not cancel its siblings, but any failure fails the job
/// once the pool drains; every successfully completed pair's records are
/// visible in the returned map.
pub async fn aggregate(
    source: Arc<dyn PageSource>,
    registry: Arc<DepartmentRegistry>,
    pairs: Vec<PagePair>,
    progress: Arc<dyn ProgressSink>,
) -> Result<Catalog> {
    let courses: Arc<DashMap<u32, CourseRecord>> = Arc::new(DashMap::new());
    let completed = Arc::new(AtomicUsize::new(0));
    let permits = Arc::new(Semaphore::new(default_parallelism().max(1)));
    let total = pairs.len();

    let mut tasks = JoinSet::new();
    for pair in pairs {
        let source = Arc::clone(&source);
        let registry = Arc::clone(&registry);
        let progress = Arc::clone(&progress);
        let courses = Arc::clone(&courses);
        let completed = Arc::clone(&completed);
        let permits = Arc::clone(&permits);

        tasks.spawn(async move {
            // Closed only if the semaphore is dropped, which never happens
            // while tasks hold clones of it.
            let _permit = permits.acquire().await.context("worker pool closed")?;

            let records = scrape_page_pair(&*source, &registry, &pair, &*progress)
                .await
                .with_context(|| format!("page-pair {} failed", pair.index))?;

            debug!(page = pair.index, records = records.len(), "page reconciled");
            for record in records {
                insert_record(&courses, record);
            }

            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            progress.page_complete(done, total);
            Ok::<(), anyhow::Error>(())
        });
    }

    // Drain the whole pool before failing, so sibling pages are never
    // cancelled by one page's error.
    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        let outcome = joined.context("scrape task panicked")?;
        if let Err(e) = outcome
            && first_error.is_none()
        {
            first_error = Some(e);
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }

    let courses = Arc::into_inner(courses).context("scrape tasks still hold the course map")?;
    Ok(courses.into_iter().collect())
}

/// Course ids are globally unique across pages, so an id surfacing twice
/// with different data is a data-integrity problem. Last writer wins, which
/// is nondeterministic under concurrency; it is surfaced, not resolved.
fn insert_record(courses: &DashMap<u32, CourseRecord>, record: CourseRecord) {
    let course_id = record.course_id;
    if let Some(previous) = courses.insert(course_id, record.clone())
        && previous != record
    {
        warn!(
            course_id,
            course_code = record.course_code,
            "duplicate course id with conflicting data, keeping the later page's record"
        );
    }
}

/// Fetch and reconcile one page-pair. The expanded page is fetched first;
/// the order has no semantic effect.
async fn scrape_page_pair(
    source: &dyn PageSource,
    registry: &DepartmentRegistry,
    pair: &PagePair,
    progress: &dyn ProgressSink,
) -> Result<Vec<CourseRecord>, CatalogError> {
    progress.phase(pair.index, Phase::FetchExpanded);
    let expanded_markup = source.fetch(&pair.expanded).await?;
    progress.phase(pair.index, Phase::FetchUnexpanded);
    let unexpanded_markup = source.fetch(&pair.unexpanded).await?;

    // Parsed documents are not Send; both parses stay inside this block so
    // nothing un-sendable is held across an await point.
    progress.phase(pair.index, Phase::ParseExpanded);
    let expanded_doc = Html::parse_document(&expanded_markup);
    let expanded_rows = table::extract_rows(&expanded_doc)?;
    progress.phase(pair.index, Phase::ParseUnexpanded);
    let unexpanded_doc = Html::parse_document(&unexpanded_markup);
    let unexpanded_rows = table::extract_rows(&unexpanded_doc)?;

    reconcile::reconcile(&expanded_rows, &unexpanded_rows, registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::progress::NoProgress;
    use async_trait::async_trait;
    use std::collections::{BTreeMap, HashMap};
    use url::Url;

    struct FakeSource {
        pages: HashMap<String, String>,
    }

    impl FakeSource {
        fn new(pages: &[(&Url, String)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.clone()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl PageSource for FakeSource {
        async fn fetch(&self, url: &Url) -> Result<String, CatalogError> {
            self.pages
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| CatalogError::RequestFailed {
                    url: url.to_string(),
                    source: anyhow::anyhow!("no such page"),
                })
        }
    }

    fn registry() -> Arc<DepartmentRegistry> {
        Arc::new(DepartmentRegistry::from_map(
            [("ACCT".to_owned(), "Accounting".to_owned())].into(),
        ))
    }

    fn pair(index: usize) -> PagePair {
        PagePair {
            index,
            expanded: Url::parse(&format!("https://catalog.test/page{index}?expand=1")).unwrap(),
            unexpanded: Url::parse(&format!("https://catalog.test/page{index}")).unwrap(),
        }
    }

    fn expanded_page(courses: &[(&str, &str)]) -> String {
        let rows: String = courses
            .iter()
            .map(|(heading, description)| {
                format!("<tr><td>1</td><td><h3>{heading}</h3><hr>{description}</td></tr>")
            })
            .collect();
        format!(r#"<table class="table_default">{rows}</table>"#)
    }

    fn unexpanded_page(coids: &[u32]) -> String {
        let rows: String = coids
            .iter()
            .map(|coid| {
                format!(r#"<tr><td>1</td><td><a href="preview.php?coid={coid}">c</a></td></tr>"#)
            })
            .collect();
        format!(r#"<table class="table_default">{rows}</table>"#)
    }

    #[tokio::test]
    async fn merges_disjoint_pages_into_a_union() {
        let first = pair(1);
        let second = pair(2);
        let source = Arc::new(FakeSource::new(&[
            (
                &first.expanded,
                expanded_page(&[("ACCT 201A - Financial Accounting (3)", "Concepts.")]),
            ),
            (&first.unexpanded, unexpanded_page(&[537360])),
            (
                &second.expanded,
                expanded_page(&[
                    ("ACCT 201B - Managerial Accounting (3)", "Costing."),
                    ("ACCT 301 - Intermediate Accounting (3)", "Standards."),
                ]),
            ),
            (&second.unexpanded, unexpanded_page(&[537361, 537362])),
        ]));

        let catalog = aggregate(
            source,
            registry(),
            vec![first, second],
            Arc::new(NoProgress),
        )
        .await
        .unwrap();

        let ids: Vec<u32> = catalog.keys().copied().collect();
        assert_eq!(ids, [537360, 537361, 537362]);
        assert_eq!(catalog[&537361].title, "Managerial Accounting");
    }

    #[tokio::test]
    async fn one_failing_page_fails_the_job_after_the_pool_drains() {
        let first = pair(1);
        let second = pair(2);
        // Second pair's pages are absent, so its fetch fails.
        let source = Arc::new(FakeSource::new(&[
            (
                &first.expanded,
                expanded_page(&[("ACCT 201A - Financial Accounting (3)", "Concepts.")]),
            ),
            (&first.unexpanded, unexpanded_page(&[537360])),
        ]));

        let result = aggregate(
            source,
            registry(),
            vec![first, second],
            Arc::new(NoProgress),
        )
        .await;
        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("page-pair 2 failed"));
    }

    #[tokio::test]
    async fn reports_four_phases_and_completion() {
        use std::sync::Mutex;

        #[derive(Default)]
        struct Recorder {
            phases: Mutex<Vec<(usize, Phase)>>,
            completions: Mutex<Vec<(usize, usize)>>,
        }

        impl ProgressSink for Recorder {
            fn phase(&self, page: usize, phase: Phase) {
                self.phases.lock().unwrap().push((page, phase));
            }
            fn page_complete(&self, completed: usize, total: usize) {
                self.completions.lock().unwrap().push((completed, total));
            }
        }

        let only = pair(1);
        let source = Arc::new(FakeSource::new(&[
            (
                &only.expanded,
                expanded_page(&[("ACCT 201A - Financial Accounting (3)", "Concepts.")]),
            ),
            (&only.unexpanded, unexpanded_page(&[537360])),
        ]));

        let recorder = Arc::new(Recorder::default());
        let sink: Arc<dyn ProgressSink> = recorder.clone();
        aggregate(source, registry(), vec![only], sink)
            .await
            .unwrap();

        let phases = recorder.phases.lock().unwrap();
        assert_eq!(
            *phases,
            [
                (1, Phase::FetchExpanded),
                (1, Phase::FetchUnexpanded),
                (1, Phase::ParseExpanded),
                (1, Phase::ParseUnexpanded),
            ]
        );
        assert_eq!(*recorder.completions.lock().unwrap(), [(1, 1)]);
    }

    #[test]
    fn conflicting_duplicate_keeps_later_record() {
        let courses = DashMap::new();
        let record = |title: &str| CourseRecord {
            course_id: 537360,
            title: title.to_owned(),
            description: "Concepts.".to_owned(),
            department_code: "ACCT".to_owned(),
            department_name: "Accounting".to_owned(),
            course_code: "ACCT 201A".to_owned(),
        };

        insert_record(&courses, record("Financial Accounting"));
        insert_record(&courses, record("Renamed Course"));

        let merged: BTreeMap<u32, CourseRecord> = courses.into_iter().collect();
        assert_eq!(merged[&537360].title, "Renamed Course");
    }
}
