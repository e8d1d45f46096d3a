//! Row reconciliation: merging the expanded and unexpanded renderings of one
//! catalog page into normalized [`CourseRecord`]s.
//!
//! The two renderings enumerate identical rows in identical order, so rows
//! are paired positionally. That assumption is fragile by construction, so
//! pairing is strict: a row-count mismatch fails the whole page rather than
//! producing silently misaligned records.

use crate::catalog::departments::{DepartmentRegistry, UNKNOWN_DEPARTMENT};
use crate::catalog::{CatalogError, CourseRecord};
use html_scraper::{ElementRef, Node, Selector};
use std::sync::LazyLock;
use tracing::warn;

static DATA_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static HEADING: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h3").unwrap());
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

/// Reconcile the two row sequences of one page-pair into course records.
///
/// Rows with exactly two data cells on both sides are course rows; any other
/// cell count marks a section header, and the pair is skipped when either
/// side qualifies. Any structural failure inside a course row aborts the
/// whole page-pair.
pub fn reconcile(
    expanded_rows: &[ElementRef<'_>],
    unexpanded_rows: &[ElementRef<'_>],
    registry: &DepartmentRegistry,
) -> Result<Vec<CourseRecord>, CatalogError> {
    if expanded_rows.len() != unexpanded_rows.len() {
        return Err(CatalogError::RowCountMismatch {
            expanded: expanded_rows.len(),
            unexpanded: unexpanded_rows.len(),
        });
    }

    let mut records = Vec::new();
    for (expanded, unexpanded) in expanded_rows.iter().zip(unexpanded_rows) {
        let expanded_cells: Vec<_> = expanded.select(&DATA_CELL).collect();
        let unexpanded_cells: Vec<_> = unexpanded.select(&DATA_CELL).collect();

        // Section headers render with a single cell. Either side qualifying
        // skips the pair.
        if expanded_cells.len() != 2 || unexpanded_cells.len() != 2 {
            continue;
        }

        let course_id = course_id_from_link(&unexpanded_cells[1])?;
        records.push(course_from_cell(&expanded_cells[1], course_id, registry)?);
    }

    Ok(records)
}

/// Parse the course id from the `coid=` marker in the cell's link target.
fn course_id_from_link(cell: &ElementRef<'_>) -> Result<u32, CatalogError> {
    let link = cell
        .select(&ANCHOR)
        .next()
        .ok_or_else(|| CatalogError::MalformedRow("course row has no link".to_owned()))?;
    let href = link
        .attr("href")
        .ok_or_else(|| CatalogError::MalformedRow("course link has no href".to_owned()))?;

    let (_, rest) = href.split_once("coid=").ok_or_else(|| {
        CatalogError::MalformedRow(format!("link target has no coid marker: {href}"))
    })?;
    let digits: &str = &rest[..rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len())];
    digits
        .parse()
        .map_err(|_| CatalogError::MalformedRow(format!("invalid course id in link: {href}")))
}

/// Build a record from the expanded row's descriptive cell.
fn course_from_cell(
    cell: &ElementRef<'_>,
    course_id: u32,
    registry: &DepartmentRegistry,
) -> Result<CourseRecord, CatalogError> {
    let heading = cell
        .select(&HEADING)
        .next()
        .ok_or_else(|| CatalogError::MalformedRow("course row has no heading".to_owned()))?;
    let heading_text: String = heading.text().collect();
    let heading_text = heading_text.trim();

    // "ACCT 201A - Financial Accounting (3)" -> code left of the first
    // hyphen, title between the hyphen and the first unit annotation.
    let (course_code, raw_title) = heading_text.split_once('-').ok_or_else(|| {
        CatalogError::MalformedRow(format!("heading has no code/title separator: {heading_text}"))
    })?;
    let course_code = course_code.trim();
    let title = raw_title
        .split('(')
        .next()
        .unwrap_or(raw_title)
        .trim()
        .to_owned();

    let description = description_after_heading(&heading)?;

    let mut code_parts = course_code.split_whitespace();
    let department_code = code_parts.next().ok_or_else(|| {
        CatalogError::MalformedRow(format!("course code is empty: {heading_text}"))
    })?;
    let course_number = code_parts.next().ok_or_else(|| {
        CatalogError::MalformedRow(format!("course code has no number: {course_code}"))
    })?;

    let department_name = registry.resolve(department_code);
    if department_name == UNKNOWN_DEPARTMENT {
        warn!(
            department = department_code,
            number = course_number,
            course_id,
            "unknown department code"
        );
    }

    Ok(CourseRecord {
        course_id,
        title,
        description,
        department_code: department_code.to_owned(),
        department_name: department_name.to_owned(),
        course_code: course_code.to_owned(),
    })
}

/// The description is the sibling node immediately following the `<hr>` that
/// follows the heading.
fn description_after_heading(heading: &ElementRef<'_>) -> Result<String, CatalogError> {
    let rule = heading
        .next_siblings()
        .find(|node| ElementRef::wrap(*node).is_some_and(|el| el.value().name() == "hr"))
        .ok_or_else(|| {
            CatalogError::MalformedRow("no rule element after course heading".to_owned())
        })?;
    let node = rule.next_sibling().ok_or_else(|| {
        CatalogError::MalformedRow("no description after course heading".to_owned())
    })?;

    let text = match node.value() {
        Node::Text(text) => text.to_string(),
        _ => ElementRef::wrap(node)
            .map(|el| el.text().collect::<String>())
            .ok_or_else(|| {
                CatalogError::MalformedRow("description node is not text".to_owned())
            })?,
    };
    Ok(text.trim().to_owned())
}
