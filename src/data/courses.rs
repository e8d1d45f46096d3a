//! Database operations for the `courses` table.
//!
//! The loader flattens each catalog record into a fixed 5-column row and
//! bulk-inserts the whole artifact. The table is rebuilt on every load; the
//! artifact on disk is the source of truth.

use crate::catalog::Catalog;
use anyhow::{Context, Result};
use sqlx::mysql::MySqlPool;
use sqlx::{MySql, QueryBuilder};
use tracing::info;

/// Rows per bulk INSERT statement.
const INSERT_CHUNK_SIZE: usize = 500;

/// Drop and recreate the `courses` table.
pub async fn init_table(pool: &MySqlPool) -> Result<()> {
    sqlx::query("DROP TABLE IF EXISTS courses")
        .execute(pool)
        .await
        .context("failed to drop courses table")?;
    sqlx::query(
        r#"
        CREATE TABLE courses (
            course_id INT UNSIGNED NOT NULL PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            department VARCHAR(255) NOT NULL,
            course_code VARCHAR(32) NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .context("failed to create courses table")?;

    info!("courses table initialized");
    Ok(())
}

/// Bulk-insert every record of the artifact. Returns the row count.
pub async fn insert_courses(pool: &MySqlPool, catalog: &Catalog) -> Result<u64> {
    let records: Vec<_> = catalog.values().collect();
    let mut inserted = 0;

    for chunk in records.chunks(INSERT_CHUNK_SIZE) {
        let mut query = QueryBuilder::<MySql>::new(
            "INSERT INTO courses (course_id, title, description, department, course_code) ",
        );
        query.push_values(chunk, |mut row, course| {
            row.push_bind(course.course_id)
                .push_bind(&course.title)
                .push_bind(&course.description)
                .push_bind(&course.department_name)
                .push_bind(&course.course_code);
        });

        let result = query
            .build()
            .execute(pool)
            .await
            .context("failed to bulk insert courses")?;
        inserted += result.rows_affected();
    }

    Ok(inserted)
}
