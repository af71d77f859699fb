// Shared test helpers for SQLite-backed sink tests.
//
// Each test gets its own database file in a temp directory so tests can run in
// parallel without sharing tables.

use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;

use batch_sql_sink::{ColumnMap, Config};

/// A throwaway SQLite database. The file is removed when this is dropped.
pub struct TestDb {
    _dir: TempDir,
    pub url: String,
    pub pool: SqlitePool,
}

/// Creates a new database file and runs `schema` against it.
pub async fn create_test_db(schema: &str) -> TestDb {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("sink.db");
    let url = format!("sqlite:{}?mode=rwc", path.to_string_lossy());

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .expect("Failed to create test database");
    sqlx::raw_sql(schema)
        .execute(&pool)
        .await
        .expect("Failed to create schema");

    TestDb {
        _dir: dir,
        url,
        pool,
    }
}

/// Sink configuration pointing at `db` with the given column mapping.
#[allow(dead_code)] // Not every test file uses every helper
pub fn sqlite_config(db: &TestDb, table: &str, columns: &[(&str, &str)], flush_size: usize) -> Config {
    Config {
        connection_string: Some(db.url.clone()),
        table_name: table.to_string(),
        column_map: columns.iter().copied().collect::<ColumnMap>(),
        flush_size,
        idle_flush_time: Duration::from_secs(60),
        ..Default::default()
    }
}

/// Counts rows in `table`.
#[allow(dead_code)]
pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .expect("Failed to count rows")
}

/// Reads a single text column in insertion order.
#[allow(dead_code)]
pub async fn fetch_text_column(pool: &SqlitePool, table: &str, column: &str) -> Vec<Option<String>> {
    sqlx::query_scalar(&format!("SELECT {} FROM {} ORDER BY rowid", column, table))
        .fetch_all(pool)
        .await
        .expect("Failed to fetch rows")
}
