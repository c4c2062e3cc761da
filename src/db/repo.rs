use super::model::{AppendedRound, StoredRow};
use crate::batch::ReportStore;
use crate::model::AnalysisRecord;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::instrument;
use uuid::Uuid;

pub type Pool = SqlitePool;

/// Data columns of `report_rows`, in report column order.
pub const DATA_COLUMNS: [&str; 18] = [
    "subreddit",
    "post_link",
    "poster",
    "poster_status",
    "post_status",
    "poster_message",
    "commenter1",
    "commenter1_upvotes",
    "commenter1_link",
    "commenter1_message",
    "commenter2",
    "commenter2_upvotes",
    "commenter2_link",
    "commenter2_message",
    "commenter3",
    "commenter3_upvotes",
    "commenter3_link",
    "commenter3_message",
];

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// For a file-backed SQLite URL, expand a leading `~/`, ensure the parent
/// directory exists and add `mode=rwc` so a missing file is created.
/// In-memory and non-sqlite URLs pass through untouched.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let query = match query_part {
        Some(q) if q.contains("mode=") => q.to_string(),
        Some(q) => format!("{}&mode=rwc", q),
        None => "mode=rwc".to_string(),
    };
    format!("sqlite://{}?{}", expanded_path, query)
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Append a round of records to `report` inside one transaction.
#[instrument(skip_all, fields(report = %report, rows = records.len()))]
pub async fn append_rows(
    pool: &Pool,
    report: &str,
    records: &[AnalysisRecord],
) -> Result<AppendedRound> {
    let round_id = Uuid::new_v4();
    let created_at = Utc::now();
    let placeholders = vec!["?"; DATA_COLUMNS.len()].join(", ");
    let sql = format!(
        "INSERT INTO report_rows (report, round_id, created_at, {}) VALUES (?, ?, ?, {})",
        DATA_COLUMNS.join(", "),
        placeholders
    );

    let mut tx = pool.begin().await?;
    for record in records {
        let cells = record.to_row();
        if cells.len() != DATA_COLUMNS.len() {
            return Err(anyhow!(
                "record has {} cells, report has {} columns",
                cells.len(),
                DATA_COLUMNS.len()
            ));
        }
        let mut query = sqlx::query(&sql)
            .bind(report)
            .bind(round_id.to_string())
            .bind(created_at);
        for cell in cells {
            query = query.bind(cell);
        }
        query.execute(&mut *tx).await?;
    }
    tx.commit().await?;
    Ok(AppendedRound {
        round_id,
        rows: records.len(),
    })
}

/// All rows of `report` in insertion order.
#[instrument(skip_all, fields(report = %report))]
pub async fn load_rows(pool: &Pool, report: &str) -> Result<Vec<StoredRow>> {
    let sql = format!(
        "SELECT id, round_id, created_at, {} FROM report_rows WHERE report = ? ORDER BY id",
        DATA_COLUMNS.join(", ")
    );
    let rows = sqlx::query(&sql).bind(report).fetch_all(pool).await?;
    rows.iter().map(map_stored_row).collect()
}

fn map_stored_row(row: &SqliteRow) -> Result<StoredRow> {
    let cells = DATA_COLUMNS
        .iter()
        .map(|col| row.try_get::<String, _>(*col))
        .collect::<Result<Vec<_>, _>>()?;
    let record = AnalysisRecord::from_row(&cells)
        .ok_or_else(|| anyhow!("stored row has unexpected width {}", cells.len()))?;
    Ok(StoredRow {
        id: row.try_get("id")?,
        round_id: row.try_get("round_id")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        record,
    })
}

#[instrument(skip_all)]
pub async fn count_rows(pool: &Pool, report: &str) -> Result<i64> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM report_rows WHERE report = ?")
        .bind(report)
        .fetch_one(pool)
        .await?;
    Ok(n)
}

/// Report names with their row counts, alphabetically.
#[instrument(skip_all)]
pub async fn list_reports(pool: &Pool) -> Result<Vec<(String, i64)>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT report, COUNT(*) FROM report_rows GROUP BY report ORDER BY report",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[async_trait]
impl ReportStore for Pool {
    async fn append(&self, report: &str, records: &[AnalysisRecord]) -> Result<usize> {
        Ok(append_rows(self, report, records).await?.rows)
    }

    async fn load(&self, report: &str) -> Result<Vec<AnalysisRecord>> {
        let rows = load_rows(self, report).await?;
        Ok(rows.into_iter().map(|r| r.record).collect())
    }
}
