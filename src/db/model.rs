//! Row models returned by the report repository.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::AnalysisRecord;

/// One round of rows appended in a single transaction.
#[derive(Debug, Clone)]
pub struct AppendedRound {
    pub round_id: Uuid,
    pub rows: usize,
}

/// A report row as stored, with its bookkeeping columns.
#[derive(Debug, Clone)]
pub struct StoredRow {
    pub id: i64,
    pub round_id: String,
    pub created_at: DateTime<Utc>,
    pub record: AnalysisRecord,
}
