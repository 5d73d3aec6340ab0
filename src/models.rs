//! Result models for batch SQL execution.
//!
//! One `SqlResult` is produced per executed (or failed-to-parse) statement.
//! The list returned by a runner call always has the same length and order as
//! the statements identified in the input, or length 1 when the whole script
//! failed to parse.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Native result payload of one successfully executed statement.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryOutcome {
    /// Column names, empty for statements that return no rows.
    pub columns: Vec<String>,
    /// One JSON object per row, keyed by column name.
    pub rows: Vec<serde_json::Value>,
    /// Affected-row count for INSERT/UPDATE/DELETE, 0 otherwise.
    pub rows_affected: u64,
}

impl QueryOutcome {
    /// Outcome of a statement that produced no rows and touched none.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Per-statement result: either the engine's native payload or an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum StatementResult {
    Rows(QueryOutcome),
    Error { error: String },
}

impl StatementResult {
    /// Error message if this result carries one.
    pub fn error(&self) -> Option<&str> {
        match self {
            StatementResult::Rows(_) => None,
            StatementResult::Error { error } => Some(error),
        }
    }
}

/// Observational metadata attached to every result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultMetadata {
    /// Wall-clock execution time in milliseconds.
    pub execution_time_ms: u64,
    /// Human-readable creation time.
    pub timestamp: String,
}

impl ResultMetadata {
    fn now(elapsed: Duration) -> Self {
        Self {
            execution_time_ms: elapsed.as_millis() as u64,
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Result of one statement in a batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SqlResult {
    /// Freshly generated identifier so callers can key UI lists. No
    /// persistence meaning.
    pub id: String,
    /// Exact source text of the statement, trimmed.
    pub sql: String,
    /// Native payload on success, error message on failure.
    pub result: StatementResult,
    /// Redundant with `result`, kept for fast filtering.
    pub success: bool,
    pub metadata: ResultMetadata,
}

impl SqlResult {
    /// Result of a statement the engine accepted.
    pub fn completed(sql: String, outcome: QueryOutcome, elapsed: Duration) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sql,
            result: StatementResult::Rows(outcome),
            success: true,
            metadata: ResultMetadata::now(elapsed),
        }
    }

    /// Result of a statement the engine rejected.
    pub fn failed(sql: String, message: String, elapsed: Duration) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sql,
            result: StatementResult::Error { error: message },
            success: false,
            metadata: ResultMetadata::now(elapsed),
        }
    }

    /// Single result wrapping a whole script the grammar rejected. The `sql`
    /// field carries the raw text unmodified.
    pub fn parse_error(sql: &str, message: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sql: sql.to_string(),
            result: StatementResult::Error {
                error: format!("Parse error: {}", message),
            },
            success: false,
            metadata: ResultMetadata::now(Duration::ZERO),
        }
    }
}
