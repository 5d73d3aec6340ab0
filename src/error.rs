//! Error types for the batch runner.
//!
//! Two layers: `EngineError` covers failures of the embedded engine itself,
//! `RunnerError` covers whole-batch failures of a runner call. A single
//! statement that the engine rejects is *not* an error at either layer; it is
//! reported as a failed entry in the result list and the batch continues.

use thiserror::Error;

/// Errors produced by the embedded SQL engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine rejected a statement or failed internally.
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),

    /// `CREATE EXTENSION` named an extension that was not loaded when the
    /// engine instance was created. Extension support is fixed for the
    /// lifetime of the instance.
    #[error("extension \"{0}\" is not available")]
    ExtensionUnavailable(String),
}

/// Fatal, whole-batch failures of a runner call.
///
/// Callers must treat these as distinct from a `success: false` entry in the
/// result list: a `RunnerError` means the execution environment is broken,
/// not that one statement was bad.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Creating the singleton engine instance failed.
    #[error("engine initialization failed: {0}")]
    EngineInit(#[source] EngineError),

    /// The `BEGIN` or `ROLLBACK` wrapping a DML batch failed. Basic
    /// transactional integrity is a prerequisite, not a per-statement
    /// condition, so this is not recovered.
    #[error("transaction control failed: {0}")]
    Transaction(#[source] EngineError),

    /// The caller cancelled the batch between statements.
    #[error("execution cancelled")]
    Cancelled,
}
