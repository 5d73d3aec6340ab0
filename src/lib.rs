//! sqlbatch - statement splitting and transactional batch execution for an
//! embedded SQL engine.
//!
//! Given a possibly-multi-statement SQL script and a list of requested
//! extensions, the runner:
//!
//! - parses the script into individually executable statements with a real
//!   SQL grammar (dollar-quoted bodies, comments, and semicolons embedded in
//!   literals are handled correctly),
//! - comments out `CREATE EXTENSION` requests the engine cannot honor,
//! - decides once per script whether to run inside an isolating transaction
//!   (DML, always rolled back) or directly (DDL, persists),
//! - executes each statement against a singleton in-process engine, capturing
//!   per-statement success or failure without aborting the batch,
//! - falls back to naive semicolon splitting if the grammar crashes.
//!
//! The engine instance is created lazily on the first call with a fixed
//! memory budget and lives for the rest of the process. Callers render the
//! returned [`SqlResult`] list; a `Result::Err` from the runner means the
//! execution environment itself is broken, not that a statement failed.
//!
//! # Example
//!
//! ```no_run
//! use sqlbatch::SqlRunner;
//!
//! # fn example() -> Result<(), sqlbatch::RunnerError> {
//! let runner = SqlRunner::new();
//! let results = runner.execute_query(
//!     "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);",
//!     &[],
//! )?;
//! assert!(results.iter().all(|r| r.success));
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod ddl_filter;
pub mod engine;
pub mod error;
pub mod extensions;
pub mod extractor;
pub mod models;
pub mod parser;
pub mod runner;

pub use classifier::is_ddl;
pub use ddl_filter::{detect_extensions, filter_extension_ddl};
pub use engine::{EngineConfig, EngineManager, SqlEngine, SqliteEngine, DEFAULT_MEMORY_BUDGET};
pub use error::{EngineError, RunnerError};
pub use extensions::{normalize_extension_name, resolve_extensions, ResolvedExtensions};
pub use models::{QueryOutcome, ResultMetadata, SqlResult, StatementResult};
pub use runner::{CancelToken, SqlRunner};

use once_cell::sync::Lazy;

static GLOBAL_RUNNER: Lazy<SqlRunner> = Lazy::new(SqlRunner::new);

/// Execute a script against the process-wide runner.
///
/// The first call in a process creates the engine instance; every later call
/// reuses it, including its frozen extension set.
pub fn execute_query(
    sql: &str,
    required_extensions: &[String],
) -> Result<Vec<SqlResult>, RunnerError> {
    GLOBAL_RUNNER.execute_query(sql, required_extensions)
}
