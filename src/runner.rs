//! Batch orchestration.
//!
//! One call flows through: get-or-create the engine instance → comment out
//! unsupported `CREATE EXTENSION` requests → classify the whole script once
//! as DDL or DML → execute.
//!
//! DDL runs directly: the engine cannot run DDL inside a transaction, and
//! schema changes are meant to persist across calls. Everything else runs
//! between `BEGIN` and an unconditional `ROLLBACK`, which makes every DML
//! call side-effect-free against the shared instance: validating a script
//! against a schema never mutates durable state. The rollback is attempted
//! even when execution fails, and only then does the failure propagate.
//!
//! Statements execute strictly sequentially. Later statements may depend on
//! earlier ones, and the DML path depends on transactional ordering, so
//! there is no statement-level parallelism. One statement's failure is
//! recorded and the batch continues; under rollback-always semantics later
//! failures still need to be observed even though nothing persists.

use crate::classifier::is_ddl;
use crate::ddl_filter::{detect_extensions, filter_extension_ddl};
use crate::engine::{EngineConfig, EngineManager, SqlEngine};
use crate::error::RunnerError;
use crate::extractor::{extract_statements, fallback_split};
use crate::models::SqlResult;
use crate::parser::{parse_sql, ParseOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Cooperative cancellation flag, checked between statements only. The
/// engine call itself is atomic and cannot be interrupted mid-statement.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Public entry point for batch SQL execution against the singleton engine.
///
/// Each `SqlRunner` owns its own engine lifecycle, so tests can construct
/// independent instances; the crate-level [`execute_query`](crate::execute_query)
/// function shares one runner for the whole process.
pub struct SqlRunner {
    manager: EngineManager,
}

impl SqlRunner {
    pub fn new() -> Self {
        Self {
            manager: EngineManager::new(),
        }
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            manager: EngineManager::with_config(config),
        }
    }

    /// Execute a possibly-multi-statement script, returning one result per
    /// identified statement.
    ///
    /// `required_extensions` is consulted only by the call that creates the
    /// engine instance; afterwards the instance's extension set is frozen.
    pub fn execute_query(
        &self,
        sql: &str,
        required_extensions: &[String],
    ) -> Result<Vec<SqlResult>, RunnerError> {
        self.execute_inner(sql, required_extensions, None)
    }

    /// Like [`execute_query`](Self::execute_query), but checks `cancel`
    /// between statements and aborts the whole batch with
    /// [`RunnerError::Cancelled`] once it is set.
    pub fn execute_query_with_cancel(
        &self,
        sql: &str,
        required_extensions: &[String],
        cancel: &CancelToken,
    ) -> Result<Vec<SqlResult>, RunnerError> {
        self.execute_inner(sql, required_extensions, Some(cancel))
    }

    /// Execute a script, taking the required extensions from the script's
    /// own `CREATE EXTENSION` statements.
    pub fn execute_script(&self, sql: &str) -> Result<Vec<SqlResult>, RunnerError> {
        let detected = detect_extensions(sql);
        self.execute_inner(sql, &detected, None)
    }

    fn execute_inner(
        &self,
        sql: &str,
        required_extensions: &[String],
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<SqlResult>, RunnerError> {
        let slot = self.manager.get_or_create(required_extensions)?;
        let filtered_sql = filter_extension_ddl(sql, &slot.supported_extensions);

        let mut engine = slot.engine.lock();

        if is_ddl(&filtered_sql) {
            execute_sql(&filtered_sql, &mut *engine, cancel)
        } else {
            execute_in_transaction(&filtered_sql, &mut *engine, cancel)
        }
    }
}

/// DML path: wrap execution in `BEGIN` and an unconditional `ROLLBACK`.
fn execute_in_transaction(
    sql_text: &str,
    engine: &mut dyn SqlEngine,
    cancel: Option<&CancelToken>,
) -> Result<Vec<SqlResult>, RunnerError> {
    engine.query("BEGIN").map_err(RunnerError::Transaction)?;
    let outcome = execute_sql(sql_text, engine, cancel);
    let rollback = engine.query("ROLLBACK").map_err(RunnerError::Transaction);
    // Rollback is attempted before any inner failure propagates.
    let results = outcome?;
    rollback?;
    Ok(results)
}

impl Default for SqlRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared execution routine for the DDL and DML paths.
///
/// Parses the script, extracts statements, and runs them in source order.
/// A structural parse error yields a single failed result and no execution;
/// a grammar crash falls back to naive splitting with a warning.
pub(crate) fn execute_sql(
    sql_text: &str,
    engine: &mut dyn SqlEngine,
    cancel: Option<&CancelToken>,
) -> Result<Vec<SqlResult>, RunnerError> {
    let statements = match parse_sql(sql_text) {
        Ok(ParseOutcome::Parsed(tree)) => extract_statements(sql_text, &tree.statements),
        Ok(ParseOutcome::Error(message)) => {
            return Ok(vec![SqlResult::parse_error(sql_text, &message)]);
        }
        Err(crash) => {
            log::warn!("SQL parsing failed, falling back to simple split: {}", crash);
            fallback_split(sql_text)
        }
    };

    let mut results = Vec::with_capacity(statements.len());
    for statement in statements {
        if let Some(token) = cancel {
            if token.is_cancelled() {
                return Err(RunnerError::Cancelled);
            }
        }

        let started = Instant::now();
        match engine.query(&statement) {
            Ok(outcome) => {
                results.push(SqlResult::completed(statement, outcome, started.elapsed()));
            }
            Err(err) => {
                results.push(SqlResult::failed(
                    statement,
                    err.to_string(),
                    started.elapsed(),
                ));
            }
        }
    }

    Ok(results)
}
