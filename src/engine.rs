//! Embedded engine handle and its process-wide lifecycle.
//!
//! `SqlEngine` is the seam the runner executes through. The default
//! implementation is SQLite via rusqlite; transaction control happens by
//! submitting literal `BEGIN`/`ROLLBACK` statements through the same `query`
//! entry point as everything else, there is no separate transaction API.
//!
//! `EngineManager` owns the singleton slot: the engine is created lazily on
//! first use with a fixed memory budget and the extension set resolved from
//! that first call, and it is never torn down during process lifetime.
//! Re-initialization per call would be far more expensive than holding the
//! memory. Extension support is therefore frozen at creation: later calls
//! get the original supported-extension list regardless of what they
//! request, because the engine cannot be reconfigured with new extensions
//! after the fact.

use crate::ddl_filter::create_extension_target;
use crate::error::{EngineError, RunnerError};
use crate::extensions::{normalize_extension_name, resolve_extensions, ExtensionModule};
use crate::models::QueryOutcome;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::collections::HashSet;
use std::path::PathBuf;

/// Default memory budget: 256 MiB. A deliberate ceiling to bound worst-case
/// memory per process under concurrent test or serverless execution.
pub const DEFAULT_MEMORY_BUDGET: usize = 256 * 1024 * 1024;

/// Engine creation settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Page-cache budget in bytes, fixed at creation and not adjustable
    /// afterwards.
    pub memory_budget: usize,
    /// Database file path; `None` for an in-memory database.
    pub db_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            memory_budget: DEFAULT_MEMORY_BUDGET,
            db_path: None,
        }
    }
}

/// Execution seam between the runner and the embedded engine.
pub trait SqlEngine: Send {
    /// Run a single statement and return its native result payload.
    fn query(&mut self, sql: &str) -> Result<QueryOutcome, EngineError>;
}

/// SQLite-backed engine with a frozen extension set.
pub struct SqliteEngine {
    conn: Connection,
    loaded_extensions: HashSet<String>,
}

impl SqliteEngine {
    /// Open an engine and install the given extension modules.
    pub fn open(
        config: &EngineConfig,
        modules: &[&'static ExtensionModule],
    ) -> Result<Self, EngineError> {
        let conn = match &config.db_path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };

        // Negative cache_size is a KiB budget rather than a page count.
        let budget_kib = (config.memory_budget / 1024) as i64;
        conn.pragma_update(None, "cache_size", -budget_kib)?;

        let mut loaded_extensions = HashSet::new();
        for module in modules {
            (module.install)(&conn)?;
            loaded_extensions.insert(module.name.to_string());
        }

        Ok(Self {
            conn,
            loaded_extensions,
        })
    }

    /// Extensions this instance was created with (normalized names).
    pub fn loaded_extensions(&self) -> &HashSet<String> {
        &self.loaded_extensions
    }

    fn run_statement(&mut self, sql: &str) -> Result<QueryOutcome, EngineError> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

        if columns.is_empty() {
            let rows_affected = stmt.execute([])? as u64;
            return Ok(QueryOutcome {
                columns,
                rows: Vec::new(),
                rows_affected,
            });
        }

        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut object = serde_json::Map::new();
            for (i, column) in columns.iter().enumerate() {
                object.insert(column.clone(), value_to_json(row.get_ref(i)?));
            }
            out.push(serde_json::Value::Object(object));
        }

        Ok(QueryOutcome {
            columns,
            rows: out,
            rows_affected: 0,
        })
    }
}

impl SqlEngine for SqliteEngine {
    fn query(&mut self, sql: &str) -> Result<QueryOutcome, EngineError> {
        // Extension modules were loaded at instance creation, so CREATE
        // EXTENSION is answered here instead of being handed to SQLite.
        if let Some(name) = create_extension_target(sql) {
            let normalized = normalize_extension_name(&name);
            return if self.loaded_extensions.contains(&normalized) {
                Ok(QueryOutcome::empty())
            } else {
                Err(EngineError::ExtensionUnavailable(normalized))
            };
        }

        self.run_statement(sql)
    }
}

fn value_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(text) => {
            serde_json::Value::String(String::from_utf8_lossy(text).into_owned())
        }
        ValueRef::Blob(blob) => {
            let hex: String = blob.iter().map(|b| format!("{:02x}", b)).collect();
            serde_json::Value::String(format!("\\x{}", hex))
        }
    }
}

/// The singleton slot: one engine handle plus the supported-extension list
/// it was built with.
pub struct EngineSlot {
    /// Engine access is serialized; the embedded engine is not proven safe
    /// for concurrent query submission.
    pub engine: Mutex<SqliteEngine>,
    /// Original requested spellings of the extensions that resolved on the
    /// creating call. Frozen for the lifetime of the instance.
    pub supported_extensions: Vec<String>,
}

/// Owns the process-wide engine instance.
///
/// Tests construct independent managers to get independent engines; the
/// crate-level convenience API holds one for the whole process.
pub struct EngineManager {
    config: EngineConfig,
    slot: OnceCell<EngineSlot>,
}

impl EngineManager {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            slot: OnceCell::new(),
        }
    }

    /// Get the engine, creating it on first use.
    ///
    /// Only the creating call's `required_extensions` matter; subsequent
    /// calls receive the existing handle and its original
    /// supported-extension list no matter what they request.
    pub fn get_or_create(
        &self,
        required_extensions: &[String],
    ) -> Result<&EngineSlot, RunnerError> {
        self.slot.get_or_try_init(|| {
            let resolved = resolve_extensions(required_extensions);
            let engine = SqliteEngine::open(&self.config, &resolved.modules)
                .map_err(RunnerError::EngineInit)?;
            log::debug!(
                "engine instance created (memory budget {} bytes, {} extensions)",
                self.config.memory_budget,
                resolved.supported_names.len()
            );
            Ok(EngineSlot {
                engine: Mutex::new(engine),
                supported_extensions: resolved.supported_names,
            })
        })
    }
}

impl Default for EngineManager {
    fn default() -> Self {
        Self::new()
    }
}
