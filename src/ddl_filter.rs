//! `CREATE EXTENSION` rewriting.
//!
//! The engine never sees a `CREATE EXTENSION` request it cannot honor:
//! unsupported requests are replaced with an inline SQL comment that both
//! explains the exclusion and preserves the original text for audit, turning
//! the statement into a no-op instead of a syntax element the engine must
//! execute.
//!
//! This is a textual regex rewrite, not an AST edit. `CREATE EXTENSION`
//! statements are small and rarely appear inside string literals, so the
//! false-positive risk of matching those words inside a literal is accepted
//! as a known limitation.

use crate::extensions::normalize_extension_name;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static CREATE_EXTENSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)CREATE\s+EXTENSION\s+(?:IF\s+NOT\s+EXISTS\s+)?["']?([^"'\s;]+)["']?"#)
        .unwrap()
});

static CREATE_EXTENSION_STMT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^CREATE\s+EXTENSION\s+(?:IF\s+NOT\s+EXISTS\s+)?["']?([^"'\s;]+)["']?"#)
        .unwrap()
});

/// Comment out every `CREATE EXTENSION` request for an extension outside the
/// supported set. Supported requests and all other text are left untouched.
pub fn filter_extension_ddl(sql: &str, supported_extensions: &[String]) -> String {
    let supported: HashSet<String> = supported_extensions
        .iter()
        .map(|ext| normalize_extension_name(ext))
        .collect();

    CREATE_EXTENSION_RE
        .replace_all(sql, |caps: &regex::Captures<'_>| {
            let matched = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            if supported.contains(&normalize_extension_name(name)) {
                matched.to_string()
            } else {
                format!("-- Excluded (not supported by the embedded engine): {}", matched)
            }
        })
        .into_owned()
}

/// Extension names a script requests via `CREATE EXTENSION`, in order of
/// first appearance, original spelling preserved.
pub fn detect_extensions(sql: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for caps in CREATE_EXTENSION_RE.captures_iter(sql) {
        if let Some(name) = caps.get(1) {
            let name = name.as_str();
            if seen.insert(normalize_extension_name(name)) {
                names.push(name.to_string());
            }
        }
    }
    names
}

/// If `sql` is a single `CREATE EXTENSION` statement, the requested
/// extension name. Used by the engine to intercept extension DDL, since
/// extension modules are loaded at instance creation rather than on demand.
pub(crate) fn create_extension_target(sql: &str) -> Option<String> {
    CREATE_EXTENSION_STMT_RE
        .captures(sql.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
