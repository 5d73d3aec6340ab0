//! Extension registry and resolver.
//!
//! The reference engine loads extension modules dynamically by name at
//! instance creation. In a statically-typed build that becomes a
//! compile-time registry: a closed table mapping each known extension name
//! to a statically-linked install hook that is run against the engine
//! connection when the instance is created.
//!
//! Name normalization: extension names are compared lowercased and trimmed,
//! with surrounding double quotes stripped. The alias `uuid-ossp` maps to
//! `uuid_ossp`, the engine's internal spelling of the common package name.
//!
//! Unknown names, and names whose install hook fails, are dropped from the
//! loaded set with a warning. They never fail the whole call; the DDL filter
//! downstream comments their `CREATE EXTENSION` statements out.

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use std::collections::HashSet;
use uuid::Uuid;

/// One known extension: its engine-internal name and the hook that installs
/// it on a fresh connection.
pub struct ExtensionModule {
    pub name: &'static str,
    pub install: fn(&Connection) -> rusqlite::Result<()>,
}

/// Closed set of known extensions. Hooks register SQL-level shims where the
/// engine can express them; the rest are name-level markers whose load is a
/// no-op (the name is still accepted by `CREATE EXTENSION` and kept by the
/// DDL filter).
static REGISTRY: &[ExtensionModule] = &[
    ExtensionModule { name: "live", install: install_marker },
    ExtensionModule { name: "vector", install: install_marker },
    ExtensionModule { name: "pg_ivm", install: install_marker },
    ExtensionModule { name: "amcheck", install: install_marker },
    ExtensionModule { name: "auto_explain", install: install_marker },
    ExtensionModule { name: "bloom", install: install_marker },
    ExtensionModule { name: "btree_gin", install: install_marker },
    ExtensionModule { name: "btree_gist", install: install_marker },
    ExtensionModule { name: "citext", install: install_citext },
    ExtensionModule { name: "cube", install: install_marker },
    ExtensionModule { name: "earthdistance", install: install_marker },
    ExtensionModule { name: "fuzzystrmatch", install: install_fuzzystrmatch },
    ExtensionModule { name: "hstore", install: install_marker },
    ExtensionModule { name: "isn", install: install_marker },
    ExtensionModule { name: "lo", install: install_marker },
    ExtensionModule { name: "ltree", install: install_marker },
    ExtensionModule { name: "pg_trgm", install: install_pg_trgm },
    ExtensionModule { name: "seg", install: install_marker },
    ExtensionModule { name: "tablefunc", install: install_marker },
    ExtensionModule { name: "tcn", install: install_marker },
    ExtensionModule { name: "tsm_system_rows", install: install_marker },
    ExtensionModule { name: "tsm_system_time", install: install_marker },
    ExtensionModule { name: "uuid_ossp", install: install_uuid_ossp },
];

/// Outcome of resolving a requested extension list.
pub struct ResolvedExtensions {
    /// Modules to install at engine creation, keyed by normalized name.
    pub modules: Vec<&'static ExtensionModule>,
    /// Original (non-normalized) requested names that resolved, so
    /// downstream filtering can match what the caller actually wrote.
    pub supported_names: Vec<String>,
}

/// Normalize an extension name for lookup: trim, strip surrounding double
/// quotes, lowercase, and map the `uuid-ossp` alias to `uuid_ossp`.
pub fn normalize_extension_name(name: &str) -> String {
    let mut normalized = name.trim();
    if normalized.len() >= 2 && normalized.starts_with('"') && normalized.ends_with('"') {
        normalized = &normalized[1..normalized.len() - 1];
    }
    let normalized = normalized.to_lowercase();
    if normalized == "uuid-ossp" {
        "uuid_ossp".to_string()
    } else {
        normalized
    }
}

/// Look up a known extension by normalized name.
pub fn lookup(normalized_name: &str) -> Option<&'static ExtensionModule> {
    REGISTRY.iter().find(|module| module.name == normalized_name)
}

/// Map requested extension names to loadable modules.
///
/// Unknown names are dropped with a warning. Duplicate requests (after
/// normalization) resolve to a single module but keep only the first
/// requested spelling.
pub fn resolve_extensions(required_extensions: &[String]) -> ResolvedExtensions {
    let mut modules = Vec::new();
    let mut supported_names = Vec::new();
    let mut resolved = HashSet::new();

    for requested in required_extensions {
        let normalized = normalize_extension_name(requested);
        match lookup(&normalized) {
            Some(module) => {
                if resolved.insert(normalized) {
                    modules.push(module);
                    supported_names.push(requested.clone());
                }
            }
            None => {
                log::warn!(
                    "Extension '{}' is not supported by the embedded engine and will be excluded",
                    requested
                );
            }
        }
    }

    if supported_names.len() < required_extensions.len() {
        log::info!(
            "Filtered extensions: {} ({}/{} supported)",
            supported_names.join(", "),
            supported_names.len(),
            required_extensions.len()
        );
    }

    ResolvedExtensions {
        modules,
        supported_names,
    }
}

fn install_marker(_conn: &Connection) -> rusqlite::Result<()> {
    Ok(())
}

/// `uuid_generate_v4()`, the uuid-ossp function schemas lean on for default
/// key generation.
fn install_uuid_ossp(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function("uuid_generate_v4", 0, FunctionFlags::SQLITE_UTF8, |_ctx| {
        Ok(Uuid::new_v4().to_string())
    })
}

/// Case-insensitive `citext` collation.
fn install_citext(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_collation("citext", |a, b| a.to_lowercase().cmp(&b.to_lowercase()))
}

/// `levenshtein(a, b)` from fuzzystrmatch.
fn install_fuzzystrmatch(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "levenshtein",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let a: String = ctx.get(0)?;
            let b: String = ctx.get(1)?;
            Ok(levenshtein(&a, &b) as i64)
        },
    )
}

/// `similarity(a, b)` from pg_trgm.
fn install_pg_trgm(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "similarity",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let a: String = ctx.get(0)?;
            let b: String = ctx.get(1)?;
            Ok(trigram_similarity(&a, &b))
        },
    )
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn trigrams(s: &str) -> HashSet<String> {
    // pg_trgm pads with two leading and one trailing blank.
    let padded = format!("  {} ", s.to_lowercase());
    let chars: Vec<char> = padded.chars().collect();
    chars
        .windows(3)
        .map(|window| window.iter().collect())
        .collect()
}

fn trigram_similarity(a: &str, b: &str) -> f64 {
    let ta = trigrams(a);
    let tb = trigrams(b);
    let shared = ta.intersection(&tb).count();
    let total = ta.union(&tb).count();
    if total == 0 {
        0.0
    } else {
        shared as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requested(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalizes_names() {
        assert_eq!(normalize_extension_name("  Vector "), "vector");
        assert_eq!(normalize_extension_name("uuid-ossp"), "uuid_ossp");
        assert_eq!(normalize_extension_name("UUID-OSSP"), "uuid_ossp");
        assert_eq!(normalize_extension_name("\"uuid-ossp\""), "uuid_ossp");
        assert_eq!(normalize_extension_name("pg_trgm"), "pg_trgm");
    }

    #[test]
    fn resolves_known_extensions_keeping_original_spelling() {
        let resolved = resolve_extensions(&requested(&["Vector", "uuid-ossp"]));
        assert_eq!(resolved.modules.len(), 2);
        assert_eq!(resolved.supported_names, vec!["Vector", "uuid-ossp"]);
        assert_eq!(resolved.modules[0].name, "vector");
        assert_eq!(resolved.modules[1].name, "uuid_ossp");
    }

    #[test]
    fn drops_unknown_extensions_silently() {
        let resolved = resolve_extensions(&requested(&["not_real_ext", "hstore"]));
        assert_eq!(resolved.modules.len(), 1);
        assert_eq!(resolved.supported_names, vec!["hstore"]);
    }

    #[test]
    fn deduplicates_normalized_requests() {
        let resolved = resolve_extensions(&requested(&["uuid-ossp", "uuid_ossp"]));
        assert_eq!(resolved.modules.len(), 1);
        assert_eq!(resolved.supported_names, vec!["uuid-ossp"]);
    }

    #[test]
    fn uuid_shim_generates_distinct_values() {
        let conn = Connection::open_in_memory().unwrap();
        install_uuid_ossp(&conn).unwrap();
        let a: String = conn
            .query_row("SELECT uuid_generate_v4()", [], |row| row.get(0))
            .unwrap();
        let b: String = conn
            .query_row("SELECT uuid_generate_v4()", [], |row| row.get(0))
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn levenshtein_matches_reference_values() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn trigram_similarity_bounds() {
        assert_eq!(trigram_similarity("word", "word"), 1.0);
        let sim = trigram_similarity("word", "words");
        assert!(sim > 0.0 && sim < 1.0);
    }
}
