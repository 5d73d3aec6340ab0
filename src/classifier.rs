//! DDL-vs-DML statement classification.
//!
//! The embedded engine cannot run DDL inside the isolating transaction the
//! runner wraps around DML batches, so the runner picks its transaction
//! strategy from this classification. It is a purposeful heuristic on the
//! leading keyword, not full statement-type detection: `BEGIN`/`COMMIT` are
//! not special-cased and execute as ordinary statements inside whatever
//! wrapping applies.

use std::str::FromStr;

/// Keywords that open a DDL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DdlKeyword {
    Create,
    Alter,
    Drop,
    Truncate,
}

impl DdlKeyword {
    pub fn as_str(self) -> &'static str {
        match self {
            DdlKeyword::Create => "CREATE",
            DdlKeyword::Alter => "ALTER",
            DdlKeyword::Drop => "DROP",
            DdlKeyword::Truncate => "TRUNCATE",
        }
    }
}

impl FromStr for DdlKeyword {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CREATE" => Ok(DdlKeyword::Create),
            "ALTER" => Ok(DdlKeyword::Alter),
            "DROP" => Ok(DdlKeyword::Drop),
            "TRUNCATE" => Ok(DdlKeyword::Truncate),
            _ => Err(()),
        }
    }
}

/// True iff the first whitespace-delimited token of the trimmed text is a DDL
/// keyword.
///
/// The runner applies this once to the whole submitted script, not per
/// statement: a script whose first statement is DDL-like is treated as a DDL
/// batch in its entirety.
pub fn is_ddl(sql: &str) -> bool {
    sql.trim()
        .split_whitespace()
        .next()
        .map(|word| DdlKeyword::from_str(word).is_ok())
        .unwrap_or(false)
}
