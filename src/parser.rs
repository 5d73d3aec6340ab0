//! Grammar collaborator adapter.
//!
//! Wraps the SQL grammar (sqlparser, PostgreSQL dialect) and turns a script
//! into a list of top-level statement nodes carrying byte offsets into the
//! original text. The runner distinguishes three outcomes:
//!
//! - the grammar accepts the script: statement nodes are produced and the
//!   extractor slices the original text with them;
//! - the grammar reports a structural parse error: the whole batch becomes a
//!   single parse-error result;
//! - the grammar *crashes* (a panic, or aborting on its recursion limit):
//!   the runner recovers by falling back to naive splitting.
//!
//! Statement boundaries are computed by a byte-level scan of the source that
//! respects single/double-quoted strings, line and block comments, and
//! dollar-quoted bodies, so semicolons inside any of those never open a new
//! statement. Offsets are byte offsets in UTF-8.

use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::{Parser, ParserError};
use thiserror::Error;

/// One top-level statement as located by the grammar.
///
/// `location` is the byte offset where the statement region starts (right
/// after the previous statement's terminator, so leading whitespace and
/// comments belong to the statement). `None` means unknown and is treated as
/// offset 0 by the extractor. `len` is the byte length of the region,
/// exclusive of the terminating semicolon; `None` for an unterminated final
/// statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementNode {
    pub location: Option<usize>,
    pub len: Option<usize>,
}

/// Parsed statement list for a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTree {
    pub statements: Vec<StatementNode>,
}

/// Structured outcome of a parse attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// The grammar accepted the script.
    Parsed(ParseTree),
    /// The grammar rejected the script with a structural error.
    Error(String),
}

/// The grammar failed abnormally, as opposed to rejecting the input.
#[derive(Debug, Error)]
pub enum ParserCrash {
    #[error("parser panicked: {0}")]
    Panic(String),
    #[error("statement nesting exceeded the parser recursion limit")]
    RecursionLimit,
}

/// Parse a script into statement nodes.
pub fn parse_sql(sql: &str) -> Result<ParseOutcome, ParserCrash> {
    let parsed = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        Parser::parse_sql(&PostgreSqlDialect {}, sql)
    }))
    .map_err(|payload| ParserCrash::Panic(panic_message(payload.as_ref())))?;

    match parsed {
        Ok(_statements) => Ok(ParseOutcome::Parsed(ParseTree {
            statements: statement_spans(sql),
        })),
        Err(ParserError::RecursionLimitExceeded) => Err(ParserCrash::RecursionLimit),
        Err(ParserError::ParserError(message)) | Err(ParserError::TokenizerError(message)) => {
            Ok(ParseOutcome::Error(message))
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Compute byte-offset spans of the top-level statements in `sql`.
///
/// Segments containing only whitespace and comments produce no node, which
/// keeps the node list aligned with what the grammar counts as statements.
fn statement_spans(sql: &str) -> Vec<StatementNode> {
    let bytes = sql.as_bytes();
    let len = bytes.len();
    let mut nodes = Vec::new();
    let mut seg_start = 0usize;
    let mut has_content = false;
    let mut i = 0usize;

    // Byte-level scan: UTF-8 continuation bytes never equal the ASCII
    // delimiters below, so multi-byte characters pass through untouched.
    while i < len {
        match bytes[i] {
            b'-' if i + 1 < len && bytes[i + 1] == b'-' => {
                i += 2;
                while i < len && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if i + 1 < len && bytes[i + 1] == b'*' => {
                i += 2;
                while i + 1 < len && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i = (i + 2).min(len);
            }
            b'\'' => {
                has_content = true;
                i += 1;
                while i < len {
                    if bytes[i] == b'\'' {
                        // '' is an escaped quote inside the literal
                        if i + 1 < len && bytes[i + 1] == b'\'' {
                            i += 2;
                        } else {
                            i += 1;
                            break;
                        }
                    } else {
                        i += 1;
                    }
                }
            }
            b'"' => {
                has_content = true;
                i += 1;
                while i < len && bytes[i] != b'"' {
                    i += 1;
                }
                i = (i + 1).min(len);
            }
            b'$' => {
                has_content = true;
                if let Some(tag_end) = dollar_tag_end(bytes, i) {
                    let tag = &sql[i..tag_end];
                    match sql[tag_end..].find(tag) {
                        Some(rel) => i = tag_end + rel + tag.len(),
                        // Unterminated body runs to the end of the input.
                        None => i = len,
                    }
                } else {
                    i += 1;
                }
            }
            b';' => {
                if has_content {
                    nodes.push(StatementNode {
                        location: Some(seg_start),
                        len: Some(i - seg_start),
                    });
                }
                seg_start = i + 1;
                has_content = false;
                i += 1;
            }
            b if b.is_ascii_whitespace() => {
                i += 1;
            }
            _ => {
                has_content = true;
                i += 1;
            }
        }
    }

    if has_content {
        nodes.push(StatementNode {
            location: Some(seg_start),
            len: None,
        });
    }

    nodes
}

/// If `start` opens a `$tag$` delimiter, the byte offset just past its
/// closing `$`.
fn dollar_tag_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut j = start + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'$' => return Some(j + 1),
            b if b.is_ascii_alphanumeric() || b == b'_' => j += 1,
            _ => return None,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(sql: &str) -> Vec<(Option<usize>, Option<usize>)> {
        statement_spans(sql)
            .into_iter()
            .map(|node| (node.location, node.len))
            .collect()
    }

    #[test]
    fn two_terminated_statements() {
        let sql = "SELECT 1; SELECT 2;";
        assert_eq!(spans(sql), vec![(Some(0), Some(8)), (Some(9), Some(18 - 9))]);
    }

    #[test]
    fn final_statement_without_terminator_has_no_len() {
        let sql = "SELECT 1; SELECT 2";
        assert_eq!(spans(sql), vec![(Some(0), Some(8)), (Some(9), None)]);
    }

    #[test]
    fn semicolons_inside_string_literals_do_not_split() {
        let sql = "INSERT INTO logs(msg) VALUES ('a;b'); SELECT 1;";
        assert_eq!(spans(sql).len(), 2);
    }

    #[test]
    fn escaped_quotes_stay_inside_the_literal() {
        let sql = "INSERT INTO t(v) VALUES ('it''s; fine'); SELECT 1;";
        assert_eq!(spans(sql).len(), 2);
    }

    #[test]
    fn semicolons_inside_comments_do_not_split() {
        let sql = "SELECT 1; -- not; a; statement\nSELECT 2; /* also; not */ SELECT 3;";
        assert_eq!(spans(sql).len(), 3);
    }

    #[test]
    fn dollar_quoted_bodies_are_opaque() {
        let sql = "CREATE FUNCTION f() RETURNS TEXT AS $fn$ SELECT 1; SELECT 2; $fn$ LANGUAGE sql; SELECT 3;";
        let nodes = statement_spans(sql);
        assert_eq!(nodes.len(), 2);
        let end = nodes[0].location.unwrap() + nodes[0].len.unwrap();
        assert!(sql[..end].contains("$fn$ SELECT 1; SELECT 2; $fn$"));
    }

    #[test]
    fn comment_only_segments_produce_no_node() {
        assert!(spans("-- nothing here\n").is_empty());
        assert!(spans("/* nothing */ ;;").is_empty());
        let sql = "SELECT 1; -- trailing note\n";
        assert_eq!(spans(sql).len(), 1);
    }

    #[test]
    fn multibyte_text_keeps_byte_offsets_consistent() {
        let sql = "-- コメント 🚀\nSELECT 1;\nSELECT 2;";
        let nodes = statement_spans(sql);
        assert_eq!(nodes.len(), 2);
        let first = &sql[nodes[0].location.unwrap()..nodes[0].location.unwrap() + nodes[0].len.unwrap()];
        assert_eq!(first.trim(), "-- コメント 🚀\nSELECT 1");
    }

    #[test]
    fn valid_script_parses_to_nodes() {
        match parse_sql("SELECT 1; SELECT 2;").unwrap() {
            ParseOutcome::Parsed(tree) => assert_eq!(tree.statements.len(), 2),
            ParseOutcome::Error(message) => panic!("unexpected parse error: {}", message),
        }
    }

    #[test]
    fn invalid_script_reports_structural_error() {
        match parse_sql("INVALID SQL SYNTAX;;;").unwrap() {
            ParseOutcome::Error(message) => assert!(!message.is_empty()),
            ParseOutcome::Parsed(_) => panic!("expected a parse error"),
        }
    }

    #[test]
    fn deeply_nested_expressions_crash_rather_than_error() {
        let sql = format!("SELECT {}1{}", "(".repeat(200), ")".repeat(200));
        let err = parse_sql(&sql).unwrap_err();
        assert!(matches!(err, ParserCrash::RecursionLimit));
    }

    #[test]
    fn empty_script_parses_to_zero_nodes() {
        match parse_sql("").unwrap() {
            ParseOutcome::Parsed(tree) => assert!(tree.statements.is_empty()),
            ParseOutcome::Error(message) => panic!("unexpected parse error: {}", message),
        }
    }
}
