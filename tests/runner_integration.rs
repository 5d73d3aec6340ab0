//! End-to-end tests for batch execution against the singleton engine.
//!
//! Each test constructs its own `SqlRunner` and therefore its own engine
//! instance; the engine-lifecycle tests rely on that isolation.

use sqlbatch::{SqlRunner, StatementResult};

fn extensions(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn count_value(result: &StatementResult, column: &str) -> i64 {
    match result {
        StatementResult::Rows(outcome) => outcome.rows[0][column].as_i64().unwrap(),
        StatementResult::Error { error } => panic!("expected rows, got error: {}", error),
    }
}

#[test]
fn single_statement() {
    let runner = SqlRunner::new();
    let results = runner.execute_query("SELECT 1;", &[]).unwrap();

    assert_eq!(results.len(), 1);
    assert!(results[0].success);
    assert_eq!(results[0].sql, "SELECT 1");
}

#[test]
fn multiple_statements_keep_source_order() {
    let runner = SqlRunner::new();
    let results = runner
        .execute_query("SELECT 1 AS a; SELECT 2 AS b; SELECT 3 AS c;", &[])
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].sql, "SELECT 1 AS a");
    assert_eq!(results[1].sql, "SELECT 2 AS b");
    assert_eq!(results[2].sql, "SELECT 3 AS c");
    assert!(results.iter().all(|r| r.success));
}

#[test]
fn dollar_quoted_function_bodies_split_into_two_statements() {
    let runner = SqlRunner::new();
    let sql = "\n\
        CREATE OR REPLACE FUNCTION hello()\n\
        RETURNS TEXT AS $$\n\
        BEGIN\n\
          RETURN 'Hello; World!';\n\
        END;\n\
        $$ LANGUAGE plpgsql;\n\
        \n\
        SELECT 1;\n";

    let results = runner.execute_query(sql, &[]).unwrap();

    // Split shape is what matters here; the engine itself does not accept
    // plpgsql, so the function statement is reported as failed.
    assert_eq!(results.len(), 2);
    assert!(results[0].sql.contains("CREATE OR REPLACE FUNCTION"));
    assert!(results[0].sql.contains("RETURN 'Hello; World!';"));
    assert!(results[0].sql.contains("$$"));
    assert_eq!(results[1].sql, "SELECT 1");
}

#[test]
fn semicolons_inside_dollar_quotes_stay_verbatim() {
    let runner = SqlRunner::new();
    let sql = "\n\
        CREATE OR REPLACE FUNCTION complex_function()\n\
        RETURNS TEXT AS $func$\n\
        BEGIN\n\
          EXECUTE 'SELECT 1; SELECT 2;';\n\
          RETURN 'Done; finished;';\n\
        END;\n\
        $func$ LANGUAGE plpgsql;\n";

    let results = runner.execute_query(sql, &[]).unwrap();

    assert_eq!(results.len(), 1);
    assert!(results[0].sql.contains("$func$"));
    assert!(results[0].sql.contains("SELECT 1; SELECT 2;"));
}

#[test]
fn ddl_persists_across_calls() {
    let runner = SqlRunner::new();
    runner
        .execute_query("CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT);", &[])
        .unwrap();

    let results = runner
        .execute_query("SELECT COUNT(*) AS n FROM items;", &[])
        .unwrap();
    assert!(results[0].success);
    assert_eq!(count_value(&results[0].result, "n"), 0);
}

#[test]
fn dml_always_rolls_back() {
    let runner = SqlRunner::new();
    runner
        .execute_query("CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT);", &[])
        .unwrap();

    let results = runner
        .execute_query("INSERT INTO items (name) VALUES ('a');", &[])
        .unwrap();
    assert!(results[0].success);

    // The insert ran in a transaction that is always rolled back, so a
    // separate call sees no rows.
    let results = runner
        .execute_query("SELECT COUNT(*) AS n FROM items;", &[])
        .unwrap();
    assert_eq!(count_value(&results[0].result, "n"), 0);
}

#[test]
fn constraint_violation_does_not_abort_the_batch() {
    let runner = SqlRunner::new();
    runner
        .execute_query("CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT);", &[])
        .unwrap();

    let results = runner
        .execute_query(
            "INSERT INTO items (id, name) VALUES (1, 'a');\n\
             INSERT INTO items (id, name) VALUES (1, 'b');\n\
             INSERT INTO items (id, name) VALUES (2, 'c');",
            &[],
        )
        .unwrap();

    assert_eq!(results.len(), 3);
    assert!(results[0].success);
    assert!(!results[1].success);
    assert!(results[1]
        .result
        .error()
        .unwrap()
        .contains("UNIQUE constraint failed"));
    assert!(results[2].success);
}

#[test]
fn unsupported_extension_is_excluded_not_fatal() {
    let runner = SqlRunner::new();
    let results = runner
        .execute_query(
            "CREATE EXTENSION not_real_ext;",
            &extensions(&["not_real_ext"]),
        )
        .unwrap();

    // The request is rewritten to a comment, which the grammar reduces to
    // zero statements: the call is a no-op rather than an error.
    assert!(results.is_empty());
}

#[test]
fn supported_extension_loads_and_registers_functions() {
    let runner = SqlRunner::new();
    let results = runner
        .execute_query(
            "CREATE EXTENSION \"uuid-ossp\";\nSELECT uuid_generate_v4() AS id;",
            &extensions(&["uuid-ossp"]),
        )
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results[0].success, "CREATE EXTENSION should be accepted");
    assert!(results[1].success, "extension function should be callable");
}

#[test]
fn extension_set_is_frozen_after_first_call() {
    let runner = SqlRunner::new();
    runner.execute_query("SELECT 1;", &[]).unwrap();

    // The instance was created without extensions; a later request cannot
    // add one, so the CREATE EXTENSION is excluded and the function missing.
    let results = runner
        .execute_query(
            "CREATE EXTENSION \"uuid-ossp\";\nSELECT uuid_generate_v4() AS id;",
            &extensions(&["uuid-ossp"]),
        )
        .unwrap();

    assert_eq!(results.len(), 1);
    assert!(!results[0].success);
}

#[test]
fn parse_failure_yields_single_parse_error_result() {
    let runner = SqlRunner::new();
    let results = runner.execute_query("INVALID SQL SYNTAX;;;", &[]).unwrap();

    assert_eq!(results.len(), 1);
    assert!(!results[0].success);
    assert_eq!(results[0].sql, "INVALID SQL SYNTAX;;;");
    assert!(results[0]
        .result
        .error()
        .unwrap()
        .starts_with("Parse error: "));
}

#[test]
fn grammar_crash_falls_back_to_naive_splitting() {
    let runner = SqlRunner::new();
    // Nesting past the grammar's recursion limit aborts the parse, so the
    // script is split on semicolons instead. The oversized chunk is rejected
    // by the engine and recorded; the batch continues.
    let nested = format!(
        "SELECT {}1{};\nSELECT 2 AS b;",
        "(".repeat(200),
        ")".repeat(200)
    );
    let results = runner.execute_query(&nested, &[]).unwrap();

    assert_eq!(results.len(), 2);
    assert!(!results[0].success);
    assert!(results[1].success);
    assert_eq!(results[1].sql, "SELECT 2 AS b");
}

#[test]
fn multibyte_comments_do_not_shift_statement_boundaries() {
    let runner = SqlRunner::new();
    let sql = "-- コメント: セットアップ 🚀\nSELECT 1 AS a;\n-- 中文注释\nSELECT 2 AS b;";
    let results = runner.execute_query(sql, &[]).unwrap();

    assert_eq!(results.len(), 2);
    assert!(results[0].sql.ends_with("SELECT 1 AS a"));
    assert!(results[1].sql.ends_with("SELECT 2 AS b"));
    assert!(results.iter().all(|r| r.success));
}

#[test]
fn script_level_extension_detection() {
    let runner = SqlRunner::new();
    let results = runner
        .execute_script("CREATE EXTENSION \"uuid-ossp\";\nSELECT uuid_generate_v4() AS id;")
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.success));
}

#[test]
fn results_carry_metadata() {
    let runner = SqlRunner::new();
    let results = runner.execute_query("SELECT 1;", &[]).unwrap();

    assert!(!results[0].id.is_empty());
    assert!(!results[0].metadata.timestamp.is_empty());
}
