//! Validator behavior through the public API.

use db_quill::safety::{normalize, validate_query, validation_report};

#[test]
fn test_rejects_non_read_statements() {
    for sql in [
        "UPDATE t SET x=1",
        "EXPLAIN SELECT 1",
        "VALUES (1)",
        "",
        "   ",
        "-- only a comment",
    ] {
        assert!(!validate_query(sql), "accepted: {sql:?}");
    }
}

#[test]
fn test_denylist_matches_substrings() {
    for sql in [
        "SELECT * FROM t WHERE note LIKE '%pragma%'",
        "SELECT updated_at FROM t",
        "SELECT 1; DROP TABLE x;",
        "select * from sp_who",
    ] {
        assert!(!validate_query(sql), "accepted: {sql:?}");
    }
}

#[test]
fn test_parentheses_must_balance() {
    assert!(!validate_query("SELECT * FROM t WHERE (a=1"));
    assert!(!validate_query("SELECT * FROM t WHERE a=1)"));
    assert!(!validate_query("SELECT ) ( FROM t"));
    assert!(validate_query("SELECT * FROM t WHERE (a=1 AND (b=2))"));
}

#[test]
fn test_accepts_reads_with_comments() {
    assert!(validate_query(
        "/* report */\n  SELECT id -- the key\n  FROM users"
    ));
    assert!(validate_query(
        "WITH recent AS (SELECT * FROM orders) SELECT count(*) FROM recent"
    ));
}

#[test]
fn test_verdict_is_stable_under_normalization() {
    for sql in [
        "SELECT  *\nFROM users",
        "select * from t where (a=1",
        "/* x */ WITH a AS (SELECT 1) SELECT * FROM a",
        "DELETE FROM t",
    ] {
        let normalized = normalize(sql);
        assert_eq!(validate_query(&normalized), validate_query(sql), "{sql:?}");
    }
}

#[test]
fn test_report_matches_verdict() {
    let valid = validation_report("SELECT 1");
    assert!(valid.valid);
    assert_eq!(valid.message, "Query is valid");

    let invalid = validation_report("DROP TABLE users");
    assert!(!invalid.valid);
    assert_eq!(invalid.message, "Query is invalid or unsafe");
}
