//! Live backend over the SQLite log warehouse.
//!
//! Each `execute` call is one read job: open the warehouse read-only,
//! prepare, fetch, close. The job blocks the calling thread until it
//! resolves and is never retried here.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rusqlite::ErrorCode;
use rusqlite::types::Value as SqlValue;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{LogBackend, QueryError};
use crate::models::{Record, ResultEnvelope};
use crate::sanitize::{effective_row_cap, strip_trailing_terminators};
use crate::warehouse::open_warehouse_read_only;

pub const LIVE_BACKEND_NAME: &str = "live";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveBackend {
    warehouse_path: PathBuf,
    table: String,
}

impl LiveBackend {
    #[must_use]
    pub fn new(warehouse_path: impl Into<PathBuf>, table: impl Into<String>) -> Self {
        Self {
            warehouse_path: warehouse_path.into(),
            table: table.into(),
        }
    }

    /// Fails with `MissingTable` unless the configured table exists.
    fn check_configured_table(
        &self,
        connection: &rusqlite::Connection,
    ) -> Result<(), QueryError> {
        let exists = connection
            .query_row(
                "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
                [self.table.as_str()],
                |row| row.get::<usize, bool>(0),
            )
            .map_err(|error| classify_sqlite_error(&error))?;
        if exists {
            return Ok(());
        }
        Err(QueryError::MissingTable {
            detail: format!(
                "configured log table `{}` does not exist in {}",
                self.table,
                self.warehouse_path.display()
            ),
        })
    }

    fn with_table_context(&self, error: QueryError) -> QueryError {
        match error {
            QueryError::MissingTable { detail } => QueryError::MissingTable {
                detail: format!("{detail} (configured log table is `{}`)", self.table),
            },
            other => other,
        }
    }
}

impl LogBackend for LiveBackend {
    fn name(&self) -> &'static str {
        LIVE_BACKEND_NAME
    }

    fn log_table(&self) -> &str {
        &self.table
    }

    fn execute(&self, query: &str) -> Result<ResultEnvelope, QueryError> {
        validate_read_only_sql(query).map_err(|violation| QueryError::Rejected {
            message: violation.message,
        })?;
        check_warehouse_access(&self.warehouse_path)?;

        let connection = open_warehouse_read_only(&self.warehouse_path)
            .map_err(|error| classify_sqlite_error(&error))?;
        self.check_configured_table(&connection)?;
        let row_cap = effective_row_cap(query);
        debug!(
            warehouse = %self.warehouse_path.display(),
            table = %self.table,
            row_cap,
            "submitting warehouse read job"
        );

        let started = Instant::now();
        let result = execute_read_only_query(&connection, query, row_cap).map_err(|error| {
            let classified = self.with_table_context(classify_sqlite_error(&error));
            warn!(kind = %classified.kind(), error = %error, "warehouse read job failed");
            classified
        })?;
        debug!(
            row_count = result.rows.len(),
            truncated = result.truncated,
            duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "warehouse read job completed"
        );

        let envelope = ResultEnvelope::from_rows(
            result.rows,
            "query succeeded but no log records matched",
        );
        if result.truncated {
            return Ok(envelope.with_message(format!("results truncated at {row_cap} rows")));
        }
        Ok(envelope)
    }
}

fn check_warehouse_access(path: &Path) -> Result<(), QueryError> {
    match std::fs::File::open(path) {
        Ok(_) => Ok(()),
        Err(error) if error.kind() == IoErrorKind::NotFound => Err(QueryError::MissingTable {
            detail: format!("log warehouse not found: {}", path.display()),
        }),
        Err(error) if error.kind() == IoErrorKind::PermissionDenied => {
            Err(QueryError::PermissionDenied {
                detail: format!("cannot read log warehouse {}: {error}", path.display()),
            })
        }
        Err(error) => Err(QueryError::Generic {
            detail: format!("cannot open log warehouse {}: {error}", path.display()),
        }),
    }
}

/// Maps a store failure onto the three reportable kinds.
#[must_use]
pub fn classify_sqlite_error(error: &rusqlite::Error) -> QueryError {
    let detail = error.to_string();
    let lowered = detail.to_ascii_lowercase();

    if lowered.contains("no such table") {
        return QueryError::MissingTable { detail };
    }

    let permission_code = matches!(
        error.sqlite_error_code(),
        Some(
            ErrorCode::PermissionDenied
                | ErrorCode::ReadOnly
                | ErrorCode::AuthorizationForStatementDenied
        )
    );
    if permission_code || lowered.contains("not authorized") || lowered.contains("access denied")
    {
        return QueryError::PermissionDenied { detail };
    }

    QueryError::Generic { detail }
}

#[derive(Debug, Clone)]
pub(crate) struct SqlGuardrailViolation {
    pub(crate) message: String,
}

/// Accepts exactly one `SELECT`, `WITH ... SELECT`, or `EXPLAIN ... SELECT`
/// statement with no mutating keywords.
pub(crate) fn validate_read_only_sql(raw_sql: &str) -> Result<(), SqlGuardrailViolation> {
    let candidate = strip_trailing_terminators(raw_sql);
    if candidate.is_empty() {
        return Err(guardrail_violation(
            "SQL query is empty; provide a SELECT/CTE/EXPLAIN-SELECT statement",
        ));
    }

    // Literal text never changes what a statement does.
    let candidate = mask_string_literals(candidate);
    if candidate.contains(';') {
        return Err(guardrail_violation(
            "Multi-statement SQL is not allowed; submit exactly one read-only statement",
        ));
    }

    let normalized = candidate.to_ascii_lowercase();
    if let Some(keyword) = first_mutating_keyword(&normalized) {
        return Err(guardrail_violation(format!(
            "Mutating SQL keyword `{keyword}` is not allowed; the log warehouse is read-only"
        )));
    }

    let normalized_whitespace = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
    let allowed = normalized_whitespace.starts_with("select")
        || normalized_whitespace.starts_with("with")
        || normalized_whitespace.starts_with("explain select")
        || normalized_whitespace.starts_with("explain query plan select");
    if !allowed {
        let leading_keyword = leading_keyword(&normalized);
        return Err(guardrail_violation(format!(
            "Only SELECT, WITH ... SELECT, and EXPLAIN ... SELECT statements are allowed \
             (found `{leading_keyword}`)"
        )));
    }

    Ok(())
}

/// Blanks the contents of single-quoted literals. A doubled quote (`''`)
/// closes and reopens the literal, which leaves it masked.
fn mask_string_literals(sql: &str) -> String {
    let mut in_literal = false;
    sql.chars()
        .map(|ch| {
            if ch == '\'' {
                in_literal = !in_literal;
                ch
            } else if in_literal {
                ' '
            } else {
                ch
            }
        })
        .collect()
}

fn first_mutating_keyword(normalized_sql: &str) -> Option<String> {
    const MUTATING_KEYWORDS: &[&str] = &[
        "insert", "update", "delete", "create", "alter", "drop", "truncate", "attach", "detach",
        "pragma", "vacuum", "reindex", "begin", "commit", "rollback",
    ];

    normalized_sql
        .split(|ch: char| !ch.is_ascii_alphanumeric() && ch != '_')
        .find_map(|token| {
            MUTATING_KEYWORDS
                .contains(&token)
                .then_some(token.to_string())
        })
}

fn leading_keyword(normalized_sql: &str) -> String {
    normalized_sql
        .split(|ch: char| !ch.is_ascii_alphanumeric() && ch != '_')
        .find(|token| !token.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

fn guardrail_violation(message: impl Into<String>) -> SqlGuardrailViolation {
    SqlGuardrailViolation {
        message: message.into(),
    }
}

#[derive(Debug)]
struct QueryExecutionResult {
    rows: Vec<Record>,
    truncated: bool,
}

fn execute_read_only_query(
    connection: &rusqlite::Connection,
    sql: &str,
    row_cap: usize,
) -> rusqlite::Result<QueryExecutionResult> {
    let mut statement = connection.prepare(sql)?;
    let column_names = statement
        .column_names()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();

    let mut rows = statement.query([])?;
    let mut result_rows = Vec::new();
    let mut truncated = false;
    while let Some(row) = rows.next()? {
        if result_rows.len() >= row_cap {
            truncated = true;
            break;
        }

        let mut record = Record::new();
        for (index, column_name) in column_names.iter().enumerate() {
            let value = row.get::<usize, SqlValue>(index)?;
            record.insert(column_name.clone(), json_value_from_sql(value));
        }
        result_rows.push(record);
    }

    Ok(QueryExecutionResult {
        rows: result_rows,
        truncated,
    })
}

fn json_value_from_sql(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(value) => json!(value),
        SqlValue::Real(value) => json!(value),
        SqlValue::Text(value) => json!(value),
        SqlValue::Blob(value) => json!(encode_blob_hex(&value)),
    }
}

fn encode_blob_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push(HEX[(byte >> 4) as usize] as char);
        output.push(HEX[(byte & 0x0f) as usize] as char);
    }
    output
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use rusqlite::types::Value as SqlValue;
    use serde_json::json;

    use super::{
        classify_sqlite_error, encode_blob_hex, execute_read_only_query, json_value_from_sql,
        validate_read_only_sql,
    };
    use crate::backends::QueryError;
    use crate::warehouse::open_warehouse_read_only;

    #[test]
    fn allows_select_with_optional_trailing_semicolon() {
        assert!(validate_read_only_sql("SELECT 1 LIMIT 50").is_ok());
        assert!(validate_read_only_sql("select 1 limit 5 ; ").is_ok());
        assert!(
            validate_read_only_sql("WITH x AS (SELECT 1) SELECT * FROM x LIMIT 50").is_ok()
        );
        assert!(validate_read_only_sql("EXPLAIN QUERY PLAN SELECT * FROM logs LIMIT 5").is_ok());
    }

    #[test]
    fn rejects_multi_statement_and_mutating_sql() {
        let multi = validate_read_only_sql("SELECT 1; SELECT 2 LIMIT 50")
            .expect_err("multi-statement SQL must be rejected");
        assert!(multi.message.contains("Multi-statement"));

        let mutating = validate_read_only_sql("DELETE FROM logs LIMIT 50")
            .expect_err("mutating SQL must be rejected");
        assert!(mutating.message.contains("`delete`"));

        let keyword_text = validate_read_only_sql("errors LIMIT 50")
            .expect_err("non-SQL text must be rejected");
        assert!(keyword_text.message.contains("`errors`"));
    }

    #[test]
    fn keywords_inside_string_literals_are_allowed() {
        for sql in [
            "SELECT * FROM logs WHERE message LIKE '%update%' LIMIT 50",
            "SELECT * FROM logs WHERE message LIKE '%;%' LIMIT 50",
            "SELECT * FROM logs WHERE message = 'can''t drop; delete' LIMIT 5",
        ] {
            assert!(validate_read_only_sql(sql).is_ok(), "{sql}");
        }

        let mutating = validate_read_only_sql("SELECT 'x' LIMIT 1; DROP TABLE logs")
            .expect_err("statement after a literal must still be rejected");
        assert!(mutating.message.contains("Multi-statement"));
    }

    #[test]
    fn classifies_missing_table() {
        let connection = Connection::open_in_memory().expect("in-memory db should open");
        let error = connection
            .prepare("SELECT * FROM logs LIMIT 50")
            .expect_err("missing table should fail to prepare");
        assert!(matches!(
            classify_sqlite_error(&error),
            QueryError::MissingTable { .. }
        ));
    }

    #[test]
    fn classifies_writes_on_read_only_connection_as_permission_denied() {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("clock should be after epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("logtriage-readonly-{nanos}.sqlite"));
        Connection::open(&path)
            .expect("scratch db should open")
            .execute_batch("CREATE TABLE logs (message TEXT);")
            .expect("scratch table should be created");

        let connection = open_warehouse_read_only(&path).expect("read-only open should succeed");
        let error = connection
            .execute("INSERT INTO logs (message) VALUES ('x')", [])
            .expect_err("write through read-only connection must fail");
        assert!(matches!(
            classify_sqlite_error(&error),
            QueryError::PermissionDenied { .. }
        ));

        drop(connection);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn classifies_syntax_errors_as_generic_with_raw_detail() {
        let connection = Connection::open_in_memory().expect("in-memory db should open");
        let error = connection
            .prepare("SELECT FROM WHERE LIMIT 50")
            .expect_err("malformed SQL should fail to prepare");
        match classify_sqlite_error(&error) {
            QueryError::Generic { detail } => assert!(detail.contains("syntax error"), "{detail}"),
            other => panic!("expected generic error, got {other:?}"),
        }
    }

    #[test]
    fn stops_fetching_at_row_cap() {
        let connection = Connection::open_in_memory().expect("in-memory db should open");
        connection
            .execute_batch(
                "CREATE TABLE t (n INTEGER); INSERT INTO t VALUES (1), (2), (3), (4);",
            )
            .expect("fixture table should be created");

        let result = execute_read_only_query(&connection, "SELECT n FROM t ORDER BY n DESC", 2)
            .expect("query should execute");
        assert!(result.truncated);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0].get("n"), Some(&json!(4)));
    }

    #[test]
    fn maps_sqlite_values_to_json() {
        assert_eq!(json_value_from_sql(SqlValue::Null), json!(null));
        assert_eq!(json_value_from_sql(SqlValue::Integer(7)), json!(7));
        assert_eq!(json_value_from_sql(SqlValue::Text("x".into())), json!("x"));
        assert_eq!(encode_blob_hex(&[0x00, 0xab, 0xff]), "00abff");
    }
}
