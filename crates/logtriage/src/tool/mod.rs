//! The `query_logs` capability exposed to the diagnosis agent.
//!
//! `invoke` is total: it always returns one JSON document, success or not.

use std::time::Instant;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::backends::{LiveBackend, LogBackend, SyntheticBackend};
use crate::config::{BackendMode, ToolConfig};
use crate::models::{ErrorEnvelope, ErrorKind, LogRecord, ResultEnvelope, ToolEnvelope};
use crate::sanitize::{effective_row_cap, sanitize};

pub const TOOL_NAME: &str = "query_logs";
pub const TOOL_DESCRIPTION: &str = "Query production logs to investigate an incident. Returns a \
     JSON document with `row_count`, `rows` (newest first), an optional `message`, and an \
     `error` object with `kind` and `hint` when the query could not run.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct QueryLogsInput {
    /// A bounded read query; must include a row limit.
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: String,
    pub input_schema: Value,
    pub record_schema: Value,
}

pub struct LogQueryTool {
    backend: Box<dyn LogBackend>,
}

impl std::fmt::Debug for LogQueryTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogQueryTool")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl LogQueryTool {
    #[must_use]
    pub fn new(backend: Box<dyn LogBackend>) -> Self {
        Self { backend }
    }

    /// Binds the tool to the backend selected by `config.mode`. The choice
    /// cannot be changed afterwards.
    #[must_use]
    pub fn from_config(config: &ToolConfig) -> Self {
        let backend: Box<dyn LogBackend> = match config.mode {
            BackendMode::Synthetic => Box::new(SyntheticBackend::new()),
            BackendMode::Live => Box::new(LiveBackend::new(
                config.warehouse_path.clone(),
                config.table.clone(),
            )),
        };
        Self::new(backend)
    }

    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Agent-facing description of this tool, naming the table its backend
    /// answers for.
    #[must_use]
    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: TOOL_NAME,
            description: format!(
                "{TOOL_DESCRIPTION} Log records live in the `{}` table.",
                self.backend.log_table()
            ),
            input_schema: schema_value(schemars::schema_for!(QueryLogsInput)),
            record_schema: schema_value(schemars::schema_for!(LogRecord)),
        }
    }

    /// Runs one candidate query and returns the serialized envelope.
    #[must_use]
    pub fn invoke(&self, candidate_query: &str) -> String {
        encode_envelope(&self.invoke_envelope(candidate_query))
    }

    /// Same as [`invoke`](Self::invoke) for raw agent arguments of the form
    /// `{"query": "..."}`.
    #[must_use]
    pub fn invoke_arguments(&self, arguments: &str) -> String {
        match serde_json::from_str::<QueryLogsInput>(arguments) {
            Ok(input) => self.invoke(&input.query),
            Err(error) => {
                warn!(error = %error, "rejecting malformed tool arguments");
                let failure = ErrorEnvelope::new(ErrorKind::Generic, "invalid tool arguments")
                    .with_hint(r#"pass a JSON object of the form {"query": "<bounded read query>"}"#)
                    .with_detail(error.to_string());
                encode_envelope(&ToolEnvelope::failure(
                    TOOL_NAME,
                    self.backend.name(),
                    String::new(),
                    failure,
                ))
            }
        }
    }

    #[must_use]
    pub fn invoke_envelope(&self, candidate_query: &str) -> ToolEnvelope {
        let query = sanitize(candidate_query);
        let row_cap = effective_row_cap(&query);
        let backend = self.backend.name();
        let started = Instant::now();

        let envelope = match self.backend.execute(&query) {
            Ok(result) => {
                let result = enforce_row_cap(result, row_cap);
                info!(
                    backend,
                    row_count = result.rows.len(),
                    "log query completed"
                );
                ToolEnvelope::success(TOOL_NAME, backend, query, result)
            }
            Err(error) => {
                warn!(backend, kind = %error.kind(), error = %error, "log query failed");
                ToolEnvelope::failure(TOOL_NAME, backend, query, error.to_envelope())
            }
        };

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        envelope
            .with_meta("duration_ms", json!(duration_ms))
            .with_meta("row_cap", json!(row_cap))
    }
}

fn enforce_row_cap(result: ResultEnvelope, row_cap: usize) -> ResultEnvelope {
    if result.rows.len() <= row_cap {
        return result;
    }
    let message = format!("results truncated at {row_cap} rows");
    let mut rows = result.rows;
    rows.truncate(row_cap);
    ResultEnvelope::from_rows(rows, message.clone()).with_message(message)
}

fn schema_value(schema: schemars::Schema) -> Value {
    serde_json::to_value(schema).unwrap_or_else(|_| json!({ "type": "object" }))
}

fn encode_envelope(envelope: &ToolEnvelope) -> String {
    serde_json::to_string(envelope).unwrap_or_else(|error| {
        warn!(error = %error, "failed to encode tool envelope");
        json!({
            "ok": false,
            "tool": TOOL_NAME,
            "backend": envelope.backend,
            "generated_at_utc": envelope.generated_at_utc,
            "query": envelope.query,
            "row_count": 0,
            "rows": [],
            "message": "failed to encode tool response",
            "meta": {},
            "error": {
                "kind": ErrorKind::Generic.as_str(),
                "message": "failed to encode tool response",
                "detail": error.to_string()
            }
        })
        .to_string()
    })
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::{LogQueryTool, TOOL_NAME};
    use crate::backends::{LogBackend, QueryError, SyntheticBackend};
    use crate::models::{Record, ResultEnvelope};

    struct OversizedBackend;

    impl LogBackend for OversizedBackend {
        fn name(&self) -> &'static str {
            "oversized"
        }

        fn execute(&self, _query: &str) -> Result<ResultEnvelope, QueryError> {
            let rows = (0..500)
                .map(|index| {
                    let mut record = Record::new();
                    record.insert("n".to_string(), json!(index));
                    record
                })
                .collect::<Vec<_>>();
            Ok(ResultEnvelope::from_rows(rows, "unused"))
        }
    }

    struct FailingBackend;

    impl LogBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn execute(&self, _query: &str) -> Result<ResultEnvelope, QueryError> {
            Err(QueryError::Generic {
                detail: "disk I/O error".to_string(),
            })
        }
    }

    fn parse(output: &str) -> Value {
        serde_json::from_str(output).expect("tool output should be one JSON document")
    }

    #[test]
    fn enforces_row_cap_on_any_backend() {
        let tool = LogQueryTool::new(Box::new(OversizedBackend));
        let output = parse(&tool.invoke("SELECT * FROM logs LIMIT 1000"));
        assert_eq!(output.get("row_count"), Some(&json!(50)));
        assert_eq!(
            output.get("rows").and_then(Value::as_array).map(Vec::len),
            Some(50)
        );
        assert_eq!(output.pointer("/meta/row_cap"), Some(&json!(50)));
        assert_eq!(
            output.get("query"),
            Some(&json!("SELECT * FROM logs LIMIT 50"))
        );
    }

    #[test]
    fn zero_cap_over_oversized_backend_still_explains_empty_result() {
        let tool = LogQueryTool::new(Box::new(OversizedBackend));
        let output = parse(&tool.invoke("SELECT * FROM logs LIMIT 0"));
        assert_eq!(output.get("ok"), Some(&json!(true)));
        assert_eq!(output.get("row_count"), Some(&json!(0)));
        assert_eq!(output.get("rows"), Some(&json!([])));
        assert_eq!(
            output.get("message"),
            Some(&json!("results truncated at 0 rows"))
        );
    }

    #[test]
    fn backend_failures_become_error_documents() {
        let tool = LogQueryTool::new(Box::new(FailingBackend));
        let output = parse(&tool.invoke("SELECT * FROM logs"));
        assert_eq!(output.get("ok"), Some(&json!(false)));
        assert_eq!(output.get("tool"), Some(&json!(TOOL_NAME)));
        assert_eq!(output.pointer("/error/kind"), Some(&json!("generic")));
        assert_eq!(
            output.pointer("/error/detail"),
            Some(&json!("disk I/O error"))
        );
    }

    #[test]
    fn malformed_arguments_become_error_documents() {
        let tool = LogQueryTool::new(Box::new(SyntheticBackend::with_anchor(1_770_274_803_000)));
        let output = parse(&tool.invoke_arguments(r#"{"sql": "SELECT 1"}"#));
        assert_eq!(output.get("ok"), Some(&json!(false)));
        assert_eq!(output.get("row_count"), Some(&json!(0)));
        assert!(output.pointer("/error/hint").is_some());

        let output = parse(&tool.invoke_arguments(r#"{"query": "errors"}"#));
        assert_eq!(output.get("ok"), Some(&json!(true)));
    }

    #[test]
    fn descriptor_exposes_single_query_input() {
        let tool = LogQueryTool::new(Box::new(SyntheticBackend::with_anchor(1_770_274_803_000)));
        let descriptor = tool.descriptor();
        assert_eq!(descriptor.name, "query_logs");
        assert!(descriptor.description.contains("`logs` table"));
        assert_eq!(
            descriptor.input_schema.pointer("/properties/query/type"),
            Some(&json!("string"))
        );
        assert_eq!(
            descriptor.input_schema.pointer("/required"),
            Some(&json!(["query"]))
        );
        assert!(
            descriptor
                .input_schema
                .pointer("/properties/query/description")
                .and_then(Value::as_str)
                .is_some_and(|text| text.contains("row limit"))
        );
    }
}
