use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Generic row shape shared by every backend: field name to JSON scalar.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LogRecord {
    pub timestamp: String,
    pub timestamp_unix_ms: u64,
    pub severity: Severity,
    pub service: String,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<i64>,
}

impl LogRecord {
    /// Interchange form. Optional fields are emitted as explicit nulls so
    /// every row exposes the same field set.
    #[must_use]
    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("timestamp".to_string(), json!(self.timestamp));
        record.insert(
            "timestamp_unix_ms".to_string(),
            json!(self.timestamp_unix_ms),
        );
        record.insert("severity".to_string(), json!(self.severity.as_str()));
        record.insert("service".to_string(), json!(self.service));
        record.insert("message".to_string(), json!(self.message));
        record.insert("trace_id".to_string(), json!(self.trace_id));
        record.insert("http_status".to_string(), json!(self.http_status));
        record
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{LogRecord, Severity};

    #[test]
    fn severity_serializes_upper_case() {
        assert_eq!(
            serde_json::to_value(Severity::Warning).expect("severity should serialize"),
            json!("WARNING")
        );
        assert_eq!(
            serde_json::from_value::<Severity>(json!("CRITICAL")).expect("severity should parse"),
            Severity::Critical
        );
        assert_eq!(Severity::Error.as_str(), "ERROR");
    }

    #[test]
    fn record_form_keeps_null_optional_fields() {
        let record = LogRecord {
            timestamp: "2026-02-05T07:00:03.000Z".to_string(),
            timestamp_unix_ms: 1_770_274_803_000,
            severity: Severity::Info,
            service: "auth-service".to_string(),
            message: "login ok".to_string(),
            trace_id: None,
            http_status: Some(200),
        }
        .to_record();

        assert_eq!(record.get("severity"), Some(&json!("INFO")));
        assert_eq!(record.get("trace_id"), Some(&json!(null)));
        assert_eq!(record.get("http_status"), Some(&json!(200)));
        assert_eq!(record.len(), 7);
    }
}
