use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::log_record::Record;
use crate::utils::time::{format_unix_ms, unix_timestamp_ms};

pub const TOOL_ENVELOPE_SCHEMA_VERSION: &str = "logtriage.tool-envelope.v1";

pub type ToolEnvelopeMeta = BTreeMap<String, Value>;

/// Uniform output of a backend invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub row_count: usize,
    pub rows: Vec<Record>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ResultEnvelope {
    /// Builds an envelope from fetched rows. An empty row set is annotated
    /// with `empty_message` so the caller never sees a bare zero.
    #[must_use]
    pub fn from_rows(rows: Vec<Record>, empty_message: impl Into<String>) -> Self {
        if rows.is_empty() {
            return Self::empty(empty_message);
        }
        Self {
            row_count: rows.len(),
            rows,
            message: None,
        }
    }

    #[must_use]
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            row_count: 0,
            rows: Vec::new(),
            message: Some(message.into()),
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingTable,
    PermissionDenied,
    Generic,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingTable => "missing_table",
            Self::PermissionDenied => "permission_denied",
            Self::Generic => "generic",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub kind: ErrorKind,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,

    /// Raw message from the underlying store, kept for diagnostics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorEnvelope {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            hint: None,
            detail: None,
        }
    }

    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// The single document handed back to the agent. Success and failure share
/// this shape; failures carry `row_count = 0`, no rows, and `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolEnvelope {
    pub ok: bool,
    pub tool: String,
    pub backend: String,
    pub generated_at_utc: String,
    pub query: String,
    pub row_count: usize,
    pub rows: Vec<Record>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    pub meta: ToolEnvelopeMeta,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
}

impl ToolEnvelope {
    #[must_use]
    pub fn success(
        tool: impl Into<String>,
        backend: impl Into<String>,
        query: impl Into<String>,
        result: ResultEnvelope,
    ) -> Self {
        let mut envelope = Self::base(tool, backend, query, true);
        envelope.row_count = result.rows.len();
        envelope.rows = result.rows;
        envelope.message = result.message;
        envelope
    }

    #[must_use]
    pub fn failure(
        tool: impl Into<String>,
        backend: impl Into<String>,
        query: impl Into<String>,
        error: ErrorEnvelope,
    ) -> Self {
        let mut envelope = Self::base(tool, backend, query, false);
        envelope.message = Some(error.message.clone());
        envelope.error = Some(error);
        envelope
    }

    fn base(
        tool: impl Into<String>,
        backend: impl Into<String>,
        query: impl Into<String>,
        ok: bool,
    ) -> Self {
        let mut meta = ToolEnvelopeMeta::new();
        meta.insert(
            "schema_version".to_string(),
            json!(TOOL_ENVELOPE_SCHEMA_VERSION),
        );

        Self {
            ok,
            tool: tool.into(),
            backend: backend.into(),
            generated_at_utc: format_unix_ms(unix_timestamp_ms()),
            query: query.into(),
            row_count: 0,
            rows: Vec::new(),
            message: None,
            meta,
            error: None,
        }
    }

    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }
}
