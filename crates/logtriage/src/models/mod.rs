pub mod envelope;
pub mod log_record;

pub use envelope::{
    ErrorEnvelope, ErrorKind, ResultEnvelope, TOOL_ENVELOPE_SCHEMA_VERSION, ToolEnvelope,
    ToolEnvelopeMeta,
};
pub use log_record::{LogRecord, Record, Severity};
