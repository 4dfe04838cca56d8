pub mod corpus;
pub mod live;
pub mod synthetic;

pub use live::LiveBackend;
pub use synthetic::SyntheticBackend;

use thiserror::Error;

use crate::models::{ErrorEnvelope, ErrorKind, ResultEnvelope};
use crate::warehouse::DEFAULT_LOGS_TABLE;

pub const MISSING_TABLE_HINT: &str = "The log warehouse or its table has not been provisioned yet. \
     Provision it (for example with `logtriage seed`) and allow ingestion time to populate it \
     before querying again.";

pub const PERMISSION_DENIED_HINT: &str = "The tool needs read-only access: read permission on \
     the warehouse file and SELECT on the logs table. Write access is never required.";

/// Classified failure of a single backend job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("log table not found: {detail}")]
    MissingTable { detail: String },

    #[error("permission denied: {detail}")]
    PermissionDenied { detail: String },

    #[error("query rejected: {message}")]
    Rejected { message: String },

    #[error("query failed: {detail}")]
    Generic { detail: String },
}

impl QueryError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingTable { .. } => ErrorKind::MissingTable,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::Rejected { .. } | Self::Generic { .. } => ErrorKind::Generic,
        }
    }

    #[must_use]
    pub fn to_envelope(&self) -> ErrorEnvelope {
        match self {
            Self::MissingTable { detail } => {
                ErrorEnvelope::new(ErrorKind::MissingTable, "log table not found")
                    .with_hint(MISSING_TABLE_HINT)
                    .with_detail(detail.clone())
            }
            Self::PermissionDenied { detail } => ErrorEnvelope::new(
                ErrorKind::PermissionDenied,
                "permission denied while querying logs",
            )
            .with_hint(PERMISSION_DENIED_HINT)
            .with_detail(detail.clone()),
            Self::Rejected { message } => {
                ErrorEnvelope::new(ErrorKind::Generic, "query rejected before execution")
                    .with_hint(message.clone())
            }
            Self::Generic { detail } => {
                ErrorEnvelope::new(ErrorKind::Generic, "log query failed")
                    .with_detail(detail.clone())
            }
        }
    }
}

/// Capability the tool façade dispatches to. Implementations receive an
/// already-sanitized query and resolve it in a single job.
pub trait LogBackend: Send + Sync {
    /// Short stable name reported in tool envelopes.
    fn name(&self) -> &'static str;

    /// Table the agent should address its queries to.
    fn log_table(&self) -> &str {
        DEFAULT_LOGS_TABLE
    }

    fn execute(&self, query: &str) -> Result<ResultEnvelope, QueryError>;
}
