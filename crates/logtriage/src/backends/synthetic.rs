//! Deterministic in-memory backend.
//!
//! Query "understanding" is keyword matching over the raw query text, not
//! parsing. Filter precedence is fixed: severity, then origin, then
//! recency, then the row cap. Records are sorted newest first last of all.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use super::corpus::{KNOWN_SERVICES, fixture_records};
use super::{LogBackend, QueryError};
use crate::models::{LogRecord, ResultEnvelope, Severity};
use crate::sanitize::effective_row_cap;
use crate::utils::time::{MILLIS_PER_MINUTE, unix_timestamp_ms};

pub const SYNTHETIC_BACKEND_NAME: &str = "synthetic";

/// Identifies the keyword rule set below. Changing any signal or its
/// precedence is a new rule set.
pub const MATCH_RULES_VERSION: &str = "keyword-match.v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchPlan {
    pub severity: Option<Severity>,
    pub origin: Option<&'static str>,
    pub window_minutes: Option<u64>,
    pub row_cap: usize,
}

impl MatchPlan {
    fn describe(&self) -> String {
        let mut filters = Vec::new();
        if let Some(severity) = self.severity {
            filters.push(format!("severity={}", severity.as_str()));
        }
        if let Some(origin) = self.origin {
            filters.push(format!("service~{origin}"));
        }
        if let Some(window_minutes) = self.window_minutes {
            filters.push(format!("within last {window_minutes} minutes"));
        }
        if filters.is_empty() {
            "no filters".to_string()
        } else {
            filters.join(", ")
        }
    }
}

/// Derives the filters the synthetic backend applies for `query`.
#[must_use]
pub fn plan_query(query: &str) -> MatchPlan {
    let lowered = query.to_ascii_lowercase();

    let severity = if lowered.contains("error") {
        Some(Severity::Error)
    } else if lowered.contains("warn") {
        Some(Severity::Warning)
    } else {
        None
    };

    let origin = KNOWN_SERVICES
        .iter()
        .copied()
        .find(|needle| lowered.contains(needle));

    let window_minutes = if thirty_minute_regex().is_match(&lowered) {
        Some(30)
    } else if one_hour_regex().is_match(&lowered) {
        Some(60)
    } else {
        None
    };

    MatchPlan {
        severity,
        origin,
        window_minutes,
        row_cap: effective_row_cap(query),
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticBackend {
    anchor_unix_ms: u64,
    records: Vec<LogRecord>,
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticBackend {
    /// Builds the corpus anchored at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self::with_anchor(unix_timestamp_ms())
    }

    #[must_use]
    pub fn with_anchor(anchor_unix_ms: u64) -> Self {
        Self {
            anchor_unix_ms,
            records: fixture_records(anchor_unix_ms),
        }
    }

    #[must_use]
    pub fn anchor_unix_ms(&self) -> u64 {
        self.anchor_unix_ms
    }

    #[must_use]
    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Evaluates `query` with recency bounds relative to `now_unix_ms`.
    #[must_use]
    pub fn execute_at(&self, query: &str, now_unix_ms: u64) -> ResultEnvelope {
        let plan = plan_query(query);
        let newer_than = plan
            .window_minutes
            .map(|minutes| now_unix_ms.saturating_sub(minutes * MILLIS_PER_MINUTE));
        debug!(
            rules = MATCH_RULES_VERSION,
            severity = plan.severity.map(Severity::as_str),
            origin = plan.origin,
            window_minutes = plan.window_minutes,
            row_cap = plan.row_cap,
            "evaluating synthetic query"
        );

        let mut matched = self
            .records
            .iter()
            .filter(|record| plan.severity.is_none_or(|severity| record.severity == severity))
            .filter(|record| plan.origin.is_none_or(|origin| record.service.contains(origin)))
            .filter(|record| newer_than.is_none_or(|bound| record.timestamp_unix_ms > bound))
            .take(plan.row_cap)
            .collect::<Vec<_>>();
        matched.sort_by(|left, right| right.timestamp_unix_ms.cmp(&left.timestamp_unix_ms));

        let rows = matched.into_iter().map(LogRecord::to_record).collect();
        ResultEnvelope::from_rows(
            rows,
            format!("no log records matched ({})", plan.describe()),
        )
    }
}

impl LogBackend for SyntheticBackend {
    fn name(&self) -> &'static str {
        SYNTHETIC_BACKEND_NAME
    }

    fn execute(&self, query: &str) -> Result<ResultEnvelope, QueryError> {
        Ok(self.execute_at(query, unix_timestamp_ms()))
    }
}

fn thirty_minute_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\b30\s*(?:m|mins?|minutes?)\b").expect("30 minute regex should compile")
    })
}

fn one_hour_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\b(?:1\s*(?:h|hrs?|hours?)|60\s*(?:m|mins?|minutes?)|(?:last|past)\s+hour)\b")
            .expect("one hour regex should compile")
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{MatchPlan, SyntheticBackend, plan_query};
    use crate::models::Severity;
    use crate::utils::time::MILLIS_PER_MINUTE;

    const ANCHOR: u64 = 1_770_274_803_000;

    fn trace_ids(backend: &SyntheticBackend, query: &str) -> Vec<String> {
        backend
            .execute_at(query, ANCHOR)
            .rows
            .iter()
            .filter_map(|row| row.get("trace_id").and_then(|value| value.as_str()))
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn plan_applies_error_before_warning() {
        let plan = plan_query("errors and warnings from checkout");
        assert_eq!(
            plan,
            MatchPlan {
                severity: Some(Severity::Error),
                origin: Some("checkout"),
                window_minutes: None,
                row_cap: 50,
            }
        );
        assert_eq!(plan_query("WARN lines").severity, Some(Severity::Warning));
        assert_eq!(plan_query("SELECT * FROM logs").severity, None);
    }

    #[test]
    fn first_known_origin_wins() {
        // `payment` precedes `auth` in the priority list.
        assert_eq!(
            plan_query("auth failures blocking payment").origin,
            Some("payment")
        );
        assert_eq!(plan_query("gateway and inventory").origin, Some("inventory"));
    }

    #[test]
    fn recency_signals_prefer_thirty_minutes() {
        assert_eq!(plan_query("last 30 minutes").window_minutes, Some(30));
        assert_eq!(
            plan_query("INTERVAL 30 MINUTE and 1 hour").window_minutes,
            Some(30)
        );
        assert_eq!(plan_query("past hour").window_minutes, Some(60));
        assert_eq!(plan_query("INTERVAL 1 HOUR").window_minutes, Some(60));
        assert_eq!(plan_query("last 11 hours").window_minutes, None);
    }

    #[test]
    fn error_query_returns_error_rows_newest_first() {
        let backend = SyntheticBackend::with_anchor(ANCHOR);
        let result = backend.execute_at("errors LIMIT 50", ANCHOR);

        assert_eq!(result.row_count, 9);
        assert_eq!(result.rows.len(), result.row_count);
        assert!(
            result
                .rows
                .iter()
                .all(|row| row.get("severity") == Some(&json!("ERROR")))
        );
        let timestamps = result
            .rows
            .iter()
            .filter_map(|row| row.get("timestamp_unix_ms").and_then(|value| value.as_u64()))
            .collect::<Vec<_>>();
        assert!(timestamps.windows(2).all(|pair| pair[0] >= pair[1]));
    }

    #[test]
    fn row_cap_truncates_in_corpus_order() {
        let backend = SyntheticBackend::with_anchor(ANCHOR);
        assert_eq!(
            trace_ids(&backend, "errors LIMIT 2"),
            vec!["trace-pay-001".to_string(), "trace-chk-001".to_string()]
        );
        assert_eq!(backend.execute_at("errors limit 0", ANCHOR).row_count, 0);
    }

    #[test]
    fn origin_and_window_intersect() {
        let backend = SyntheticBackend::with_anchor(ANCHOR);
        assert_eq!(
            trace_ids(&backend, "payment logs from the last 30 minutes LIMIT 50"),
            vec![
                "trace-pay-001".to_string(),
                "trace-pay-002".to_string(),
                "trace-pay-003".to_string()
            ]
        );
    }

    #[test]
    fn window_is_relative_to_invocation_time() {
        let backend = SyntheticBackend::with_anchor(ANCHOR);
        let later = ANCHOR + 10 * MILLIS_PER_MINUTE;
        let result = backend.execute_at("payment errors in the last 30 minutes", later);
        let traces = result
            .rows
            .iter()
            .filter_map(|row| row.get("trace_id").and_then(|value| value.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(traces, vec!["trace-pay-001", "trace-pay-002"]);
    }

    #[test]
    fn empty_match_reports_applied_filters() {
        let backend = SyntheticBackend::with_anchor(ANCHOR);
        let result = backend.execute_at("gateway warnings last 30 minutes", ANCHOR + 3_600_000);
        assert_eq!(result.row_count, 0);
        assert!(result.rows.is_empty());
        let message = result.message.expect("empty result should carry a message");
        assert!(message.contains("severity=WARNING"), "{message}");
        assert!(message.contains("service~gateway"), "{message}");
        assert!(message.contains("30 minutes"), "{message}");
    }

    #[test]
    fn corpus_is_not_mutated_by_queries() {
        let backend = SyntheticBackend::with_anchor(ANCHOR);
        let before = backend.records().to_vec();
        let _ = backend.execute_at("errors LIMIT 3", ANCHOR);
        assert_eq!(backend.records(), before.as_slice());
        assert_eq!(backend.anchor_unix_ms(), ANCHOR);
    }
}
