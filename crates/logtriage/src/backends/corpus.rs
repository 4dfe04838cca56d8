use crate::models::{LogRecord, Severity};
use crate::utils::time::{format_unix_ms, minutes_before};

struct FixtureEntry {
    minutes_ago: u64,
    severity: Severity,
    service: &'static str,
    message: &'static str,
    trace_id: Option<&'static str>,
    http_status: Option<i64>,
}

const fn entry(
    minutes_ago: u64,
    severity: Severity,
    service: &'static str,
    message: &'static str,
    trace_id: Option<&'static str>,
    http_status: Option<i64>,
) -> FixtureEntry {
    FixtureEntry {
        minutes_ago,
        severity,
        service,
        message,
        trace_id,
        http_status,
    }
}

// Newest first. Offsets are minutes before the corpus anchor.
#[rustfmt::skip]
const FIXTURE: &[FixtureEntry] = &[
    entry(2, Severity::Error, "payment-service", "charge declined by upstream processor: timeout after 5000ms", Some("trace-pay-001"), Some(504)),
    entry(4, Severity::Warning, "api-gateway", "upstream latency above 2s for /v1/checkout", Some("trace-gw-001"), Some(200)),
    entry(6, Severity::Error, "checkout-service", "failed to reserve cart items: inventory-service returned 503", Some("trace-chk-001"), Some(503)),
    entry(8, Severity::Info, "auth-service", "token refresh succeeded", Some("trace-auth-001"), Some(200)),
    entry(11, Severity::Error, "payment-service", "database connection pool exhausted (max=20)", Some("trace-pay-002"), Some(500)),
    entry(14, Severity::Warning, "payment-service", "retrying charge request (attempt 2/3)", Some("trace-pay-003"), None),
    entry(17, Severity::Info, "inventory-service", "stock sync completed for 1204 SKUs", None, None),
    entry(21, Severity::Error, "auth-service", "JWT signature verification failed for key id kid-7", Some("trace-auth-002"), Some(401)),
    entry(25, Severity::Warning, "notification-service", "email provider quota at 85%", None, None),
    entry(28, Severity::Error, "inventory-service", "deadlock detected while updating stock levels", Some("trace-inv-001"), Some(500)),
    entry(33, Severity::Info, "payment-service", "webhook delivered to merchant endpoint", Some("trace-pay-004"), Some(200)),
    entry(38, Severity::Error, "checkout-service", "order submission failed: payment-service unavailable", Some("trace-chk-002"), Some(502)),
    entry(42, Severity::Warning, "auth-service", "elevated failed login attempts from 10.0.4.17", Some("trace-auth-003"), Some(429)),
    entry(47, Severity::Info, "api-gateway", "health check passed", None, Some(200)),
    entry(52, Severity::Error, "payment-service", "idempotency key collision for order ord-88412", Some("trace-pay-005"), Some(409)),
    entry(58, Severity::Warning, "inventory-service", "cache miss ratio above 40%", None, None),
    entry(64, Severity::Info, "checkout-service", "cart service deployed version 2.14.1", None, None),
    entry(71, Severity::Error, "notification-service", "push queue backlog exceeded 10000 messages", Some("trace-ntf-001"), None),
    entry(79, Severity::Warning, "checkout-service", "slow query on orders table (1840ms)", Some("trace-chk-003"), None),
    entry(88, Severity::Info, "notification-service", "daily digest batch sent", None, None),
    entry(97, Severity::Error, "api-gateway", "TLS handshake failures from edge node edge-3", Some("trace-gw-002"), Some(502)),
    entry(108, Severity::Warning, "payment-service", "fraud score service responded slowly (1.2s)", Some("trace-pay-006"), Some(200)),
    entry(119, Severity::Info, "auth-service", "signing key rotation completed", None, None),
    entry(135, Severity::Info, "inventory-service", "nightly reindex started", None, None),
];

/// Known origin substrings, in match priority order.
pub const KNOWN_SERVICES: &[&str] = &[
    "payment",
    "checkout",
    "auth",
    "inventory",
    "notification",
    "gateway",
];

/// Materializes the fixed corpus relative to `anchor_unix_ms`.
#[must_use]
pub fn fixture_records(anchor_unix_ms: u64) -> Vec<LogRecord> {
    FIXTURE
        .iter()
        .map(|fixture| {
            let timestamp_unix_ms = minutes_before(anchor_unix_ms, fixture.minutes_ago);
            LogRecord {
                timestamp: format_unix_ms(timestamp_unix_ms),
                timestamp_unix_ms,
                severity: fixture.severity,
                service: fixture.service.to_string(),
                message: fixture.message.to_string(),
                trace_id: fixture.trace_id.map(ToString::to_string),
                http_status: fixture.http_status,
            }
        })
        .collect()
}
