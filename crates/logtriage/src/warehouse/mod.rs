//! SQLite log warehouse: schema, provisioning, and connections.
//!
//! The live backend only ever opens the warehouse read-only. Writes happen
//! here, during provisioning.

use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OpenFlags, params_from_iter};

use crate::models::LogRecord;

pub const DEFAULT_LOGS_TABLE: &str = "logs";
pub const DEFAULT_INSERT_BATCH_SIZE: usize = 500;

pub const LOG_INSERT_COLUMNS: &[&str] = &[
    "timestamp",
    "timestamp_unix_ms",
    "severity",
    "service",
    "message",
    "trace_id",
    "http_status",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarehouseWriterConfig {
    pub batch_size: usize,
    pub replace_existing: bool,
}

impl Default for WarehouseWriterConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_INSERT_BATCH_SIZE,
            replace_existing: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarehouseWriteStats {
    pub input_records: usize,
    pub records_written: usize,
    pub batches_committed: usize,
}

#[must_use]
pub fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        }
        _ => false,
    }
}

pub fn create_logs_table_sql(table: &str) -> Result<String> {
    if !is_valid_table_name(table) {
        bail!("invalid log table name: {table:?}");
    }

    Ok(format!(
        r#"
CREATE TABLE IF NOT EXISTS {table} (
    timestamp TEXT NOT NULL,
    timestamp_unix_ms INTEGER NOT NULL,
    severity TEXT NOT NULL,
    service TEXT NOT NULL,
    message TEXT NOT NULL,
    trace_id TEXT,
    http_status INTEGER,
    CHECK (severity IN ('DEBUG', 'INFO', 'WARNING', 'ERROR', 'CRITICAL'))
);
CREATE INDEX IF NOT EXISTS idx_{table}_timestamp
ON {table} (timestamp_unix_ms DESC);
CREATE INDEX IF NOT EXISTS idx_{table}_service_severity
ON {table} (service, severity);
"#
    ))
}

/// Opens (creating if needed) the warehouse for provisioning.
pub fn open_warehouse_for_write(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!(
                "failed to create warehouse parent directory: {}",
                parent.display()
            )
        })?;
    }

    Connection::open(path)
        .with_context(|| format!("failed to open log warehouse: {}", path.display()))
}

/// Opens an existing warehouse without write capability. Fails rather than
/// creating an empty file when the warehouse is absent.
pub fn open_warehouse_read_only(path: &Path) -> rusqlite::Result<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
}

pub fn ensure_logs_table(connection: &Connection, table: &str) -> Result<()> {
    connection
        .execute_batch(&create_logs_table_sql(table)?)
        .with_context(|| format!("failed to create log table `{table}`"))
}

pub fn seed_warehouse(
    path: &Path,
    table: &str,
    records: &[LogRecord],
    config: WarehouseWriterConfig,
) -> Result<WarehouseWriteStats> {
    let mut connection = open_warehouse_for_write(path)?;
    ensure_logs_table(&connection, table)?;
    if config.replace_existing {
        connection
            .execute(&format!("DELETE FROM {table}"), [])
            .with_context(|| format!("failed to clear log table `{table}`"))?;
    }
    write_records_batched(&mut connection, table, records, config)
}

pub fn write_records_batched(
    connection: &mut Connection,
    table: &str,
    records: &[LogRecord],
    config: WarehouseWriterConfig,
) -> Result<WarehouseWriteStats> {
    if !is_valid_table_name(table) {
        bail!("invalid log table name: {table:?}");
    }

    let batch_size = config.batch_size.max(1);
    let insert_sql = build_insert_sql(table);
    let mut records_written = 0usize;
    let mut batches_committed = 0usize;

    for batch in records.chunks(batch_size) {
        let tx = connection
            .transaction()
            .context("failed to open warehouse transaction")?;
        {
            let mut statement = tx
                .prepare_cached(&insert_sql)
                .context("failed to prepare warehouse insert statement")?;

            for record in batch {
                let values = record_insert_values(record)?;
                statement
                    .execute(params_from_iter(values))
                    .with_context(|| {
                        format!("failed to insert log record at {}", record.timestamp)
                    })?;
                records_written += 1;
            }
        }
        tx.commit()
            .context("failed to commit warehouse batch transaction")?;
        batches_committed += 1;
    }

    Ok(WarehouseWriteStats {
        input_records: records.len(),
        records_written,
        batches_committed,
    })
}

fn build_insert_sql(table: &str) -> String {
    let placeholders = (1..=LOG_INSERT_COLUMNS.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders})",
        LOG_INSERT_COLUMNS.join(", "),
    )
}

fn record_insert_values(record: &LogRecord) -> Result<Vec<SqlValue>> {
    Ok(vec![
        SqlValue::Text(record.timestamp.clone()),
        SqlValue::Integer(
            i64::try_from(record.timestamp_unix_ms)
                .map_err(|_| anyhow!("timestamp_unix_ms exceeds sqlite INTEGER range"))?,
        ),
        SqlValue::Text(record.severity.as_str().to_string()),
        SqlValue::Text(record.service.clone()),
        SqlValue::Text(record.message.clone()),
        record
            .trace_id
            .clone()
            .map_or(SqlValue::Null, SqlValue::Text),
        record.http_status.map_or(SqlValue::Null, SqlValue::Integer),
    ])
}
