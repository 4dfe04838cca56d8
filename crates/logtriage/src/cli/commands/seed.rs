use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use crate::backends::corpus::fixture_records;
use crate::config::ToolConfig;
use crate::utils::time::{format_unix_ms, parse_timestamp_to_unix_ms, unix_timestamp_ms};
use crate::warehouse::{WarehouseWriterConfig, seed_warehouse};

#[derive(Debug, Clone, Args)]
pub struct SeedArgs {
    /// Instant the fixture offsets are measured from (RFC 3339 or epoch).
    /// Defaults to now.
    #[arg(long, value_name = "TIMESTAMP")]
    pub anchor: Option<String>,

    /// Delete existing rows before inserting.
    #[arg(long, default_value_t = false)]
    pub replace: bool,
}

pub fn run(args: &SeedArgs, config: &ToolConfig) -> Result<()> {
    let anchor_unix_ms = match args.anchor.as_deref() {
        Some(raw) => parse_timestamp_to_unix_ms(raw).context("invalid --anchor")?,
        None => unix_timestamp_ms(),
    };
    let records = fixture_records(anchor_unix_ms);
    let writer_config = WarehouseWriterConfig {
        replace_existing: args.replace,
        ..WarehouseWriterConfig::default()
    };

    let stats = seed_warehouse(&config.warehouse_path, &config.table, &records, writer_config)?;
    info!(
        input_records = stats.input_records,
        records_written = stats.records_written,
        batches = stats.batches_committed,
        "warehouse seeded"
    );
    println!(
        "seed: wrote {}/{} record(s) to {} table={} anchor={}",
        stats.records_written,
        stats.input_records,
        config.warehouse_path.display(),
        config.table,
        format_unix_ms(anchor_unix_ms)
    );

    Ok(())
}
