use anyhow::{Context, Result};
use clap::Args;

use crate::config::ToolConfig;
use crate::tool::LogQueryTool;

#[derive(Debug, Clone, Args)]
pub struct DescribeArgs {
    #[arg(long, default_value_t = false)]
    pub pretty: bool,
}

pub fn run(args: &DescribeArgs, config: &ToolConfig) -> Result<()> {
    let descriptor = LogQueryTool::from_config(config).descriptor();
    let encoded = if args.pretty {
        serde_json::to_string_pretty(&descriptor)
    } else {
        serde_json::to_string(&descriptor)
    }
    .context("failed to encode tool descriptor")?;
    println!("{encoded}");

    Ok(())
}
