use anyhow::Result;
use clap::Args;
use tracing::info;

use crate::config::ToolConfig;
use crate::tool::LogQueryTool;

#[derive(Debug, Clone, Args)]
pub struct InvokeArgs {
    /// Candidate query as the agent would supply it.
    #[arg(value_name = "QUERY", required_unless_present = "arguments")]
    pub query: Option<String>,

    /// Raw tool arguments, e.g. `{"query": "errors"}`.
    #[arg(long, value_name = "JSON", conflicts_with = "query")]
    pub arguments: Option<String>,
}

pub fn run(args: &InvokeArgs, config: &ToolConfig) -> Result<()> {
    let tool = LogQueryTool::from_config(config);
    info!(backend = tool.backend_name(), "tool bound to backend");

    let output = match &args.arguments {
        Some(arguments) => tool.invoke_arguments(arguments),
        None => tool.invoke(args.query.as_deref().unwrap_or_default()),
    };
    println!("{output}");

    Ok(())
}
