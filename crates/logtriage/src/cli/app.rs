use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use super::commands::{describe::DescribeArgs, invoke::InvokeArgs, seed::SeedArgs};

#[derive(Debug, Parser)]
#[command(
    name = "logtriage",
    version,
    about = "Bounded log queries for incident diagnosis agents"
)]
pub struct Cli {
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct RuntimeArgs {
    #[arg(long, global = true, value_name = "PATH")]
    pub home_dir: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH")]
    pub cwd: Option<PathBuf>,

    /// Backend mode: `synthetic` (alias `mock`) or `live`.
    #[arg(long, global = true, value_name = "MODE")]
    pub mode: Option<String>,

    /// Path to the SQLite log warehouse used by the live backend.
    #[arg(long, global = true, value_name = "PATH")]
    pub warehouse: Option<PathBuf>,

    #[arg(long, global = true, value_name = "NAME")]
    pub table: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one tool invocation and print the result envelope.
    Invoke(InvokeArgs),
    /// Provision the log warehouse with the fixture corpus.
    Seed(SeedArgs),
    /// Print the agent-facing tool descriptor.
    Describe(DescribeArgs),
}
