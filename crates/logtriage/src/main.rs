#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;
use clap::error::ErrorKind;
use logtriage::cli::app::{Cli, Command, RuntimeArgs};
use logtriage::cli::commands;
use logtriage::config::{ConfigInputs, ToolConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const EXIT_SUCCESS: i32 = 0;
const EXIT_RUNTIME_FAILURE: i32 = 1;
const EXIT_USAGE_ERROR: i32 = 64;

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => return exit_code_for_parse_error(error),
    };
    init_tracing();

    let command_name = command_name(&cli.command);
    info!("logtriage: starting `{command_name}`");

    match execute(cli) {
        Ok(()) => {
            info!("logtriage: completed `{command_name}` (exit_code={EXIT_SUCCESS})");
            EXIT_SUCCESS
        }
        Err(err) => {
            error!("logtriage: failed `{command_name}` (exit_code={EXIT_RUNTIME_FAILURE})");
            eprintln!("{err:#}");
            EXIT_RUNTIME_FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Invoke(args) => {
            let config = resolve_config(&cli.runtime)?;
            commands::invoke::run(&args, &config)
        }
        Command::Seed(args) => {
            let config = resolve_config(&cli.runtime)?;
            commands::seed::run(&args, &config)
        }
        Command::Describe(args) => {
            let config = resolve_config(&cli.runtime)?;
            commands::describe::run(&args, &config)
        }
    }
}

fn exit_code_for_parse_error(error: clap::Error) -> i32 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = error.print();
            EXIT_SUCCESS
        }
        _ => {
            let _ = error.print();
            EXIT_USAGE_ERROR
        }
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Invoke(_) => "invoke",
        Command::Seed(_) => "seed",
        Command::Describe(_) => "describe",
    }
}

fn resolve_config(args: &RuntimeArgs) -> Result<ToolConfig> {
    let home_dir = match &args.home_dir {
        Some(path) => path.clone(),
        None => std::env::var_os("HOME")
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("HOME is not set; pass --home-dir"))?,
    };

    let cwd = match &args.cwd {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };

    let flags = ConfigInputs {
        mode: args.mode.clone(),
        warehouse: args.warehouse.clone(),
        table: args.table.clone(),
    };
    let config =
        logtriage::config::resolve_tool_config(&home_dir, &cwd, flags.or(ConfigInputs::from_env()))?;
    info!(
        mode = %config.mode,
        warehouse = %config.warehouse_path.display(),
        table = %config.table,
        "configuration resolved"
    );
    Ok(config)
}
