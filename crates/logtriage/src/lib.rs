#![forbid(unsafe_code)]

pub mod backends;
pub mod cli;
pub mod config;
pub mod models;
pub mod sanitize;
pub mod tool;
pub mod utils;
pub mod warehouse;

pub use backends::{LiveBackend, LogBackend, QueryError, SyntheticBackend};
pub use cli::app::{Cli, Command};
pub use config::{BackendMode, ToolConfig};
pub use tool::LogQueryTool;
