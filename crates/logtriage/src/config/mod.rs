//! Startup configuration.
//!
//! Everything here is resolved once, before the tool is constructed, and
//! handed to it by value. Nothing reads configuration after startup.

use std::fmt::{Display, Formatter};
use std::path::{Component, Path, PathBuf};

use anyhow::{Result, bail};

use crate::warehouse::{DEFAULT_LOGS_TABLE, is_valid_table_name};

pub const MODE_ENV_VAR: &str = "LOGTRIAGE_MODE";
pub const WAREHOUSE_ENV_VAR: &str = "LOGTRIAGE_WAREHOUSE";
pub const TABLE_ENV_VAR: &str = "LOGTRIAGE_TABLE";

/// Which backend the tool is bound to for the whole process lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BackendMode {
    #[default]
    Synthetic,
    Live,
}

impl BackendMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Synthetic => "synthetic",
            Self::Live => "live",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "synthetic" | "mock" => Ok(Self::Synthetic),
            "live" => Ok(Self::Live),
            other => bail!("unsupported backend mode `{other}` (expected `synthetic` or `live`)"),
        }
    }
}

impl Display for BackendMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw, unvalidated settings from one configuration source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigInputs {
    pub mode: Option<String>,
    pub warehouse: Option<PathBuf>,
    pub table: Option<String>,
}

impl ConfigInputs {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            mode: non_empty_env(MODE_ENV_VAR),
            warehouse: non_empty_env(WAREHOUSE_ENV_VAR).map(PathBuf::from),
            table: non_empty_env(TABLE_ENV_VAR),
        }
    }

    /// Fields set in `self` win; unset ones fall through to `fallback`.
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        Self {
            mode: self.mode.or(fallback.mode),
            warehouse: self.warehouse.or(fallback.warehouse),
            table: self.table.or(fallback.table),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub mode: BackendMode,
    pub warehouse_path: PathBuf,
    pub table: String,
}

impl ToolConfig {
    /// Synthetic-mode configuration with default warehouse settings.
    #[must_use]
    pub fn synthetic(home_dir: &Path) -> Self {
        Self {
            mode: BackendMode::Synthetic,
            warehouse_path: default_warehouse_path(home_dir),
            table: DEFAULT_LOGS_TABLE.to_string(),
        }
    }
}

#[must_use]
pub fn default_warehouse_path(home_dir: &Path) -> PathBuf {
    home_dir.join(".logtriage").join("warehouse.sqlite")
}

pub fn resolve_tool_config(home_dir: &Path, cwd: &Path, inputs: ConfigInputs) -> Result<ToolConfig> {
    if !home_dir.is_absolute() {
        bail!("home_dir must be absolute: {}", home_dir.display());
    }
    if !cwd.is_absolute() {
        bail!("cwd must be absolute: {}", cwd.display());
    }

    let home_dir = normalize_lexical(home_dir);
    let cwd = normalize_lexical(cwd);

    let mode = match inputs.mode.as_deref() {
        Some(raw) => BackendMode::parse(raw)?,
        None => BackendMode::default(),
    };
    let warehouse_path = match inputs.warehouse.as_deref() {
        Some(path) => resolve_user_path(path, &home_dir, &cwd)?,
        None => default_warehouse_path(&home_dir),
    };
    let table = inputs
        .table
        .unwrap_or_else(|| DEFAULT_LOGS_TABLE.to_string());
    if !is_valid_table_name(&table) {
        bail!("log table name must be a plain SQL identifier: {table:?}");
    }

    Ok(ToolConfig {
        mode,
        warehouse_path: normalize_lexical(&warehouse_path),
        table,
    })
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn resolve_user_path(path: &Path, home_dir: &Path, cwd: &Path) -> Result<PathBuf> {
    let expanded = expand_tilde(path, home_dir)?;
    let resolved = if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    };

    Ok(normalize_lexical(&resolved))
}

fn expand_tilde(path: &Path, home_dir: &Path) -> Result<PathBuf> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let mut expanded = home_dir.to_path_buf();
            for component in components {
                expanded.push(component.as_os_str());
            }
            Ok(expanded)
        }
        Some(Component::Normal(first))
            if first
                .to_str()
                .is_some_and(|segment| segment.starts_with('~')) =>
        {
            bail!(
                "unsupported home expansion syntax (only `~` and `~/...` are supported): {}",
                path.display()
            )
        }
        _ => Ok(path.to_path_buf()),
    }
}

fn normalize_lexical(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component.as_os_str());
                }
            }
            _ => normalized.push(component.as_os_str()),
        }
    }

    normalized
}
