use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use sqlparser::dialect::{dialect_from_str, Dialect};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::sql_engine::makefile::{MakefileOptions, DEFAULT_RUN_COMMAND, DEFAULT_SENTINEL_PREFIX};

pub const CONFIG_FILE_NAME: &str = "sqlmake.yaml";

/// Project configuration read from sqlmake.yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlMakeConfig {
    /// Directory scanned for .sql scripts
    #[serde(default = "default_models_path")]
    pub models_path: PathBuf,

    /// Descend into subdirectories of models_path
    #[serde(default)]
    pub recursive: bool,

    /// Where the Makefile is written
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Where diagnostics are logged
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// sqlparser dialect used to tokenize scripts
    #[serde(default = "default_dialect")]
    pub dialect: String,

    #[serde(default = "default_run_command")]
    pub run_command: String,

    #[serde(default = "default_sentinel_prefix")]
    pub sentinel_prefix: String,

    /// Treat circular dependencies between files as fatal
    #[serde(default)]
    pub strict: bool,

    /// Additional project configurations
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

fn default_models_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_output() -> PathBuf {
    PathBuf::from("Makefile")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("sqlmake.log")
}

fn default_dialect() -> String {
    "bigquery".to_string()
}

fn default_run_command() -> String {
    DEFAULT_RUN_COMMAND.to_string()
}

fn default_sentinel_prefix() -> String {
    DEFAULT_SENTINEL_PREFIX.to_string()
}

impl Default for SqlMakeConfig {
    fn default() -> Self {
        Self {
            models_path: default_models_path(),
            recursive: false,
            output: default_output(),
            log_file: default_log_file(),
            dialect: default_dialect(),
            run_command: default_run_command(),
            sentinel_prefix: default_sentinel_prefix(),
            strict: false,
            extra: HashMap::new(),
        }
    }
}

/// Values given on the command line; each one replaces the configured value
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub models_path: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub dialect: Option<String>,
    pub run_command: Option<String>,
    pub strict: bool,
}

impl SqlMakeConfig {
    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(path) = overrides.models_path {
            self.models_path = path;
        }
        if let Some(output) = overrides.output {
            self.output = output;
        }
        if let Some(log_file) = overrides.log_file {
            self.log_file = log_file;
        }
        if let Some(dialect) = overrides.dialect {
            self.dialect = dialect;
        }
        if let Some(run_command) = overrides.run_command {
            self.run_command = run_command;
        }
        self.strict |= overrides.strict;
    }

    pub fn sql_dialect(&self) -> Result<Box<dyn Dialect>> {
        dialect_from_str(&self.dialect).ok_or_else(|| anyhow!("Unknown SQL dialect: {}", self.dialect))
    }

    pub fn makefile_options(&self) -> MakefileOptions {
        MakefileOptions {
            run_command: self.run_command.clone(),
            sentinel_prefix: self.sentinel_prefix.clone(),
            script_root: self.script_root(),
        }
    }

    /// Scripts directory as seen from the directory holding the Makefile
    pub fn script_root(&self) -> String {
        let output_dir = match self.output.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        relative_path(&self.models_path, output_dir)
    }
}

/// `target` as reached from `base`, empty when both are the same directory.
/// Falls back to `target` unchanged when either path cannot be resolved.
fn relative_path(target: &Path, base: &Path) -> String {
    let (Ok(target_abs), Ok(base_abs)) = (target.canonicalize(), base.canonicalize()) else {
        return target.to_string_lossy().to_string();
    };

    let target_parts: Vec<_> = target_abs.components().collect();
    let base_parts: Vec<_> = base_abs.components().collect();
    let common = target_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = vec!["..".to_string(); base_parts.len() - common];
    parts.extend(
        target_parts[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().to_string()),
    );
    parts.join("/")
}

/// Reads the configuration file from the specified path, or sqlmake.yaml in the
/// current directory when present, or falls back to defaults
pub fn read_config(config_path: Option<&Path>) -> Result<SqlMakeConfig> {
    let config_path = match config_path {
        Some(path) => {
            if !path.exists() {
                bail!("Configuration file not found at: {}", path.display());
            }
            path.to_path_buf()
        }
        None => {
            let current_dir = std::env::current_dir()?;
            let candidate = current_dir.join(CONFIG_FILE_NAME);
            if !candidate.exists() {
                return Ok(SqlMakeConfig::default());
            }
            candidate
        }
    };

    let config_str = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read configuration: {}", config_path.display()))?;
    parse_config(&config_str)
        .with_context(|| format!("Invalid configuration: {}", config_path.display()))
}

pub fn parse_config(content: &str) -> Result<SqlMakeConfig> {
    if content.trim().is_empty() {
        return Ok(SqlMakeConfig::default());
    }
    let config: SqlMakeConfig = serde_yaml::from_str(content)?;
    Ok(config)
}
