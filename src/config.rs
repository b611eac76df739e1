//! Configuration for the MSH³ core and its admin tooling
//!
//! Values come from, lowest precedence first: built-in defaults, an optional
//! TOML file, and `MSH3__`-prefixed environment variables
//! (`MSH3__COUNTER__MAX_ATTEMPTS=8`).

use crate::error::{MshError, Result};
use crate::types::Capability;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const ENV_PREFIX: &str = "MSH3";
const ENV_SEPARATOR: &str = "__";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MshConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub counter: CounterConfig,

    #[serde(default)]
    pub operator: OperatorConfig,

    #[serde(default)]
    pub audit: AuditConfig,
}

/// Where the document store lives
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Local file path or `libsql://` URL; `--db-path` and `MSH3_DB_PATH` win
    #[serde(default)]
    pub path: Option<String>,

    /// Auth token for remote databases
    #[serde(default)]
    pub auth_token: Option<String>,
}

/// MSH-ID counter allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    /// Counter document name
    pub name: String,

    /// Attempts at the atomic increment before falling back to a timestamp id
    pub max_attempts: u32,

    /// Base delay between attempts, doubled after each failure
    pub retry_backoff_ms: u64,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            name: "msh".to_string(),
            max_attempts: 5,
            retry_backoff_ms: 25,
        }
    }
}

impl CounterConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Gap audit bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Jumps between consecutive ids wider than this are reported as outliers
    pub max_gap_span: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_gap_span: crate::stats::DEFAULT_MAX_GAP_SPAN,
        }
    }
}

/// Identity the admin tooling acts as
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    pub id: String,
    pub display_name: String,
    pub capabilities: Vec<Capability>,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            id: "operator".to_string(),
            display_name: "MSH3 Operator".to_string(),
            capabilities: Capability::ALL.to_vec(),
        }
    }
}

impl MshConfig {
    /// Load defaults, then `path` if given, then the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        let config: MshConfig = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file only (no environment)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load from a TOML string only (no environment)
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: MshConfig = Config::builder()
            .add_source(File::from_str(toml_str, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML, e.g. for `msh3 init --write-config`
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| MshError::Other(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.counter.name.trim().is_empty() {
            return Err(invalid("counter.name must not be empty"));
        }
        if self.counter.max_attempts == 0 {
            return Err(invalid("counter.max_attempts must be at least 1"));
        }
        if self.counter.retry_backoff_ms > 10_000 {
            return Err(invalid("counter.retry_backoff_ms must be at most 10000"));
        }
        if self.audit.max_gap_span == 0 {
            return Err(invalid("audit.max_gap_span must be at least 1"));
        }
        if self.operator.id.trim().is_empty() {
            return Err(invalid("operator.id must not be empty"));
        }
        if let Some(path) = &self.database.path {
            if path.trim().is_empty() {
                return Err(invalid("database.path must not be empty when set"));
            }
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> MshError {
    MshError::Config(config::ConfigError::Message(msg.to_string()))
}
