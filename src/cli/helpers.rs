//! Shared helper functions for CLI commands
//!
//! Database path resolution, store construction and output formatting.

use clap::ValueEnum;
use msh3_core::{
    error::Result, CurrentUser, DocumentStore, LibsqlStore, MemoryStore, MshConfig,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Sentinel path selecting the in-process store (dry runs)
pub const MEMORY_DB: &str = ":memory:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Everything a handler needs from the global flags
pub struct Context {
    pub config: MshConfig,
    pub db_path: Option<String>,
    pub format: OutputFormat,
}

impl Context {
    pub fn operator(&self) -> CurrentUser {
        let operator = &self.config.operator;
        CurrentUser::new(
            operator.id.clone(),
            operator.display_name.clone(),
            operator.capabilities.iter().copied(),
        )
    }

    pub fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}

/// Get the default database path using XDG_DATA_HOME standard
pub fn get_default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("msh3")
        .join("msh3.db")
}

/// Get the database path from CLI arg, env var, config file, or default
pub fn get_db_path(cli_path: Option<String>, config: &MshConfig) -> String {
    cli_path
        .or_else(|| std::env::var("MSH3_DB_PATH").ok().filter(|p| !p.is_empty()))
        .or_else(|| config.database.path.clone())
        .unwrap_or_else(|| get_default_db_path().to_string_lossy().to_string())
}

/// Open the configured store
///
/// `create_if_missing` is only set by commands that may start from nothing
/// (`init`, `import`).
pub async fn open_store(ctx: &Context, create_if_missing: bool) -> Result<Arc<dyn DocumentStore>> {
    let db_path = get_db_path(ctx.db_path.clone(), &ctx.config);
    debug!("Using database: {}", db_path);

    if db_path == MEMORY_DB {
        return Ok(Arc::new(MemoryStore::new()));
    }
    let store = LibsqlStore::from_path(
        &db_path,
        ctx.config.database.auth_token.clone(),
        create_if_missing,
    )
    .await?;
    Ok(Arc::new(store))
}

/// Print a value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
