//! Database initialization command

use msh3_core::error::Result;
use std::path::PathBuf;
use tracing::debug;

use super::helpers::{get_db_path, open_store, Context, MEMORY_DB};

/// Handle database initialization command
pub async fn handle(ctx: &Context, write_config: Option<PathBuf>) -> Result<()> {
    let db_path = get_db_path(ctx.db_path.clone(), &ctx.config);
    debug!("Initializing database at {}", db_path);

    if db_path == MEMORY_DB {
        println!("In-memory store selected; nothing to initialize");
    } else {
        // Creates the file and applies the schema
        open_store(ctx, true).await?;
        println!("Database initialized: {}", db_path);
    }

    if let Some(path) = write_config {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&path, ctx.config.to_toml()?)?;
        println!("Configuration written: {}", path.display());
    }
    Ok(())
}
