//! Historical data import command

use msh3_core::{error::Result, AdminService, CounterAllocator, ImportBundle, Records};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use super::helpers::{open_store, print_json, Context};

/// Handle import command
///
/// Reads an [`ImportBundle`] JSON file and writes it directly, bypassing the
/// allocator.
pub async fn handle(ctx: &Context, file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)?;
    let bundle: ImportBundle = serde_json::from_str(&raw)?;
    debug!(
        "Read {} users and {} assessments from {}",
        bundle.users.len(),
        bundle.assessments.len(),
        file.display()
    );

    let store = open_store(ctx, true).await?;
    let admin = AdminService::new(
        Records::new(Arc::clone(&store)),
        CounterAllocator::from_config(store, &ctx.config.counter),
        ctx.operator(),
    );
    let report = admin.import(bundle).await?;

    if ctx.json() {
        return print_json(&report);
    }
    println!(
        "Users:       {} imported, {} failed",
        report.users.succeeded.len(),
        report.users.failed.len()
    );
    println!(
        "Assessments: {} imported, {} failed",
        report.assessments.succeeded.len(),
        report.assessments.failed.len()
    );
    for failure in report.users.failed.iter().chain(&report.assessments.failed) {
        println!("  {}: {}", failure.id, failure.error);
    }
    if report.needs_sync {
        println!("Imported ids run past the counter; run `msh3 sync-counter`.");
    }
    Ok(())
}
