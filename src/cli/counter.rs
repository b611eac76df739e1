//! Counter commands: allocate, sync-counter, reset

use msh3_core::{
    error::{MshError, Result},
    AdminService, CounterAllocator, Records,
};
use std::sync::Arc;
use tracing::{info, warn};

use super::helpers::{open_store, print_json, Context};

fn admin_service(ctx: &Context, store: Arc<dyn msh3_core::DocumentStore>) -> AdminService {
    AdminService::new(
        Records::new(Arc::clone(&store)),
        CounterAllocator::from_config(store, &ctx.config.counter),
        ctx.operator(),
    )
}

/// Handle allocate command
pub async fn handle_allocate(ctx: &Context, count: usize) -> Result<()> {
    let store = open_store(ctx, false).await?;
    let allocator = CounterAllocator::from_config(store, &ctx.config.counter);

    let mut allocated = Vec::with_capacity(count);
    for _ in 0..count {
        allocated.push(allocator.allocate_next_id().await);
    }

    if ctx.json() {
        return print_json(&allocated);
    }
    for id in &allocated {
        if id.degraded {
            println!("{} (provisional)", id.id);
        } else {
            println!("{}", id.id);
        }
    }
    Ok(())
}

/// Handle sync-counter command
pub async fn handle_sync(ctx: &Context) -> Result<()> {
    let store = open_store(ctx, false).await?;
    let outcome = admin_service(ctx, store).sync_counter().await?;

    if ctx.json() {
        return print_json(&outcome);
    }
    match outcome.previous {
        Some(previous) if !outcome.changed() => {
            println!("Counter already at {}", previous)
        }
        Some(previous) => println!("Counter synced: {} -> {}", previous, outcome.current),
        None => println!("Counter initialized to {}", outcome.current),
    }
    Ok(())
}

/// Handle reset command
///
/// Without `wipe` only the counter is reset; with it every assessment is
/// deleted first and the counter is reset only if all deletes succeeded.
pub async fn handle_reset(ctx: &Context, wipe: bool, yes: bool) -> Result<()> {
    if !yes {
        return Err(MshError::InvalidOperation(
            "reset is destructive; pass --yes to confirm".to_string(),
        ));
    }
    let store = open_store(ctx, false).await?;
    let admin = admin_service(ctx, store);

    if !wipe {
        admin.reset_counter().await?;
        info!("Counter reset by {}", admin.actor().id);
        println!("Counter reset to 0");
        return Ok(());
    }

    let report = admin.wipe_assessments().await?;
    if ctx.json() {
        print_json(&report)?;
    } else {
        println!(
            "Deleted {} assessments, {} failed",
            report.deletes.succeeded.len(),
            report.deletes.failed.len()
        );
        for failure in &report.deletes.failed {
            println!("  {}: {}", failure.id, failure.error);
        }
        if report.counter_reset {
            println!("Counter reset to 0");
        } else {
            println!("Counter NOT reset; rerun after fixing the failures");
        }
    }
    if !report.counter_reset {
        warn!("Wipe incomplete: {} failures", report.deletes.failed.len());
    }
    Ok(())
}
