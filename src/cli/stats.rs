//! Assessment statistics and gap audit command

use msh3_core::{error::Result, stats::compute_stats_with};
use tracing::debug;

use super::helpers::{open_store, print_json, Context};

/// Longest gap list printed in text mode
const MAX_GAPS_SHOWN: usize = 50;

/// Handle stats command
///
/// With `check`, exits with status 1 when the counter trails the highest id.
pub async fn handle(ctx: &Context, check: bool) -> Result<()> {
    let store = open_store(ctx, false).await?;
    let stats = compute_stats_with(
        store.as_ref(),
        &ctx.config.counter.name,
        ctx.config.audit.max_gap_span,
    )
    .await?;
    debug!("Computed stats over {} documents", stats.total);

    if ctx.json() {
        print_json(&stats)?;
    } else {
        println!("Assessments:    {}", stats.total);
        println!("  draft:        {}", stats.by_status.draft);
        println!("  pending:      {}", stats.by_status.pending);
        println!("  completed:    {}", stats.by_status.completed);
        if stats.rejected > 0 {
            println!("  rejected:     {}", stats.rejected);
        }
        println!("Max MSH id:     MSH{}", stats.max_sequence);
        println!("Counter:        {}", stats.counter_value);
        println!("Drift:          {:+}", stats.drift());
        println!("Unnumbered:     {}", stats.unnumbered);
        println!("Provisional:    {}", stats.provisional);

        if stats.gaps.is_empty() {
            println!("Gaps:           none");
        } else {
            let more = stats.gaps.len().saturating_sub(MAX_GAPS_SHOWN);
            println!("Gaps ({}):       {}", stats.gaps.len(), msh_list(&stats.gaps));
            if more > 0 {
                println!("                ... and {} more", more);
            }
        }
        if !stats.outliers.is_empty() {
            println!("Outliers ({}):   {}", stats.outliers.len(), msh_list(&stats.outliers));
        }
        if !stats.duplicates.is_empty() {
            println!("Duplicates ({}): {}", stats.duplicates.len(), msh_list(&stats.duplicates));
        }
        if !stats.malformed.is_empty() {
            let shown: Vec<&str> = stats
                .malformed
                .iter()
                .take(MAX_GAPS_SHOWN)
                .map(String::as_str)
                .collect();
            println!("Malformed ({}):  {}", stats.malformed.len(), shown.join(", "));
        }
        if stats.needs_sync() {
            println!();
            println!("Counter trails the highest id; run `msh3 sync-counter`.");
        }
    }

    if check && stats.needs_sync() {
        std::process::exit(1);
    }
    Ok(())
}

fn msh_list(sequences: &[u64]) -> String {
    sequences
        .iter()
        .take(MAX_GAPS_SHOWN)
        .map(|n| format!("MSH{}", n))
        .collect::<Vec<_>>()
        .join(", ")
}
