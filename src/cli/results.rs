//! MSH Result commands: results (preview) and publish

use msh3_core::{
    aggregate_result,
    error::{MshError, Result},
    results::AverageScores,
    AdminService, CounterAllocator, Cycle, MshResult, Records, UserId,
};
use std::sync::Arc;

use super::helpers::{open_store, print_json, Context};

fn print_group(label: &str, scores: Option<&AverageScores>) {
    match scores {
        Some(s) => println!(
            "  {:<14} culture {:.2}/{:.2}  competencies {:.2}/{:.2}  execution {:.2}/{:.2}  = {:.2}",
            label,
            s.culture.contribution,
            s.culture.growth,
            s.competencies.contribution,
            s.competencies.growth,
            s.execution.contribution,
            s.execution.growth,
            s.composite()
        ),
        None => println!("  {:<14} -", label),
    }
}

fn print_result(result: &MshResult) {
    println!("{} ({} in {})", result.id, result.subject_id, result.cycle);
    print_group("self", result.self_scores.as_ref());
    print_group("manager", result.manager_scores.as_ref());
    print_group("direct reports", result.direct_report_scores.as_ref());
    print_group("peers", result.peer_scores.as_ref());
    print_group("overall", Some(&result.overall));
    println!(
        "  composite {:.2}, 9-box {} \"{}\"",
        result.composite,
        result.nine_box.cell(),
        result.nine_box.label()
    );
    let counts = &result.rater_counts;
    println!(
        "  raters: {} self, {} manager, {} direct report, {} peer",
        counts.self_rating, counts.manager, counts.direct_report, counts.peer
    );
}

/// Handle results command: recompute without storing
pub async fn handle_preview(ctx: &Context, subject: String, cycle: Cycle) -> Result<()> {
    let records = Records::new(open_store(ctx, false).await?);
    let subject = UserId::new(subject);
    let report = records.assessments_for_cycle(cycle).await?;
    let result = aggregate_result(&report.records, &subject, cycle).ok_or_else(|| {
        MshError::NotFound(format!("no completed assessments for {} in {}", subject, cycle))
    })?;

    if ctx.json() {
        return print_json(&result);
    }
    print_result(&result);
    if let Some(published) = records.result(&subject, cycle).await? {
        println!("  last published {}", published.computed_at.to_rfc3339());
    }
    Ok(())
}

/// Handle publish command
pub async fn handle_publish(ctx: &Context, subject: String, cycle: Cycle) -> Result<()> {
    let store = open_store(ctx, false).await?;
    let admin = AdminService::new(
        Records::new(Arc::clone(&store)),
        CounterAllocator::from_config(store, &ctx.config.counter),
        ctx.operator(),
    );
    let result = admin.publish(&UserId::new(subject), cycle).await?;

    if ctx.json() {
        return print_json(&result);
    }
    print_result(&result);
    println!("Published.");
    Ok(())
}
