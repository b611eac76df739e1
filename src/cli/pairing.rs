//! Pairing inspection command

use msh3_core::{
    badge_for,
    error::Result,
    is_side_complete, pending_actions_for,
    pairing::{detect_pairing, pairings_for_manager},
    Assessment, Cycle, Pairing, Records, Side, UserId, ViewerRole,
};
use serde::Serialize;
use tracing::{debug, warn};

use super::helpers::{open_store, print_json, Context};

#[derive(Serialize)]
struct SideView {
    side: Side,
    complete: bool,
    manager_badge: String,
    direct_report_badge: String,
}

#[derive(Serialize)]
struct PairingView<'a> {
    pairing: &'a Pairing,
    sides: Vec<SideView>,
    pending_actions: Vec<msh3_core::PendingAction>,
}

fn slot_status(slot: &Option<Assessment>) -> String {
    match slot {
        Some(a) => {
            let msh = a.msh_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());
            format!("{} {} [{}]", msh, a.status, a.id)
        }
        None => "missing".to_string(),
    }
}

fn view<'a>(pairing: &'a Pairing, viewer: Option<&UserId>) -> PairingView<'a> {
    let sides = Side::BOTH
        .iter()
        .map(|side| SideView {
            side: *side,
            complete: is_side_complete(pairing, *side),
            manager_badge: badge_for(pairing, ViewerRole::Manager, *side).to_string(),
            direct_report_badge: badge_for(pairing, ViewerRole::DirectReport, *side).to_string(),
        })
        .collect();
    let pending_actions = viewer
        .map(|v| pending_actions_for(pairing, v))
        .unwrap_or_default();
    PairingView {
        pairing,
        sides,
        pending_actions,
    }
}

fn print_text(view: &PairingView<'_>) {
    let p = view.pairing;
    println!("{}  (MR {} / DR {})", p.id, p.manager_id, p.direct_report_id);
    for side in &view.sides {
        let slots = p.side(side.side);
        println!(
            "  Side {}: self {} | bilateral {}",
            side.side,
            slot_status(&slots.self_assessment),
            slot_status(&slots.bilateral)
        );
        println!(
            "          manager sees \"{}\", direct report sees \"{}\"",
            side.manager_badge, side.direct_report_badge
        );
    }
    if !p.superseded.is_empty() {
        let ids: Vec<String> = p.superseded.iter().map(|id| id.to_string()).collect();
        println!("  Superseded duplicates: {}", ids.join(", "));
    }
    for action in &view.pending_actions {
        println!("  Pending (side {}): {}", action.side, action.describe());
    }
}

/// Handle pairing command
///
/// Without `direct_report`, shows one pairing per direct report of `manager`.
pub async fn handle(
    ctx: &Context,
    manager: String,
    direct_report: Option<String>,
    cycle: Cycle,
    viewer: Option<String>,
) -> Result<()> {
    let store = open_store(ctx, false).await?;
    let records = Records::new(store);

    let report = records.assessments_for_cycle(cycle).await?;
    if !report.is_clean() {
        warn!(
            "{} non-conforming assessments skipped",
            report.rejected.len()
        );
    }

    let manager = UserId::new(manager);
    let pairings = match direct_report {
        Some(dr) => detect_pairing(&report.records, &manager, &UserId::new(dr), cycle)
            .into_iter()
            .collect::<Vec<_>>(),
        None => {
            let users = records.users().await?.records;
            pairings_for_manager(&report.records, &users, &manager, cycle)
        }
    };
    debug!("Found {} pairings for {} in {}", pairings.len(), manager, cycle);

    let viewer = viewer.map(UserId::new);
    let views: Vec<PairingView<'_>> = pairings.iter().map(|p| view(p, viewer.as_ref())).collect();

    if ctx.json() {
        return print_json(&views);
    }
    if views.is_empty() {
        println!("No pairing activity for {} in {}", manager, cycle);
    }
    for view in &views {
        print_text(view);
    }
    Ok(())
}
