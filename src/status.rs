//! Badge and pending-action derivation from a [`Pairing`]

use crate::pairing::{Pairing, Side};
use crate::types::{AssessmentId, AssessmentStatus, UserId};
use serde::{Deserialize, Serialize};

/// Which participant is looking at the pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewerRole {
    Manager,
    DirectReport,
}

impl ViewerRole {
    pub const ALL: [ViewerRole; 2] = [ViewerRole::Manager, ViewerRole::DirectReport];

    fn user<'a>(&self, pairing: &'a Pairing) -> &'a UserId {
        match self {
            ViewerRole::Manager => &pairing.manager_id,
            ViewerRole::DirectReport => &pairing.direct_report_id,
        }
    }
}

/// Display state of one side of a pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Badge {
    Published,
    ReadyForReview,
    AwaitingOtherSelfAssessment,
    ActionRequired,
    BothPending,
    InProgress,
}

impl Badge {
    pub fn label(&self) -> &'static str {
        match self {
            Badge::Published => "Published",
            Badge::ReadyForReview => "Ready for review",
            Badge::AwaitingOtherSelfAssessment => "Awaiting other party's self-assessment",
            Badge::ActionRequired => "Action required",
            Badge::BothPending => "Both pending",
            Badge::InProgress => "In progress",
        }
    }
}

impl std::fmt::Display for Badge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Badge for `side` as seen by `viewer`
///
/// Precedence: published bilateral, then both completed, then the
/// completion matrix. Defined for every combination.
pub fn badge_for(pairing: &Pairing, viewer: ViewerRole, side: Side) -> Badge {
    let slots = pairing.side(side);
    if slots.bilateral_published() {
        return Badge::Published;
    }

    let viewer_id = viewer.user(pairing);
    match (slots.self_completed(), slots.bilateral_completed()) {
        (true, true) => Badge::ReadyForReview,
        (true, false) if pairing.rater(side) == viewer_id => Badge::ActionRequired,
        (true, false) => Badge::InProgress,
        (false, true) if pairing.self_owner(side) == viewer_id => Badge::ActionRequired,
        (false, true) => Badge::AwaitingOtherSelfAssessment,
        (false, false) => Badge::BothPending,
    }
}

/// Which assessment is outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    SelfAssessment,
    BilateralRating,
}

/// Something the viewer still has to submit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub pairing_id: String,
    pub side: Side,
    pub kind: ActionKind,

    /// Who the outstanding assessment is about
    pub subject_id: UserId,

    /// Existing draft/pending record, if one was started
    pub assessment_id: Option<AssessmentId>,
    pub status: Option<AssessmentStatus>,
}

impl PendingAction {
    pub fn describe(&self) -> String {
        let what = match self.kind {
            ActionKind::SelfAssessment => "self-assessment".to_string(),
            ActionKind::BilateralRating => format!("rating of {}", self.subject_id),
        };
        match self.status {
            Some(status) => format!("{} ({})", what, status),
            None => format!("{} (not started)", what),
        }
    }
}

/// Outstanding assessments owed by `viewer_id`; empty for non-participants
pub fn pending_actions_for(pairing: &Pairing, viewer_id: &UserId) -> Vec<PendingAction> {
    let mut actions = Vec::new();
    if !pairing.is_participant(viewer_id) {
        return actions;
    }

    for side in Side::BOTH {
        let slots = pairing.side(side);
        let owed = if pairing.self_owner(side) == viewer_id {
            Some((ActionKind::SelfAssessment, &slots.self_assessment))
        } else if pairing.rater(side) == viewer_id {
            Some((ActionKind::BilateralRating, &slots.bilateral))
        } else {
            None
        };

        if let Some((kind, slot)) = owed {
            if slot.as_ref().map(|a| a.is_completed()).unwrap_or(false) {
                continue;
            }
            actions.push(PendingAction {
                pairing_id: pairing.id.clone(),
                side,
                kind,
                subject_id: pairing.self_owner(side).clone(),
                assessment_id: slot.as_ref().map(|a| a.id.clone()),
                status: slot.as_ref().map(|a| a.status),
            });
        }
    }
    actions
}
