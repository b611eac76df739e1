//! Bilateral 360° pairing detection
//!
//! A pairing correlates, for one cycle, the assessments exchanged between a
//! manager (MR) and one of their direct reports (DR):
//!
//! - side A: DR's self-assessment and MR's rating of DR
//! - side B: MR's self-assessment and DR's rating of MR
//!
//! When several records could fill the same slot, the most recently updated
//! one wins (ties broken by creation time, then id) and the others are listed
//! in [`Pairing::superseded`].

use crate::types::{direct_reports_of, Assessment, AssessmentId, Cycle, User, UserId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// One half of a pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// DR is rated: DR self + MR -> DR
    A,
    /// MR is rated: MR self + DR -> MR
    B,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::A, Side::B];
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::A => f.write_str("A"),
            Side::B => f.write_str("B"),
        }
    }
}

/// Deterministic pairing id, independent of argument order
///
/// `pair-<year>-<MM>-<smaller id>-<larger id>`
pub fn pairing_id(cycle: Cycle, a: &UserId, b: &UserId) -> String {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    format!("pair-{}-{:02}-{}-{}", cycle.year, cycle.month, low, high)
}

/// The two assessments that make up one side
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideSlots {
    pub self_assessment: Option<Assessment>,
    pub bilateral: Option<Assessment>,
}

impl SideSlots {
    pub fn self_completed(&self) -> bool {
        self.self_assessment
            .as_ref()
            .map(|a| a.is_completed())
            .unwrap_or(false)
    }

    pub fn bilateral_completed(&self) -> bool {
        self.bilateral
            .as_ref()
            .map(|a| a.is_completed())
            .unwrap_or(false)
    }

    pub fn bilateral_published(&self) -> bool {
        self.bilateral.as_ref().map(|a| a.published).unwrap_or(false)
    }
}

/// Reconstructed MR <-> DR relationship for one cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pairing {
    pub id: String,
    pub cycle: Cycle,
    pub manager_id: UserId,
    pub direct_report_id: UserId,
    pub side_a: SideSlots,
    pub side_b: SideSlots,

    /// Records that lost a slot to a more recent duplicate
    #[serde(default)]
    pub superseded: Vec<AssessmentId>,
}

impl Pairing {
    pub fn side(&self, side: Side) -> &SideSlots {
        match side {
            Side::A => &self.side_a,
            Side::B => &self.side_b,
        }
    }

    /// Whose self-assessment sits on `side`
    pub fn self_owner(&self, side: Side) -> &UserId {
        match side {
            Side::A => &self.direct_report_id,
            Side::B => &self.manager_id,
        }
    }

    /// Who owes the bilateral rating on `side`
    pub fn rater(&self, side: Side) -> &UserId {
        match side {
            Side::A => &self.manager_id,
            Side::B => &self.direct_report_id,
        }
    }

    pub fn is_participant(&self, user: &UserId) -> bool {
        &self.manager_id == user || &self.direct_report_id == user
    }
}

/// Both the self-assessment and the bilateral rating on `side` are completed
pub fn is_side_complete(pairing: &Pairing, side: Side) -> bool {
    let slots = pairing.side(side);
    slots.self_completed() && slots.bilateral_completed()
}

/// Later `updated_at` wins, then later `created_at`, then larger id
fn recency(a: &Assessment, b: &Assessment) -> Ordering {
    a.updated_at
        .cmp(&b.updated_at)
        .then(a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

fn fill(slot: &mut Option<Assessment>, candidate: &Assessment, superseded: &mut Vec<AssessmentId>) {
    let Some(current) = slot.as_ref() else {
        *slot = Some(candidate.clone());
        return;
    };
    let (winner, loser) = if recency(candidate, current) == Ordering::Greater {
        (candidate.clone(), current.id.clone())
    } else {
        (current.clone(), candidate.id.clone())
    };
    warn!(
        "Duplicate assessment for slot: {} supersedes {}",
        winner.id, loser
    );
    superseded.push(loser);
    *slot = Some(winner);
}

/// Reconstruct the pairing between `manager_id` and `direct_report_id`
///
/// Returns `None` when no record in `cycle` references either participant.
/// A record fills a slot when it is a self-assessment of either participant,
/// or when its subject/assessor are the two participants in either order.
pub fn detect_pairing(
    assessments: &[Assessment],
    manager_id: &UserId,
    direct_report_id: &UserId,
    cycle: Cycle,
) -> Option<Pairing> {
    if manager_id == direct_report_id {
        warn!("Refusing to pair {} with themself", manager_id);
        return None;
    }

    let in_cycle: Vec<&Assessment> = assessments.iter().filter(|a| a.cycle == cycle).collect();
    if !in_cycle
        .iter()
        .any(|a| a.references(manager_id) || a.references(direct_report_id))
    {
        return None;
    }

    let mut pairing = Pairing {
        id: pairing_id(cycle, manager_id, direct_report_id),
        cycle,
        manager_id: manager_id.clone(),
        direct_report_id: direct_report_id.clone(),
        side_a: SideSlots::default(),
        side_b: SideSlots::default(),
        superseded: Vec::new(),
    };

    for assessment in in_cycle {
        let subject = &assessment.subject_id;
        let slot = if assessment.is_self_assessment() {
            if subject == direct_report_id {
                &mut pairing.side_a.self_assessment
            } else if subject == manager_id {
                &mut pairing.side_b.self_assessment
            } else {
                continue;
            }
        } else if subject == direct_report_id && &assessment.assessor_id == manager_id {
            &mut pairing.side_a.bilateral
        } else if subject == manager_id && &assessment.assessor_id == direct_report_id {
            &mut pairing.side_b.bilateral
        } else {
            continue;
        };
        fill(slot, assessment, &mut pairing.superseded);
    }

    debug!(
        "Detected pairing {} (A complete: {}, B complete: {})",
        pairing.id,
        is_side_complete(&pairing, Side::A),
        is_side_complete(&pairing, Side::B)
    );
    Some(pairing)
}

/// One pairing per direct report of `manager_id` that has activity in `cycle`
pub fn pairings_for_manager(
    assessments: &[Assessment],
    users: &[User],
    manager_id: &UserId,
    cycle: Cycle,
) -> Vec<Pairing> {
    direct_reports_of(users, manager_id)
        .into_iter()
        .filter_map(|report| detect_pairing(assessments, manager_id, &report.id, cycle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_utils::{cycle, user, AssessmentBuilder};
    use crate::types::{AssessmentStatus, AssessorRole};
    use chrono::{Duration, Utc};
    use proptest::prelude::*;

    const CYCLE: &str = "2025-03";

    fn ids() -> (UserId, UserId) {
        (UserId::from("mr"), UserId::from("dr"))
    }

    fn full_set() -> Vec<Assessment> {
        vec![
            AssessmentBuilder::self_assessment("dr", CYCLE).id("dr-self").completed().build(),
            AssessmentBuilder::bilateral("dr", "mr", CYCLE).id("mr-on-dr").completed().build(),
            AssessmentBuilder::self_assessment("mr", CYCLE).id("mr-self").build(),
            AssessmentBuilder::rating("mr", "dr", AssessorRole::DirectReport, CYCLE)
                .id("dr-on-mr")
                .status(AssessmentStatus::Pending)
                .build(),
        ]
    }

    #[test]
    fn test_pairing_id_format() {
        let (mr, dr) = ids();
        assert_eq!(pairing_id(cycle(CYCLE), &mr, &dr), "pair-2025-03-dr-mr");
        assert_eq!(
            pairing_id(cycle("2024-11"), &UserId::from("a"), &UserId::from("b")),
            "pair-2024-11-a-b"
        );
    }

    #[test]
    fn test_detects_all_four_slots() {
        let (mr, dr) = ids();
        let pairing = detect_pairing(&full_set(), &mr, &dr, cycle(CYCLE)).unwrap();

        assert_eq!(pairing.id, "pair-2025-03-dr-mr");
        assert_eq!(pairing.side_a.self_assessment.as_ref().unwrap().id.as_str(), "dr-self");
        assert_eq!(pairing.side_a.bilateral.as_ref().unwrap().id.as_str(), "mr-on-dr");
        assert_eq!(pairing.side_b.self_assessment.as_ref().unwrap().id.as_str(), "mr-self");
        assert_eq!(pairing.side_b.bilateral.as_ref().unwrap().id.as_str(), "dr-on-mr");
        assert!(is_side_complete(&pairing, Side::A));
        assert!(!is_side_complete(&pairing, Side::B));
        assert!(pairing.superseded.is_empty());
    }

    #[test]
    fn test_same_result_regardless_of_query_order() {
        let (mr, dr) = ids();
        let records = full_set();
        let forward = detect_pairing(&records, &mr, &dr, cycle(CYCLE)).unwrap();
        let mut reversed_input = records.clone();
        reversed_input.reverse();
        let backward = detect_pairing(&reversed_input, &mr, &dr, cycle(CYCLE)).unwrap();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_none_when_cycle_has_no_participant_records() {
        let (mr, dr) = ids();
        assert!(detect_pairing(&[], &mr, &dr, cycle(CYCLE)).is_none());
        assert!(detect_pairing(&full_set(), &mr, &dr, cycle("2025-04")).is_none());

        let unrelated = vec![AssessmentBuilder::self_assessment("someone", CYCLE).build()];
        assert!(detect_pairing(&unrelated, &mr, &dr, cycle(CYCLE)).is_none());
    }

    #[test]
    fn test_peer_rating_yields_empty_pairing() {
        let (mr, dr) = ids();
        let records = vec![AssessmentBuilder::rating("dr", "peer", AssessorRole::Peer, CYCLE).build()];
        let pairing = detect_pairing(&records, &mr, &dr, cycle(CYCLE)).unwrap();
        assert_eq!(pairing.side_a, SideSlots::default());
        assert_eq!(pairing.side_b, SideSlots::default());
    }

    #[test]
    fn test_most_recent_duplicate_wins() {
        let (mr, dr) = ids();
        let now = Utc::now();
        let records = vec![
            AssessmentBuilder::self_assessment("dr", CYCLE)
                .id("new")
                .updated_at(now)
                .completed()
                .build(),
            AssessmentBuilder::self_assessment("dr", CYCLE)
                .id("old")
                .updated_at(now - Duration::days(2))
                .build(),
        ];

        let pairing = detect_pairing(&records, &mr, &dr, cycle(CYCLE)).unwrap();
        assert_eq!(pairing.side_a.self_assessment.unwrap().id.as_str(), "new");
        assert_eq!(pairing.superseded, vec![AssessmentId::from("old")]);
    }

    #[test]
    fn test_self_pairing_is_rejected() {
        let mr = UserId::from("mr");
        assert!(detect_pairing(&full_set(), &mr, &mr, cycle(CYCLE)).is_none());
    }

    #[test]
    fn test_pairings_for_manager() {
        let users = vec![
            user("mr", None),
            user("dr", Some("mr")),
            user("idle", Some("mr")),
            user("other", Some("boss")),
        ];
        let pairings = pairings_for_manager(&full_set(), &users, &UserId::from("mr"), cycle(CYCLE));
        // "idle" has no records but MR does, so it still gets a pairing
        assert_eq!(pairings.len(), 2);
        assert_eq!(pairings[0].direct_report_id.as_str(), "dr");
        assert_eq!(pairings[1].direct_report_id.as_str(), "idle");
        assert!(pairings[1].side_a.self_assessment.is_none());
    }

    proptest! {
        #[test]
        fn prop_pairing_id_is_symmetric(
            a in "[a-z0-9]{1,12}",
            b in "[a-z0-9]{1,12}",
            month in 1u8..=12,
            year in 2000u16..2100,
        ) {
            prop_assume!(a != b);
            let cycle = Cycle::new(month, year).unwrap();
            let (a, b) = (UserId::from(a.as_str()), UserId::from(b.as_str()));
            prop_assert_eq!(pairing_id(cycle, &a, &b), pairing_id(cycle, &b, &a));
        }
    }
}
