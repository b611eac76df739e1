//! MSH Result aggregation
//!
//! An MSH Result summarizes every completed assessment about one employee
//! in one cycle: per-dimension averages per rater group, an overall average
//! across the non-self raters, composite and 9-box. Results are derived and
//! can be recomputed at any time; publishing stores a snapshot and flags the
//! source assessments as published.

use crate::error::{MshError, Result};
use crate::scoring::nine_box_for;
use crate::storage::records::Records;
use crate::types::{
    Assessment, AssessmentId, AssessorRole, Cycle, Dimension, NineBoxPosition, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Stored id of the result for `subject` in `cycle`
pub fn result_id(subject: &UserId, cycle: Cycle) -> String {
    format!("{}-{}", subject, cycle)
}

/// Mean contribution and growth for one dimension
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionAverage {
    pub contribution: f64,
    pub growth: f64,
}

/// Per-dimension means over a group of assessments
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AverageScores {
    pub culture: DimensionAverage,
    pub competencies: DimensionAverage,
    pub execution: DimensionAverage,
}

impl AverageScores {
    /// `None` for an empty group
    pub fn of(group: &[&Assessment]) -> Option<Self> {
        if group.is_empty() {
            return None;
        }
        let n = group.len() as f64;
        let mean = |dimension: Dimension| {
            let (c, g) = group.iter().fold((0i64, 0i64), |(c, g), a| {
                let score = a.scores.get(dimension);
                (c + score.contribution as i64, g + score.growth as i64)
            });
            DimensionAverage {
                contribution: c as f64 / n,
                growth: g as f64 / n,
            }
        };
        Some(Self {
            culture: mean(Dimension::Culture),
            competencies: mean(Dimension::Competencies),
            execution: mean(Dimension::Execution),
        })
    }

    pub fn get(&self, dimension: Dimension) -> DimensionAverage {
        match dimension {
            Dimension::Culture => self.culture,
            Dimension::Competencies => self.competencies,
            Dimension::Execution => self.execution,
        }
    }

    pub fn total_contribution(&self) -> f64 {
        Dimension::ALL.iter().map(|d| self.get(*d).contribution).sum()
    }

    pub fn total_growth(&self) -> f64 {
        Dimension::ALL.iter().map(|d| self.get(*d).growth).sum()
    }

    pub fn composite(&self) -> f64 {
        self.total_contribution() + self.total_growth()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaterCounts {
    pub self_rating: usize,
    pub manager: usize,
    pub direct_report: usize,
    pub peer: usize,
}

/// Aggregate per employee per cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MshResult {
    pub id: String,
    pub subject_id: UserId,
    pub cycle: Cycle,
    pub self_scores: Option<AverageScores>,
    pub manager_scores: Option<AverageScores>,
    pub direct_report_scores: Option<AverageScores>,
    pub peer_scores: Option<AverageScores>,

    /// Mean over manager, direct-report and peer ratings; self if none exist
    pub overall: AverageScores,
    pub composite: f64,
    pub nine_box: NineBoxPosition,
    pub rater_counts: RaterCounts,
    pub source_assessments: Vec<AssessmentId>,
    pub computed_at: DateTime<Utc>,
}

/// Aggregate the completed assessments about `subject` in `cycle`
///
/// Returns `None` when there is nothing completed to aggregate.
pub fn aggregate_result(
    assessments: &[Assessment],
    subject: &UserId,
    cycle: Cycle,
) -> Option<MshResult> {
    let sources: Vec<&Assessment> = assessments
        .iter()
        .filter(|a| a.cycle == cycle && &a.subject_id == subject && a.is_completed())
        .collect();
    if sources.is_empty() {
        return None;
    }

    let group = |role: AssessorRole| {
        sources
            .iter()
            .copied()
            .filter(|a| {
                if role == AssessorRole::SelfRating {
                    a.is_self_assessment()
                } else {
                    !a.is_self_assessment() && a.assessor_role == role
                }
            })
            .collect::<Vec<_>>()
    };
    let self_group = group(AssessorRole::SelfRating);
    let manager_group = group(AssessorRole::Manager);
    let report_group = group(AssessorRole::DirectReport);
    let peer_group = group(AssessorRole::Peer);

    let others: Vec<&Assessment> = sources
        .iter()
        .copied()
        .filter(|a| !a.is_self_assessment())
        .collect();
    let overall = AverageScores::of(&others)
        .or_else(|| AverageScores::of(&self_group))
        .unwrap_or_default();

    let mut source_assessments: Vec<AssessmentId> = sources.iter().map(|a| a.id.clone()).collect();
    source_assessments.sort();

    Some(MshResult {
        id: result_id(subject, cycle),
        subject_id: subject.clone(),
        cycle,
        self_scores: AverageScores::of(&self_group),
        manager_scores: AverageScores::of(&manager_group),
        direct_report_scores: AverageScores::of(&report_group),
        peer_scores: AverageScores::of(&peer_group),
        composite: overall.composite(),
        nine_box: nine_box_for(overall.total_contribution(), overall.total_growth()),
        overall,
        rater_counts: RaterCounts {
            self_rating: self_group.len(),
            manager: manager_group.len(),
            direct_report: report_group.len(),
            peer: peer_group.len(),
        },
        source_assessments,
        computed_at: Utc::now(),
    })
}

/// Recompute, store the result and flag its sources as published
pub async fn publish_result(
    records: &Records,
    subject: &UserId,
    cycle: Cycle,
) -> Result<MshResult> {
    let report = records.assessments_for_cycle(cycle).await?;
    if !report.is_clean() {
        warn!(
            "{} non-conforming assessments ignored while publishing {}",
            report.rejected.len(),
            result_id(subject, cycle)
        );
    }

    let result = aggregate_result(&report.records, subject, cycle).ok_or_else(|| {
        MshError::NotFound(format!("no completed assessments for {} in {}", subject, cycle))
    })?;
    records.save_result(&result).await?;

    let now = Utc::now();
    for mut assessment in report
        .records
        .into_iter()
        .filter(|a| result.source_assessments.contains(&a.id) && !a.published)
    {
        assessment.published = true;
        assessment.updated_at = now;
        records.save_assessment(&assessment).await?;
    }

    info!(
        "Published {} from {} assessments (composite {:.2})",
        result.id,
        result.source_assessments.len(),
        result.composite
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;
    use crate::storage::test_utils::{cycle, AssessmentBuilder};
    use crate::types::{AssessmentStatus, Band};
    use std::sync::Arc;

    const CYCLE: &str = "2025-03";

    fn sample() -> Vec<Assessment> {
        vec![
            AssessmentBuilder::self_assessment("dr", CYCLE)
                .scores([(2, 2), (2, 2), (2, 2)])
                .completed()
                .build(),
            AssessmentBuilder::bilateral("dr", "mr", CYCLE)
                .scores([(2, 1), (1, 1), (2, 0)])
                .completed()
                .build(),
            AssessmentBuilder::rating("dr", "peer", AssessorRole::Peer, CYCLE)
                .scores([(0, 1), (1, 1), (0, 0)])
                .status(AssessmentStatus::Aligned)
                .build(),
            // not completed, ignored
            AssessmentBuilder::rating("dr", "peer2", AssessorRole::Peer, CYCLE)
                .scores([(2, 2), (2, 2), (2, 2)])
                .build(),
        ]
    }

    #[test]
    fn test_aggregate_groups_by_rater() {
        let dr = UserId::from("dr");
        let result = aggregate_result(&sample(), &dr, cycle(CYCLE)).unwrap();

        assert_eq!(result.id, "dr-2025-03");
        assert_eq!(
            result.rater_counts,
            RaterCounts { self_rating: 1, manager: 1, direct_report: 0, peer: 1 }
        );
        assert_eq!(result.self_scores.unwrap().composite(), 12.0);
        assert!(result.direct_report_scores.is_none());

        // overall = mean of manager (7) and peer (3)
        assert_eq!(result.overall.culture.contribution, 1.0);
        assert_eq!(result.composite, 5.0);
        assert_eq!(result.nine_box.performance, Band::Medium);
        assert_eq!(result.nine_box.potential, Band::Low);
        assert_eq!(result.source_assessments.len(), 3);
    }

    #[test]
    fn test_self_only_falls_back_to_self_scores() {
        let records = vec![AssessmentBuilder::self_assessment("u", CYCLE)
            .scores([(1, 1), (1, 1), (1, 1)])
            .completed()
            .build()];
        let result = aggregate_result(&records, &UserId::from("u"), cycle(CYCLE)).unwrap();
        assert_eq!(result.composite, 6.0);
    }

    #[test]
    fn test_nothing_completed_yields_none() {
        let records = vec![AssessmentBuilder::self_assessment("u", CYCLE).build()];
        assert!(aggregate_result(&records, &UserId::from("u"), cycle(CYCLE)).is_none());
        assert!(aggregate_result(&sample(), &UserId::from("dr"), cycle("2025-04")).is_none());
    }

    #[tokio::test]
    async fn test_publish_marks_sources() {
        let records = Records::new(Arc::new(MemoryStore::new()));
        for assessment in sample() {
            records.save_assessment(&assessment).await.unwrap();
        }

        let dr = UserId::from("dr");
        let result = publish_result(&records, &dr, cycle(CYCLE)).await.unwrap();
        let stored = records.result(&dr, cycle(CYCLE)).await.unwrap().unwrap();
        assert_eq!(stored, result);

        let all = records.assessments().await.unwrap().records;
        let published = all.iter().filter(|a| a.published).count();
        assert_eq!(published, 3);
        assert!(all.iter().filter(|a| !a.is_completed()).all(|a| !a.published));
    }

    #[tokio::test]
    async fn test_publish_without_completed_assessments_is_not_found() {
        let records = Records::new(Arc::new(MemoryStore::new()));
        let err = publish_result(&records, &UserId::from("ghost"), cycle(CYCLE))
            .await
            .unwrap_err();
        assert!(matches!(err, MshError::NotFound(_)));
    }
}
