//! Fixture builders shared by unit tests, integration tests and benches

use crate::types::{
    Assessment, AssessmentId, AssessmentStatus, AssessmentType, AssessorRole, Cycle,
    DimensionScore, DimensionScores, MshId, OrgLayer, User, UserId,
};
use chrono::{DateTime, Utc};

/// Parse a `YYYY-MM` cycle, panicking on bad fixtures
pub fn cycle(s: &str) -> Cycle {
    s.parse().expect("fixture cycle must be YYYY-MM")
}

/// Builder for assessment fixtures
#[derive(Debug, Clone)]
pub struct AssessmentBuilder {
    assessment: Assessment,
}

impl AssessmentBuilder {
    /// Rating of `subject` by `assessor` with an explicit role
    pub fn rating(subject: &str, assessor: &str, role: AssessorRole, cycle_str: &str) -> Self {
        let assessment_type = match role {
            AssessorRole::SelfRating => AssessmentType::SelfAssessment,
            AssessorRole::Peer => AssessmentType::PeerToPeer,
            AssessorRole::Manager | AssessorRole::DirectReport => AssessmentType::ThreeSixty,
        };
        Self {
            assessment: Assessment::new(
                UserId::from(subject),
                UserId::from(assessor),
                role,
                assessment_type,
                cycle(cycle_str),
            ),
        }
    }

    pub fn self_assessment(user: &str, cycle_str: &str) -> Self {
        Self::rating(user, user, AssessorRole::SelfRating, cycle_str)
    }

    /// 360 rating of `subject` by their manager `assessor`
    pub fn bilateral(subject: &str, assessor: &str, cycle_str: &str) -> Self {
        Self::rating(subject, assessor, AssessorRole::Manager, cycle_str)
    }

    pub fn id(mut self, id: &str) -> Self {
        self.assessment.id = AssessmentId::from(id);
        self
    }

    pub fn status(mut self, status: AssessmentStatus) -> Self {
        self.assessment.status = status;
        self
    }

    pub fn completed(self) -> Self {
        self.status(AssessmentStatus::Completed)
    }

    pub fn published(mut self) -> Self {
        self.assessment.published = true;
        self
    }

    pub fn msh(mut self, n: u64) -> Self {
        self.assessment.msh_id = Some(MshId::Sequence(n));
        self
    }

    pub fn updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.assessment.updated_at = at;
        self
    }

    /// Culture, competencies, execution as (contribution, growth)
    pub fn scores(mut self, values: [(i32, i32); 3]) -> Self {
        self.assessment.scores = DimensionScores::new(
            DimensionScore::new(values[0].0, values[0].1),
            DimensionScore::new(values[1].0, values[1].1),
            DimensionScore::new(values[2].0, values[2].1),
        );
        self
    }

    pub fn build(mut self) -> Assessment {
        self.assessment.recompute_scores();
        self.assessment
    }
}

/// Plain user with an optional manager
pub fn user(id: &str, manager: Option<&str>) -> User {
    let mut user = User::new(id, id.to_uppercase(), OrgLayer::IndividualContributor);
    user.manager_id = manager.map(UserId::from);
    user
}
