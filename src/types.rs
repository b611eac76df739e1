//! Core data types for the MSH³ assessment system
//!
//! This module defines the canonical schema for users and assessments. Every
//! document read from the store is decoded into these types and validated
//! before any pairing, scoring or auditing logic sees it.

use crate::error::{MshError, Result};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

static SEQUENCE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^MSH([1-9]\d*)$").expect("valid sequence pattern"));
static PROVISIONAL_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^MSH-T(\d+)$").expect("valid provisional pattern"));

/// Largest sequence number any store can hold (libSQL integers are signed)
pub const MAX_SEQUENCE: u64 = i64::MAX as u64;

/// Unique identifier for a user in the org hierarchy
///
/// Ordering is lexicographic on the raw id, which is what pairing ids rely on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Document id of an assessment
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssessmentId(pub String);

impl AssessmentId {
    /// Create a new random assessment ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AssessmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for AssessmentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for AssessmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human-readable assessment identifier
///
/// `Sequence(n)` renders as `MSH{n}` and is issued by the counter allocator.
/// `Provisional(millis)` renders as `MSH-T{millis}` and is only produced when
/// the allocator had to fall back to a timestamp; it never takes part in
/// sequence auditing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MshId {
    Sequence(u64),
    Provisional(i64),
}

impl MshId {
    /// Parse `MSH{n}` or `MSH-T{millis}`
    ///
    /// `n` must be in `1..=MAX_SEQUENCE` and written without leading zeros,
    /// so every sequence has exactly one spelling.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if let Some(caps) = SEQUENCE_ID.captures(raw) {
            return caps[1]
                .parse::<u64>()
                .ok()
                .filter(|n| *n <= MAX_SEQUENCE)
                .map(MshId::Sequence)
                .ok_or_else(|| MshError::InvalidMshId(raw.to_string()));
        }
        if let Some(caps) = PROVISIONAL_ID.captures(raw) {
            return caps[1]
                .parse::<i64>()
                .map(MshId::Provisional)
                .map_err(|_| MshError::InvalidMshId(raw.to_string()));
        }
        Err(MshError::InvalidMshId(raw.to_string()))
    }

    /// Sequence number, if this id came from the counter
    pub fn sequence(&self) -> Option<u64> {
        match self {
            MshId::Sequence(n) => Some(*n),
            MshId::Provisional(_) => None,
        }
    }

    pub fn is_provisional(&self) -> bool {
        matches!(self, MshId::Provisional(_))
    }
}

impl std::fmt::Display for MshId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MshId::Sequence(n) => write!(f, "MSH{}", n),
            MshId::Provisional(ts) => write!(f, "MSH-T{}", ts),
        }
    }
}

impl TryFrom<String> for MshId {
    type Error = MshError;

    fn try_from(value: String) -> Result<Self> {
        MshId::parse(&value)
    }
}

impl From<MshId> for String {
    fn from(id: MshId) -> Self {
        id.to_string()
    }
}

/// Assessment period (month + year)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cycle {
    pub year: u16,
    pub month: u8,
}

impl Cycle {
    pub fn new(month: u8, year: u16) -> Result<Self> {
        let cycle = Self { year, month };
        cycle.validate()?;
        Ok(cycle)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=12).contains(&self.month) {
            return Err(MshError::InvalidCycle(format!(
                "month {} is outside 1-12",
                self.month
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for Cycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

impl std::str::FromStr for Cycle {
    type Err = MshError;

    /// Parse `YYYY-MM`
    fn from_str(s: &str) -> Result<Self> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| MshError::InvalidCycle(format!("expected YYYY-MM, got '{}'", s)))?;
        let year = year
            .parse::<u16>()
            .map_err(|_| MshError::InvalidCycle(format!("bad year in '{}'", s)))?;
        let month = month
            .parse::<u8>()
            .map_err(|_| MshError::InvalidCycle(format!("bad month in '{}'", s)))?;
        Cycle::new(month, year)
    }
}

/// Rated dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Culture,
    Competencies,
    Execution,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [
        Dimension::Culture,
        Dimension::Competencies,
        Dimension::Execution,
    ];
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dimension::Culture => write!(f, "culture"),
            Dimension::Competencies => write!(f, "competencies"),
            Dimension::Execution => write!(f, "execution"),
        }
    }
}

/// Contribution and growth sub-scores for one dimension
///
/// The UI constrains these to 0-2; nothing here clamps them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub contribution: i32,
    pub growth: i32,
}

impl DimensionScore {
    pub fn new(contribution: i32, growth: i32) -> Self {
        Self {
            contribution,
            growth,
        }
    }
}

/// Scores for all three dimensions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionScores {
    pub culture: DimensionScore,
    pub competencies: DimensionScore,
    pub execution: DimensionScore,
}

impl DimensionScores {
    pub fn new(
        culture: DimensionScore,
        competencies: DimensionScore,
        execution: DimensionScore,
    ) -> Self {
        Self {
            culture,
            competencies,
            execution,
        }
    }

    pub fn get(&self, dimension: Dimension) -> DimensionScore {
        match dimension {
            Dimension::Culture => self.culture,
            Dimension::Competencies => self.competencies,
            Dimension::Execution => self.execution,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, DimensionScore)> + '_ {
        Dimension::ALL.iter().map(move |d| (*d, self.get(*d)))
    }
}

/// Role of the assessor relative to the subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssessorRole {
    #[serde(rename = "self")]
    SelfRating,
    Manager,
    DirectReport,
    Peer,
}

/// Kind of rating event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssessmentType {
    #[serde(rename = "self")]
    SelfAssessment,
    #[serde(rename = "1x1")]
    OneOnOne,
    #[serde(rename = "360")]
    ThreeSixty,
    #[serde(rename = "p2p")]
    PeerToPeer,
}

/// Alignment outcome attached to a completed assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlignmentOutcome {
    Aligned,
    NotAligned,
}

/// Assessment lifecycle status
///
/// `draft -> pending -> completed`, and `completed` may be tagged with a
/// terminal alignment outcome (`aligned` / `not-aligned`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssessmentStatus {
    Draft,
    Pending,
    Completed,
    Aligned,
    NotAligned,
}

impl AssessmentStatus {
    /// Completed, with or without an alignment outcome
    pub fn is_completed(&self) -> bool {
        matches!(
            self,
            AssessmentStatus::Completed | AssessmentStatus::Aligned | AssessmentStatus::NotAligned
        )
    }

    pub fn outcome(&self) -> Option<AlignmentOutcome> {
        match self {
            AssessmentStatus::Aligned => Some(AlignmentOutcome::Aligned),
            AssessmentStatus::NotAligned => Some(AlignmentOutcome::NotAligned),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: AssessmentStatus) -> bool {
        use AssessmentStatus::*;
        matches!(
            (self, next),
            (Draft, Pending) | (Pending, Completed) | (Completed, Aligned) | (Completed, NotAligned)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentStatus::Draft => "draft",
            AssessmentStatus::Pending => "pending",
            AssessmentStatus::Completed => "completed",
            AssessmentStatus::Aligned => "aligned",
            AssessmentStatus::NotAligned => "not-aligned",
        }
    }
}

impl std::fmt::Display for AssessmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One axis of the 9-box grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    Low,
    Medium,
    High,
}

impl Band {
    fn index(&self) -> u8 {
        match self {
            Band::Low => 0,
            Band::Medium => 1,
            Band::High => 2,
        }
    }
}

/// Performance x potential placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NineBoxPosition {
    pub performance: Band,
    pub potential: Band,
}

impl NineBoxPosition {
    /// Grid cell 1-9, row-major from low potential / low performance
    pub fn cell(&self) -> u8 {
        self.potential.index() * 3 + self.performance.index() + 1
    }

    pub fn label(&self) -> &'static str {
        match (self.performance, self.potential) {
            (Band::Low, Band::Low) => "Talent risk",
            (Band::Medium, Band::Low) => "Effective",
            (Band::High, Band::Low) => "Trusted professional",
            (Band::Low, Band::Medium) => "Inconsistent player",
            (Band::Medium, Band::Medium) => "Core player",
            (Band::High, Band::Medium) => "High performer",
            (Band::Low, Band::High) => "Rough diamond",
            (Band::Medium, Band::High) => "Future star",
            (Band::High, Band::High) => "Star",
        }
    }
}

/// Outcome of an HR partner review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HrpOutcome {
    Upheld,
    Adjusted,
    Dismissed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HrpReview {
    pub outcome: HrpOutcome,
    #[serde(default)]
    pub reviewer_id: Option<UserId>,
    pub reviewed_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A single rating event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    // === Identity ===
    pub id: AssessmentId,

    #[serde(default)]
    pub msh_id: Option<MshId>,

    pub cycle: Cycle,

    // === Participants ===
    /// Who is rated
    pub subject_id: UserId,

    /// Who rates
    pub assessor_id: UserId,

    pub assessor_role: AssessorRole,

    pub assessment_type: AssessmentType,

    // === Lifecycle ===
    pub status: AssessmentStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,

    /// Folded into a published MSH result
    #[serde(default)]
    pub published: bool,

    // === Scores ===
    pub scores: DimensionScores,

    /// Sum of every contribution and growth sub-score
    pub composite: i32,

    #[serde(default)]
    pub nine_box: Option<NineBoxPosition>,

    #[serde(default)]
    pub notes: BTreeMap<Dimension, String>,

    // === HR partner review ===
    #[serde(default)]
    pub hrp_requested: bool,

    #[serde(default)]
    pub hrp_review: Option<HrpReview>,
}

impl Assessment {
    /// Create a draft assessment with zero scores
    pub fn new(
        subject_id: UserId,
        assessor_id: UserId,
        assessor_role: AssessorRole,
        assessment_type: AssessmentType,
        cycle: Cycle,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AssessmentId::new(),
            msh_id: None,
            cycle,
            subject_id,
            assessor_id,
            assessor_role,
            assessment_type,
            status: AssessmentStatus::Draft,
            created_at: now,
            updated_at: now,
            submitted_at: None,
            published: false,
            scores: DimensionScores::default(),
            composite: 0,
            nine_box: None,
            notes: BTreeMap::new(),
            hrp_requested: false,
            hrp_review: None,
        }
    }

    /// Self-assessment: the assessor rates themself
    pub fn is_self_assessment(&self) -> bool {
        self.assessor_role == AssessorRole::SelfRating
            || self.assessment_type == AssessmentType::SelfAssessment
            || self.subject_id == self.assessor_id
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }

    pub fn references(&self, user: &UserId) -> bool {
        &self.subject_id == user || &self.assessor_id == user
    }

    /// Replace scores and refresh the derived composite and 9-box
    pub fn set_scores(&mut self, scores: DimensionScores) {
        self.scores = scores;
        self.recompute_scores();
    }

    pub fn recompute_scores(&mut self) {
        let summary = crate::scoring::compute_scores(&self.scores);
        self.composite = summary.composite;
        self.nine_box = Some(summary.nine_box());
    }

    /// Move along the lifecycle, rejecting backward or skipping moves
    pub fn transition_to(&mut self, next: AssessmentStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(MshError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        let now = Utc::now();
        if next == AssessmentStatus::Completed {
            self.submitted_at = Some(now);
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Check the canonical-schema invariants
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.id.0.trim().is_empty() {
            return Err("empty assessment id".to_string());
        }
        if self.subject_id.0.trim().is_empty() || self.assessor_id.0.trim().is_empty() {
            return Err("subject and assessor ids are required".to_string());
        }
        self.cycle.validate().map_err(|e| e.to_string())?;
        let same_person = self.subject_id == self.assessor_id;
        let self_role = self.assessor_role == AssessorRole::SelfRating;
        let self_type = self.assessment_type == AssessmentType::SelfAssessment;
        if self_role != self_type {
            return Err(format!(
                "assessor role {:?} does not match assessment type {:?}",
                self.assessor_role, self.assessment_type
            ));
        }
        if self_role && !same_person {
            return Err("self-assessment whose assessor differs from subject".to_string());
        }
        if !self_role && same_person {
            return Err("non-self assessment where subject rates themself".to_string());
        }
        let expected = crate::scoring::compute_scores(&self.scores).composite;
        if self.composite != expected {
            return Err(format!(
                "composite {} does not equal sum of sub-scores {}",
                self.composite, expected
            ));
        }
        Ok(())
    }
}

/// Organizational layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrgLayer {
    Executive,
    PillarLeader,
    Supervisor,
    IndividualContributor,
}

/// Granted capability flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    AdminPanel,
    ManageUsers,
    PublishResults,
    ViewAllAssessments,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::AdminPanel,
        Capability::ManageUsers,
        Capability::PublishResults,
        Capability::ViewAllAssessments,
    ];
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Capability::AdminPanel => "admin-panel",
            Capability::ManageUsers => "manage-users",
            Capability::PublishResults => "publish-results",
            Capability::ViewAllAssessments => "view-all-assessments",
        };
        f.write_str(s)
    }
}

/// A person in the org hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,

    pub display_name: String,

    pub layer: OrgLayer,

    #[serde(default)]
    pub pillar: Option<String>,

    #[serde(default)]
    pub sub_pillar: Option<String>,

    /// Reporting relationship
    #[serde(default)]
    pub manager_id: Option<UserId>,

    #[serde(default)]
    pub capabilities: BTreeSet<Capability>,
}

impl User {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, layer: OrgLayer) -> Self {
        Self {
            id: UserId::new(id),
            display_name: display_name.into(),
            layer,
            pillar: None,
            sub_pillar: None,
            manager_id: None,
            capabilities: BTreeSet::new(),
        }
    }

    pub fn reports_to(&self, manager: &UserId) -> bool {
        self.manager_id.as_ref() == Some(manager)
    }

    /// Check the canonical-schema invariants
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.id.0.trim().is_empty() {
            return Err("empty user id".to_string());
        }
        if self.display_name.trim().is_empty() {
            return Err("empty display name".to_string());
        }
        if self.manager_id.as_ref() == Some(&self.id) {
            return Err("user is their own manager".to_string());
        }
        Ok(())
    }
}

/// Users whose manager is `manager`, in id order
pub fn direct_reports_of<'a>(users: &'a [User], manager: &UserId) -> Vec<&'a User> {
    let mut reports: Vec<&User> = users.iter().filter(|u| u.reports_to(manager)).collect();
    reports.sort_by(|a, b| a.id.cmp(&b.id));
    reports
}
