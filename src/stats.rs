//! Assessment statistics and MSH-ID gap auditing
//!
//! Everything here is derived fresh from one scan of the assessment
//! collection; nothing is persisted.

use crate::error::Result;
use crate::storage::records::{decode_assessment, raw_msh_id, ASSESSMENTS};
use crate::storage::{Document, DocumentStore};
use crate::types::{AssessmentStatus, MshId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Widest jump between consecutive sequences the gap audit expands
pub const DEFAULT_MAX_GAP_SPAN: u64 = 10_000;

/// Counts by lifecycle status; `completed` absorbs aligned and not-aligned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub draft: usize,
    pub pending: usize,
    pub completed: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: AssessmentStatus) {
        match status {
            AssessmentStatus::Draft => self.draft += 1,
            AssessmentStatus::Pending => self.pending += 1,
            AssessmentStatus::Completed | AssessmentStatus::Aligned | AssessmentStatus::NotAligned => {
                self.completed += 1
            }
        }
    }

    pub fn total(&self) -> usize {
        self.draft + self.pending + self.completed
    }
}

/// Result of a statistics scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentStats {
    /// Every document in the collection, conforming or not
    pub total: usize,

    /// Conforming documents only
    pub by_status: StatusCounts,

    /// Highest `MSH{n}` seen, outliers included; 0 if none
    pub max_sequence: u64,

    /// Missing sequence numbers below the first outlier
    pub gaps: Vec<u64>,

    /// Sequences past a jump wider than the gap span, not expanded into gaps
    pub outliers: Vec<u64>,

    /// Sequence numbers carried by more than one document
    pub duplicates: Vec<u64>,

    /// Documents with no `msh_id`
    pub unnumbered: usize,

    /// Ids of documents whose `msh_id` is present but unparseable
    pub malformed: Vec<String>,

    /// Documents carrying a timestamp fallback id
    pub provisional: usize,

    /// Documents that failed schema validation
    pub rejected: usize,

    /// Stored counter value, 0 if never written
    pub counter_value: u64,
}

impl AssessmentStats {
    /// `counter_value - max_sequence`; negative means ids would be reissued
    pub fn drift(&self) -> i128 {
        self.counter_value as i128 - self.max_sequence as i128
    }

    pub fn needs_sync(&self) -> bool {
        self.drift() < 0
    }
}

/// Gaps and outliers of a sequence set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceAudit {
    pub gaps: Vec<u64>,
    pub outliers: Vec<u64>,
}

/// Walk the sequences upward from 0, expanding each jump into gaps
///
/// The first sequence more than `max_span` above its predecessor, and
/// everything above it, are reported as outliers instead, which keeps the
/// gap list bounded by `sequences.len() * max_span`.
pub fn audit_sequences(sequences: &BTreeSet<u64>, max_span: u64) -> SequenceAudit {
    let mut audit = SequenceAudit::default();
    let mut previous = 0u64;
    let mut iter = sequences.iter().copied();

    while let Some(n) = iter.next() {
        if n - previous > max_span {
            audit.outliers.push(n);
            audit.outliers.extend(iter);
            break;
        }
        audit.gaps.extend(previous.saturating_add(1)..n);
        previous = n;
    }
    audit
}

/// Missing integers in `1..=max(sequences)` under the default span
pub fn find_gaps(sequences: &BTreeSet<u64>) -> Vec<u64> {
    audit_sequences(sequences, DEFAULT_MAX_GAP_SPAN).gaps
}

/// Summarize raw assessment documents against a counter value
pub fn summarize(documents: &[Document], counter_value: u64) -> AssessmentStats {
    summarize_with(documents, counter_value, DEFAULT_MAX_GAP_SPAN)
}

/// [`summarize`] with an explicit gap span
pub fn summarize_with(documents: &[Document], counter_value: u64, max_span: u64) -> AssessmentStats {
    let mut by_status = StatusCounts::default();
    let mut occurrences: BTreeMap<u64, usize> = BTreeMap::new();
    let mut unnumbered = 0;
    let mut malformed = Vec::new();
    let mut provisional = 0;
    let mut rejected = 0;

    for document in documents {
        match raw_msh_id(document) {
            Some(MshId::Sequence(n)) => *occurrences.entry(n).or_default() += 1,
            Some(MshId::Provisional(_)) => provisional += 1,
            None => match document.data.get("msh_id") {
                None | Some(Value::Null) => unnumbered += 1,
                Some(raw) => {
                    warn!("Unparseable MSH id {} on {}", raw, document.id);
                    malformed.push(document.id.clone());
                }
            },
        }
        match decode_assessment(document) {
            Ok(assessment) => by_status.record(assessment.status),
            Err(reason) => {
                debug!("Skipping {} in status counts: {}", document.id, reason);
                rejected += 1;
            }
        }
    }

    let sequences: BTreeSet<u64> = occurrences.keys().copied().collect();
    let duplicates: Vec<u64> = occurrences
        .iter()
        .filter(|(_, count)| **count > 1)
        .map(|(n, _)| *n)
        .collect();
    let audit = audit_sequences(&sequences, max_span);
    malformed.sort();

    AssessmentStats {
        total: documents.len(),
        by_status,
        max_sequence: sequences.iter().next_back().copied().unwrap_or(0),
        gaps: audit.gaps,
        outliers: audit.outliers,
        duplicates,
        unnumbered,
        malformed,
        provisional,
        rejected,
        counter_value,
    }
}

/// Scan the assessment collection once and read the counter
pub async fn compute_stats(store: &dyn DocumentStore, counter_name: &str) -> Result<AssessmentStats> {
    compute_stats_with(store, counter_name, DEFAULT_MAX_GAP_SPAN).await
}

/// [`compute_stats`] with an explicit gap span
pub async fn compute_stats_with(
    store: &dyn DocumentStore,
    counter_name: &str,
    max_span: u64,
) -> Result<AssessmentStats> {
    let documents = store.list(ASSESSMENTS).await?;
    let counter_value = store.get_counter(counter_name).await?.unwrap_or(0);
    let stats = summarize_with(&documents, counter_value, max_span);
    info!(
        "Stats: {} assessments, max MSH{}, {} gaps, {} outliers, {} duplicates, counter {} (drift {})",
        stats.total,
        stats.max_sequence,
        stats.gaps.len(),
        stats.outliers.len(),
        stats.duplicates.len(),
        stats.counter_value,
        stats.drift()
    );
    Ok(stats)
}
