//! Typed record access over a [`DocumentStore`]
//!
//! This is the schema boundary: documents are decoded into the canonical
//! types from [`crate::types`] and validated here. Collection reads report
//! non-conforming documents instead of branching on field-name variants at
//! every call site.

use crate::error::{MshError, Result};
use crate::results::MshResult;
use crate::storage::{Document, DocumentStore, Filter};
use crate::types::{Assessment, AssessmentId, Cycle, MshId, User, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

pub const ASSESSMENTS: &str = "assessments";
pub const USERS: &str = "users";
pub const RESULTS: &str = "msh_results";

/// A document that failed decoding or validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub id: String,
    pub reason: String,
}

/// Conforming records plus everything that was rejected
#[derive(Debug, Clone)]
pub struct LoadReport<T> {
    pub records: Vec<T>,
    pub rejected: Vec<RejectedRecord>,
}

impl<T> LoadReport<T> {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Decode and validate one assessment document
pub fn decode_assessment(document: &Document) -> std::result::Result<Assessment, String> {
    let assessment: Assessment =
        serde_json::from_value(document.data.clone()).map_err(|e| e.to_string())?;
    if assessment.id.as_str() != document.id {
        return Err(format!(
            "body id '{}' does not match document id",
            assessment.id
        ));
    }
    assessment.validate()?;
    Ok(assessment)
}

/// Decode one user document
pub fn decode_user(document: &Document) -> std::result::Result<User, String> {
    let user: User = serde_json::from_value(document.data.clone()).map_err(|e| e.to_string())?;
    if user.id.as_str() != document.id {
        return Err(format!("body id '{}' does not match document id", user.id));
    }
    user.validate()?;
    Ok(user)
}

/// MSH id stored on a raw document, whether or not the rest conforms
pub fn raw_msh_id(document: &Document) -> Option<MshId> {
    document
        .data
        .get("msh_id")
        .and_then(|v| v.as_str())
        .and_then(|s| MshId::parse(s).ok())
}

fn collect<T>(
    collection: &str,
    documents: Vec<Document>,
    decode: fn(&Document) -> std::result::Result<T, String>,
) -> LoadReport<T> {
    let mut records = Vec::with_capacity(documents.len());
    let mut rejected = Vec::new();
    for document in &documents {
        match decode(document) {
            Ok(record) => records.push(record),
            Err(reason) => {
                warn!("Rejecting {}/{}: {}", collection, document.id, reason);
                rejected.push(RejectedRecord {
                    id: document.id.clone(),
                    reason,
                });
            }
        }
    }
    LoadReport { records, rejected }
}

/// Typed repository for users, assessments and published results
#[derive(Clone)]
pub struct Records {
    store: Arc<dyn DocumentStore>,
}

impl Records {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// One assessment; `None` if absent, error if it does not conform
    pub async fn assessment(&self, id: &AssessmentId) -> Result<Option<Assessment>> {
        match self.store.get(ASSESSMENTS, id.as_str()).await? {
            Some(document) => decode_assessment(&document)
                .map(Some)
                .map_err(|reason| MshError::InvalidRecord {
                    collection: ASSESSMENTS.to_string(),
                    id: id.to_string(),
                    reason,
                }),
            None => Ok(None),
        }
    }

    pub async fn assessments(&self) -> Result<LoadReport<Assessment>> {
        let documents = self.store.list(ASSESSMENTS).await?;
        debug!("Loaded {} assessment documents", documents.len());
        Ok(collect(ASSESSMENTS, documents, decode_assessment))
    }

    pub async fn assessments_for_cycle(&self, cycle: Cycle) -> Result<LoadReport<Assessment>> {
        let filter = Filter::new()
            .field_eq("cycle.year", cycle.year)
            .field_eq("cycle.month", cycle.month);
        let documents = self.store.query(ASSESSMENTS, &filter).await?;
        Ok(collect(ASSESSMENTS, documents, decode_assessment))
    }

    /// Validate then write
    pub async fn save_assessment(&self, assessment: &Assessment) -> Result<()> {
        assessment
            .validate()
            .map_err(|reason| MshError::InvalidRecord {
                collection: ASSESSMENTS.to_string(),
                id: assessment.id.to_string(),
                reason,
            })?;
        let document = Document::new(assessment.id.as_str(), serde_json::to_value(assessment)?);
        self.store.set(ASSESSMENTS, &document).await
    }

    pub async fn delete_assessment(&self, id: &AssessmentId) -> Result<bool> {
        self.store.delete(ASSESSMENTS, id.as_str()).await
    }

    pub async fn user(&self, id: &UserId) -> Result<Option<User>> {
        match self.store.get(USERS, id.as_str()).await? {
            Some(document) => {
                decode_user(&document)
                    .map(Some)
                    .map_err(|reason| MshError::InvalidRecord {
                        collection: USERS.to_string(),
                        id: id.to_string(),
                        reason,
                    })
            }
            None => Ok(None),
        }
    }

    pub async fn users(&self) -> Result<LoadReport<User>> {
        let documents = self.store.list(USERS).await?;
        Ok(collect(USERS, documents, decode_user))
    }

    /// Validate then write
    pub async fn save_user(&self, user: &User) -> Result<()> {
        user.validate().map_err(|reason| MshError::InvalidRecord {
            collection: USERS.to_string(),
            id: user.id.to_string(),
            reason,
        })?;
        let document = Document::new(user.id.as_str(), serde_json::to_value(user)?);
        self.store.set(USERS, &document).await
    }

    pub async fn save_result(&self, result: &MshResult) -> Result<()> {
        let document = Document::new(result.id.clone(), serde_json::to_value(result)?);
        self.store.set(RESULTS, &document).await
    }

    pub async fn result(&self, subject: &UserId, cycle: Cycle) -> Result<Option<MshResult>> {
        let id = crate::results::result_id(subject, cycle);
        match self.store.get(RESULTS, &id).await? {
            Some(document) => Ok(Some(serde_json::from_value(document.data)?)),
            None => Ok(None),
        }
    }
}
