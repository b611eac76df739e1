//! MSH³ - assessment aggregation and pairing core
//!
//! Backs a 360°/1x1 performance-assessment tool. The crate provides:
//! - Score composition and 9-box placement from per-dimension ratings
//! - Sequential `MSH{n}` identifiers from an atomic store counter
//! - Bilateral manager <-> direct-report pairing detection per cycle
//! - Badges and pending actions derived from a pairing
//! - Statistics and MSH-ID gap auditing
//! - MSH Result aggregation and publication
//! - Capability-gated administrative batch operations
//!
//! # Architecture
//!
//! - **Types**: canonical records (`Assessment`, `User`, `Cycle`, ...)
//! - **Storage**: `DocumentStore` trait with in-memory and libSQL backends,
//!   plus typed access and schema validation in `storage::records`
//! - **Engine**: `scoring`, `pairing`, `status`, `stats`, `results`
//! - **Operations**: `counter`, `admin`, `access`
//!
//! # Example
//!
//! ```ignore
//! use msh3_core::{detect_pairing, badge_for, Records, MemoryStore, Side, UserId, ViewerRole};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> msh3_core::Result<()> {
//!     let records = Records::new(Arc::new(MemoryStore::new()));
//!     let cycle = "2025-03".parse()?;
//!     let report = records.assessments_for_cycle(cycle).await?;
//!
//!     let (mr, dr) = (UserId::from("mr"), UserId::from("dr"));
//!     if let Some(pairing) = detect_pairing(&report.records, &mr, &dr, cycle) {
//!         println!("{}", badge_for(&pairing, ViewerRole::Manager, Side::A));
//!     }
//!     Ok(())
//! }
//! ```

pub mod access;
pub mod admin;
pub mod config;
pub mod counter;
pub mod error;
pub mod pairing;
pub mod results;
pub mod scoring;
pub mod stats;
pub mod status;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use access::CurrentUser;
pub use admin::{AdminService, BatchReport, ImportBundle};
pub use config::MshConfig;
pub use counter::{AllocatedId, CounterAllocator};
pub use error::{MshError, Result};
pub use pairing::{detect_pairing, is_side_complete, pairing_id, Pairing, Side};
pub use results::{aggregate_result, MshResult};
pub use scoring::{compute_scores, ScoreSummary};
pub use stats::{compute_stats, compute_stats_with, AssessmentStats};
pub use status::{badge_for, pending_actions_for, Badge, PendingAction, ViewerRole};
pub use storage::libsql::{ConnectionMode, LibsqlStore};
pub use storage::memory::MemoryStore;
pub use storage::records::Records;
pub use storage::{Document, DocumentStore, Filter};
pub use types::{
    Assessment, AssessmentId, AssessmentStatus, AssessorRole, Capability, Cycle, MshId, User,
    UserId,
};
