//! Administrative operations
//!
//! Bulk operations are best-effort batches, not transactions: deletes are
//! issued concurrently, nothing is rolled back, and every call returns a
//! [`BatchReport`] listing what succeeded and what failed so the caller can
//! retry the failures. Each operation checks the acting user's capabilities
//! first.

use crate::access::CurrentUser;
use crate::counter::{CounterAllocator, SyncOutcome};
use crate::error::{MshError, Result};
use crate::results::{publish_result, MshResult};
use crate::storage::records::{Records, ASSESSMENTS};
use crate::storage::DocumentStore;
use crate::types::{Assessment, Capability, Cycle, OrgLayer, User, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::task::{self, JoinSet};
use tracing::{info, warn};

/// One failed item of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub id: String,
    pub error: String,
}

/// Per-item outcome of a best-effort batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Every item succeeded
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, id: String, outcome: Result<()>) {
        match outcome {
            Ok(()) => self.succeeded.push(id),
            Err(e) => self.failed.push(BatchFailure {
                id,
                error: e.to_string(),
            }),
        }
    }

    fn sort(&mut self) {
        self.succeeded.sort();
        self.failed.sort_by(|a, b| a.id.cmp(&b.id));
    }
}

/// Delete `ids` from `collection` concurrently
///
/// A missing document counts as a failure so retries can tell it apart.
pub async fn bulk_delete(
    store: Arc<dyn DocumentStore>,
    collection: &str,
    ids: Vec<String>,
) -> BatchReport {
    let mut tasks = JoinSet::new();
    let mut pending: HashMap<task::Id, String> = HashMap::with_capacity(ids.len());
    for id in ids {
        let store = Arc::clone(&store);
        let collection = collection.to_string();
        let key = id.clone();
        let handle = tasks.spawn(async move {
            match store.delete(&collection, &id).await {
                Ok(true) => Ok(()),
                Ok(false) => Err(MshError::NotFound(format!("{}/{}", collection, id))),
                Err(e) => Err(e),
            }
        });
        pending.insert(handle.id(), key);
    }

    let mut report = BatchReport::default();
    while let Some(joined) = tasks.join_next_with_id().await {
        match joined {
            Ok((task_id, outcome)) => {
                if let Some(id) = pending.remove(&task_id) {
                    report.record(id, outcome);
                }
            }
            Err(e) => {
                let id = pending
                    .remove(&e.id())
                    .unwrap_or_else(|| format!("task-{}", e.id()));
                warn!("Delete of {} aborted: {}", id, e);
                report.failed.push(BatchFailure {
                    id,
                    error: e.to_string(),
                });
            }
        }
    }
    report.sort();

    info!(
        "Bulk delete in {}: {} succeeded, {} failed",
        collection,
        report.succeeded.len(),
        report.failed.len()
    );
    report
}

/// Outcome of a full assessment wipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WipeReport {
    pub deletes: BatchReport,

    /// Only true when every delete succeeded
    pub counter_reset: bool,
}

/// Historical data loaded by direct write
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportBundle {
    #[serde(default)]
    pub users: Vec<User>,

    #[serde(default)]
    pub assessments: Vec<Assessment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub users: BatchReport,
    pub assessments: BatchReport,

    /// Imported MSH ids run past the counter; run a counter sync
    pub needs_sync: bool,
}

/// Capability-gated administrative entry points
pub struct AdminService {
    records: Records,
    counter: CounterAllocator,
    actor: CurrentUser,
}

impl AdminService {
    pub fn new(records: Records, counter: CounterAllocator, actor: CurrentUser) -> Self {
        Self {
            records,
            counter,
            actor,
        }
    }

    pub fn actor(&self) -> &CurrentUser {
        &self.actor
    }

    /// Delete the given assessments
    pub async fn delete_assessments(&self, ids: Vec<String>) -> Result<BatchReport> {
        self.actor.require(Capability::AdminPanel)?;
        Ok(bulk_delete(Arc::clone(self.records.store()), ASSESSMENTS, ids).await)
    }

    /// Delete every assessment, then reset the counter if nothing failed
    pub async fn wipe_assessments(&self) -> Result<WipeReport> {
        self.actor.require(Capability::AdminPanel)?;
        let ids: Vec<String> = self
            .records
            .store()
            .list(ASSESSMENTS)
            .await?
            .into_iter()
            .map(|doc| doc.id)
            .collect();
        info!("{} wiping {} assessments", self.actor.id, ids.len());

        let deletes = bulk_delete(Arc::clone(self.records.store()), ASSESSMENTS, ids).await;
        let counter_reset = if deletes.is_complete() {
            self.counter.reset().await?;
            true
        } else {
            warn!(
                "Counter left untouched: {} deletes failed",
                deletes.failed.len()
            );
            false
        };
        Ok(WipeReport {
            deletes,
            counter_reset,
        })
    }

    /// Write users and assessments as given, bypassing the allocator
    pub async fn import(&self, bundle: ImportBundle) -> Result<ImportReport> {
        self.actor.require(Capability::AdminPanel)?;
        info!(
            "{} importing {} users and {} assessments",
            self.actor.id,
            bundle.users.len(),
            bundle.assessments.len()
        );

        let mut users = BatchReport::default();
        for user in &bundle.users {
            users.record(user.id.to_string(), self.records.save_user(user).await);
        }

        let mut assessments = BatchReport::default();
        let mut max_imported = 0;
        for assessment in &bundle.assessments {
            let outcome = self.records.save_assessment(assessment).await;
            if outcome.is_ok() {
                if let Some(n) = assessment.msh_id.and_then(|id| id.sequence()) {
                    max_imported = max_imported.max(n);
                }
            }
            assessments.record(assessment.id.to_string(), outcome);
        }

        let needs_sync = max_imported > self.counter.current().await?;
        if needs_sync {
            warn!(
                "Imported MSH{} exceeds counter {}; run sync-counter",
                max_imported,
                self.counter.name()
            );
        }
        Ok(ImportReport {
            users,
            assessments,
            needs_sync,
        })
    }

    pub async fn sync_counter(&self) -> Result<SyncOutcome> {
        self.actor.require(Capability::AdminPanel)?;
        self.counter.sync().await
    }

    pub async fn reset_counter(&self) -> Result<()> {
        self.actor.require(Capability::AdminPanel)?;
        self.counter.reset().await
    }

    pub async fn publish(&self, subject: &UserId, cycle: Cycle) -> Result<MshResult> {
        self.actor.require(Capability::PublishResults)?;
        publish_result(&self.records, subject, cycle).await
    }

    /// Change a user's layer and capability set
    pub async fn update_user_role(
        &self,
        user_id: &UserId,
        layer: OrgLayer,
        capabilities: BTreeSet<Capability>,
    ) -> Result<User> {
        self.actor.require(Capability::ManageUsers)?;
        let mut user = self
            .records
            .user(user_id)
            .await?
            .ok_or_else(|| MshError::NotFound(format!("user {}", user_id)))?;
        user.layer = layer;
        user.capabilities = capabilities;
        self.records.save_user(&user).await?;
        info!("{} updated role of {} to {:?}", self.actor.id, user_id, layer);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;
    use crate::storage::test_utils::{user, AssessmentBuilder};
    use crate::storage::{Document, Filter, MockDocumentStore};
    use async_trait::async_trait;
    use serde_json::json;

    /// Memory store whose delete of one id panics
    struct PanickingDelete {
        inner: MemoryStore,
        poison: &'static str,
    }

    #[async_trait]
    impl DocumentStore for PanickingDelete {
        async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
            self.inner.get(collection, id).await
        }

        async fn list(&self, collection: &str) -> Result<Vec<Document>> {
            self.inner.list(collection).await
        }

        async fn set(&self, collection: &str, document: &Document) -> Result<()> {
            self.inner.set(collection, document).await
        }

        async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
            if id == self.poison {
                panic!("storage driver crashed deleting {}", id);
            }
            self.inner.delete(collection, id).await
        }

        async fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
            self.inner.query(collection, filter).await
        }

        async fn get_counter(&self, name: &str) -> Result<Option<u64>> {
            self.inner.get_counter(name).await
        }

        async fn set_counter(&self, name: &str, value: u64) -> Result<()> {
            self.inner.set_counter(name, value).await
        }

        async fn increment_counter(&self, name: &str) -> Result<u64> {
            self.inner.increment_counter(name).await
        }
    }

    fn admin() -> CurrentUser {
        CurrentUser::new("ops", "Ops", Capability::ALL)
    }

    fn service(store: Arc<dyn DocumentStore>, actor: CurrentUser) -> AdminService {
        AdminService::new(
            Records::new(Arc::clone(&store)),
            CounterAllocator::new(store),
            actor,
        )
    }

    #[tokio::test]
    async fn test_bulk_delete_reports_missing_items() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        store
            .set(ASSESSMENTS, &Document::new("a", json!({})))
            .await
            .unwrap();

        let report = bulk_delete(
            Arc::clone(&store),
            ASSESSMENTS,
            vec!["a".to_string(), "ghost".to_string()],
        )
        .await;
        assert_eq!(report.succeeded, vec!["a".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].id, "ghost");
        assert_eq!(report.attempted(), 2);
    }

    #[tokio::test]
    async fn test_bulk_delete_names_the_item_whose_task_panicked() {
        let inner = MemoryStore::new();
        for id in ["a", "boom", "c"] {
            inner
                .set(ASSESSMENTS, &Document::new(id, json!({})))
                .await
                .unwrap();
        }
        let store: Arc<dyn DocumentStore> = Arc::new(PanickingDelete { inner, poison: "boom" });

        let report = bulk_delete(
            Arc::clone(&store),
            ASSESSMENTS,
            vec!["a".to_string(), "boom".to_string(), "c".to_string()],
        )
        .await;
        assert_eq!(report.succeeded, vec!["a".to_string(), "c".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].id, "boom");
        assert!(report.failed[0].error.contains("panic"));
        assert!(store.get(ASSESSMENTS, "boom").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_wipe_resets_counter_only_on_full_success() {
        let mut mock = MockDocumentStore::new();
        mock.expect_list().returning(|_| {
            Ok(vec![
                Document::new("a", json!({})),
                Document::new("b", json!({})),
            ])
        });
        mock.expect_delete().returning(|_, id| {
            if id == "b" {
                Err(MshError::Database("unavailable".to_string()))
            } else {
                Ok(true)
            }
        });
        mock.expect_set_counter().never();

        let report = service(Arc::new(mock), admin()).wipe_assessments().await.unwrap();
        assert!(!report.counter_reset);
        assert_eq!(report.deletes.succeeded, vec!["a".to_string()]);
        assert_eq!(report.deletes.failed[0].id, "b");
    }

    #[tokio::test]
    async fn test_wipe_then_allocate_starts_at_one() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let admin = service(Arc::clone(&store), admin());
        let allocator = CounterAllocator::new(Arc::clone(&store));
        let records = Records::new(Arc::clone(&store));
        for n in 1..=3 {
            let id = allocator.allocate_next_id().await.id;
            let mut assessment = AssessmentBuilder::self_assessment("u", "2025-03").build();
            assessment.msh_id = Some(id);
            assert_eq!(id.sequence(), Some(n));
            records.save_assessment(&assessment).await.unwrap();
        }

        let report = admin.wipe_assessments().await.unwrap();
        assert!(report.counter_reset);
        assert_eq!(report.deletes.succeeded.len(), 3);
        assert_eq!(allocator.allocate_next_id().await.id.sequence(), Some(1));
    }

    #[tokio::test]
    async fn test_operations_require_capabilities() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let viewer = CurrentUser::new("viewer", "Viewer", [Capability::ViewAllAssessments]);
        let service = service(store, viewer);

        assert!(matches!(
            service.wipe_assessments().await,
            Err(MshError::PermissionDenied(_))
        ));
        assert!(matches!(
            service.sync_counter().await,
            Err(MshError::PermissionDenied(_))
        ));
        assert!(matches!(
            service
                .update_user_role(&UserId::from("x"), OrgLayer::Executive, BTreeSet::new())
                .await,
            Err(MshError::PermissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_import_flags_counter_drift() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let service = service(Arc::clone(&store), admin());

        let mut broken = AssessmentBuilder::self_assessment("u2", "2025-03").build();
        broken.composite = 99;
        let bundle = ImportBundle {
            users: vec![user("u1", None), user("u2", Some("u1"))],
            assessments: vec![
                AssessmentBuilder::self_assessment("u1", "2025-03").msh(7).build(),
                broken,
            ],
        };

        let report = service.import(bundle).await.unwrap();
        assert_eq!(report.users.succeeded.len(), 2);
        assert_eq!(report.assessments.succeeded.len(), 1);
        assert_eq!(report.assessments.failed.len(), 1);
        assert!(report.needs_sync);

        let outcome = service.sync_counter().await.unwrap();
        assert_eq!(outcome.current, 7);
    }

    #[tokio::test]
    async fn test_import_reports_invalid_users_as_failed() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let service = service(Arc::clone(&store), admin());

        let mut nameless = user("u2", Some("u1"));
        nameless.display_name = String::new();
        let bundle = ImportBundle {
            users: vec![user("u1", None), nameless],
            assessments: Vec::new(),
        };

        let report = service.import(bundle).await.unwrap();
        assert_eq!(report.users.succeeded, vec!["u1".to_string()]);
        assert_eq!(report.users.failed.len(), 1);
        assert_eq!(report.users.failed[0].id, "u2");
        assert!(report.users.failed[0].error.contains("display name"));

        let loaded = Records::new(store).users().await.unwrap();
        assert_eq!(loaded.records.len(), 1);
        assert!(loaded.rejected.is_empty());
    }

    #[tokio::test]
    async fn test_update_user_role() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let service = service(Arc::clone(&store), admin());
        Records::new(store).save_user(&user("lead", None)).await.unwrap();

        let caps: BTreeSet<Capability> = [Capability::PublishResults].into_iter().collect();
        let updated = service
            .update_user_role(&UserId::from("lead"), OrgLayer::Supervisor, caps.clone())
            .await
            .unwrap();
        assert_eq!(updated.layer, OrgLayer::Supervisor);
        assert_eq!(updated.capabilities, caps);

        assert!(matches!(
            service
                .update_user_role(&UserId::from("nobody"), OrgLayer::Supervisor, caps)
                .await,
            Err(MshError::NotFound(_))
        ));
    }
}
