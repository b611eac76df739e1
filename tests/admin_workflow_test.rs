//! End-to-end administrative workflow on a libSQL store

mod common;

use msh3_core::storage::test_utils::{cycle, user, AssessmentBuilder};
use msh3_core::{
    compute_stats, AdminService, AssessorRole, Capability, CounterAllocator, CurrentUser,
    DocumentStore, ImportBundle, MshError, Records, UserId,
};
use std::sync::Arc;

const CYCLE: &str = "2025-03";

fn bundle() -> ImportBundle {
    ImportBundle {
        users: vec![user("mr", None), user("dr", Some("mr"))],
        assessments: vec![
            AssessmentBuilder::self_assessment("dr", CYCLE)
                .msh(1)
                .scores([(2, 2), (2, 1), (2, 2)])
                .completed()
                .build(),
            AssessmentBuilder::bilateral("dr", "mr", CYCLE)
                .msh(2)
                .scores([(1, 1), (2, 1), (1, 2)])
                .completed()
                .build(),
            AssessmentBuilder::self_assessment("mr", CYCLE).msh(4).build(),
            AssessmentBuilder::rating("mr", "dr", AssessorRole::DirectReport, CYCLE)
                .msh(5)
                .build(),
        ],
    }
}

#[tokio::test]
async fn test_import_audit_sync_publish_wipe() {
    let (_dir, store) = common::create_test_libsql().await;
    let store: Arc<dyn DocumentStore> = store;
    let records = Records::new(Arc::clone(&store));
    let admin = AdminService::new(
        records.clone(),
        CounterAllocator::new(Arc::clone(&store)),
        CurrentUser::new("ops", "Ops", Capability::ALL),
    );

    let imported = admin.import(bundle()).await.unwrap();
    assert!(imported.users.is_complete());
    assert!(imported.assessments.is_complete());
    assert!(imported.needs_sync);

    let stats = compute_stats(store.as_ref(), "msh").await.unwrap();
    assert_eq!(stats.gaps, vec![3]);
    assert_eq!(stats.by_status.completed, 2);
    assert!(stats.needs_sync());

    assert_eq!(admin.sync_counter().await.unwrap().current, 5);

    let result = admin.publish(&UserId::from("dr"), cycle(CYCLE)).await.unwrap();
    assert_eq!(result.rater_counts.manager, 1);
    assert_eq!(result.composite, 8.0);
    let stored = records.result(&UserId::from("dr"), cycle(CYCLE)).await.unwrap();
    assert_eq!(stored, Some(result));

    let wipe = admin.wipe_assessments().await.unwrap();
    assert_eq!(wipe.deletes.succeeded.len(), 4);
    assert!(wipe.counter_reset);

    let stats = compute_stats(store.as_ref(), "msh").await.unwrap();
    assert_eq!(stats.total, 0);
    assert_eq!(stats.counter_value, 0);

    // Users survive a wipe
    assert_eq!(records.users().await.unwrap().records.len(), 2);
}

#[tokio::test]
async fn test_publish_requires_capability() {
    let store = common::create_memory_store();
    let admin = AdminService::new(
        common::records(&store),
        CounterAllocator::new(Arc::clone(&store)),
        CurrentUser::new("mgr", "Manager", [Capability::AdminPanel]),
    );
    admin.import(bundle()).await.unwrap();

    let err = admin
        .publish(&UserId::from("dr"), cycle(CYCLE))
        .await
        .unwrap_err();
    assert!(matches!(err, MshError::PermissionDenied(_)));
}
