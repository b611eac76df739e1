//! Statistics and gap auditing against real stores

mod common;

use msh3_core::storage::test_utils::AssessmentBuilder;
use msh3_core::{
    compute_stats, compute_stats_with, AssessmentStatus, CounterAllocator, DocumentStore,
};

#[tokio::test]
async fn test_gap_between_issued_ids() {
    let (_dir, store) = common::create_test_libsql().await;
    common::seed_msh_ids(store.as_ref(), &[1, 2, 4, 5]).await;

    let stats = compute_stats(store.as_ref(), "msh").await.unwrap();
    assert_eq!(stats.max_sequence, 5);
    assert_eq!(stats.gaps, vec![3]);
    // Bare seed documents are not valid assessments
    assert_eq!(stats.rejected, 4);
}

#[tokio::test]
async fn test_contiguous_ids_have_no_gaps() {
    let store = common::create_memory_store();
    common::seed_msh_ids(store.as_ref(), &[1, 2, 3, 4, 5, 6]).await;

    let stats = compute_stats(store.as_ref(), "msh").await.unwrap();
    assert_eq!(stats.max_sequence, 6);
    assert!(stats.gaps.is_empty());
}

#[tokio::test]
async fn test_counts_and_drift_for_allocated_assessments() {
    let store = common::create_memory_store();
    let records = common::records(&store);
    let allocator = CounterAllocator::new(store.clone());

    let statuses = [
        AssessmentStatus::Draft,
        AssessmentStatus::Pending,
        AssessmentStatus::Completed,
        AssessmentStatus::Aligned,
        AssessmentStatus::NotAligned,
    ];
    for (i, status) in statuses.into_iter().enumerate() {
        let mut assessment = AssessmentBuilder::self_assessment(&format!("u{}", i), "2025-03")
            .status(status)
            .build();
        assessment.msh_id = Some(allocator.allocate_next_id().await.id);
        records.save_assessment(&assessment).await.unwrap();
    }

    let stats = compute_stats(store.as_ref(), "msh").await.unwrap();
    assert_eq!(stats.total, 5);
    assert_eq!(stats.by_status.draft, 1);
    assert_eq!(stats.by_status.pending, 1);
    assert_eq!(stats.by_status.completed, 3);
    assert_eq!(stats.by_status.total(), 5);
    assert_eq!(stats.max_sequence, 5);
    assert_eq!(stats.counter_value, 5);
    assert_eq!(stats.drift(), 0);

    // A deleted record leaves a gap but no drift
    let victim = records.assessments().await.unwrap().records.into_iter().find(|a| {
        a.msh_id.and_then(|id| id.sequence()) == Some(2)
    });
    records.delete_assessment(&victim.unwrap().id).await.unwrap();
    let stats = compute_stats(store.as_ref(), "msh").await.unwrap();
    assert_eq!(stats.gaps, vec![2]);
    assert_eq!(stats.drift(), 0);
}

#[tokio::test]
async fn test_drift_detected_after_direct_import() {
    let store = common::create_memory_store();
    common::seed_msh_ids(store.as_ref(), &[1, 2, 9]).await;
    store.set_counter("msh", 2).await.unwrap();

    let stats = compute_stats(store.as_ref(), "msh").await.unwrap();
    assert_eq!(stats.drift(), -7);
    assert!(stats.needs_sync());

    CounterAllocator::new(store.clone()).sync().await.unwrap();
    let stats = compute_stats(store.as_ref(), "msh").await.unwrap();
    assert_eq!(stats.drift(), 0);
    assert_eq!(stats.gaps, (3..=8).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_timestamp_shaped_id_is_an_outlier_not_a_gap_range() {
    let (_dir, store) = common::create_test_libsql().await;
    common::seed_msh_ids(store.as_ref(), &[1, 2, 4, 202_503_011_234]).await;

    let stats = compute_stats(store.as_ref(), "msh").await.unwrap();
    assert_eq!(stats.gaps, vec![3]);
    assert_eq!(stats.outliers, vec![202_503_011_234]);
    assert_eq!(stats.max_sequence, 202_503_011_234);

    let narrow = compute_stats_with(store.as_ref(), "msh", 1).await.unwrap();
    assert!(narrow.gaps.is_empty());
    assert_eq!(narrow.outliers, vec![4, 202_503_011_234]);
}

#[tokio::test]
async fn test_reused_sequence_is_reported_as_duplicate() {
    let store = common::create_memory_store();
    common::seed_msh_ids(store.as_ref(), &[1, 2, 3]).await;
    store
        .set(
            msh3_core::storage::records::ASSESSMENTS,
            &msh3_core::Document::new("copy-of-2", serde_json::json!({ "msh_id": "MSH2" })),
        )
        .await
        .unwrap();

    let stats = compute_stats(store.as_ref(), "msh").await.unwrap();
    assert_eq!(stats.duplicates, vec![2]);
    assert!(stats.gaps.is_empty());
}

#[tokio::test]
async fn test_unrepresentable_ids_are_malformed() {
    let store = common::create_memory_store();
    common::seed_msh_ids(store.as_ref(), &[1, u64::MAX]).await;

    let stats = compute_stats(store.as_ref(), "msh").await.unwrap();
    assert_eq!(stats.max_sequence, 1);
    assert_eq!(stats.malformed, vec![format!("seed-{}", u64::MAX)]);
}
