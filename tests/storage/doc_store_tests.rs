//! DocStore interface tests.
//!
//! These tests verify the contract of the DocStore trait: the optimistic
//! commit protocol, synthetic empty snapshots, and half-open operation
//! ranges. Each storage implementation should run them.

use serde_json::{json, Value};

use foliodb::{CommitOutcome, DocStore, Snapshot, StorageError};

/// Create a test operation payload.
pub fn make_op(n: u64) -> Value {
    json!({ "p": ["x"], "oi": n })
}

/// Create a proposed snapshot for version `version` whose state reflects
/// operation `n`.
pub fn make_snapshot(id: &str, version: u64, n: u64) -> Snapshot {
    Snapshot::new(
        id,
        version,
        Some("json0".to_string()),
        Some(json!({ "x": n })),
    )
}

/// Drive a document from empty through `count` successful commits.
pub async fn commit_n<S: DocStore>(store: &S, collection: &str, id: &str, count: u64) {
    for v in 1..=count {
        let outcome = store
            .commit(collection, id, &make_op(v), &make_snapshot(id, v, v))
            .await
            .expect("commit should succeed");
        assert_eq!(outcome, CommitOutcome::Committed, "version {} should commit", v);
    }
}

// =============================================================================
// commit tests
// =============================================================================

pub async fn test_commit_first_version<S: DocStore>(store: &S) {
    let collection = "test_commit_first";
    let id = "a";

    let outcome = store
        .commit(collection, id, &make_op(1), &make_snapshot(id, 1, 1))
        .await
        .expect("commit should succeed");
    assert_eq!(outcome, CommitOutcome::Committed);

    let snapshot = store
        .get_snapshot(collection, id)
        .await
        .expect("get_snapshot should succeed");
    assert_eq!(snapshot.version, 1);
    assert_eq!(snapshot.doc_type.as_deref(), Some("json0"));
    assert_eq!(snapshot.data, Some(json!({ "x": 1 })));
}

pub async fn test_commit_stale_version_conflicts<S: DocStore>(store: &S) {
    let collection = "test_commit_stale";
    let id = "a";

    commit_n(store, collection, id, 1).await;

    // Same proposed version again: another writer (us) already advanced it.
    let outcome = store
        .commit(collection, id, &make_op(9), &make_snapshot(id, 1, 9))
        .await
        .expect("stale commit should not error");
    assert_eq!(outcome, CommitOutcome::Conflict);

    // Nothing persisted by the conflicting attempt.
    let snapshot = store.get_snapshot(collection, id).await.expect("get_snapshot");
    assert_eq!(snapshot.version, 1);
    assert_eq!(snapshot.data, Some(json!({ "x": 1 })));
    let ops = store.get_ops(collection, id, 0, None).await.expect("get_ops");
    assert_eq!(ops.len(), 1);
}

pub async fn test_commit_version_gap_conflicts<S: DocStore>(store: &S) {
    let collection = "test_commit_gap";
    let id = "a";

    // Empty document expects version 1; proposing 3 is a conflict, not an
    // error.
    let outcome = store
        .commit(collection, id, &make_op(3), &make_snapshot(id, 3, 3))
        .await
        .expect("gap commit should not error");
    assert_eq!(outcome, CommitOutcome::Conflict);

    let snapshot = store.get_snapshot(collection, id).await.expect("get_snapshot");
    assert_eq!(snapshot.version, 0, "no snapshot row should exist");
}

pub async fn test_commit_sequence<S: DocStore>(store: &S) {
    let collection = "test_commit_sequence";
    let id = "a";

    let first = store
        .commit(collection, id, &json!({ "x": 1 }), &make_snapshot(id, 1, 1))
        .await
        .expect("first commit");
    assert_eq!(first, CommitOutcome::Committed);

    let stale = store
        .commit(collection, id, &json!({ "x": 1 }), &make_snapshot(id, 1, 1))
        .await
        .expect("stale commit");
    assert_eq!(stale, CommitOutcome::Conflict, "expected next version is 2");

    let second = store
        .commit(collection, id, &json!({ "x": 2 }), &make_snapshot(id, 2, 2))
        .await
        .expect("second commit");
    assert_eq!(second, CommitOutcome::Committed);

    let ops = store.get_ops(collection, id, 0, None).await.expect("get_ops");
    assert_eq!(ops, vec![json!({ "x": 1 }), json!({ "x": 2 })]);
}

pub async fn test_commit_rejects_version_zero<S: DocStore>(store: &S) {
    let collection = "test_commit_zero";
    let id = "a";

    let result = store
        .commit(collection, id, &make_op(0), &make_snapshot(id, 0, 0))
        .await;
    assert!(
        matches!(result, Err(StorageError::InvalidVersion { version: 0 })),
        "version 0 is a programmer error"
    );
}

pub async fn test_commit_rejects_empty_identifiers<S: DocStore>(store: &S) {
    let result = store
        .commit("", "a", &make_op(1), &make_snapshot("a", 1, 1))
        .await;
    assert!(matches!(
        result,
        Err(StorageError::InvalidIdentifier { what: "collection" })
    ));

    let result = store
        .commit("test_commit_empty_id", "", &make_op(1), &make_snapshot("", 1, 1))
        .await;
    assert!(matches!(
        result,
        Err(StorageError::InvalidIdentifier { what: "id" })
    ));
}

pub async fn test_concurrent_single_writer_wins<S: DocStore>(store: &S) {
    let collection = "test_single_writer";
    let id = "a";

    // Two racing commits proposing the same version: exactly one wins, the
    // other observes the advanced document.
    let (op_left, snap_left) = (make_op(1), make_snapshot(id, 1, 1));
    let (op_right, snap_right) = (make_op(2), make_snapshot(id, 1, 2));
    let (left, right) = tokio::join!(
        store.commit(collection, id, &op_left, &snap_left),
        store.commit(collection, id, &op_right, &snap_right),
    );
    let left = left.expect("left commit should not error");
    let right = right.expect("right commit should not error");

    let committed = [left, right]
        .iter()
        .filter(|o| **o == CommitOutcome::Committed)
        .count();
    assert_eq!(committed, 1, "exactly one writer should win");

    let snapshot = store.get_snapshot(collection, id).await.expect("get_snapshot");
    assert_eq!(snapshot.version, 1);
}

// =============================================================================
// get_snapshot tests
// =============================================================================

pub async fn test_empty_document_snapshot<S: DocStore>(store: &S) {
    let snapshot = store
        .get_snapshot("test_empty_doc", "never-written")
        .await
        .expect("empty document read should not error");
    assert_eq!(snapshot.id, "never-written");
    assert_eq!(snapshot.version, 0);
    assert_eq!(snapshot.doc_type, None);
    assert_eq!(snapshot.data, None);
    assert_eq!(snapshot.metadata, None);
}

pub async fn test_round_trip<S: DocStore>(store: &S) {
    let collection = "test_round_trip";
    let id = "a";

    // Quoting and unicode exercise the statement encoding.
    let op = json!({
        "p": ["note"],
        "oi": "it's \"quoted\" — caffè ☕",
        "list": [1, 2.5, null, true],
        "nested": { "empty": {} }
    });
    let snapshot = Snapshot::new(
        id,
        1,
        Some("json0".to_string()),
        Some(json!({ "note": "it's \"quoted\" — caffè ☕" })),
    );

    let outcome = store
        .commit(collection, id, &op, &snapshot)
        .await
        .expect("commit");
    assert_eq!(outcome, CommitOutcome::Committed);

    let read = store.get_snapshot(collection, id).await.expect("get_snapshot");
    assert_eq!(read.data, snapshot.data);

    let ops = store.get_ops(collection, id, 0, None).await.expect("get_ops");
    assert_eq!(ops, vec![op]);
}

pub async fn test_deleted_document_snapshot<S: DocStore>(store: &S) {
    let collection = "test_deleted_doc";
    let id = "a";

    commit_n(store, collection, id, 1).await;

    // A delete commit carries no type and no data.
    let outcome = store
        .commit(
            collection,
            id,
            &json!({ "od": { "x": 1 } }),
            &Snapshot::new(id, 2, None, None),
        )
        .await
        .expect("delete commit");
    assert_eq!(outcome, CommitOutcome::Committed);

    let snapshot = store.get_snapshot(collection, id).await.expect("get_snapshot");
    assert_eq!(snapshot.version, 2);
    assert_eq!(snapshot.doc_type, None);
    assert_eq!(snapshot.data, None);
}

// =============================================================================
// get_ops tests
// =============================================================================

pub async fn test_get_ops_half_open<S: DocStore>(store: &S) {
    let collection = "test_ops_half_open";
    let id = "a";

    commit_n(store, collection, id, 5).await;

    // [0, 3): the operations applied at versions 0, 1, 2.
    let ops = store
        .get_ops(collection, id, 0, Some(3))
        .await
        .expect("get_ops");
    assert_eq!(ops, vec![make_op(1), make_op(2), make_op(3)]);

    // [2, ∞): everything from version 2 onward.
    let ops = store.get_ops(collection, id, 2, None).await.expect("get_ops");
    assert_eq!(ops, vec![make_op(3), make_op(4), make_op(5)]);

    // Degenerate range is empty, not an error.
    let ops = store
        .get_ops(collection, id, 1, Some(1))
        .await
        .expect("get_ops");
    assert!(ops.is_empty());
}

pub async fn test_get_ops_empty_document<S: DocStore>(store: &S) {
    let ops = store
        .get_ops("test_ops_empty", "never-written", 0, None)
        .await
        .expect("get_ops on empty document should not error");
    assert!(ops.is_empty());
}

pub async fn test_get_ops_ordered<S: DocStore>(store: &S) {
    let collection = "test_ops_ordered";
    let id = "a";

    commit_n(store, collection, id, 8).await;

    let ops = store.get_ops(collection, id, 0, None).await.expect("get_ops");
    let expected: Vec<_> = (1..=8).map(make_op).collect();
    assert_eq!(ops, expected);
}

pub async fn test_get_ops_to_snapshot<S: DocStore>(store: &S) {
    let collection = "test_ops_to_snapshot";
    let id = "a";

    commit_n(store, collection, id, 5).await;

    let snapshot = store.get_snapshot(collection, id).await.expect("get_snapshot");
    assert_eq!(snapshot.version, 5);

    let ops = store
        .get_ops_to_snapshot(collection, id, 2, &snapshot)
        .await
        .expect("get_ops_to_snapshot");
    assert_eq!(ops, vec![make_op(3), make_op(4), make_op(5)]);

    let equivalent = store
        .get_ops(collection, id, 2, Some(snapshot.version))
        .await
        .expect("get_ops");
    assert_eq!(ops, equivalent);
}

// =============================================================================
// version invariant tests
// =============================================================================

pub async fn test_version_contiguity<S: DocStore>(store: &S) {
    let collection = "test_contiguity";
    let id = "a";

    commit_n(store, collection, id, 6).await;

    let snapshot = store.get_snapshot(collection, id).await.expect("get_snapshot");
    let ops = store.get_ops(collection, id, 0, None).await.expect("get_ops");
    assert_eq!(
        snapshot.version,
        ops.len() as u64,
        "snapshot version equals applied operation count"
    );
}

pub async fn test_documents_are_isolated<S: DocStore>(store: &S) {
    let collection = "test_isolation";

    commit_n(store, collection, "a", 3).await;
    commit_n(store, collection, "b", 1).await;

    let a = store.get_snapshot(collection, "a").await.expect("get_snapshot");
    let b = store.get_snapshot(collection, "b").await.expect("get_snapshot");
    assert_eq!(a.version, 3);
    assert_eq!(b.version, 1);

    let ops_b = store.get_ops(collection, "b", 0, None).await.expect("get_ops");
    assert_eq!(ops_b.len(), 1);
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all DocStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_doc_store_tests {
    ($store:expr) => {
        use $crate::storage::doc_store_tests::*;

        // commit tests
        test_commit_first_version($store).await;
        println!("  test_commit_first_version: PASSED");

        test_commit_stale_version_conflicts($store).await;
        println!("  test_commit_stale_version_conflicts: PASSED");

        test_commit_version_gap_conflicts($store).await;
        println!("  test_commit_version_gap_conflicts: PASSED");

        test_commit_sequence($store).await;
        println!("  test_commit_sequence: PASSED");

        test_commit_rejects_version_zero($store).await;
        println!("  test_commit_rejects_version_zero: PASSED");

        test_commit_rejects_empty_identifiers($store).await;
        println!("  test_commit_rejects_empty_identifiers: PASSED");

        test_concurrent_single_writer_wins($store).await;
        println!("  test_concurrent_single_writer_wins: PASSED");

        // get_snapshot tests
        test_empty_document_snapshot($store).await;
        println!("  test_empty_document_snapshot: PASSED");

        test_round_trip($store).await;
        println!("  test_round_trip: PASSED");

        test_deleted_document_snapshot($store).await;
        println!("  test_deleted_document_snapshot: PASSED");

        // get_ops tests
        test_get_ops_half_open($store).await;
        println!("  test_get_ops_half_open: PASSED");

        test_get_ops_empty_document($store).await;
        println!("  test_get_ops_empty_document: PASSED");

        test_get_ops_ordered($store).await;
        println!("  test_get_ops_ordered: PASSED");

        test_get_ops_to_snapshot($store).await;
        println!("  test_get_ops_to_snapshot: PASSED");

        // version invariant tests
        test_version_contiguity($store).await;
        println!("  test_version_contiguity: PASSED");

        test_documents_are_isolated($store).await;
        println!("  test_documents_are_isolated: PASSED");
    };
}
