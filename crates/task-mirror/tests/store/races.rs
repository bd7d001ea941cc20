//! Interleavings of subscription deliveries and in-flight mutations.
//!
//! Deliveries fully replace the cache and do not merge around unconfirmed
//! optimistic values: whichever write lands last wins. Both directions of
//! that race are pinned down here, along with field-level independence of
//! concurrent mutations on one task.

use std::sync::Arc;

use serde_json::json;

use task_mirror::error::RemoteWriteError;
use task_mirror::store::TaskStore;

use super::common::{run_pending, seed, snapshot, MockRemote, GROUP};

fn one_task() -> Vec<task_mirror::types::TaskSnapshot> {
    vec![snapshot(
        "1",
        json!({
            "name": "Plan sprint",
            "status": "To Do",
            "groupCode": GROUP,
        }),
    )]
}

#[tokio::test]
async fn delivery_mid_flight_overwrites_optimistic_value() {
    let remote = Arc::new(MockRemote::new());
    let store = Arc::new(TaskStore::with_remote(remote.clone()));
    let _handle = seed(&store, &remote, one_task());

    remote.hold_writes();
    let call = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.set_status("1", "In Progress").await })
    };
    run_pending().await;
    assert_eq!(store.cache().get("1").unwrap().status, "In Progress");

    // An authoritative delivery lands while the write is unresolved.
    remote.deliver(
        GROUP,
        vec![snapshot("1", json!({ "status": "Done", "groupCode": GROUP }))],
    );
    assert_eq!(store.cache().get("1").unwrap().status, "Done");

    // Remote success performs no further local write: the delivery was the
    // last writer and its value stands.
    remote.release_next_write(Ok(()));
    call.await.unwrap();
    assert_eq!(store.cache().get("1").unwrap().status, "Done");
}

#[tokio::test]
async fn rollback_after_delivery_is_the_last_writer() {
    let remote = Arc::new(MockRemote::new());
    let store = Arc::new(TaskStore::with_remote(remote.clone()));
    let _handle = seed(&store, &remote, one_task());

    remote.hold_writes();
    let call = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.set_status("1", "In Progress").await })
    };
    run_pending().await;

    remote.deliver(
        GROUP,
        vec![snapshot("1", json!({ "status": "Done", "groupCode": GROUP }))],
    );

    // The failed write's rollback restores the pre-call snapshot, clobbering
    // the delivered value — last writer wins.
    remote.release_next_write(Err(RemoteWriteError::new("1", "offline")));
    call.await.unwrap();
    assert_eq!(store.cache().get("1").unwrap().status, "To Do");
}

#[tokio::test]
async fn rollback_after_removal_by_delivery_is_a_noop() {
    let remote = Arc::new(MockRemote::new());
    let store = Arc::new(TaskStore::with_remote(remote.clone()));
    let _handle = seed(&store, &remote, one_task());

    remote.hold_writes();
    let call = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.set_status("1", "In Progress").await })
    };
    run_pending().await;

    // The task disappears from the authoritative set mid-flight.
    remote.deliver(GROUP, vec![]);

    remote.release_next_write(Err(RemoteWriteError::new("1", "offline")));
    call.await.unwrap();
    assert!(store.cache().is_empty(), "rollback must not resurrect the task");
}

#[tokio::test]
async fn concurrent_mutations_on_disjoint_fields_stay_independent() {
    let remote = Arc::new(MockRemote::new());
    let store = Arc::new(TaskStore::with_remote(remote.clone()));
    let _handle = seed(&store, &remote, one_task());

    remote.hold_writes();
    let status_call = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.set_status("1", "In Progress").await })
    };
    run_pending().await;
    let name_call = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.set_name("1", "Plan release").await })
    };
    run_pending().await;

    let task = store.cache().get("1").unwrap();
    assert_eq!(task.status, "In Progress");
    assert_eq!(task.name, "Plan release");

    // Status write fails and rolls back; the name write succeeds. Each
    // operation patches only its own field, so the status rollback must not
    // undo the concurrent name change.
    remote.release_next_write(Err(RemoteWriteError::new("1", "offline")));
    status_call.await.unwrap();
    remote.release_next_write(Ok(()));
    name_call.await.unwrap();

    let task = store.cache().get("1").unwrap();
    assert_eq!(task.status, "To Do");
    assert_eq!(task.name, "Plan release");
}
