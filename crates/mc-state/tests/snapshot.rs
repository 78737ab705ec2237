//! Snapshot round-trip over a committed state.
//!
//! Exercises the full path: write through a fresh state, commit to the
//! backing store, reload at the committed root, record a timed
//! snapshot, and read the original value back out of it.

use mc_state::{BlockInfo, MemoryDb, SnapshotManager, StateDb};
use primitive_types::H256;
use shared_types::Name;
use std::sync::Arc;

#[test]
fn snapshot_round_trip() {
    let db = Arc::new(MemoryDb::new());
    let prev_hash = H256::zero();
    let mut state1 = StateDb::open(Arc::clone(&db), prev_hash).unwrap();

    let addr = Name::new("snapshot01");
    let key = "aaaaaa";
    let value = b"1".to_vec();
    state1.put(&addr, key, value.clone());

    let root = state1.commit(prev_hash, 0).expect("commit state");

    let state2 = StateDb::open(Arc::clone(&db), root).expect("reload at root");
    let manager = SnapshotManager::new(&state2);
    manager
        .set_snapshot(
            100_000_000,
            BlockInfo {
                number: 0,
                block_hash: prev_hash,
                timestamp: 0,
            },
        )
        .expect("set snapshot");

    let timestamp = manager.get_last_snapshot_time().expect("last snapshot time");
    assert_eq!(timestamp, 100_000_000);

    manager
        .get_prev_snapshot_time(100_000_000)
        .expect("prev snapshot time");

    let (_, current_root) = manager
        .get_current_snapshot_hash()
        .expect("current snapshot hash");
    assert_eq!(current_root, root);

    let msg = manager
        .get_snapshot_msg(&addr, key, 100_000_000)
        .expect("snapshot msg");
    assert_eq!(msg, value);

    manager
        .get_snapshot_state(100_000_000)
        .expect("snapshot state");
}
