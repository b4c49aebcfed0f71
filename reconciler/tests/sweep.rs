//! End-to-end sweeps over a file-backed store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Duration, Utc};
use ledger::{Clock, IdentityUnlockRequest, ManualClock, ReputationRecord};
use reconciler::{
    EntityStore, EscalationWorker, GovernanceState, JsonFileStore, RtiRequest, RtiStatus,
    WorkerConfig,
};

struct TempDir(PathBuf);

impl TempDir {
    fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("reconciler-it-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }

    fn file(&self) -> PathBuf {
        self.0.join("state.json")
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

async fn seed(path: &Path, filed: chrono::DateTime<Utc>) {
    let store = JsonFileStore::open(path).await.unwrap();
    for (id, days) in [("rti-a", 20), ("rti-b", 30), ("rti-c", 10)] {
        let request = RtiRequest::new(id, filed, filed + Duration::days(days)).unwrap();
        store.save_rti_request(&request).await.unwrap();
    }
    store
        .save_reputation(&ReputationRecord::new("citizen-1"))
        .await
        .unwrap();
}

#[tokio::test]
async fn sweep_results_survive_restart() {
    let dir = TempDir::new();
    let filed = Utc::now();
    seed(&dir.file(), filed).await;

    let clock = Arc::new(ManualClock::new(filed));
    clock.advance(Duration::days(17));

    {
        let store = Arc::new(JsonFileStore::open(dir.file()).await.unwrap());
        let state = Arc::new(GovernanceState::bootstrap(store, clock.clone()).await.unwrap());
        let worker = EscalationWorker::new(state, WorkerConfig::default());

        let report = worker.sweep().await.unwrap();
        assert_eq!(report.examined, 3);
        // rti-a: 17/20 elapsed; rti-c: past its deadline; rti-b: 17/30
        assert_eq!(report.escalated, 1);
        assert_eq!(report.violations, 1);
        assert_eq!(report.users_decayed, 1);
    }

    let store = Arc::new(JsonFileStore::open(dir.file()).await.unwrap());
    assert_eq!(
        store.load_rti_request("rti-a").await.unwrap().status,
        RtiStatus::Escalated
    );
    assert_eq!(
        store.load_rti_request("rti-b").await.unwrap().status,
        RtiStatus::Submitted
    );
    assert_eq!(
        store.load_rti_request("rti-c").await.unwrap().status,
        RtiStatus::Violation
    );

    let state = GovernanceState::bootstrap(store, clock.clone()).await.unwrap();
    assert_eq!(state.chain().len().await, 2);
    assert!(state.chain().verify().await.is_ok());
    assert_eq!(state.reputation().score("citizen-1"), 49.5);
}

#[tokio::test]
async fn tampered_store_refuses_to_bootstrap() {
    let dir = TempDir::new();
    let filed = Utc::now();
    seed(&dir.file(), filed).await;

    let clock = Arc::new(ManualClock::new(filed + Duration::days(40)));
    {
        let store = Arc::new(JsonFileStore::open(dir.file()).await.unwrap());
        let state = Arc::new(GovernanceState::bootstrap(store, clock.clone()).await.unwrap());
        EscalationWorker::new(state, WorkerConfig::default())
            .sweep()
            .await
            .unwrap();
    }

    // Rewrite one recorded transition by hand
    let raw = std::fs::read_to_string(dir.file()).unwrap();
    let mut snapshot: serde_json::Value = serde_json::from_str(&raw).unwrap();
    snapshot["audit_entries"][0]["target_id"] = serde_json::json!("rti-z");
    std::fs::write(dir.file(), serde_json::to_vec(&snapshot).unwrap()).unwrap();

    let store = Arc::new(JsonFileStore::open(dir.file()).await.unwrap());
    let err = GovernanceState::bootstrap(store, clock.clone())
        .await
        .err()
        .unwrap();
    assert!(err.is_fatal());
}

#[tokio::test]
async fn later_sweeps_only_record_new_changes() {
    let dir = TempDir::new();
    let filed = Utc::now();
    seed(&dir.file(), filed).await;

    let clock = Arc::new(ManualClock::new(filed));
    let store = Arc::new(JsonFileStore::open(dir.file()).await.unwrap());
    let state = Arc::new(GovernanceState::bootstrap(store, clock.clone()).await.unwrap());
    let worker = EscalationWorker::new(Arc::clone(&state), WorkerConfig::default());

    let mut total_changes = 0;
    for _ in 0..35 {
        clock.advance(Duration::days(1));
        total_changes += worker.sweep().await.unwrap().changed();
    }

    // Each request escalates once and then violates once
    assert_eq!(total_changes, 6);
    assert_eq!(state.chain().len().await, 6);
    assert!(clock.now() > filed + Duration::days(30));
}

#[tokio::test]
async fn sealed_identity_unlocks_after_restart() {
    let dir = TempDir::new();
    let clock = Arc::new(ManualClock::new(Utc::now()));

    let parts = {
        let store = Arc::new(JsonFileStore::open(dir.file()).await.unwrap());
        let state = GovernanceState::bootstrap(store, clock.clone()).await.unwrap();
        state.seal_identity("report-1", "Jane Citizen").await.unwrap()
    };

    let raw = std::fs::read_to_string(dir.file()).unwrap();
    assert!(!raw.contains("Jane Citizen"));

    let store = Arc::new(JsonFileStore::open(dir.file()).await.unwrap());
    let state = GovernanceState::bootstrap(store, clock.clone()).await.unwrap();
    let request = IdentityUnlockRequest {
        target_id: "report-1".to_string(),
        key_part1: parts[0].clone(),
        key_part2: parts[1].clone(),
        court_order_hash: "order-77".to_string(),
    };
    let outcome = state
        .reconstruct_identity("judge-1", "judiciary", &request)
        .await
        .unwrap();
    assert!(outcome.is_revealed());
    assert_eq!(state.chain().len().await, 1);
}
