//! Persistence interface for governance entities.
//!
//! The engine only ever loads and saves whole entities by id; audit entries
//! are append-only. [`MemoryStore`] backs tests and embedding, while
//! [`JsonFileStore`] keeps a single JSON snapshot on disk for the binary.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use ledger::{AuditEntry, ReputationRecord, SealedIdentity};

use crate::rti::RtiRequest;
use crate::types::{ReconcilerError, Result};

/// Load/save access to persisted entities.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// All disclosure requests.
    async fn list_rti_requests(&self) -> Result<Vec<RtiRequest>>;

    /// One disclosure request by id.
    async fn load_rti_request(&self, id: &str) -> Result<RtiRequest>;

    /// Insert or replace a disclosure request.
    async fn save_rti_request(&self, request: &RtiRequest) -> Result<()>;

    /// All reputation records.
    async fn list_reputation(&self) -> Result<Vec<ReputationRecord>>;

    /// Insert or replace a reputation record.
    async fn save_reputation(&self, record: &ReputationRecord) -> Result<()>;

    /// Append one audit entry after the last persisted one.
    async fn append_audit_entry(&self, entry: &AuditEntry) -> Result<()>;

    /// All audit entries in append order.
    async fn load_audit_entries(&self) -> Result<Vec<AuditEntry>>;

    /// Insert or replace an escrowed identity.
    async fn save_sealed_identity(&self, sealed: &SealedIdentity) -> Result<()>;

    /// All escrowed identities.
    async fn list_sealed_identities(&self) -> Result<Vec<SealedIdentity>>;
}

/// Everything a store holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub rti_requests: BTreeMap<String, RtiRequest>,
    pub reputation: BTreeMap<String, ReputationRecord>,
    pub audit_entries: Vec<AuditEntry>,
    pub sealed_identities: BTreeMap<String, SealedIdentity>,
}

impl Snapshot {
    fn append_audit(&mut self, entry: &AuditEntry) -> Result<()> {
        let expected = self
            .audit_entries
            .last()
            .map(|e| e.hash.as_str())
            .unwrap_or(ledger::GENESIS_HASH);
        if entry.previous_hash != expected {
            return Err(ReconcilerError::Store(format!(
                "audit entry {} does not extend the persisted head",
                entry.id
            )));
        }
        self.audit_entries.push(entry.clone());
        Ok(())
    }
}

/// In-memory store.
#[derive(Default)]
pub struct MemoryStore {
    data: Arc<RwLock<Snapshot>>,
    failing_ids: Arc<RwLock<HashSet<String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with a snapshot.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            data: Arc::new(RwLock::new(snapshot)),
            failing_ids: Arc::default(),
        }
    }

    /// Make every save for `id` fail (RTI request, user or escrow target).
    pub async fn fail_saves_for(&self, id: impl Into<String>) {
        self.failing_ids.write().await.insert(id.into());
    }

    /// Copy of the current contents.
    pub async fn snapshot(&self) -> Snapshot {
        self.data.read().await.clone()
    }

    async fn check_failure(&self, id: &str) -> Result<()> {
        if self.failing_ids.read().await.contains(id) {
            return Err(ReconcilerError::Store(format!("save rejected for {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn list_rti_requests(&self) -> Result<Vec<RtiRequest>> {
        Ok(self.data.read().await.rti_requests.values().cloned().collect())
    }

    async fn load_rti_request(&self, id: &str) -> Result<RtiRequest> {
        self.data
            .read()
            .await
            .rti_requests
            .get(id)
            .cloned()
            .ok_or_else(|| ReconcilerError::NotFound(format!("RTI request {id}")))
    }

    async fn save_rti_request(&self, request: &RtiRequest) -> Result<()> {
        self.check_failure(&request.id).await?;
        self.data
            .write()
            .await
            .rti_requests
            .insert(request.id.clone(), request.clone());
        Ok(())
    }

    async fn list_reputation(&self) -> Result<Vec<ReputationRecord>> {
        Ok(self.data.read().await.reputation.values().cloned().collect())
    }

    async fn save_reputation(&self, record: &ReputationRecord) -> Result<()> {
        self.check_failure(&record.user_id).await?;
        self.data
            .write()
            .await
            .reputation
            .insert(record.user_id.clone(), record.clone());
        Ok(())
    }

    async fn append_audit_entry(&self, entry: &AuditEntry) -> Result<()> {
        self.data.write().await.append_audit(entry)
    }

    async fn load_audit_entries(&self) -> Result<Vec<AuditEntry>> {
        Ok(self.data.read().await.audit_entries.clone())
    }

    async fn save_sealed_identity(&self, sealed: &SealedIdentity) -> Result<()> {
        self.check_failure(&sealed.target_id).await?;
        self.data
            .write()
            .await
            .sealed_identities
            .insert(sealed.target_id.clone(), sealed.clone());
        Ok(())
    }

    async fn list_sealed_identities(&self) -> Result<Vec<SealedIdentity>> {
        Ok(self.data.read().await.sealed_identities.values().cloned().collect())
    }
}

/// Store backed by one JSON snapshot file.
///
/// The whole snapshot is rewritten on every save through a temporary file
/// and rename, so a crash leaves either the old or the new snapshot.
pub struct JsonFileStore {
    path: PathBuf,
    data: RwLock<Snapshot>,
}

impl JsonFileStore {
    /// Open a snapshot file, starting empty if it does not exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let data = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Snapshot>(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Store file not found, starting empty");
                Snapshot::default()
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            path = %path.display(),
            rti_requests = data.rti_requests.len(),
            users = data.reputation.len(),
            audit_entries = data.audit_entries.len(),
            sealed_identities = data.sealed_identities.len(),
            "Store opened"
        );

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "Snapshot written");
        Ok(())
    }

    /// Apply `change` to a copy, persist it, then publish it.
    async fn update<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut Snapshot) -> Result<()> + Send,
    {
        let mut data = self.data.write().await;
        let mut next = data.clone();
        change(&mut next)?;
        self.persist(&next).await?;
        *data = next;
        Ok(())
    }
}

#[async_trait]
impl EntityStore for JsonFileStore {
    async fn list_rti_requests(&self) -> Result<Vec<RtiRequest>> {
        Ok(self.data.read().await.rti_requests.values().cloned().collect())
    }

    async fn load_rti_request(&self, id: &str) -> Result<RtiRequest> {
        self.data
            .read()
            .await
            .rti_requests
            .get(id)
            .cloned()
            .ok_or_else(|| ReconcilerError::NotFound(format!("RTI request {id}")))
    }

    async fn save_rti_request(&self, request: &RtiRequest) -> Result<()> {
        let request = request.clone();
        self.update(move |s| {
            s.rti_requests.insert(request.id.clone(), request);
            Ok(())
        })
        .await
    }

    async fn list_reputation(&self) -> Result<Vec<ReputationRecord>> {
        Ok(self.data.read().await.reputation.values().cloned().collect())
    }

    async fn save_reputation(&self, record: &ReputationRecord) -> Result<()> {
        let record = record.clone();
        self.update(move |s| {
            s.reputation.insert(record.user_id.clone(), record);
            Ok(())
        })
        .await
    }

    async fn append_audit_entry(&self, entry: &AuditEntry) -> Result<()> {
        self.update(|s| s.append_audit(entry)).await
    }

    async fn load_audit_entries(&self) -> Result<Vec<AuditEntry>> {
        Ok(self.data.read().await.audit_entries.clone())
    }

    async fn save_sealed_identity(&self, sealed: &SealedIdentity) -> Result<()> {
        let sealed = sealed.clone();
        self.update(move |s| {
            s.sealed_identities.insert(sealed.target_id.clone(), sealed);
            Ok(())
        })
        .await
    }

    async fn list_sealed_identities(&self) -> Result<Vec<SealedIdentity>> {
        Ok(self.data.read().await.sealed_identities.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use ledger::{AuditChain, AuditRecord, SystemClock};

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("reconciler-store-{}", uuid::Uuid::new_v4()))
            .join("state.json")
    }

    fn request(id: &str) -> RtiRequest {
        let filed = Utc::now();
        RtiRequest::new(id, filed, filed + Duration::days(20)).unwrap()
    }

    #[tokio::test]
    async fn test_memory_roundtrip() {
        let store = MemoryStore::new();
        store.save_rti_request(&request("rti-1")).await.unwrap();

        let loaded = store.load_rti_request("rti-1").await.unwrap();
        assert_eq!(loaded.id, "rti-1");
        assert!(matches!(
            store.load_rti_request("missing").await,
            Err(ReconcilerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = MemoryStore::new();
        store.fail_saves_for("rti-1").await;
        assert!(store.save_rti_request(&request("rti-1")).await.is_err());
        assert!(store.list_rti_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_audit_append_must_extend_head() {
        let chain = AuditChain::new(Arc::new(SystemClock));
        let first = chain
            .append(AuditRecord::new("admin", "official", "test", "t-1"))
            .await
            .unwrap();
        let second = chain
            .append(AuditRecord::new("admin", "official", "test", "t-2"))
            .await
            .unwrap();

        let store = MemoryStore::new();
        assert!(store.append_audit_entry(&second).await.is_err());
        store.append_audit_entry(&first).await.unwrap();
        store.append_audit_entry(&second).await.unwrap();
        assert!(store.append_audit_entry(&second).await.is_err());

        let entries = store.load_audit_entries().await.unwrap();
        assert!(ledger::verify_chain(&entries));
    }

    #[tokio::test]
    async fn test_file_store_persists_across_reopen() {
        let path = temp_path();

        {
            let store = JsonFileStore::open(&path).await.unwrap();
            store.save_rti_request(&request("rti-9")).await.unwrap();
            store
                .save_reputation(&ReputationRecord::new("user-1"))
                .await
                .unwrap();
            let (sealed, _) = SealedIdentity::encrypt("report-1", "Jane Citizen").unwrap();
            store.save_sealed_identity(&sealed).await.unwrap();
        }

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.load_rti_request("rti-9").await.unwrap().id, "rti-9");
        assert_eq!(reopened.list_reputation().await.unwrap().len(), 1);
        let sealed = reopened.list_sealed_identities().await.unwrap();
        assert_eq!(sealed.len(), 1);
        assert_eq!(sealed[0].target_id, "report-1");

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_file() {
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{ not json").unwrap();

        assert!(JsonFileStore::open(&path).await.is_err());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
