//! Append-only, hash-chained audit log of privileged actions.
//!
//! Every entry commits to its predecessor:
//!
//! ```text
//! hash = hex(SHA-256(previous_hash || canonical_payload))
//! ```
//!
//! where the canonical payload is the compact JSON of actor, role, action,
//! target id, RFC 3339 timestamp, details and reason code in that fixed
//! order. The first entry links to [`GENESIS_HASH`]. Entries are never
//! mutated or removed; a chain that fails verification is an integrity
//! violation and must halt dependent processing.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::clock::Clock;
use crate::types::{require, LedgerError, Result};

/// `previous_hash` of the first entry in every chain.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// A recorded privileged action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry ID
    pub id: String,
    /// Who performed the action
    pub actor: String,
    /// Role the actor held at the time
    pub role: String,
    /// What was done
    pub action: String,
    /// Entity the action applied to
    pub target_id: String,
    pub timestamp_utc: DateTime<Utc>,
    /// Hash of the preceding entry
    pub previous_hash: String,
    /// Hash of this entry
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
}

#[derive(Serialize)]
struct CanonicalPayload<'a> {
    actor: &'a str,
    role: &'a str,
    action: &'a str,
    target_id: &'a str,
    timestamp_utc: String,
    details: Option<&'a serde_json::Value>,
    reason_code: Option<&'a str>,
}

impl AuditEntry {
    /// Recompute this entry's hash from its content and `previous_hash`.
    pub fn compute_hash(&self) -> Result<String> {
        let payload = CanonicalPayload {
            actor: &self.actor,
            role: &self.role,
            action: &self.action,
            target_id: &self.target_id,
            timestamp_utc: self
                .timestamp_utc
                .to_rfc3339_opts(SecondsFormat::Nanos, true),
            details: self.details.as_ref(),
            reason_code: self.reason_code.as_deref(),
        };
        let canonical = serde_json::to_vec(&payload)?;

        let mut hasher = Sha256::new();
        hasher.update(self.previous_hash.as_bytes());
        hasher.update(&canonical);
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Content of an action to append.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditRecord {
    pub actor: String,
    pub role: String,
    pub action: String,
    pub target_id: String,
    pub details: Option<serde_json::Value>,
    pub reason_code: Option<String>,
}

impl AuditRecord {
    /// Create a record with the required fields.
    pub fn new(
        actor: impl Into<String>,
        role: impl Into<String>,
        action: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            actor: actor.into(),
            role: role.into(),
            action: action.into(),
            target_id: target_id.into(),
            details: None,
            reason_code: None,
        }
    }

    /// Attach structured details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Attach a reason code.
    pub fn with_reason_code(mut self, reason_code: impl Into<String>) -> Self {
        self.reason_code = Some(reason_code.into());
        self
    }

    /// Check the fields every entry must carry.
    pub fn validate(&self) -> Result<()> {
        require("actor", &self.actor)?;
        require("role", &self.role)?;
        require("action", &self.action)?;
        require("target_id", &self.target_id)
    }
}

/// Check a sequence of entries, reporting the first break.
pub fn check_chain(entries: &[AuditEntry]) -> Result<()> {
    let mut expected_previous = GENESIS_HASH;

    for (index, entry) in entries.iter().enumerate() {
        if entry.previous_hash != expected_previous {
            return Err(LedgerError::Integrity {
                index,
                reason: "previous_hash does not link to the prior entry".to_string(),
            });
        }
        if entry.compute_hash()? != entry.hash {
            return Err(LedgerError::Integrity {
                index,
                reason: format!("content does not match hash of entry {}", entry.id),
            });
        }
        expected_previous = entry.hash.as_str();
    }

    Ok(())
}

/// Whether a sequence of entries forms an intact chain.
pub fn verify_chain(entries: &[AuditEntry]) -> bool {
    check_chain(entries).is_ok()
}

struct ChainState {
    entries: Vec<AuditEntry>,
    head: String,
}

/// The audit chain: the single-writer integrity boundary.
///
/// Appends take the write lock for the whole read-head / hash / push
/// sequence; readers clone a consistent snapshot under the read lock.
pub struct AuditChain {
    state: Arc<RwLock<ChainState>>,
    clock: Arc<dyn Clock>,
}

impl AuditChain {
    /// Create an empty chain.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(RwLock::new(ChainState {
                entries: Vec::new(),
                head: GENESIS_HASH.to_string(),
            })),
            clock,
        }
    }

    /// Restore a chain from persisted entries, verifying it first.
    pub fn from_entries(entries: Vec<AuditEntry>, clock: Arc<dyn Clock>) -> Result<Self> {
        if let Err(e) = check_chain(&entries) {
            error!(error = %e, "Persisted audit chain failed verification");
            return Err(e);
        }

        let head = entries
            .last()
            .map(|e| e.hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());

        info!(entries = entries.len(), head = %head, "Audit chain restored");

        Ok(Self {
            state: Arc::new(RwLock::new(ChainState { entries, head })),
            clock,
        })
    }

    /// Append an action, extending the chain.
    pub async fn append(&self, record: AuditRecord) -> Result<AuditEntry> {
        record.validate()?;

        let mut state = self.state.write().await;

        let mut entry = AuditEntry {
            id: uuid::Uuid::new_v4().to_string(),
            actor: record.actor,
            role: record.role,
            action: record.action,
            target_id: record.target_id,
            timestamp_utc: self.clock.now(),
            previous_hash: state.head.clone(),
            hash: String::new(),
            details: record.details,
            reason_code: record.reason_code,
        };
        entry.hash = entry.compute_hash()?;

        state.head = entry.hash.clone();
        state.entries.push(entry.clone());

        info!(
            entry_id = %entry.id,
            actor = %entry.actor,
            action = %entry.action,
            target_id = %entry.target_id,
            "Audit entry appended"
        );

        Ok(entry)
    }

    /// Verify the current chain.
    pub async fn verify(&self) -> Result<()> {
        let state = self.state.read().await;
        let result = check_chain(&state.entries);
        if let Err(e) = &result {
            error!(error = %e, "Audit chain integrity violation");
        }
        result
    }

    /// Current head hash.
    pub async fn head(&self) -> String {
        self.state.read().await.head.clone()
    }

    /// Snapshot of all entries in append order.
    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.state.read().await.entries.clone()
    }

    /// Entries at position `index` and later, in append order.
    pub async fn entries_from(&self, index: usize) -> Vec<AuditEntry> {
        let state = self.state.read().await;
        state.entries.get(index..).map(<[_]>::to_vec).unwrap_or_default()
    }

    /// Number of entries.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Whether the chain has no entries.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }

    /// Most recent entries, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        let state = self.state.read().await;
        state.entries.iter().rev().take(limit).cloned().collect()
    }

    /// Entries concerning a target.
    pub async fn by_target(&self, target_id: &str) -> Vec<AuditEntry> {
        let state = self.state.read().await;
        state
            .entries
            .iter()
            .filter(|e| e.target_id == target_id)
            .cloned()
            .collect()
    }

    /// Entries made by an actor.
    pub async fn by_actor(&self, actor: &str) -> Vec<AuditEntry> {
        let state = self.state.read().await;
        state
            .entries
            .iter()
            .filter(|e| e.actor == actor)
            .cloned()
            .collect()
    }
}
