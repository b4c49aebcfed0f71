//! Process-wide governance state.
//!
//! Built once at startup from the store and shared by reference. Every
//! audit entry appended through this type is persisted in chain order; an
//! entry whose persistence failed is retried on the next flush.
//!
//! Writes to one RTI request, one user's reputation or one escrow target
//! are serialized by a per-entity lock, so a manual transition and a worker
//! sweep never act on the same stale copy.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::json;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info, warn};

use ledger::{
    AuditChain, AuditEntry, AuditRecord, Clock, EscrowOutcome, IdentityEscrow,
    IdentityUnlockRequest, ReputationLedger, SealedIdentity,
};
use scoring::{
    compute_moral_score_with, ImpactAssessment, InfluenceAssessment, MoralScore, MoralWeights,
    ReputationAction, RiskLevel,
};

use crate::rti::{RtiRequest, RtiStatus};
use crate::store::EntityStore;
use crate::types::{ReconcilerError, Result};

/// Audit action recorded for adverse influence actions.
pub const INFLUENCE_ACTION: &str = "influence_action";

/// Audit action recorded for manual RTI transitions.
pub const RTI_TRANSITION_ACTION: &str = "rti_transition";

/// Shared governance state.
pub struct GovernanceState {
    store: Arc<dyn EntityStore>,
    clock: Arc<dyn Clock>,
    chain: Arc<AuditChain>,
    reputation: Arc<ReputationLedger>,
    escrow: IdentityEscrow,
    moral_weights: MoralWeights,
    /// Number of chain entries known to be persisted
    persisted: Mutex<usize>,
    /// Per-entity write locks, keyed by kind and id
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl GovernanceState {
    /// Restore state from the store.
    ///
    /// Fails with a fatal ledger error if the persisted audit chain does
    /// not verify.
    pub async fn bootstrap(store: Arc<dyn EntityStore>, clock: Arc<dyn Clock>) -> Result<Self> {
        let entries = store.load_audit_entries().await?;
        let persisted = entries.len();

        let chain = match AuditChain::from_entries(entries, Arc::clone(&clock)) {
            Ok(chain) => Arc::new(chain),
            Err(e) => {
                error!(error = %e, "Refusing to start on a tampered audit chain");
                return Err(e.into());
            }
        };

        let reputation = Arc::new(ReputationLedger::load(store.list_reputation().await?));

        let sealed = store.list_sealed_identities().await?;
        let sealed_count = sealed.len();
        let escrow = IdentityEscrow::restore(Arc::clone(&chain), sealed)?;

        info!(
            audit_entries = persisted,
            users = reputation.len(),
            sealed_identities = sealed_count,
            "Governance state bootstrapped"
        );

        Ok(Self {
            store,
            clock,
            chain,
            reputation,
            escrow,
            moral_weights: MoralWeights::default(),
            persisted: Mutex::new(persisted),
            locks: DashMap::new(),
        })
    }

    /// Use deployment-specific weights for moral impact scoring.
    pub fn with_moral_weights(mut self, weights: MoralWeights) -> Self {
        self.moral_weights = weights;
        self
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    pub fn chain(&self) -> &Arc<AuditChain> {
        &self.chain
    }

    pub fn reputation(&self) -> &Arc<ReputationLedger> {
        &self.reputation
    }

    /// Identity escrow. Sealing and unlock attempts should go through
    /// [`GovernanceState::seal_identity`] and
    /// [`GovernanceState::reconstruct_identity`] so they are persisted.
    pub fn escrow(&self) -> &IdentityEscrow {
        &self.escrow
    }

    pub fn moral_weights(&self) -> &MoralWeights {
        &self.moral_weights
    }

    /// Current time from the injected clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    async fn lock(&self, key: String) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(self.locks.entry(key).or_default().value());
        lock.lock_owned().await
    }

    /// Append an audit entry and persist it.
    pub async fn record(&self, record: AuditRecord) -> Result<AuditEntry> {
        let entry = self.chain.append(record).await?;
        self.flush_audit().await?;
        Ok(entry)
    }

    /// Persist chain entries the store has not seen yet.
    ///
    /// Returns how many entries were written.
    pub async fn flush_audit(&self) -> Result<usize> {
        let mut persisted = self.persisted.lock().await;

        let mut written = 0;
        for entry in self.chain.entries_from(*persisted).await {
            if let Err(e) = self.store.append_audit_entry(&entry).await {
                warn!(entry_id = %entry.id, error = %e, "Audit entry not persisted, will retry");
                return Err(e);
            }
            *persisted += 1;
            written += 1;
        }
        Ok(written)
    }

    /// Escrow an identity, persisting the sealed record before it becomes
    /// available for reconstruction. Returns the two key parts.
    pub async fn seal_identity(&self, target_id: &str, identity: &str) -> Result<[String; 2]> {
        let _guard = self.lock(format!("escrow:{target_id}")).await;

        if self.escrow.is_sealed(target_id).await {
            return Err(ReconcilerError::InvalidInput(format!(
                "identity for {target_id} is already sealed"
            )));
        }

        let (sealed, parts) = SealedIdentity::encrypt(target_id, identity)?;
        self.store.save_sealed_identity(&sealed).await?;
        self.escrow.insert(sealed).await?;
        Ok(parts)
    }

    /// Attempt an identity unlock and persist its audit entry.
    pub async fn reconstruct_identity(
        &self,
        actor: &str,
        role: &str,
        request: &IdentityUnlockRequest,
    ) -> Result<EscrowOutcome> {
        let outcome = self.escrow.reconstruct(actor, role, request).await?;
        self.flush_audit().await?;
        Ok(outcome)
    }

    /// Apply a reputation action and persist the user's record.
    pub async fn update_reputation(&self, user_id: &str, action: ReputationAction) -> Result<f64> {
        let _guard = self.lock(format!("user:{user_id}")).await;

        let record = self.reputation.update_record(user_id, action, self.now())?;
        self.store.save_reputation(&record).await?;
        Ok(record.trust_score)
    }

    /// Persist a user's current reputation record, if the user is known.
    pub async fn persist_reputation(&self, user_id: &str) -> Result<bool> {
        let _guard = self.lock(format!("user:{user_id}")).await;

        match self.reputation.get(user_id) {
            Some(record) => {
                self.store.save_reputation(&record).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Score a project's impact with the configured weights.
    pub fn score_moral_impact(&self, impact: &ImpactAssessment) -> MoralScore {
        compute_moral_score_with(&self.moral_weights, impact)
    }

    /// Record an adverse action taken on a high-risk influence assessment.
    ///
    /// Only `High` assessments justify an adverse action; anything else is
    /// rejected without writing to the chain.
    pub async fn record_influence_action(
        &self,
        actor: &str,
        role: &str,
        target_id: &str,
        action: &str,
        assessment: &InfluenceAssessment,
    ) -> Result<AuditEntry> {
        if assessment.risk_level != RiskLevel::High {
            return Err(ReconcilerError::InvalidInput(format!(
                "adverse action on {} requires a high-risk assessment, got {}",
                target_id, assessment.risk_level
            )));
        }

        let record = AuditRecord::new(actor, role, INFLUENCE_ACTION, target_id)
            .with_details(json!({
                "action": action,
                "risk_level": assessment.risk_level.as_str(),
                "bot_probability": assessment.bot_probability,
                "explanation": assessment.explanation,
            }))
            .with_reason_code("HIGH_INFLUENCE_RISK");

        let entry = self.record(record).await?;
        info!(target_id = %target_id, action = %action, entry_id = %entry.id, "Influence action recorded");
        Ok(entry)
    }

    /// Change one RTI request under its lock.
    ///
    /// The request is loaded fresh and handed to `change`, which edits it
    /// and returns the audit record describing the edit, or `None` to
    /// leave it alone. The record is checked before anything is written;
    /// the request is then saved and the entry appended. A rejected change
    /// writes nothing.
    ///
    /// Returns the request as it now stands and the entry, if one was
    /// written.
    pub async fn update_rti<F>(
        &self,
        request_id: &str,
        change: F,
    ) -> Result<(RtiRequest, Option<AuditEntry>)>
    where
        F: FnOnce(&mut RtiRequest) -> Result<Option<AuditRecord>> + Send,
    {
        let _guard = self.lock(format!("rti:{request_id}")).await;

        let stored = self.store.load_rti_request(request_id).await?;
        let mut request = stored.clone();
        let record = match change(&mut request)? {
            Some(record) => record,
            None => return Ok((stored, None)),
        };
        record.validate()?;

        self.store.save_rti_request(&request).await?;
        let entry = self.record(record).await?;
        Ok((request, Some(entry)))
    }

    /// Move a disclosure request through its manual lifecycle.
    pub async fn transition_rti(
        &self,
        actor: &str,
        role: &str,
        request_id: &str,
        next: RtiStatus,
    ) -> Result<RtiRequest> {
        let (request, _) = self
            .update_rti(request_id, |request| {
                let previous = request.status;
                request.transition(next)?;
                Ok(Some(
                    AuditRecord::new(actor, role, RTI_TRANSITION_ACTION, request_id).with_details(
                        json!({
                            "from": previous.as_str(),
                            "to": next.as_str(),
                        }),
                    ),
                ))
            })
            .await?;

        Ok(request)
    }
}
