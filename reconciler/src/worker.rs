//! Escalation worker.
//!
//! Periodically applies the deadline rule to every disclosure request and
//! decays reputation scores. Each sweep reads the clock once, so every
//! entity in a sweep is judged against the same instant.
//!
//! Each request is re-read under its lock before the rule is applied, so a
//! status set by an official after the listing is never overwritten.
//!
//! Sweeps never overlap: a sweep requested while another is in progress is
//! reported as skipped. A failure on one entity is logged and counted; the
//! sweep moves on. Only audit chain integrity failures abort a sweep.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tokio::sync::{Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use ledger::AuditRecord;

use crate::config::WorkerConfig;
use crate::rti::RtiStatus;
use crate::state::GovernanceState;
use crate::types::Result;

/// Audit action recorded for automatic status changes.
pub const ESCALATION_ACTION: &str = "rti_escalation";

/// Role recorded on entries the worker writes.
pub const WORKER_ROLE: &str = "system";

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Another sweep was in progress; nothing was done
    pub skipped: bool,
    pub examined: usize,
    pub escalated: usize,
    pub violations: usize,
    /// Entities whose processing failed
    pub failed: usize,
    pub users_decayed: usize,
}

impl SweepReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    /// Number of requests whose status changed.
    pub fn changed(&self) -> usize {
        self.escalated + self.violations
    }
}

/// Background reconciler for time-based state.
pub struct EscalationWorker {
    state: Arc<GovernanceState>,
    config: WorkerConfig,
    /// Held for the duration of a sweep
    sweeping: Mutex<()>,
    running: Arc<RwLock<bool>>,
    shutdown: Notify,
}

impl EscalationWorker {
    pub fn new(state: Arc<GovernanceState>, config: WorkerConfig) -> Self {
        Self {
            state,
            config,
            sweeping: Mutex::new(()),
            running: Arc::new(RwLock::new(false)),
            shutdown: Notify::new(),
        }
    }

    /// Run one reconciliation pass.
    pub async fn sweep(&self) -> Result<SweepReport> {
        let _guard = match self.sweeping.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Sweep already in progress, skipping");
                return Ok(SweepReport::skipped());
            }
        };

        let now = self.state.now();
        let mut report = SweepReport::default();

        for request in self.state.store().list_rti_requests().await? {
            report.examined += 1;
            let id = request.id;

            match self.reconcile_request(&id, now).await {
                Ok(Some(RtiStatus::Violation)) => report.violations += 1,
                Ok(Some(_)) => report.escalated += 1,
                Ok(None) => {}
                Err(e) if e.is_fatal() => {
                    error!(request_id = %id, error = %e, "Audit chain integrity failure, aborting sweep");
                    return Err(e);
                }
                Err(e) => {
                    warn!(request_id = %id, error = %e, "Failed to reconcile RTI request");
                    report.failed += 1;
                }
            }
        }

        if self.config.reputation_decay_per_sweep > 0.0 {
            let changed = self
                .state
                .reputation()
                .decay_all(self.config.reputation_decay_per_sweep, now);

            for record in changed {
                match self.state.persist_reputation(&record.user_id).await {
                    Ok(_) => report.users_decayed += 1,
                    Err(e) => {
                        warn!(user_id = %record.user_id, error = %e, "Failed to persist decayed reputation");
                        report.failed += 1;
                    }
                }
            }
        }

        info!(
            examined = report.examined,
            escalated = report.escalated,
            violations = report.violations,
            failed = report.failed,
            users_decayed = report.users_decayed,
            "Sweep complete"
        );

        Ok(report)
    }

    /// Returns the new status if the request changed.
    async fn reconcile_request(&self, id: &str, now: DateTime<Utc>) -> Result<Option<RtiStatus>> {
        let threshold = self.config.escalation_threshold;
        let actor = self.config.actor.as_str();

        let (request, entry) = self
            .state
            .update_rti(id, |request| {
                let (from, to) = match request.reconcile(now, threshold) {
                    Some(change) => change,
                    None => return Ok(None),
                };
                let reason_code = match to {
                    RtiStatus::Violation => "DEADLINE_PASSED",
                    _ => "DEADLINE_APPROACHING",
                };
                Ok(Some(
                    AuditRecord::new(actor, WORKER_ROLE, ESCALATION_ACTION, request.id.as_str())
                        .with_details(json!({
                            "from": from.as_str(),
                            "to": to.as_str(),
                            "deadline": request.deadline.to_rfc3339(),
                        }))
                        .with_reason_code(reason_code),
                ))
            })
            .await?;

        if entry.is_none() {
            return Ok(None);
        }

        info!(request_id = %request.id, to = %request.status, "RTI request status changed");
        Ok(Some(request.status))
    }

    /// Start the periodic sweep loop.
    ///
    /// Returns `None` if the worker is already running.
    pub async fn start(self: Arc<Self>) -> Option<JoinHandle<()>> {
        {
            let mut running = self.running.write().await;
            if *running {
                warn!("Escalation worker already running");
                return None;
            }
            *running = true;
        }

        let period = self.config.sweep_interval();
        info!(interval = ?period, "Starting escalation worker");

        let worker = Arc::clone(&self);
        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = worker.shutdown.notified() => break,
                }

                if let Err(e) = worker.sweep().await {
                    error!(error = %e, "Sweep failed");
                    if e.is_fatal() {
                        break;
                    }
                }
            }

            *worker.running.write().await = false;
            info!("Escalation worker stopped");
        }))
    }

    /// Signal the sweep loop to stop after any sweep in progress.
    pub async fn stop(&self) {
        if *self.running.read().await {
            info!("Stopping escalation worker");
            self.shutdown.notify_one();
        }
    }

    /// Check if the loop is running.
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}
