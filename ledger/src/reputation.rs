//! Per-user trust scores.
//!
//! Updates to one user are serialized by the map entry lock; different
//! users update independently. Scores are clamped to [0, 100] on every
//! mutation.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use scoring::reputation::{decay_reputation, update_reputation, MAX_TRUST, MIN_TRUST};
use scoring::ReputationAction;

use crate::types::{require, Result};

/// Score assigned to users with no record.
pub const DEFAULT_TRUST_SCORE: f64 = 50.0;

/// History events kept per user.
pub const MAX_HISTORY: usize = 100;

/// Reason recorded for inactivity decay.
pub const DECAY_REASON: &str = "inactivity_decay";

/// One change to a user's score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationEvent {
    pub date: DateTime<Utc>,
    /// Score after the change
    pub score: f64,
    pub reason: String,
}

/// A user's trust score and its history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationRecord {
    pub user_id: String,
    pub trust_score: f64,
    #[serde(default)]
    pub history: Vec<ReputationEvent>,
}

impl ReputationRecord {
    /// Create a record at the default score.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            trust_score: DEFAULT_TRUST_SCORE,
            history: Vec::new(),
        }
    }

    fn record(&mut self, score: f64, reason: &str, at: DateTime<Utc>) {
        self.trust_score = score;
        self.history.push(ReputationEvent {
            date: at,
            score,
            reason: reason.to_string(),
        });
        if self.history.len() > MAX_HISTORY {
            let excess = self.history.len() - MAX_HISTORY;
            self.history.drain(..excess);
        }
    }

    /// Apply an action and return the new score.
    pub fn apply(&mut self, action: ReputationAction, at: DateTime<Utc>) -> f64 {
        let score = update_reputation(self.trust_score, action);
        self.record(score, action.as_str(), at);
        score
    }

    /// Apply inactivity decay. Returns whether the score changed.
    pub fn decay(&mut self, amount: f64, at: DateTime<Utc>) -> bool {
        let score = decay_reputation(self.trust_score, amount);
        if score == self.trust_score {
            return false;
        }
        self.record(score, DECAY_REASON, at);
        true
    }
}

/// Process-wide reputation store.
pub struct ReputationLedger {
    records: DashMap<String, ReputationRecord>,
}

impl ReputationLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Build a ledger from persisted records.
    pub fn load(records: impl IntoIterator<Item = ReputationRecord>) -> Self {
        let ledger = Self::new();
        for mut record in records {
            record.trust_score = scoring::math::clamp(record.trust_score, MIN_TRUST, MAX_TRUST);
            ledger.records.insert(record.user_id.clone(), record);
        }
        info!(users = ledger.records.len(), "Reputation ledger loaded");
        ledger
    }

    /// Current record for a user.
    pub fn get(&self, user_id: &str) -> Option<ReputationRecord> {
        self.records.get(user_id).map(|r| r.value().clone())
    }

    /// Current score for a user (default for unknown users).
    pub fn score(&self, user_id: &str) -> f64 {
        self.records
            .get(user_id)
            .map(|r| r.trust_score)
            .unwrap_or(DEFAULT_TRUST_SCORE)
    }

    /// Apply an action to a user's score.
    pub fn update(&self, user_id: &str, action: ReputationAction, at: DateTime<Utc>) -> Result<f64> {
        self.update_record(user_id, action, at)
            .map(|record| record.trust_score)
    }

    /// Apply an action and return the user's record as it stood right
    /// after this update, captured while the entry was still held.
    pub fn update_record(
        &self,
        user_id: &str,
        action: ReputationAction,
        at: DateTime<Utc>,
    ) -> Result<ReputationRecord> {
        require("user_id", user_id)?;

        let mut entry = self
            .records
            .entry(user_id.to_string())
            .or_insert_with(|| ReputationRecord::new(user_id));
        let score = entry.apply(action, at);
        let record = entry.value().clone();
        drop(entry);

        debug!(user_id = %user_id, action = action.as_str(), score, "Reputation updated");
        Ok(record)
    }

    /// Decay every user's score, returning the records that changed.
    pub fn decay_all(&self, amount: f64, at: DateTime<Utc>) -> Vec<ReputationRecord> {
        let mut changed = Vec::new();
        for mut entry in self.records.iter_mut() {
            if entry.decay(amount, at) {
                changed.push(entry.value().clone());
            }
        }
        debug!(changed = changed.len(), amount, "Reputation decay applied");
        changed
    }

    /// All records, sorted by user id.
    pub fn snapshot(&self) -> Vec<ReputationRecord> {
        let mut records: Vec<_> = self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        records
    }

    /// Number of users tracked.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no users are tracked.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for ReputationLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_new_user_starts_at_default() {
        let ledger = ReputationLedger::new();
        let score = ledger
            .update("user-1", ReputationAction::ReportRejected, Utc::now())
            .unwrap();
        assert_eq!(score, 35.0);

        let record = ledger.get("user-1").unwrap();
        assert_eq!(record.history.len(), 1);
        assert_eq!(record.history[0].reason, "report_rejected");
    }

    #[test]
    fn test_never_negative() {
        let ledger = ReputationLedger::new();
        for _ in 0..10 {
            ledger
                .update("spammer", ReputationAction::ReportRejected, Utc::now())
                .unwrap();
        }
        assert_eq!(ledger.score("spammer"), 0.0);
    }

    #[test]
    fn test_empty_user_rejected() {
        let ledger = ReputationLedger::new();
        assert!(ledger.update(" ", ReputationAction::Login, Utc::now()).is_err());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_decay_reports_only_changes() {
        let mut floored = ReputationRecord::new("floored");
        floored.trust_score = 0.0;
        let ledger = ReputationLedger::load(vec![ReputationRecord::new("active"), floored]);

        let changed = ledger.decay_all(0.5, Utc::now());
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].user_id, "active");
        assert_eq!(ledger.score("active"), 49.5);
        assert!(ledger.get("floored").unwrap().history.is_empty());
    }

    #[test]
    fn test_load_clamps() {
        let mut record = ReputationRecord::new("user-1");
        record.trust_score = 140.0;
        let ledger = ReputationLedger::load(vec![record]);
        assert_eq!(ledger.score("user-1"), 100.0);
    }

    #[test]
    fn test_history_bounded() {
        let ledger = ReputationLedger::new();
        for _ in 0..(MAX_HISTORY + 20) {
            ledger.update("user-1", ReputationAction::Login, Utc::now()).unwrap();
        }
        assert_eq!(ledger.get("user-1").unwrap().history.len(), MAX_HISTORY);
    }

    #[test]
    fn test_concurrent_updates_to_one_user_serialize() {
        let ledger = Arc::new(ReputationLedger::new());

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let ledger = Arc::clone(&ledger);
                scope.spawn(move || {
                    for _ in 0..5 {
                        ledger
                            .update("user-1", ReputationAction::VoteConsensus, Utc::now())
                            .unwrap();
                    }
                });
            }
        });

        assert_eq!(ledger.score("user-1"), 90.0);
        assert_eq!(ledger.get("user-1").unwrap().history.len(), 40);
    }

    #[test]
    fn test_update_record_is_the_post_update_state() {
        let ledger = Arc::new(ReputationLedger::new());

        let mut lengths: Vec<usize> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let ledger = Arc::clone(&ledger);
                    scope.spawn(move || {
                        (0..5)
                            .map(|_| {
                                let record = ledger
                                    .update_record("user-1", ReputationAction::Login, Utc::now())
                                    .unwrap();
                                record.history.len()
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        // Every caller saw its own update and nobody else's later ones
        lengths.sort_unstable();
        assert_eq!(lengths, (1..=40).collect::<Vec<_>>());
    }
}
