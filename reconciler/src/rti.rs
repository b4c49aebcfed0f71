//! Disclosure (RTI) request lifecycle.
//!
//! ```text
//! submitted -> acknowledged -> review -> responded | escalated | violation -> closed
//! ```
//!
//! Officials drive the manual transitions; the escalation worker applies
//! the deadline rule on every sweep. The rule is a pure function of the
//! filing date, deadline, current time and current status, so re-running
//! it is idempotent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ReconcilerError, Result};

/// Elapsed fraction of the response window after which a request escalates.
pub const ESCALATION_THRESHOLD: f64 = 0.8;

/// Status of a disclosure request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RtiStatus {
    Submitted,
    Acknowledged,
    Review,
    Responded,
    /// Deadline approaching without a response
    Escalated,
    /// Deadline passed without a response
    Violation,
    Closed,
}

impl RtiStatus {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RtiStatus::Submitted => "submitted",
            RtiStatus::Acknowledged => "acknowledged",
            RtiStatus::Review => "review",
            RtiStatus::Responded => "responded",
            RtiStatus::Escalated => "escalated",
            RtiStatus::Violation => "violation",
            RtiStatus::Closed => "closed",
        }
    }

    /// Terminal with respect to automatic escalation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RtiStatus::Responded | RtiStatus::Closed)
    }

    /// Whether an official may move a request from `self` to `next`.
    pub fn can_transition_to(&self, next: RtiStatus) -> bool {
        use RtiStatus::*;
        matches!(
            (self, next),
            (Submitted, Acknowledged)
                | (Acknowledged, Review)
                | (Review, Responded)
                | (Review, Escalated)
                | (Review, Violation)
                | (Escalated, Responded)
                | (Escalated, Violation)
                | (Violation, Responded)
                | (Responded, Closed)
                | (Escalated, Closed)
                | (Violation, Closed)
        )
    }
}

impl std::fmt::Display for RtiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deadline rule with the default threshold.
pub fn next_status(
    date_filed: DateTime<Utc>,
    deadline: DateTime<Utc>,
    now: DateTime<Utc>,
    current: RtiStatus,
) -> RtiStatus {
    next_status_with_threshold(date_filed, deadline, now, current, ESCALATION_THRESHOLD)
}

/// Deadline rule.
///
/// - `responded` / `closed`: unchanged
/// - past the deadline: `violation`
/// - more than `threshold` of the window elapsed: `escalated`
/// - otherwise unchanged
///
/// A `violation` is never demoted back to `escalated`.
pub fn next_status_with_threshold(
    date_filed: DateTime<Utc>,
    deadline: DateTime<Utc>,
    now: DateTime<Utc>,
    current: RtiStatus,
    threshold: f64,
) -> RtiStatus {
    if current.is_terminal() {
        return current;
    }
    if now > deadline {
        return RtiStatus::Violation;
    }

    let window_ms = (deadline - date_filed).num_milliseconds();
    if window_ms <= 0 {
        return current;
    }
    let elapsed = (now - date_filed).num_milliseconds() as f64 / window_ms as f64;

    if elapsed > threshold && current != RtiStatus::Violation {
        RtiStatus::Escalated
    } else {
        current
    }
}

/// A disclosure request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtiRequest {
    pub id: String,
    pub date_filed: DateTime<Utc>,
    /// Statutory response deadline
    pub deadline: DateTime<Utc>,
    pub status: RtiStatus,
}

impl RtiRequest {
    /// File a new request.
    pub fn new(id: impl Into<String>, date_filed: DateTime<Utc>, deadline: DateTime<Utc>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ReconcilerError::InvalidInput("request id must not be empty".to_string()));
        }
        if deadline <= date_filed {
            return Err(ReconcilerError::InvalidInput(format!(
                "deadline of {} must be after its filing date",
                id
            )));
        }
        Ok(Self {
            id,
            date_filed,
            deadline,
            status: RtiStatus::Submitted,
        })
    }

    /// Apply a manual lifecycle transition.
    pub fn transition(&mut self, next: RtiStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(ReconcilerError::InvalidTransition(format!(
                "{}: {} -> {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    /// Apply the deadline rule. Returns `(from, to)` if the status changed.
    pub fn reconcile(&mut self, now: DateTime<Utc>, threshold: f64) -> Option<(RtiStatus, RtiStatus)> {
        let next = next_status_with_threshold(self.date_filed, self.deadline, now, self.status, threshold);
        if next == self.status {
            return None;
        }
        let previous = self.status;
        self.status = next;
        Some((previous, next))
    }
}
