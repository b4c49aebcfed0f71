//! Trust-score adjustment rules.
//!
//! A rejected report costs three times what a verified one earns.

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::math;

/// Lowest possible trust score.
pub const MIN_TRUST: f64 = 0.0;
/// Highest possible trust score.
pub const MAX_TRUST: f64 = 100.0;

/// An action that moves a user's trust score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum ReputationAction {
    /// A submitted report was verified
    ReportVerified,
    /// A submitted report was rejected as false
    ReportRejected,
    /// Voted with the eventual consensus
    VoteConsensus,
    /// Voted against the eventual consensus
    VoteOutlier,
    Login,
}

impl ReputationAction {
    /// Score delta for this action.
    pub fn delta(&self) -> f64 {
        match self {
            ReputationAction::ReportVerified => 5.0,
            ReputationAction::ReportRejected => -15.0,
            ReputationAction::VoteConsensus => 1.0,
            ReputationAction::VoteOutlier => -0.5,
            ReputationAction::Login => 0.1,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReputationAction::ReportVerified => "report_verified",
            ReputationAction::ReportRejected => "report_rejected",
            ReputationAction::VoteConsensus => "vote_consensus",
            ReputationAction::VoteOutlier => "vote_outlier",
            ReputationAction::Login => "login",
        }
    }
}

impl std::str::FromStr for ReputationAction {
    type Err = crate::ScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "report_verified" => Ok(Self::ReportVerified),
            "report_rejected" => Ok(Self::ReportRejected),
            "vote_consensus" => Ok(Self::VoteConsensus),
            "vote_outlier" => Ok(Self::VoteOutlier),
            "login" => Ok(Self::Login),
            other => Err(crate::ScoreError::InvalidInput(format!(
                "unknown reputation action '{}'",
                other
            ))),
        }
    }
}

/// Apply an action to a score, clamped to [0, 100].
pub fn update_reputation(current: f64, action: ReputationAction) -> f64 {
    math::clamp(current + action.delta(), MIN_TRUST, MAX_TRUST)
}

/// Subtract an inactivity decay, never going below 0.
pub fn decay_reputation(current: f64, amount: f64) -> f64 {
    math::clamp(current - amount.max(0.0), MIN_TRUST, MAX_TRUST)
}
