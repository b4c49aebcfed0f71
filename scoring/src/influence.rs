//! Bot and coordinated-voting risk from vote telemetry.
//!
//! This classifier never blocks anything by itself. Callers choose the
//! policy (reject, shadow-limit, ...) from the returned risk level, and any
//! adverse action taken on a `High` result must be recorded in the audit
//! chain.

use serde::{Deserialize, Serialize};
use tracing::debug;

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::math;
use crate::types::RiskLevel;

/// Votes per minute at which velocity risk saturates.
pub const VELOCITY_SATURATION_PER_MIN: f64 = 50.0;

const VELOCITY_WEIGHT: f64 = 0.4;
const DIVERSITY_WEIGHT: f64 = 0.4;
const AGE_WEIGHT: f64 = 0.2;

/// Telemetry for one vote-batch window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct VoteTelemetry {
    /// Votes cast per minute in the window
    pub vote_velocity_per_min: f64,
    /// Distinct IPs / votes (0.0 - 1.0)
    pub ip_diversity_ratio: f64,
    /// Age of the voting account
    pub account_age_days: f64,
}

/// Result of a bot-risk assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct InfluenceAssessment {
    pub risk_level: RiskLevel,
    /// Probability that the window is automated (0.0 - 1.0)
    pub bot_probability: f64,
    /// Dominant factors; absent for low-risk windows
    pub explanation: Option<String>,
}

/// Account-age risk factor.
fn age_factor(age_days: f64) -> f64 {
    if age_days < 7.0 {
        1.0
    } else if age_days < 30.0 {
        0.5
    } else {
        0.1
    }
}

/// Classify a vote window.
pub fn assess_bot_risk(telemetry: &VoteTelemetry) -> InfluenceAssessment {
    let velocity_risk =
        math::clamp_unit(telemetry.vote_velocity_per_min / VELOCITY_SATURATION_PER_MIN);
    let diversity_risk = 1.0 - math::clamp_unit(telemetry.ip_diversity_ratio);
    let age_risk = age_factor(math::clamp(telemetry.account_age_days, 0.0, f64::MAX));

    let bot_probability = VELOCITY_WEIGHT * velocity_risk
        + DIVERSITY_WEIGHT * diversity_risk
        + AGE_WEIGHT * age_risk;
    let risk_level = RiskLevel::from_thresholds(bot_probability, 0.4, 0.7);

    let explanation = if risk_level == RiskLevel::Low {
        None
    } else {
        let mut factors = Vec::new();
        if velocity_risk >= 0.5 {
            factors.push(format!(
                "vote velocity {:.1}/min",
                telemetry.vote_velocity_per_min
            ));
        }
        if diversity_risk >= 0.5 {
            factors.push(format!(
                "low IP diversity ({:.0}%)",
                math::clamp_unit(telemetry.ip_diversity_ratio) * 100.0
            ));
        }
        if age_risk >= 0.5 {
            factors.push(format!(
                "new account ({:.0} days)",
                telemetry.account_age_days.max(0.0)
            ));
        }
        if factors.is_empty() {
            factors.push("combined moderate signals".to_string());
        }
        Some(format!(
            "{} risk ({:.0}% bot probability): {}",
            risk_level,
            bot_probability * 100.0,
            factors.join(", ")
        ))
    };

    debug!(
        bot_probability,
        risk = %risk_level,
        "Assessed vote window"
    );

    InfluenceAssessment {
        risk_level,
        bot_probability,
        explanation,
    }
}
