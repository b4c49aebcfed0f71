//! Shared types for the scoring functions.

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Three-band risk classification shared by the classifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// No action suggested
    Low,
    /// Worth a closer look
    Medium,
    /// Callers should apply policy (and audit any adverse action)
    High,
}

impl RiskLevel {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    /// Band a value with strict `>` thresholds.
    pub fn from_thresholds(value: f64, medium_above: f64, high_above: f64) -> Self {
        if value > high_above {
            RiskLevel::High
        } else if value > medium_above {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error types for scoring.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoreError {
    /// Input that has no sensible clamp
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, ScoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_are_strict() {
        assert_eq!(RiskLevel::from_thresholds(0.7, 0.4, 0.7), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_thresholds(0.71, 0.4, 0.7), RiskLevel::High);
        assert_eq!(RiskLevel::from_thresholds(0.4, 0.4, 0.7), RiskLevel::Low);
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&RiskLevel::High).unwrap();
        assert_eq!(json, "\"high\"");
    }
}
