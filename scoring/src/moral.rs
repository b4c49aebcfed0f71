//! Net social-impact scalar for proposed projects.
//!
//! Default weights: poverty reduction counts most, environmental cost least.
//! Deployments can override them through configuration.

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::math;

/// Impact dimensions of a project, each on the caller's 0 - 100 scale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct ImpactAssessment {
    pub poverty_benefit: f64,
    pub displacement_risk: f64,
    pub environmental_impact: f64,
    pub social_justice: f64,
}

/// Weights applied to each impact dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct MoralWeights {
    pub poverty_benefit: f64,
    pub social_justice: f64,
    pub displacement_risk: f64,
    pub environmental_impact: f64,
}

impl Default for MoralWeights {
    fn default() -> Self {
        Self {
            poverty_benefit: 0.4,
            social_justice: 0.3,
            displacement_risk: 0.2,
            environmental_impact: 0.1,
        }
    }
}

/// Moral score with its rationale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct MoralScore {
    /// Net impact (-100 - 100)
    pub score: i32,
    pub explanation: String,
}

/// Score with the default weights.
pub fn compute_moral_score(impact: &ImpactAssessment) -> MoralScore {
    compute_moral_score_with(&MoralWeights::default(), impact)
}

/// Score with explicit weights.
pub fn compute_moral_score_with(weights: &MoralWeights, impact: &ImpactAssessment) -> MoralScore {
    let benefits = [
        ("poverty benefit", weights.poverty_benefit * impact.poverty_benefit),
        ("social justice", weights.social_justice * impact.social_justice),
    ];
    let costs = [
        ("displacement risk", weights.displacement_risk * impact.displacement_risk),
        ("environmental impact", weights.environmental_impact * impact.environmental_impact),
    ];

    let raw = benefits.iter().map(|(_, v)| v).sum::<f64>() - costs.iter().map(|(_, v)| v).sum::<f64>();
    let score = math::clamp(raw, -100.0, 100.0).round() as i32;

    let top_benefit = benefits
        .iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(name, _)| *name)
        .unwrap_or("none");
    let top_cost = costs
        .iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(name, _)| *name)
        .unwrap_or("none");

    MoralScore {
        score,
        explanation: format!(
            "Net impact {}: largest benefit is {}, largest cost is {}",
            score, top_benefit, top_cost
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights() {
        let impact = ImpactAssessment {
            poverty_benefit: 80.0,
            displacement_risk: 30.0,
            environmental_impact: 20.0,
            social_justice: 60.0,
        };
        // 32 + 18 - 6 - 2 = 42
        let result = compute_moral_score(&impact);
        assert_eq!(result.score, 42);
        assert!(result.explanation.contains("poverty benefit"));
        assert!(result.explanation.contains("displacement risk"));
    }

    #[test]
    fn test_clamped() {
        let impact = ImpactAssessment {
            poverty_benefit: 0.0,
            displacement_risk: 1000.0,
            environmental_impact: 1000.0,
            social_justice: 0.0,
        };
        assert_eq!(compute_moral_score(&impact).score, -100);

        let impact = ImpactAssessment {
            poverty_benefit: 1000.0,
            social_justice: 1000.0,
            ..Default::default()
        };
        assert_eq!(compute_moral_score(&impact).score, 100);
    }

    #[test]
    fn test_custom_weights() {
        let weights = MoralWeights {
            environmental_impact: 1.0,
            ..Default::default()
        };
        let impact = ImpactAssessment {
            environmental_impact: 50.0,
            ..Default::default()
        };
        assert_eq!(compute_moral_score_with(&weights, &impact).score, -50);
    }
}
