//! Truth probability for citizen reports.
//!
//! Combines four signals into a 0-100 score:
//! - **Reporter trust**: the reporter's reputation, normalized to [0, 1]
//! - **Evidence strength**: linear per item, saturating at 1.0
//! - **Geo match**: exponential decay with distance from the reported location
//! - **Community consensus**: Laplace-smoothed support ratio (0.5 with no votes)

use serde::{Deserialize, Serialize};
use tracing::trace;

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::math;

/// Weight of the reporter's trust.
pub const TRUST_WEIGHT: f64 = 0.30;
/// Weight of evidence strength.
pub const EVIDENCE_WEIGHT: f64 = 0.40;
/// Weight of the geo-match signal.
pub const GEO_WEIGHT: f64 = 0.10;
/// Weight of the community consensus.
pub const CONSENSUS_WEIGHT: f64 = 0.20;

/// Strength contributed by each piece of evidence.
pub const EVIDENCE_PER_ITEM: f64 = 0.35;
/// Geo decay rate per kilometre.
pub const GEO_DECAY_PER_KM: f64 = 2.0;

/// Raw signals for one truth computation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct SignalBundle {
    /// Reporter trust score (clamped to 0 - 100)
    pub reporter_trust: f64,
    /// Number of evidence items attached
    pub evidence_count: u32,
    /// Distance between the reporter and the reported location
    pub geo_distance_km: f64,
    /// Community members confirming the report
    pub community_support: u64,
    /// Community members doubting the report
    pub community_doubt: u64,
}

/// Normalized signals (each 0.0 - 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct TruthSignals {
    pub reporter_trust: f64,
    pub evidence_strength: f64,
    pub geo_match: f64,
    pub community_consensus: f64,
}

/// Scored report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct TruthResult {
    /// Truth probability (0 - 100)
    pub score: u8,
    /// Normalized inputs that produced the score
    pub signals: TruthSignals,
    /// Top contributing factors
    pub explanation: String,
}

impl TruthSignals {
    /// Derive normalized signals from a bundle, clamping out-of-range inputs.
    pub fn from_bundle(bundle: &SignalBundle) -> Self {
        let geo_match = if bundle.geo_distance_km.is_nan() {
            0.0
        } else {
            math::exp_decay(bundle.geo_distance_km, GEO_DECAY_PER_KM)
        };

        Self {
            reporter_trust: math::clamp(bundle.reporter_trust, 0.0, 100.0) / 100.0,
            evidence_strength: math::saturating_linear(
                bundle.evidence_count as f64,
                EVIDENCE_PER_ITEM,
                1.0,
            ),
            geo_match,
            community_consensus: math::laplace_smooth(
                bundle.community_support,
                bundle.community_doubt,
            ),
        }
    }

    /// Weighted contribution of each signal, in score points.
    pub fn contributions(&self) -> [(&'static str, f64); 4] {
        [
            ("reporter trust", 100.0 * TRUST_WEIGHT * self.reporter_trust),
            ("evidence strength", 100.0 * EVIDENCE_WEIGHT * self.evidence_strength),
            ("geo match", 100.0 * GEO_WEIGHT * self.geo_match),
            ("community consensus", 100.0 * CONSENSUS_WEIGHT * self.community_consensus),
        ]
    }

    /// Weighted sum in [0, 1].
    pub fn weighted_sum(&self) -> f64 {
        TRUST_WEIGHT * self.reporter_trust
            + EVIDENCE_WEIGHT * self.evidence_strength
            + GEO_WEIGHT * self.geo_match
            + CONSENSUS_WEIGHT * self.community_consensus
    }
}

/// Compute a report's truth probability.
///
/// Inputs are clamped rather than rejected, so this never fails.
pub fn compute_truth_score(bundle: &SignalBundle) -> TruthResult {
    let signals = TruthSignals::from_bundle(bundle);
    let score = math::round_score(signals.weighted_sum());

    let mut ranked = signals.contributions();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let explanation = format!(
        "Truth score {}: driven by {} ({:.1} pts) and {} ({:.1} pts)",
        score, ranked[0].0, ranked[0].1, ranked[1].0, ranked[1].1
    );

    trace!(score, ?signals, "Computed truth score");

    TruthResult {
        score,
        signals,
        explanation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bundle(trust: f64, evidence: u32, km: f64, support: u64, doubt: u64) -> SignalBundle {
        SignalBundle {
            reporter_trust: trust,
            evidence_count: evidence,
            geo_distance_km: km,
            community_support: support,
            community_doubt: doubt,
        }
    }

    #[test]
    fn test_field_report_scenario() {
        let result = compute_truth_score(&bundle(85.0, 2, 0.05, 1240, 10));

        assert!((result.signals.evidence_strength - 0.70).abs() < 1e-9);
        assert!((result.signals.geo_match - 0.905).abs() < 1e-3);
        assert!((result.signals.community_consensus - 0.991).abs() < 1e-3);
        assert_eq!(result.score, 82);
        assert!(result.explanation.starts_with("Truth score 82: driven by evidence strength"));
    }

    #[test]
    fn test_zero_votes_prior() {
        let result = compute_truth_score(&bundle(50.0, 0, 0.0, 0, 0));
        assert_eq!(result.signals.community_consensus, 0.5);
    }

    #[test]
    fn test_evidence_saturates() {
        let three = compute_truth_score(&bundle(50.0, 3, 1.0, 0, 0));
        let many = compute_truth_score(&bundle(50.0, 300, 1.0, 0, 0));
        assert_eq!(three.signals.evidence_strength, 1.0);
        assert_eq!(three.score, many.score);
    }

    #[test]
    fn test_inputs_are_clamped() {
        let result = compute_truth_score(&bundle(250.0, 0, -5.0, 0, 0));
        assert_eq!(result.signals.reporter_trust, 1.0);
        assert_eq!(result.signals.geo_match, 1.0);

        let result = compute_truth_score(&bundle(f64::NAN, 0, f64::NAN, 0, 0));
        assert_eq!(result.signals.reporter_trust, 0.0);
        assert_eq!(result.signals.geo_match, 0.0);
    }

    #[test]
    fn test_maximum_score() {
        let result = compute_truth_score(&bundle(100.0, 10, 0.0, 1_000_000, 0));
        assert_eq!(result.score, 100);
    }

    proptest! {
        #[test]
        fn score_in_bounds(
            trust in -50.0f64..200.0,
            evidence in 0u32..50,
            km in 0.0f64..500.0,
            support in 0u64..10_000,
            doubt in 0u64..10_000,
        ) {
            let result = compute_truth_score(&bundle(trust, evidence, km, support, doubt));
            prop_assert!(result.score <= 100);
        }

        #[test]
        fn monotonic_in_evidence(
            trust in 0.0f64..100.0,
            evidence in 0u32..20,
            km in 0.0f64..10.0,
            support in 0u64..1_000,
            doubt in 0u64..1_000,
        ) {
            let lower = compute_truth_score(&bundle(trust, evidence, km, support, doubt));
            let higher = compute_truth_score(&bundle(trust, evidence + 1, km, support, doubt));
            prop_assert!(higher.score >= lower.score);
        }

        #[test]
        fn monotonic_in_trust(
            trust in 0.0f64..99.0,
            bump in 0.0f64..1.0,
            evidence in 0u32..20,
            km in 0.0f64..10.0,
            support in 0u64..1_000,
            doubt in 0u64..1_000,
        ) {
            let lower = compute_truth_score(&bundle(trust, evidence, km, support, doubt));
            let higher = compute_truth_score(&bundle(trust + bump, evidence, km, support, doubt));
            prop_assert!(higher.score >= lower.score);
        }

        #[test]
        fn monotonic_in_support(
            trust in 0.0f64..100.0,
            evidence in 0u32..20,
            km in 0.0f64..10.0,
            support in 0u64..1_000,
            doubt in 0u64..1_000,
        ) {
            let lower = compute_truth_score(&bundle(trust, evidence, km, support, doubt));
            let higher = compute_truth_score(&bundle(trust, evidence, km, support + 1, doubt));
            prop_assert!(higher.score >= lower.score);
        }
    }
}
