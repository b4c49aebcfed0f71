//! Per-voter weight for project approval tallies.
//!
//! The weight is the product of four multipliers, so no single factor can
//! silence a voter: the formula never yields zero.

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::math;

/// Distance under which a voter counts as local.
pub const LOCAL_RADIUS_KM: f64 = 2.0;
/// Distance beyond which the geo multiplier bottoms out.
pub const REGIONAL_RADIUS_KM: f64 = 50.0;
/// Geo multiplier floor for distant voters.
pub const DISTANT_FLOOR: f64 = 0.25;

/// Who is voting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct VoterProfile {
    /// Voter trust score (0 - 100)
    pub user_trust: f64,
    /// Distance from the project site
    pub distance_km: f64,
    pub is_expert: bool,
    pub is_verified_resident: bool,
}

/// Weight breakdown for one voter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct VoteWeight {
    pub geo_multiplier: f64,
    pub expert_multiplier: f64,
    pub trust_multiplier: f64,
    pub residency_multiplier: f64,
    /// Product of all multipliers
    pub weight: f64,
}

impl VoteWeight {
    /// Compute the weight breakdown for a voter.
    pub fn for_voter(profile: &VoterProfile) -> Self {
        let geo_multiplier = geo_multiplier(profile.distance_km);
        let expert_multiplier = if profile.is_expert { 3.0 } else { 1.0 };
        let trust_multiplier = 0.5 + math::clamp(profile.user_trust, 0.0, 100.0) / 100.0;
        let residency_multiplier = if profile.is_verified_resident { 1.5 } else { 1.0 };

        Self {
            geo_multiplier,
            expert_multiplier,
            trust_multiplier,
            residency_multiplier,
            weight: geo_multiplier * expert_multiplier * trust_multiplier * residency_multiplier,
        }
    }

    /// Human-readable breakdown.
    pub fn explanation(&self) -> String {
        format!(
            "Vote weight {:.3} = geo {:.2} x expert {:.1} x trust {:.2} x residency {:.1}",
            self.weight,
            self.geo_multiplier,
            self.expert_multiplier,
            self.trust_multiplier,
            self.residency_multiplier
        )
    }
}

fn geo_multiplier(distance_km: f64) -> f64 {
    let distance = math::clamp(distance_km, 0.0, f64::MAX);
    if distance < LOCAL_RADIUS_KM {
        2.0
    } else if distance <= REGIONAL_RADIUS_KM {
        1.0 - distance / 100.0
    } else {
        DISTANT_FLOOR
    }
}

/// Compute a single voter's weight.
pub fn compute_vote_weight(
    user_trust: f64,
    distance_km: f64,
    is_expert: bool,
    is_verified_resident: bool,
) -> f64 {
    VoteWeight::for_voter(&VoterProfile {
        user_trust,
        distance_km,
        is_expert,
        is_verified_resident,
    })
    .weight
}

/// Running weighted tally for one project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct WeightedTally {
    pub approve_weight: f64,
    pub reject_weight: f64,
    pub voters: u32,
}

impl WeightedTally {
    /// Create an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one vote.
    pub fn record(&mut self, profile: &VoterProfile, approve: bool) -> VoteWeight {
        let weight = VoteWeight::for_voter(profile);
        if approve {
            self.approve_weight += weight.weight;
        } else {
            self.reject_weight += weight.weight;
        }
        self.voters += 1;
        weight
    }

    /// Weighted approval ratio; 0.5 before any vote is cast.
    pub fn approval_ratio(&self) -> f64 {
        let total = self.approve_weight + self.reject_weight;
        if total <= 0.0 {
            0.5
        } else {
            self.approve_weight / total
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_zero() {
        let weight = compute_vote_weight(0.0, 0.0, false, false);
        assert!(weight > 0.0);
        assert_eq!(weight, 1.0); // 2.0 geo x 0.5 trust
    }

    #[test]
    fn test_geo_bands() {
        assert_eq!(geo_multiplier(1.99), 2.0);
        assert!((geo_multiplier(2.0) - 0.98).abs() < 1e-12);
        assert_eq!(geo_multiplier(50.0), 0.5);
        assert_eq!(geo_multiplier(50.1), DISTANT_FLOOR);
        assert_eq!(geo_multiplier(-10.0), 2.0);
    }

    #[test]
    fn test_local_expert_resident() {
        let weight = compute_vote_weight(100.0, 0.5, true, true);
        assert!((weight - 2.0 * 3.0 * 1.5 * 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_tally() {
        let mut tally = WeightedTally::new();
        assert_eq!(tally.approval_ratio(), 0.5);

        let local = VoterProfile {
            user_trust: 50.0,
            distance_km: 1.0,
            ..Default::default()
        };
        let distant = VoterProfile {
            user_trust: 50.0,
            distance_km: 500.0,
            ..Default::default()
        };

        tally.record(&local, true);
        tally.record(&distant, false);

        assert_eq!(tally.voters, 2);
        // 2.0 vs 0.25
        assert!((tally.approval_ratio() - 2.0 / 2.25).abs() < 1e-9);
    }

    #[test]
    fn test_explanation() {
        let weight = VoteWeight::for_voter(&VoterProfile {
            user_trust: 50.0,
            distance_km: 10.0,
            is_expert: true,
            is_verified_resident: false,
        });
        assert!(weight.explanation().contains("expert 3.0"));
    }
}
