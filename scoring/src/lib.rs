//! Deterministic scoring for the civic governance engine.
//!
//! Every function in this crate is pure: signals go in, a score plus a
//! human-readable explanation comes out. Nothing here performs I/O or holds
//! shared mutable state, so callers may invoke it concurrently without
//! synchronization.
//!
//! - **Truth**: probability that a citizen report is accurate
//! - **Influence**: bot / coordinated-voting risk from vote telemetry
//! - **Vote**: per-voter weight for project approval tallies
//! - **Budget**: government-vs-market cost deviation
//! - **Moral**: net social-impact scalar
//! - **Syndicate**: procurement-network collusion density
//! - **Reputation**: trust-score adjustment rules
//!
//! With the `typescript` feature enabled, the record types can be exported
//! to TypeScript for the front-end that renders them.
//!
//! # Example
//!
//! ```
//! use scoring::{compute_truth_score, SignalBundle};
//!
//! let result = compute_truth_score(&SignalBundle {
//!     reporter_trust: 85.0,
//!     evidence_count: 2,
//!     geo_distance_km: 0.05,
//!     community_support: 1240,
//!     community_doubt: 10,
//! });
//! assert_eq!(result.score, 82);
//! ```

pub mod budget;
pub mod influence;
pub mod math;
pub mod moral;
pub mod reputation;
pub mod syndicate;
pub mod truth;
pub mod types;
pub mod vote;

// Re-export main types
pub use budget::{analyze_budget, BudgetAnalysis, BudgetLineItem};
pub use influence::{assess_bot_risk, InfluenceAssessment, VoteTelemetry};
pub use moral::{compute_moral_score, compute_moral_score_with, ImpactAssessment, MoralScore, MoralWeights};
pub use reputation::{decay_reputation, update_reputation, ReputationAction};
pub use syndicate::{compute_syndicate_score, EdgeType, NetworkEdge, NetworkNode, NodeType, SyndicateScore, TenderNetwork};
pub use truth::{compute_truth_score, SignalBundle, TruthResult, TruthSignals};
pub use types::{Result, RiskLevel, ScoreError};
pub use vote::{compute_vote_weight, VoteWeight, VoterProfile, WeightedTally};
