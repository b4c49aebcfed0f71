//! Configuration for the reconciler.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use scoring::MoralWeights;

use crate::types::{ReconcilerError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Escalation worker configuration
    pub worker: WorkerConfig,
    /// Scoring configuration
    pub scoring: ScoringConfig,
    /// General settings
    pub general: GeneralConfig,
}

impl ReconcilerConfig {
    /// Load config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| ReconcilerError::Config(format!("invalid YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| ReconcilerError::Config(e.to_string()))
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.worker.sweep_interval_secs == 0 {
            return Err(ReconcilerError::Config(
                "worker.sweep_interval_secs must be positive".to_string(),
            ));
        }
        if !(self.worker.escalation_threshold > 0.0 && self.worker.escalation_threshold < 1.0) {
            return Err(ReconcilerError::Config(
                "worker.escalation_threshold must be in (0, 1)".to_string(),
            ));
        }
        if !self.worker.reputation_decay_per_sweep.is_finite()
            || self.worker.reputation_decay_per_sweep < 0.0
        {
            return Err(ReconcilerError::Config(
                "worker.reputation_decay_per_sweep must be non-negative".to_string(),
            ));
        }
        if self.worker.actor.trim().is_empty() {
            return Err(ReconcilerError::Config("worker.actor must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Escalation worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Time between sweeps (seconds)
    pub sweep_interval_secs: u64,
    /// Trust points removed from every user per sweep
    pub reputation_decay_per_sweep: f64,
    /// Elapsed fraction of the response window that triggers escalation
    pub escalation_threshold: f64,
    /// Actor recorded on audit entries the worker writes
    pub actor: String,
}

impl WorkerConfig {
    /// Sweep interval as a duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 300, // 5 minutes
            reputation_decay_per_sweep: 0.5,
            escalation_threshold: crate::rti::ESCALATION_THRESHOLD,
            actor: "system:escalation-worker".to_string(),
        }
    }
}

/// Scoring configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Moral scorer weights
    pub moral_weights: MoralWeights,
}

/// General configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level
    pub log_level: String,
    /// Emit logs as JSON
    pub json_logs: bool,
    /// JSON snapshot file backing the store
    pub store_path: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            store_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReconcilerConfig::default();
        assert_eq!(config.worker.sweep_interval_secs, 300);
        assert_eq!(config.worker.escalation_threshold, 0.8);
        assert_eq!(config.scoring.moral_weights.poverty_benefit, 0.4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = "worker:\n  sweep_interval_secs: 60\ngeneral:\n  log_level: debug\n";
        let config = ReconcilerConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.worker.sweep_interval_secs, 60);
        assert_eq!(config.worker.reputation_decay_per_sweep, 0.5);
        assert_eq!(config.general.log_level, "debug");
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = ReconcilerConfig::default();
        let yaml = config.to_yaml().unwrap();
        let parsed = ReconcilerConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.worker.actor, config.worker.actor);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(ReconcilerConfig::from_yaml("worker:\n  sweep_interval_secs: 0\n").is_err());
        assert!(ReconcilerConfig::from_yaml("worker:\n  escalation_threshold: 1.5\n").is_err());
        assert!(ReconcilerConfig::from_yaml("worker:\n  reputation_decay_per_sweep: -1\n").is_err());
    }
}
