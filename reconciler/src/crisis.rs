//! Crisis-mode gate.
//!
//! During a declared crisis, outer layers suspend non-essential actions
//! (votes, tenders). The reconciler never consults the flag itself; callers
//! gate their own actions with [`ensure_not_in_crisis`].

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::types::{ReconcilerError, Result};

/// Source of the crisis-mode flag.
pub trait CrisisModeProvider: Send + Sync {
    /// Whether crisis mode is currently declared.
    fn is_crisis_mode_active(&self) -> bool;
}

/// Process-local crisis flag.
#[derive(Debug, Default)]
pub struct CrisisFlag {
    active: AtomicBool,
}

impl CrisisFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a crisis.
    pub fn activate(&self, reason: &str) {
        if !self.active.swap(true, Ordering::SeqCst) {
            warn!(reason = %reason, "Crisis mode activated");
        }
    }

    /// Lift the crisis.
    pub fn deactivate(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            info!("Crisis mode lifted");
        }
    }
}

impl CrisisModeProvider for CrisisFlag {
    fn is_crisis_mode_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Fail with [`ReconcilerError::CrisisMode`] if a crisis is active.
pub fn ensure_not_in_crisis(provider: &dyn CrisisModeProvider, action: &str) -> Result<()> {
    if provider.is_crisis_mode_active() {
        return Err(ReconcilerError::CrisisMode(action.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_follows_flag() {
        let flag = CrisisFlag::new();
        assert!(ensure_not_in_crisis(&flag, "voting").is_ok());

        flag.activate("flood");
        let err = ensure_not_in_crisis(&flag, "voting").unwrap_err();
        assert_eq!(err.to_string(), "Crisis mode active: voting is suspended");

        flag.deactivate();
        assert!(ensure_not_in_crisis(&flag, "voting").is_ok());
    }
}
