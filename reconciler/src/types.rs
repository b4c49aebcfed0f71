//! Error types for the reconciler.

/// Error types for reconciliation.
#[derive(Debug, thiserror::Error)]
pub enum ReconcilerError {
    /// Persistence layer failure
    #[error("Store error: {0}")]
    Store(String),

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Status change not allowed by the lifecycle
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Caller-side gate: crisis mode blocks the action
    #[error("Crisis mode active: {0} is suspended")]
    CrisisMode(String),

    /// Input rejected before any state changed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Ledger error (integrity violations are fatal)
    #[error(transparent)]
    Ledger(#[from] ledger::LedgerError),
}

impl ReconcilerError {
    /// Whether this error must halt dependent processing.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ReconcilerError::Ledger(e) if e.is_integrity())
    }
}

impl From<serde_json::Error> for ReconcilerError {
    fn from(e: serde_json::Error) -> Self {
        ReconcilerError::Store(format!("serialization failed: {e}"))
    }
}

impl From<std::io::Error> for ReconcilerError {
    fn from(e: std::io::Error) -> Self {
        ReconcilerError::Store(format!("I/O failed: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, ReconcilerError>;
