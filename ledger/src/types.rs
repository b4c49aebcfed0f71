//! Error types for the ledger crate.

/// Error types for ledger state.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Missing or malformed required input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The audit chain failed verification. Fatal; never retried.
    #[error("Audit chain integrity violation at entry {index}: {reason}")]
    Integrity {
        /// Position of the first broken entry
        index: usize,
        /// What did not match
        reason: String,
    },

    /// Cryptographic primitive failure
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Scoring rule rejected the input
    #[error("Scoring error: {0}")]
    Scoring(#[from] scoring::ScoreError),
}

impl LedgerError {
    /// Whether the error is a fatal integrity violation.
    pub fn is_integrity(&self) -> bool {
        matches!(self, LedgerError::Integrity { .. })
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Reject empty (or whitespace-only) required identifiers.
pub(crate) fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(())
}
