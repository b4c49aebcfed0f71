//! Process-wide integrity state for the civic governance engine.
//!
//! - [`AuditChain`]: append-only, SHA-256 hash-linked log of privileged actions
//! - [`IdentityEscrow`]: 2-of-2 Shamir-split identity vault gated by a court order
//! - [`ReputationLedger`]: per-user trust scores with serialized updates
//!
//! Each of these is an explicit state object: construct it once at service
//! start (usually from persisted storage) and share it by `Arc`.
//!
//! # Example
//!
//! ```ignore
//! use ledger::{AuditChain, AuditRecord, SystemClock};
//!
//! let chain = AuditChain::new(Arc::new(SystemClock));
//! chain.append(AuditRecord::new("admin-7", "moderator", "report_hidden", "report-42")).await?;
//! assert!(chain.verify().await.is_ok());
//! ```

pub mod audit;
pub mod clock;
pub mod escrow;
pub mod reputation;
pub mod shamir;
pub mod types;

// Re-export main types
pub use audit::{check_chain, verify_chain, AuditChain, AuditEntry, AuditRecord, GENESIS_HASH};
pub use clock::{Clock, ManualClock, SystemClock};
pub use escrow::{EscrowOutcome, IdentityEscrow, IdentityUnlockRequest, SealedIdentity};
pub use reputation::{ReputationEvent, ReputationLedger, ReputationRecord, DEFAULT_TRUST_SCORE};
pub use shamir::KeyShare;
pub use types::{LedgerError, Result};
