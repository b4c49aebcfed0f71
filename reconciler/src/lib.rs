//! Background reconciliation of time-based governance state.
//!
//! # Key Components
//!
//! - [`RtiRequest`]: disclosure request lifecycle and the deadline rule
//! - [`EntityStore`]: load/save interface with in-memory and JSON-file backends
//! - [`GovernanceState`]: audit chain, reputation ledger and identity escrow,
//!   restored from the store at startup
//! - [`EscalationWorker`]: periodic, non-overlapping sweeps over requests and
//!   reputation scores
//! - [`CrisisModeProvider`]: caller-side gate for suspending actions
//!
//! # Example
//!
//! ```ignore
//! use reconciler::{EscalationWorker, GovernanceState, JsonFileStore, ReconcilerConfig};
//!
//! let store = Arc::new(JsonFileStore::open("state.json").await?);
//! let state = Arc::new(GovernanceState::bootstrap(store, Arc::new(SystemClock)).await?);
//! let worker = Arc::new(EscalationWorker::new(state, config.worker));
//! let report = worker.sweep().await?;
//! ```

pub mod config;
pub mod crisis;
pub mod rti;
pub mod state;
pub mod store;
pub mod types;
pub mod worker;

// Re-export main types
pub use config::{GeneralConfig, ReconcilerConfig, ScoringConfig, WorkerConfig};
pub use crisis::{ensure_not_in_crisis, CrisisFlag, CrisisModeProvider};
pub use rti::{next_status, next_status_with_threshold, RtiRequest, RtiStatus, ESCALATION_THRESHOLD};
pub use state::GovernanceState;
pub use store::{EntityStore, JsonFileStore, MemoryStore, Snapshot};
pub use types::{ReconcilerError, Result};
pub use worker::{EscalationWorker, SweepReport};
