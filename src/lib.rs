//! Herakles Process Control Library
//!
//! Live process listing and selective process termination for Linux hosts,
//! built around a durable kill list that is reconciled on demand.
//!
//! # Components
//!
//! - **Kill list** ([`kill_list`]): durable, deduplicated set of termination
//!   targets persisted with atomic replace
//! - **Process table** ([`process`]): enumeration, point lookups and SIGKILL
//!   delivery, with per-process failures isolated
//! - **Reconciliation** ([`reconcile`]): terminates listed processes,
//!   classifies every outcome and shrinks the kill list
//! - **Router** ([`router`]): action name + parameters to JSON document
//!
//! # Usage
//!
//! ```rust,no_run
//! use herakles_process_control::{JsonFileStore, LinuxProcessTable, ReconciliationEngine};
//!
//! let store = JsonFileStore::new("/var/lib/herakles/kill_list.json");
//! let table = LinuxProcessTable::default();
//!
//! let report = ReconciliationEngine::new(&store, &table).reconcile();
//! for outcome in &report.outcomes {
//!     println!("{}: {}", outcome.pid, outcome.result.as_str());
//! }
//! ```

pub mod error;
pub mod kill_list;
pub mod netdev;
pub mod process;
pub mod reconcile;
pub mod router;

// Re-export main types for convenience
pub use error::ControlError;
pub use kill_list::{JsonFileStore, KillListEntry, KillListStore, ProcessId, StoreUpdate};
pub use netdev::NetworkTotals;
pub use process::{LinuxProcessTable, ProbeError, ProcessSnapshot, ProcessTable};
pub use reconcile::{
    OutcomeKind, ReconciliationEngine, ReconciliationOutcome, ReconciliationReport,
};
pub use router::{Action, Dispatched, Router};
