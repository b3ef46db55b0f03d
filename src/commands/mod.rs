//! CLI command implementations for herakles-process-control.
//!
//! This module provides implementations for all CLI subcommands:
//! - `check`: System validation
//! - `config`: Configuration file generation
//! - `reconcile`: One-shot kill-list reconciliation
//! - `kill_list`: Kill-list inspection and editing

pub mod check;
pub mod config;
pub mod kill_list;
pub mod reconcile;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use kill_list::command_kill_list;
pub use reconcile::command_reconcile;
