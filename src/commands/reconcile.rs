//! Reconcile command implementation.
//!
//! Runs one reconciliation pass against the configured kill list and prints
//! the report as JSON.

use herakles_process_control::router::reconciliation_body;
use herakles_process_control::{JsonFileStore, LinuxProcessTable, ReconciliationEngine};

use crate::config::Config;

/// Runs a single reconciliation pass.
///
/// Exits with code 1 if the kill list could not be updated afterwards.
pub fn command_reconcile(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = JsonFileStore::new(config.kill_list_path());
    let table = LinuxProcessTable::new(config.proc_root());

    let report = ReconciliationEngine::new(&store, &table).reconcile();
    println!("{}", serde_json::to_string_pretty(&reconciliation_body(&report))?);

    if report.persistence_error.is_some() {
        std::process::exit(1);
    }
    Ok(())
}
