//! Kill-list reconciliation.
//!
//! A pass compares the durable kill list against the live process table,
//! terminates every listed process that is still running and drops the
//! entries whose intent has been fulfilled. Every branch is idempotent, so a
//! pass can be re-run at any time: a process that is already gone counts as
//! done, and denied or failed entries stay listed for a later attempt.
//!
//! Entries are processed sequentially in list order. Two passes racing each
//! other, or a pass racing an add/remove, are not coordinated: the atomic
//! replace of the store bounds this to "last writer wins", which may lose the
//! other request's update.

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::ControlError;
use crate::kill_list::{KillListEntry, KillListStore, ProcessId};
use crate::process::ProcessTable;

/// Classification of what happened to one kill-list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Terminated,
    AlreadyGone,
    Denied,
    Failed,
}

impl OutcomeKind {
    pub const ALL: [OutcomeKind; 4] = [
        OutcomeKind::Terminated,
        OutcomeKind::AlreadyGone,
        OutcomeKind::Denied,
        OutcomeKind::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeKind::Terminated => "terminated",
            OutcomeKind::AlreadyGone => "already_gone",
            OutcomeKind::Denied => "denied",
            OutcomeKind::Failed => "failed",
        }
    }

    /// Whether the entry's intent is fulfilled and it leaves the kill list.
    pub fn removes_entry(self) -> bool {
        matches!(self, OutcomeKind::Terminated | OutcomeKind::AlreadyGone)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationOutcome {
    pub pid: ProcessId,
    pub result: OutcomeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Everything a single pass did, in kill-list order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub processed_count: usize,
    pub terminated_count: usize,
    pub already_gone_count: usize,
    pub denied_count: usize,
    pub failed_count: usize,
    pub outcomes: Vec<ReconciliationOutcome>,
    /// True when the pass rewrote the durable list.
    pub store_updated: bool,
    /// Set when the pass could not persist the shrunken list; the stale
    /// entries will be reprocessed by the next pass.
    pub persistence_error: Option<String>,
}

impl ReconciliationReport {
    pub fn count(&self, kind: OutcomeKind) -> usize {
        match kind {
            OutcomeKind::Terminated => self.terminated_count,
            OutcomeKind::AlreadyGone => self.already_gone_count,
            OutcomeKind::Denied => self.denied_count,
            OutcomeKind::Failed => self.failed_count,
        }
    }

    fn record(&mut self, outcome: ReconciliationOutcome) {
        match outcome.result {
            OutcomeKind::Terminated => self.terminated_count += 1,
            OutcomeKind::AlreadyGone => self.already_gone_count += 1,
            OutcomeKind::Denied => self.denied_count += 1,
            OutcomeKind::Failed => self.failed_count += 1,
        }
        self.processed_count += 1;
        self.outcomes.push(outcome);
    }
}

/// Converges the durable kill list with the live process table.
pub struct ReconciliationEngine<'a, S: ?Sized, T: ?Sized> {
    store: &'a S,
    table: &'a T,
}

impl<'a, S, T> ReconciliationEngine<'a, S, T>
where
    S: KillListStore + ?Sized,
    T: ProcessTable + ?Sized,
{
    pub fn new(store: &'a S, table: &'a T) -> Self {
        Self { store, table }
    }

    /// Runs one reconciliation pass.
    pub fn reconcile(&self) -> ReconciliationReport {
        let entries = self.store.load();
        let mut report = ReconciliationReport::default();

        if entries.is_empty() {
            debug!("Kill list is empty, nothing to reconcile");
            return report;
        }

        let mut remaining: Vec<KillListEntry> = Vec::with_capacity(entries.len());
        for entry in &entries {
            let outcome = self.process_entry(entry);
            if !outcome.result.removes_entry() {
                remaining.push(entry.clone());
            }
            report.record(outcome);
        }

        if remaining.len() < entries.len() {
            match self.store.save(&remaining) {
                Ok(_) => report.store_updated = true,
                Err(e) => {
                    error!("Reconciliation could not update kill list: {}", e);
                    report.persistence_error = Some(e.to_string());
                }
            }
        }

        info!(
            "Reconciled {} entries: {} terminated, {} already gone, {} denied, {} failed",
            report.processed_count,
            report.terminated_count,
            report.already_gone_count,
            report.denied_count,
            report.failed_count
        );
        report
    }

    fn process_entry(&self, entry: &KillListEntry) -> ReconciliationOutcome {
        let pid = entry.pid;
        let (result, message) = if !self.table.exists(pid) {
            debug!("PID {} already gone", pid);
            (OutcomeKind::AlreadyGone, None)
        } else {
            match self.table.terminate(pid) {
                Ok(()) => {
                    info!("PID {} terminated", pid);
                    (OutcomeKind::Terminated, None)
                }
                // Exited between the lookup and the signal.
                Err(ControlError::NotFound(_)) => {
                    debug!("PID {} exited before it could be signalled", pid);
                    (OutcomeKind::AlreadyGone, None)
                }
                Err(e @ ControlError::PermissionDenied(_)) => {
                    warn!("PID {} not terminated: {}", pid, e);
                    (OutcomeKind::Denied, Some(e.to_string()))
                }
                Err(e) => {
                    warn!("PID {} not terminated: {}", pid, e);
                    (OutcomeKind::Failed, Some(e.to_string()))
                }
            }
        };

        ReconciliationOutcome {
            pid,
            result,
            label: entry.label.clone(),
            message,
        }
    }
}
