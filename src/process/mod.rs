//! Process table access: enumeration, point lookups and termination.
//!
//! This module provides:
//! - `ProcessTable`: the narrow contract the reconciliation engine consumes
//! - `linux`: the /proc and signal backed implementation
//! - `stat`: parsers for the /proc files a snapshot is built from

pub mod linux;
pub mod stat;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::error::ControlError;
use crate::kill_list::ProcessId;

pub use linux::LinuxProcessTable;

/// Immutable view of one process at enumeration time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub name: String,
    pub ppid: u32,
    pub username: String,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub is_system_process: bool,
}

/// Failure to build the snapshot of a single process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("process {0} exited during enumeration")]
    Vanished(u32),
    #[error("access denied reading process {0}")]
    AccessDenied(u32),
    #[error("cannot read process {0}: {1}")]
    Unreadable(u32, String),
}

impl ProbeError {
    pub fn from_io(pid: u32, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => ProbeError::Vanished(pid),
            std::io::ErrorKind::PermissionDenied => ProbeError::AccessDenied(pid),
            _ => ProbeError::Unreadable(pid, err.to_string()),
        }
    }
}

/// Lazy sequence of snapshots; each element fails independently.
pub type SnapshotIter<'a> = Box<dyn Iterator<Item = Result<ProcessSnapshot, ProbeError>> + 'a>;

/// Live operating-system process table.
pub trait ProcessTable {
    fn enumerate(&self) -> SnapshotIter<'_>;

    fn exists(&self, pid: ProcessId) -> bool;

    /// Sends a non-catchable termination signal.
    ///
    /// Fails with `NotFound` when the process is gone, `PermissionDenied`
    /// when the caller lacks rights and `TerminationFailed` otherwise.
    fn terminate(&self, pid: ProcessId) -> Result<(), ControlError>;
}

/// Lists all processes, silently omitting those that cannot be read.
pub fn list_processes<T: ProcessTable + ?Sized>(table: &T) -> Vec<ProcessSnapshot> {
    let mut skipped = 0usize;
    let processes: Vec<ProcessSnapshot> = table
        .enumerate()
        .filter_map(|item| match item {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                skipped += 1;
                debug!("Skipping process: {}", e);
                None
            }
        })
        .collect();

    debug!(
        "Listed {} processes ({} skipped)",
        processes.len(),
        skipped
    );
    processes
}

/// Terminates a single process immediately. Does not touch the kill list.
pub fn kill_process<T: ProcessTable + ?Sized>(
    table: &T,
    pid: ProcessId,
) -> Result<(), ControlError> {
    table.terminate(pid)?;
    info!("Process {} killed", pid);
    Ok(())
}
