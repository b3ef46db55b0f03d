//! Process table backed by /proc and `kill(2)`.

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::{Pid, Uid, User};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::ControlError;
use crate::kill_list::ProcessId;
use crate::process::stat::{
    read_mem_total_bytes, read_process_name, read_real_uid, read_rss_bytes, read_stat,
    read_uptime_seconds,
};
use crate::process::{ProbeError, ProcessSnapshot, ProcessTable, SnapshotIter};

pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Linux process table rooted at a procfs mount.
#[derive(Debug, Clone)]
pub struct LinuxProcessTable {
    proc_root: PathBuf,
}

impl Default for LinuxProcessTable {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_ROOT)
    }
}

impl LinuxProcessTable {
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    pub fn proc_root(&self) -> &Path {
        &self.proc_root
    }

    /// Scans the proc root for numeric directory names.
    fn collect_pids(&self) -> Vec<u32> {
        let entries = match fs::read_dir(&self.proc_root) {
            Ok(e) => e,
            Err(e) => {
                warn!("Cannot read {}: {}", self.proc_root.display(), e);
                return Vec::new();
            }
        };

        let mut pids: Vec<u32> = entries
            .flatten()
            .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
            .filter(|pid| *pid > 0)
            .collect();
        pids.sort_unstable();
        pids
    }
}

/// Per-enumeration context: system totals and a username cache.
struct SnapshotContext {
    mem_total_bytes: Option<u64>,
    uptime_seconds: Option<f64>,
    usernames: HashMap<u32, String>,
}

impl SnapshotContext {
    fn username(&mut self, uid: u32) -> String {
        self.usernames
            .entry(uid)
            .or_insert_with(|| match User::from_uid(Uid::from_raw(uid)) {
                Ok(Some(user)) => user.name,
                _ => uid.to_string(),
            })
            .clone()
    }

    fn snapshot(&mut self, proc_root: &Path, pid: u32) -> Result<ProcessSnapshot, ProbeError> {
        let proc_path = proc_root.join(pid.to_string());
        let stat = read_stat(&proc_path).map_err(|e| ProbeError::from_io(pid, &e))?;
        let uid = read_real_uid(&proc_path).map_err(|e| ProbeError::from_io(pid, &e))?;

        // Kernel threads have no statm pages; treat unreadable as zero.
        let rss_bytes = read_rss_bytes(&proc_path).unwrap_or(0);
        let memory_percent = match self.mem_total_bytes {
            Some(total) if total > 0 => rss_bytes as f64 / total as f64 * 100.0,
            _ => 0.0,
        };
        let cpu_percent = self
            .uptime_seconds
            .map(|uptime| stat.cpu_percent(uptime))
            .unwrap_or(0.0);

        let name = read_process_name(&proc_path).unwrap_or_else(|| stat.comm.clone());

        Ok(ProcessSnapshot {
            pid,
            name,
            ppid: stat.ppid,
            username: self.username(uid),
            cpu_percent,
            memory_percent,
            is_system_process: uid == 0,
        })
    }
}

impl ProcessTable for LinuxProcessTable {
    fn enumerate(&self) -> SnapshotIter<'_> {
        let mut ctx = SnapshotContext {
            mem_total_bytes: read_mem_total_bytes(&self.proc_root)
                .map_err(|e| debug!("MemTotal unavailable: {}", e))
                .ok(),
            uptime_seconds: read_uptime_seconds(&self.proc_root)
                .map_err(|e| debug!("Uptime unavailable: {}", e))
                .ok(),
            usernames: HashMap::new(),
        };
        let root = self.proc_root.as_path();

        Box::new(
            self.collect_pids()
                .into_iter()
                .map(move |pid| ctx.snapshot(root, pid)),
        )
    }

    fn exists(&self, pid: ProcessId) -> bool {
        match signal::kill(Pid::from_raw(pid.as_raw()), None) {
            Ok(()) => true,
            // Exists but belongs to someone else.
            Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }

    fn terminate(&self, pid: ProcessId) -> Result<(), ControlError> {
        match signal::kill(Pid::from_raw(pid.as_raw()), Signal::SIGKILL) {
            Ok(()) => Ok(()),
            Err(Errno::ESRCH) => Err(ControlError::NotFound(pid.get())),
            Err(Errno::EPERM) => Err(ControlError::PermissionDenied(pid.get())),
            Err(e) => Err(ControlError::TerminationFailed(pid.get(), e.to_string())),
        }
    }
}
