//! Durable kill list: the set of processes the operator intends to terminate.
//!
//! The list is the only durable state of the service. Every mutation goes
//! through load → modify → atomic replace, so a reader only ever observes the
//! previous document or the new one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::ControlError;

/// Default location of the kill-list document.
pub const DEFAULT_KILL_LIST_PATH: &str = "/var/lib/herakles/kill_list.json";

/// Positive identifier of a live OS process.
///
/// Identifiers are reused by the kernel once a process exits, so a value is
/// only meaningful at the moment it is looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProcessId(u32);

impl ProcessId {
    /// Largest identifier that can be passed to `kill(2)`.
    pub const MAX: u32 = i32::MAX as u32;

    /// Validates a raw integer as a process identifier.
    pub fn new(raw: i64) -> Result<Self, ControlError> {
        if raw <= 0 {
            return Err(ControlError::InvalidInput(format!(
                "PID must be a positive integer, got {}",
                raw
            )));
        }
        if raw > i64::from(Self::MAX) {
            return Err(ControlError::InvalidInput(format!(
                "PID {} is out of range",
                raw
            )));
        }
        Ok(Self(raw as u32))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn as_raw(self) -> i32 {
        self.0 as i32
    }
}

impl FromStr for ProcessId {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let raw: i64 = trimmed
            .parse()
            .map_err(|_| ControlError::InvalidInput(format!("Invalid PID format: {}", s)))?;
        Self::new(raw)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A recorded intent to terminate one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KillListEntry {
    pub pid: ProcessId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

impl KillListEntry {
    pub fn new(pid: ProcessId) -> Self {
        Self {
            pid,
            label: None,
            added_at: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// On-disk shape of an entry before identifier validation.
#[derive(Debug, Deserialize)]
struct StoredEntry {
    pid: i64,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    added_at: Option<DateTime<Utc>>,
}

/// Result of an add or remove: the resulting list and whether it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreUpdate {
    pub entries: Vec<KillListEntry>,
    pub changed: bool,
}

/// Collapses duplicate identifiers. The last entry for an identifier wins but
/// keeps the position of the first occurrence.
pub fn dedup_entries<I>(entries: I) -> Vec<KillListEntry>
where
    I: IntoIterator<Item = KillListEntry>,
{
    let mut out: Vec<KillListEntry> = Vec::new();
    for entry in entries {
        match out.iter_mut().find(|e| e.pid == entry.pid) {
            Some(existing) => *existing = entry,
            None => out.push(entry),
        }
    }
    out
}

/// Durable, atomically replaceable kill list.
///
/// `load` never fails: an absent or unreadable document is an empty list.
/// `add` and `remove` are built on `load`/`save` and only write when the list
/// actually changes.
pub trait KillListStore {
    fn load(&self) -> Vec<KillListEntry>;

    /// Replaces the durable list with `entries` (deduplicated) and returns
    /// what was written.
    fn save(&self, entries: &[KillListEntry]) -> Result<Vec<KillListEntry>, ControlError>;

    fn add(&self, pid: ProcessId, label: Option<String>) -> Result<StoreUpdate, ControlError> {
        let mut entries = self.load();
        if entries.iter().any(|e| e.pid == pid) {
            debug!("PID {} already present in kill list", pid);
            return Ok(StoreUpdate {
                entries,
                changed: false,
            });
        }

        entries.push(KillListEntry {
            pid,
            label,
            added_at: Some(Utc::now()),
        });
        let entries = self.save(&entries)?;
        Ok(StoreUpdate {
            entries,
            changed: true,
        })
    }

    fn remove(&self, pid: ProcessId) -> Result<StoreUpdate, ControlError> {
        let mut entries = self.load();
        let before = entries.len();
        entries.retain(|e| e.pid != pid);
        if entries.len() == before {
            debug!("PID {} not present in kill list", pid);
            return Ok(StoreUpdate {
                entries,
                changed: false,
            });
        }

        let entries = self.save(&entries)?;
        Ok(StoreUpdate {
            entries,
            changed: true,
        })
    }
}

/// Kill list persisted as a pretty-printed JSON array.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }

    fn persistence_error(&self, err: impl fmt::Display) -> ControlError {
        ControlError::PersistenceError(format!("{}: {}", self.path.display(), err))
    }
}

impl KillListStore for JsonFileStore {
    fn load(&self) -> Vec<KillListEntry> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(
                    "Cannot read kill list {}: {} - treating as empty",
                    self.path.display(),
                    e
                );
                return Vec::new();
            }
        };

        let stored: Vec<StoredEntry> = match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    "Kill list {} is malformed: {} - treating as empty",
                    self.path.display(),
                    e
                );
                return Vec::new();
            }
        };

        let entries = stored.into_iter().filter_map(|s| match ProcessId::new(s.pid) {
            Ok(pid) => Some(KillListEntry {
                pid,
                label: s.label,
                added_at: s.added_at,
            }),
            Err(_) => {
                debug!("Dropping kill list entry with invalid PID {}", s.pid);
                None
            }
        });

        dedup_entries(entries)
    }

    fn save(&self, entries: &[KillListEntry]) -> Result<Vec<KillListEntry>, ControlError> {
        let entries = dedup_entries(entries.iter().cloned());
        let mut json =
            serde_json::to_string_pretty(&entries).map_err(|e| self.persistence_error(e))?;
        json.push('\n');

        let dir = self.parent_dir();
        fs::create_dir_all(dir).map_err(|e| self.persistence_error(e))?;

        // Same directory as the target so the rename cannot cross filesystems.
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.persistence_error(e))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| self.persistence_error(e))?;
        // The temp file starts out 0600; keep the mode of the document it replaces.
        if let Ok(meta) = fs::metadata(&self.path) {
            tmp.as_file()
                .set_permissions(meta.permissions())
                .map_err(|e| self.persistence_error(e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| self.persistence_error(e))?;
        tmp.persist(&self.path)
            .map_err(|e| self.persistence_error(e.error))?;

        debug!(
            "Kill list saved to {} ({} entries)",
            self.path.display(),
            entries.len()
        );
        Ok(entries)
    }
}
