//! Application state management for the service.
//!
//! The state only carries configuration and telemetry. The kill list lives on
//! disk and the process table is read fresh, so each request builds its own
//! store handle and table.

use herakles_process_control::{JsonFileStore, LinuxProcessTable};
use prometheus::Registry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::telemetry::ControlMetrics;

/// Type alias for shared application state.
pub type SharedState = Arc<AppState>;

/// Global application state shared across requests and background tasks.
pub struct AppState {
    pub registry: Registry,
    /// Request and reconciliation counters; `None` when telemetry is disabled.
    pub metrics: Option<ControlMetrics>,
    pub config: Arc<Config>,
    pub kill_list_path: PathBuf,
    pub proc_root: PathBuf,
    pub netdev_path: PathBuf,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Config, metrics_enabled: bool) -> Result<Self, Box<dyn std::error::Error>> {
        let registry = Registry::new();
        let metrics = if metrics_enabled {
            Some(ControlMetrics::new(&registry)?)
        } else {
            None
        };

        Ok(Self {
            registry,
            metrics,
            kill_list_path: config.kill_list_path(),
            proc_root: config.proc_root(),
            netdev_path: config.netdev_path(),
            config: Arc::new(config),
            start_time: Instant::now(),
        })
    }

    pub fn store(&self) -> JsonFileStore {
        JsonFileStore::new(&self.kill_list_path)
    }

    pub fn process_table(&self) -> LinuxProcessTable {
        LinuxProcessTable::new(&self.proc_root)
    }
}
