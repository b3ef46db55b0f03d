//! Health check endpoint handler.
//!
//! This module provides the `/health` endpoint handler that reports service
//! uptime and whether the kill list can be read.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use herakles_process_control::KillListStore;
use tracing::{debug, instrument};

use crate::state::SharedState;

// Time conversion constants
const SECONDS_PER_HOUR: f64 = 3600.0;
const MINUTES_PER_HOUR: f64 = 60.0;
const HOURS_PER_DAY: f64 = 24.0;

/// Footer text for human-readable HTTP endpoints.
pub const FOOTER_TEXT: &str = "Project: https://github.com/cansp-dev/herakles-process-control | More info: https://www.herakles.now | Support: exporter@herakles.now";

/// Formats an uptime in the largest sensible unit.
pub fn format_uptime(uptime_seconds: u64) -> String {
    let uptime_hours = uptime_seconds as f64 / SECONDS_PER_HOUR;
    if uptime_hours < 1.0 {
        format!("{:.1} minutes", uptime_hours * MINUTES_PER_HOUR)
    } else if uptime_hours < HOURS_PER_DAY {
        format!("{:.1} hours", uptime_hours)
    } else {
        format!("{:.1} days", uptime_hours / HOURS_PER_DAY)
    }
}

/// Handler for the /health endpoint.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /health request");

    let proc_ok = state.proc_root.join("self").exists();
    let status = if proc_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let message = if proc_ok {
        "OK"
    } else {
        "Process table unavailable"
    };

    let store = state.store();
    let entries = tokio::task::spawn_blocking(move || store.load().len())
        .await
        .unwrap_or(0);

    let uptime_str = format_uptime(state.start_time.elapsed().as_secs());

    debug!("Health check: {} - {}", status, message);
    (
        status,
        [("Content-Type", "text/plain; charset=utf-8")],
        format!(
            "{message}\n\nUptime: {uptime_str}\nProcess table: {}\nKill list: {} ({} entries)\n\n{FOOTER_TEXT}",
            state.proc_root.display(),
            state.kill_list_path.display(),
            entries,
        ),
    )
}
