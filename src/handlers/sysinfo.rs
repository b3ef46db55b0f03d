//! Process control endpoint handler.
//!
//! This module provides the `/sysinfo` endpoint. The `action` parameter
//! selects the operation (`list`, `kill`, `add_kill_list`, `remove_kill_list`,
//! `get_kill_list`, `kill_loop_check`); parameters arrive as a query string on
//! GET or as a form body on POST. The reply is always a JSON document.

use axum::{
    extract::{Form, Query, State},
    Json,
};
use herakles_process_control::{Dispatched, KillListStore, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, error, instrument};

use crate::state::SharedState;

/// Handler for GET /sysinfo?action=...
#[instrument(skip(state))]
pub async fn sysinfo_get_handler(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    debug!("Processing GET /sysinfo request");
    Json(run_action(state, params).await)
}

/// Handler for POST /sysinfo with a form-encoded body.
#[instrument(skip(state))]
pub async fn sysinfo_post_handler(
    State(state): State<SharedState>,
    Form(params): Form<HashMap<String, String>>,
) -> Json<Value> {
    debug!("Processing POST /sysinfo request");
    Json(run_action(state, params).await)
}

/// Runs one action on the blocking pool and records telemetry.
async fn run_action(state: SharedState, params: HashMap<String, String>) -> Value {
    let worker_state = state.clone();
    let result = tokio::task::spawn_blocking(move || dispatch_blocking(&worker_state, &params)).await;

    let (dispatched, remaining) = match result {
        Ok(r) => r,
        Err(e) => {
            error!("Process control task failed: {}", e);
            return json!({
                "status": "error",
                "message": "Internal error while processing the request",
            });
        }
    };

    if let Some(metrics) = &state.metrics {
        metrics.record_request(dispatched.action);
        if let Some(report) = &dispatched.reconciliation {
            metrics.record_reconciliation(report);
        }
        let listed = dispatched
            .body
            .get("kill_list")
            .and_then(Value::as_array)
            .map(Vec::len);
        if let Some(n) = listed.or(remaining) {
            metrics.kill_list_entries.set(n as f64);
        }
    }

    dispatched.body
}

/// Dispatches the action; after a reconciliation pass also returns the
/// remaining kill-list size.
fn dispatch_blocking(
    state: &SharedState,
    params: &HashMap<String, String>,
) -> (Dispatched, Option<usize>) {
    let store = state.store();
    let table = state.process_table();
    let action = params.get("action").map(String::as_str);

    let dispatched = Router::new(&store, &table)
        .with_netdev(&state.netdev_path)
        .dispatch(action, params);
    let remaining = dispatched
        .reconciliation
        .as_ref()
        .map(|_| store.load().len());
    (dispatched, remaining)
}
