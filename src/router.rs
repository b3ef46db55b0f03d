//! Maps an inbound action name and its parameters to a process control
//! operation and renders the result as a JSON document.
//!
//! Every document carries a `status` of `success`, `info` or `error`. Invalid
//! input never escapes as a panic or transport error; it becomes an `error`
//! document with a `message`.

use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::ControlError;
use crate::kill_list::{KillListStore, ProcessId, StoreUpdate};
use crate::netdev::read_network_totals;
use crate::process::{kill_process, list_processes, ProcessTable};
use crate::reconcile::{ReconciliationEngine, ReconciliationReport};

/// Operations reachable through the `action` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    List,
    Kill,
    AddKillList,
    RemoveKillList,
    GetKillList,
    KillLoopCheck,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::List,
        Action::Kill,
        Action::AddKillList,
        Action::RemoveKillList,
        Action::GetKillList,
        Action::KillLoopCheck,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Kill => "kill",
            Action::AddKillList => "add_kill_list",
            Action::RemoveKillList => "remove_kill_list",
            Action::GetKillList => "get_kill_list",
            Action::KillLoopCheck => "kill_loop_check",
        }
    }
}

impl FromStr for Action {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "list" => Ok(Action::List),
            "kill" => Ok(Action::Kill),
            "add_kill_list" => Ok(Action::AddKillList),
            "remove_kill_list" => Ok(Action::RemoveKillList),
            "get_kill_list" | "list_kill_list" => Ok(Action::GetKillList),
            "kill_loop_check" => Ok(Action::KillLoopCheck),
            _ => Err(ControlError::InvalidInput(
                "Invalid action or no action specified".into(),
            )),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one dispatched request.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub action: Option<Action>,
    pub body: Value,
    /// Present for `kill_loop_check` so callers can record outcome telemetry.
    pub reconciliation: Option<ReconciliationReport>,
}

/// Extracts and validates the `pid` parameter.
pub fn parse_pid_param(params: &HashMap<String, String>) -> Result<ProcessId, ControlError> {
    match params.get("pid").map(|s| s.trim()) {
        None | Some("") => Err(ControlError::InvalidInput("PID not provided".into())),
        Some(raw) => raw.parse(),
    }
}

fn error_body(err: &ControlError) -> Value {
    json!({
        "status": "error",
        "error_kind": err.kind(),
        "message": err.to_string(),
    })
}

/// Request router bound to one store and one process table.
pub struct Router<'a, S: ?Sized, T: ?Sized> {
    store: &'a S,
    table: &'a T,
    netdev_path: Option<&'a Path>,
}

impl<'a, S, T> Router<'a, S, T>
where
    S: KillListStore + ?Sized,
    T: ProcessTable + ?Sized,
{
    pub fn new(store: &'a S, table: &'a T) -> Self {
        Self {
            store,
            table,
            netdev_path: None,
        }
    }

    /// Include host network totals in `list` responses.
    pub fn with_netdev(mut self, path: &'a Path) -> Self {
        self.netdev_path = Some(path);
        self
    }

    pub fn dispatch(&self, action: Option<&str>, params: &HashMap<String, String>) -> Dispatched {
        let action = match action.map(str::parse::<Action>) {
            Some(Ok(a)) => a,
            Some(Err(e)) => {
                debug!("Rejected action {:?}", action);
                return Dispatched {
                    action: None,
                    body: error_body(&e),
                    reconciliation: None,
                };
            }
            None => {
                let e = ControlError::InvalidInput("Invalid action or no action specified".into());
                return Dispatched {
                    action: None,
                    body: error_body(&e),
                    reconciliation: None,
                };
            }
        };

        debug!("Dispatching action {}", action);
        let mut reconciliation = None;
        let body = match action {
            Action::List => self.list(),
            Action::Kill => self.kill(params),
            Action::AddKillList => self.add(params),
            Action::RemoveKillList => self.remove(params),
            Action::GetKillList => self.get_kill_list(),
            Action::KillLoopCheck => {
                let report = ReconciliationEngine::new(self.store, self.table).reconcile();
                let body = reconciliation_body(&report);
                reconciliation = Some(report);
                body
            }
        };

        Dispatched {
            action: Some(action),
            body,
            reconciliation,
        }
    }

    fn list(&self) -> Value {
        let processes = list_processes(self.table);
        let network_stats = match self.netdev_path.map(read_network_totals) {
            Some(Ok(totals)) => json!(totals),
            Some(Err(e)) => {
                warn!("Network statistics unavailable: {}", e);
                Value::Null
            }
            None => Value::Null,
        };

        json!({
            "status": "success",
            "processes": processes,
            "network_stats": network_stats,
        })
    }

    fn kill(&self, params: &HashMap<String, String>) -> Value {
        let pid = match parse_pid_param(params) {
            Ok(pid) => pid,
            Err(e) => return error_body(&e),
        };

        match kill_process(self.table, pid) {
            Ok(()) => json!({
                "status": "success",
                "message": format!("Process {} killed", pid),
                "pid": pid,
            }),
            Err(e) => {
                warn!("Kill of PID {} failed: {}", pid, e);
                let mut body = error_body(&e);
                body["pid"] = json!(pid);
                body
            }
        }
    }

    fn add(&self, params: &HashMap<String, String>) -> Value {
        let pid = match parse_pid_param(params) {
            Ok(pid) => pid,
            Err(e) => return error_body(&e),
        };
        let label = params
            .get("label")
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());

        match self.store.add(pid, label) {
            Ok(update) => update_body(
                update,
                format!("PID {} added to kill list", pid),
                format!("PID {} is already in the kill list", pid),
            ),
            Err(e) => error_body(&e),
        }
    }

    fn remove(&self, params: &HashMap<String, String>) -> Value {
        let pid = match parse_pid_param(params) {
            Ok(pid) => pid,
            Err(e) => return error_body(&e),
        };

        match self.store.remove(pid) {
            Ok(update) => update_body(
                update,
                format!("PID {} removed from kill list", pid),
                format!("PID {} not found in kill list", pid),
            ),
            Err(e) => error_body(&e),
        }
    }

    fn get_kill_list(&self) -> Value {
        json!({
            "status": "success",
            "kill_list": self.store.load(),
        })
    }
}

fn update_body(update: StoreUpdate, changed_msg: String, unchanged_msg: String) -> Value {
    let (status, message) = if update.changed {
        ("success", changed_msg)
    } else {
        ("info", unchanged_msg)
    };
    json!({
        "status": status,
        "message": message,
        "kill_list": update.entries,
    })
}

/// Renders a reconciliation report; a persistence failure turns the status
/// into `error` while still carrying every outcome.
pub fn reconciliation_body(report: &ReconciliationReport) -> Value {
    let mut body = match serde_json::to_value(report) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };

    let (status, message) = match (&report.persistence_error, report.processed_count) {
        (Some(e), _) => (
            "error",
            format!(
                "Kill list could not be updated; stale entries will be retried: {}",
                e
            ),
        ),
        (None, 0) => ("success", "Kill list is empty. No actions taken.".to_string()),
        (None, n) => ("success", format!("Processed {} kill list entries", n)),
    };

    body.insert("status".into(), json!(status));
    body.insert("message".into(), json!(message));
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_action_aliases() {
        assert_eq!("get_kill_list".parse::<Action>().unwrap(), Action::GetKillList);
        assert_eq!("list_kill_list".parse::<Action>().unwrap(), Action::GetKillList);
        assert!("reboot".parse::<Action>().is_err());
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
    }

    #[test]
    fn test_parse_pid_param() {
        assert_eq!(parse_pid_param(&params(&[("pid", "12")])).unwrap().get(), 12);
        assert_eq!(
            parse_pid_param(&params(&[])),
            Err(ControlError::InvalidInput("PID not provided".into()))
        );
        assert_eq!(
            parse_pid_param(&params(&[("pid", "  ")])),
            Err(ControlError::InvalidInput("PID not provided".into()))
        );
        assert!(parse_pid_param(&params(&[("pid", "-5")])).is_err());
        assert!(parse_pid_param(&params(&[("pid", "abc")])).is_err());
    }

    #[test]
    fn test_reconciliation_body_empty() {
        let body = reconciliation_body(&ReconciliationReport::default());
        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "Kill list is empty. No actions taken.");
        assert_eq!(body["processed_count"], 0);
        assert_eq!(body["outcomes"], json!([]));
    }

    #[test]
    fn test_reconciliation_body_persistence_error() {
        let report = ReconciliationReport {
            processed_count: 1,
            already_gone_count: 1,
            persistence_error: Some("disk full".into()),
            ..Default::default()
        };
        let body = reconciliation_body(&report);
        assert_eq!(body["status"], "error");
        assert_eq!(body["persistence_error"], "disk full");
        assert_eq!(body["already_gone_count"], 1);
    }
}
