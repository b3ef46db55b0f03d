//! Prometheus metrics for process control requests and reconciliation passes.

use herakles_process_control::{Action, OutcomeKind, ReconciliationReport};
use prometheus::{Counter, CounterVec, Gauge, Opts, Registry};

/// Request and reconciliation counters exposed on `/metrics`.
#[derive(Clone)]
pub struct ControlMetrics {
    pub requests_total: CounterVec,          // labels: action
    pub reconcile_outcomes_total: CounterVec, // labels: result
    pub reconcile_passes_total: Counter,
    pub persistence_errors_total: Counter,
    pub kill_list_entries: Gauge,
}

impl ControlMetrics {
    /// Creates and registers all Prometheus metrics with the registry.
    pub fn new(registry: &Registry) -> Result<Self, Box<dyn std::error::Error>> {
        let requests_total = CounterVec::new(
            Opts::new(
                "herakles_control_requests_total",
                "Total process control requests by action",
            ),
            &["action"],
        )?;
        let reconcile_outcomes_total = CounterVec::new(
            Opts::new(
                "herakles_control_reconcile_outcomes_total",
                "Total kill-list reconciliation outcomes by result",
            ),
            &["result"],
        )?;
        let reconcile_passes_total = Counter::new(
            "herakles_control_reconcile_passes_total",
            "Total reconciliation passes run (requests and timer)",
        )?;
        let persistence_errors_total = Counter::new(
            "herakles_control_persistence_errors_total",
            "Total reconciliation passes that could not persist the kill list",
        )?;
        let kill_list_entries = Gauge::new(
            "herakles_control_kill_list_entries",
            "Number of entries currently in the kill list",
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(reconcile_outcomes_total.clone()))?;
        registry.register(Box::new(reconcile_passes_total.clone()))?;
        registry.register(Box::new(persistence_errors_total.clone()))?;
        registry.register(Box::new(kill_list_entries.clone()))?;

        // Pre-create label sets so every series is visible before first use.
        for action in Action::ALL {
            requests_total.with_label_values(&[action.as_str()]);
        }
        requests_total.with_label_values(&["invalid"]);
        for kind in OutcomeKind::ALL {
            reconcile_outcomes_total.with_label_values(&[kind.as_str()]);
        }

        Ok(Self {
            requests_total,
            reconcile_outcomes_total,
            reconcile_passes_total,
            persistence_errors_total,
            kill_list_entries,
        })
    }

    pub fn record_request(&self, action: Option<Action>) {
        let label = action.map(Action::as_str).unwrap_or("invalid");
        self.requests_total.with_label_values(&[label]).inc();
    }

    pub fn record_reconciliation(&self, report: &ReconciliationReport) {
        self.reconcile_passes_total.inc();
        for kind in OutcomeKind::ALL {
            let n = report.count(kind);
            if n > 0 {
                self.reconcile_outcomes_total
                    .with_label_values(&[kind.as_str()])
                    .inc_by(n as f64);
            }
        }
        if report.persistence_error.is_some() {
            self.persistence_errors_total.inc();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_reconciliation_counts_outcomes() {
        let registry = Registry::new();
        let metrics = ControlMetrics::new(&registry).expect("metrics register");

        let report = ReconciliationReport {
            processed_count: 3,
            terminated_count: 2,
            denied_count: 1,
            persistence_error: Some("read-only filesystem".into()),
            ..Default::default()
        };
        metrics.record_reconciliation(&report);

        let terminated = metrics
            .reconcile_outcomes_total
            .with_label_values(&["terminated"])
            .get();
        let denied = metrics
            .reconcile_outcomes_total
            .with_label_values(&["denied"])
            .get();
        assert_eq!(terminated, 2.0);
        assert_eq!(denied, 1.0);
        assert_eq!(metrics.reconcile_passes_total.get(), 1.0);
        assert_eq!(metrics.persistence_errors_total.get(), 1.0);
    }

    #[test]
    fn test_record_request_invalid_action() {
        let registry = Registry::new();
        let metrics = ControlMetrics::new(&registry).expect("metrics register");
        metrics.record_request(None);
        metrics.record_request(Some(Action::List));
        assert_eq!(
            metrics.requests_total.with_label_values(&["invalid"]).get(),
            1.0
        );
        assert_eq!(metrics.requests_total.with_label_values(&["list"]).get(), 1.0);
    }
}
