//! Integration tests for kill-list reconciliation.
//!
//! These tests drive the engine with a scripted process table and a real
//! file-backed kill list in a temporary directory.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use herakles_process_control::process::SnapshotIter;
use herakles_process_control::{
    ControlError, JsonFileStore, KillListEntry, KillListStore, OutcomeKind, ProcessId,
    ProcessTable, ReconciliationEngine, Router,
};
use tempfile::{tempdir, TempDir};

/// Process table whose behaviour is fixed per PID.
#[derive(Default)]
struct ScriptedTable {
    alive: RefCell<HashSet<u32>>,
    denied: HashSet<u32>,
    failing: HashSet<u32>,
    /// Reported as existing, but exit before the signal arrives.
    racing: HashSet<u32>,
    signalled: RefCell<Vec<u32>>,
}

impl ScriptedTable {
    fn with_alive(pids: &[u32]) -> Self {
        Self {
            alive: RefCell::new(pids.iter().copied().collect()),
            ..Default::default()
        }
    }

    fn deny(mut self, pid: u32) -> Self {
        self.alive.borrow_mut().insert(pid);
        self.denied.insert(pid);
        self
    }

    fn fail(mut self, pid: u32) -> Self {
        self.alive.borrow_mut().insert(pid);
        self.failing.insert(pid);
        self
    }

    fn race(mut self, pid: u32) -> Self {
        self.alive.borrow_mut().insert(pid);
        self.racing.insert(pid);
        self
    }
}

impl ProcessTable for ScriptedTable {
    fn enumerate(&self) -> SnapshotIter<'_> {
        Box::new(std::iter::empty())
    }

    fn exists(&self, pid: ProcessId) -> bool {
        self.alive.borrow().contains(&pid.get())
    }

    fn terminate(&self, pid: ProcessId) -> Result<(), ControlError> {
        let raw = pid.get();
        self.signalled.borrow_mut().push(raw);
        if self.racing.contains(&raw) {
            self.alive.borrow_mut().remove(&raw);
            return Err(ControlError::NotFound(raw));
        }
        if self.denied.contains(&raw) {
            return Err(ControlError::PermissionDenied(raw));
        }
        if self.failing.contains(&raw) {
            return Err(ControlError::TerminationFailed(
                raw,
                "Operation not supported".into(),
            ));
        }
        if self.alive.borrow_mut().remove(&raw) {
            Ok(())
        } else {
            Err(ControlError::NotFound(raw))
        }
    }
}

/// Store that reads like a normal list but refuses every write.
struct ReadOnlyStore {
    entries: Vec<KillListEntry>,
    save_attempts: RefCell<usize>,
}

impl KillListStore for ReadOnlyStore {
    fn load(&self) -> Vec<KillListEntry> {
        self.entries.clone()
    }

    fn save(&self, _entries: &[KillListEntry]) -> Result<Vec<KillListEntry>, ControlError> {
        *self.save_attempts.borrow_mut() += 1;
        Err(ControlError::PersistenceError("read-only file system".into()))
    }
}

fn pid(raw: i64) -> ProcessId {
    ProcessId::new(raw).unwrap()
}

fn store_with(pids: &[i64]) -> (TempDir, JsonFileStore) {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("kill_list.json"));
    let entries: Vec<KillListEntry> = pids.iter().map(|&p| KillListEntry::new(pid(p))).collect();
    store.save(&entries).unwrap();
    (dir, store)
}

fn listed(store: &JsonFileStore) -> Vec<u32> {
    store.load().iter().map(|e| e.pid.get()).collect()
}

fn results(report: &herakles_process_control::ReconciliationReport) -> Vec<(u32, OutcomeKind)> {
    report
        .outcomes
        .iter()
        .map(|o| (o.pid.get(), o.result))
        .collect()
}

#[test]
fn test_gone_and_alive_entries_are_both_removed() {
    let (_dir, store) = store_with(&[100, 200]);
    let table = ScriptedTable::with_alive(&[200]);

    let report = ReconciliationEngine::new(&store, &table).reconcile();

    assert_eq!(
        results(&report),
        vec![(100, OutcomeKind::AlreadyGone), (200, OutcomeKind::Terminated)]
    );
    assert_eq!(report.processed_count, 2);
    assert_eq!(report.terminated_count, 1);
    assert_eq!(report.already_gone_count, 1);
    assert!(report.store_updated);
    assert!(report.persistence_error.is_none());
    assert!(listed(&store).is_empty());
    // 100 was never signalled.
    assert_eq!(*table.signalled.borrow(), vec![200]);
}

#[test]
fn test_denied_entry_is_retained() {
    let (_dir, store) = store_with(&[300]);
    let table = ScriptedTable::default().deny(300);

    let report = ReconciliationEngine::new(&store, &table).reconcile();

    assert_eq!(results(&report), vec![(300, OutcomeKind::Denied)]);
    assert_eq!(report.denied_count, 1);
    assert!(report.outcomes[0]
        .message
        .as_deref()
        .unwrap()
        .contains("Permission denied"));
    assert!(!report.store_updated);
    assert_eq!(listed(&store), vec![300]);
}

#[test]
fn test_empty_kill_list_is_noop() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kill_list.json");
    let store = JsonFileStore::new(&path);
    let table = ScriptedTable::with_alive(&[1]);

    let report = ReconciliationEngine::new(&store, &table).reconcile();

    assert_eq!(report.processed_count, 0);
    assert!(report.outcomes.is_empty());
    assert!(!report.store_updated);
    assert!(!path.exists(), "empty pass must not create the document");
    assert!(table.signalled.borrow().is_empty());
}

#[test]
fn test_add_non_positive_pid_rejected_without_write() {
    let (_dir, store) = store_with(&[7]);
    let before = std::fs::read_to_string(store.path()).unwrap();
    let table = ScriptedTable::default();
    let router = Router::new(&store, &table);

    for bad in ["-5", "0"] {
        let params: HashMap<String, String> =
            [("pid".to_string(), bad.to_string())].into_iter().collect();
        let out = router.dispatch(Some("add_kill_list"), &params);
        assert_eq!(out.body["status"], "error");
        assert_eq!(out.body["error_kind"], "invalid_input");
    }

    assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
    assert_eq!(listed(&store), vec![7]);
}

#[test]
fn test_failed_entry_is_retained_with_diagnostic() {
    let (_dir, store) = store_with(&[41, 42]);
    let table = ScriptedTable::with_alive(&[41]).fail(42);

    let report = ReconciliationEngine::new(&store, &table).reconcile();

    assert_eq!(
        results(&report),
        vec![(41, OutcomeKind::Terminated), (42, OutcomeKind::Failed)]
    );
    assert_eq!(report.failed_count, 1);
    assert!(report.outcomes[1]
        .message
        .as_deref()
        .unwrap()
        .contains("Operation not supported"));
    assert_eq!(listed(&store), vec![42]);
}

#[test]
fn test_exit_between_lookup_and_signal_counts_as_gone() {
    let (_dir, store) = store_with(&[55]);
    let table = ScriptedTable::default().race(55);

    let report = ReconciliationEngine::new(&store, &table).reconcile();

    assert_eq!(results(&report), vec![(55, OutcomeKind::AlreadyGone)]);
    assert!(report.outcomes[0].message.is_none());
    assert!(listed(&store).is_empty());
}

#[test]
fn test_second_pass_terminates_nothing() {
    let (_dir, store) = store_with(&[10, 20, 30, 40]);
    let table = ScriptedTable::with_alive(&[10, 20]).deny(30).fail(40);
    let engine = ReconciliationEngine::new(&store, &table);

    let first = engine.reconcile();
    assert_eq!(first.terminated_count, 2);
    let after_first = listed(&store);

    let second = engine.reconcile();
    assert_eq!(second.terminated_count, 0);
    assert_eq!(second.processed_count, 2);
    assert!(!second.store_updated);
    assert_eq!(listed(&store), after_first);
}

#[test]
fn test_kill_list_never_grows() {
    let (_dir, store) = store_with(&[5, 6, 7, 8, 9]);
    let table = ScriptedTable::with_alive(&[6]).deny(7).fail(9);
    let engine = ReconciliationEngine::new(&store, &table);

    let mut previous: HashSet<u32> = listed(&store).into_iter().collect();
    for _ in 0..3 {
        engine.reconcile();
        let current: HashSet<u32> = listed(&store).into_iter().collect();
        assert!(current.is_subset(&previous));
        previous = current;
    }
    assert_eq!(previous, [7, 9].into_iter().collect());
}

#[test]
fn test_outcomes_follow_kill_list_order() {
    let (_dir, store) = store_with(&[900, 3, 450, 12]);
    let table = ScriptedTable::with_alive(&[3, 12]).deny(900);

    let report = ReconciliationEngine::new(&store, &table).reconcile();

    let order: Vec<u32> = report.outcomes.iter().map(|o| o.pid.get()).collect();
    assert_eq!(order, vec![900, 3, 450, 12]);
    assert_eq!(*table.signalled.borrow(), vec![900, 3, 12]);
}

#[test]
fn test_retained_entries_keep_order_and_metadata() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("kill_list.json"));
    store
        .save(&[
            KillListEntry::new(pid(1)).with_label("first"),
            KillListEntry::new(pid(2)),
            KillListEntry::new(pid(3)).with_label("third"),
        ])
        .unwrap();
    let table = ScriptedTable::default().deny(1).deny(3);

    let report = ReconciliationEngine::new(&store, &table).reconcile();

    assert_eq!(report.outcomes[0].label.as_deref(), Some("first"));
    assert_eq!(report.outcomes[1].label, None);
    let remaining = store.load();
    assert_eq!(remaining.len(), 2);
    assert_eq!(remaining[0].label.as_deref(), Some("first"));
    assert_eq!(remaining[1].label.as_deref(), Some("third"));
}

#[test]
fn test_persistence_failure_still_reports_all_outcomes() {
    let store = ReadOnlyStore {
        entries: vec![
            KillListEntry::new(pid(100)),
            KillListEntry::new(pid(200)),
            KillListEntry::new(pid(300)),
        ],
        save_attempts: RefCell::new(0),
    };
    let table = ScriptedTable::with_alive(&[200]).deny(300);

    let report = ReconciliationEngine::new(&store, &table).reconcile();

    assert_eq!(
        results(&report),
        vec![
            (100, OutcomeKind::AlreadyGone),
            (200, OutcomeKind::Terminated),
            (300, OutcomeKind::Denied),
        ]
    );
    assert_eq!(*store.save_attempts.borrow(), 1);
    assert!(!report.store_updated);
    assert!(report
        .persistence_error
        .as_deref()
        .unwrap()
        .contains("read-only file system"));
}

#[test]
fn test_no_save_when_nothing_removed() {
    let store = ReadOnlyStore {
        entries: vec![KillListEntry::new(pid(300))],
        save_attempts: RefCell::new(0),
    };
    let table = ScriptedTable::default().deny(300);

    let report = ReconciliationEngine::new(&store, &table).reconcile();

    assert_eq!(*store.save_attempts.borrow(), 0);
    assert!(report.persistence_error.is_none());
}

#[test]
fn test_corrupt_kill_list_reconciles_as_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kill_list.json");
    std::fs::write(&path, "{ this is not json").unwrap();
    let store = JsonFileStore::new(&path);
    let table = ScriptedTable::with_alive(&[1]);

    let report = ReconciliationEngine::new(&store, &table).reconcile();

    assert_eq!(report.processed_count, 0);
    assert!(table.signalled.borrow().is_empty());
}

#[test]
fn test_duplicate_entries_on_disk_processed_once() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("kill_list.json");
    std::fs::write(&path, r#"[{"pid": 77}, {"pid": 0}, {"pid": 77}, {"pid": -3}]"#).unwrap();
    let store = JsonFileStore::new(&path);
    let table = ScriptedTable::with_alive(&[77]);

    let report = ReconciliationEngine::new(&store, &table).reconcile();

    assert_eq!(results(&report), vec![(77, OutcomeKind::Terminated)]);
    assert!(listed(&store).is_empty());
}

#[test]
fn test_add_then_remove_restores_list() {
    let (_dir, store) = store_with(&[11, 22]);
    let before: HashSet<u32> = listed(&store).into_iter().collect();

    store.add(pid(33), Some("temp".into())).unwrap();
    store.remove(pid(33)).unwrap();

    let after: HashSet<u32> = listed(&store).into_iter().collect();
    assert_eq!(before, after);
}

#[test]
fn test_double_add_keeps_single_entry() {
    let (_dir, store) = store_with(&[]);

    let first = store.add(pid(8), None).unwrap();
    let second = store.add(pid(8), None).unwrap();

    assert!(first.changed);
    assert!(!second.changed);
    assert_eq!(listed(&store), vec![8]);
}
