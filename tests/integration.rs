use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use fleetrun::dispatch::Dispatcher;
use fleetrun::exec::backend::{ExecBackend, ExecEvent, OutputPayload};
use fleetrun::exec::local::LocalBackend;
use fleetrun::router::{route_data, route_error};
use fleetrun::session::registry::SessionRegistry;
use fleetrun::session::terminal::{TerminalSession, TerminalSize};
use fleetrun::store::StoreError;
use fleetrun::{load_store, resolve_command};

fn write_store(dir: &std::path::Path, content: &str) -> String {
    let path = dir.join("fleetrun.yaml");
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().to_string()
}

const BASIC_STORE: &str = r#"
commands:
  - owner: org1
    name: deploy
    display_name: Deploy
    cmd: uptime
    assets:
      - host1
      - host2
assets:
  - owner: org1
    name: host1
    display_name: Host 1
    kind: ssh
  - owner: org1
    name: host2
    display_name: Host 2
    kind: ssh
"#;

/// Wait until the session's writer thread has drained pending updates and
/// the predicate holds.
fn wait_for(session: &TerminalSession, pred: impl Fn(&vt100::Screen) -> bool) {
    for _ in 0..200 {
        if pred(session.parser().lock().screen()) {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("condition not met within timeout");
}

// ─── store tests ───

#[test]
fn test_load_store_minimal() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_store(dir.path(), BASIC_STORE);
    let (store, _) = load_store(Some(&path)).unwrap();
    let command = store.get_command("org1", "deploy").unwrap();
    assert_eq!(command.cmd, "uptime");
    assert_eq!(command.assets, vec!["host1", "host2"]);
    assert_eq!(store.list_assets("org1").len(), 2);
}

#[test]
fn test_load_store_duplicate_commands() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_store(
        dir.path(),
        r"
commands:
  - owner: org1
    name: deploy
    cmd: uptime
  - owner: org1
    name: deploy
    cmd: date
",
    );
    match load_store(Some(&path)).unwrap_err() {
        StoreError::DuplicateCommand(id) => assert_eq!(id, "org1/deploy"),
        other => panic!("Expected DuplicateCommand, got: {other:?}"),
    }
}

#[test]
fn test_load_store_empty_cmd_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_store(
        dir.path(),
        r#"
commands:
  - owner: org1
    name: deploy
    cmd: "  "
"#,
    );
    match load_store(Some(&path)).unwrap_err() {
        StoreError::Validation(msg) => assert!(msg.contains("empty cmd"), "got: {msg}"),
        other => panic!("Expected Validation error, got: {other:?}"),
    }
}

#[test]
fn test_store_save_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_store(dir.path(), BASIC_STORE);
    let (mut store, _) = load_store(Some(&path)).unwrap();

    let mut command = store.get_command("org1", "deploy").unwrap();
    command.cmd = "uptime -p".into();
    command.assets.push("host3".into());
    store.update_command("org1", "deploy", command).unwrap();
    store.save().unwrap();

    let (reloaded, _) = load_store(Some(&path)).unwrap();
    let command = reloaded.get_command("org1", "deploy").unwrap();
    assert_eq!(command.cmd, "uptime -p");
    assert_eq!(command.assets, vec!["host1", "host2", "host3"]);
}

#[test]
fn test_resolve_command_identity() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_store(dir.path(), BASIC_STORE);
    let (store, _) = load_store(Some(&path)).unwrap();
    assert!(resolve_command(&store, Some("org1/deploy")).is_ok());
    assert!(resolve_command(&store, Some("org2/deploy")).is_err());
}

// ─── routing scenario tests ───

#[test]
fn test_run_all_output_routing_scenario() {
    let mut registry = SessionRegistry::new();
    registry.reconcile(
        &["host1".to_string(), "host2".to_string()],
        TerminalSize::new(40, 10),
    );

    // Empty payload for host1: the terminal advances by exactly one line
    route_data(&registry, "host1", &OutputPayload::new("").encode());
    let host1 = registry.get("host1").unwrap();
    wait_for(host1, |screen| screen.cursor_position() == (1, 0));

    // Normal payload for host2 lands in host2's session only
    route_data(&registry, "host2", &OutputPayload::new("done").encode());
    let host2 = registry.get("host2").unwrap();
    wait_for(host2, |screen| screen.contents().starts_with("done"));
    assert_eq!(host2.parser().lock().screen().cursor_position(), (1, 0));

    // Stream error for host1 appends inline, after the blank line
    route_error(&registry, "host1", "timeout");
    wait_for(host1, |screen| screen.contents().contains("timeout"));
    let parser = host1.parser().lock();
    assert_eq!(parser.screen().cursor_position(), (2, 0));
    // Row 0 is the blank line from the empty payload
    assert_eq!(
        parser.screen().cell(0, 0).map(vt100::Cell::contents),
        Some(String::new())
    );
    drop(parser);

    // host2 never saw host1's events
    assert!(!host2.parser().lock().screen().contents().contains("timeout"));
}

#[test]
fn test_asset_list_growth_creates_only_new_session() {
    let mut registry = SessionRegistry::new();
    registry.reconcile(&["host1".to_string()], TerminalSize::new(40, 10));

    route_data(&registry, "host1", &OutputPayload::new("before").encode());
    let host1 = registry.get("host1").unwrap();
    wait_for(host1, |screen| screen.contents().contains("before"));
    let host1 = Arc::clone(host1);

    let created = registry.reconcile(
        &["host1".to_string(), "host2".to_string()],
        TerminalSize::new(40, 10),
    );
    assert_eq!(created, vec!["host2".to_string()]);
    // host1's session is the same object, buffered output untouched
    assert!(Arc::ptr_eq(&host1, registry.get("host1").unwrap()));
    assert!(
        host1
            .parser()
            .lock()
            .screen()
            .contents()
            .contains("before")
    );
}

#[test]
fn test_removed_asset_still_accepts_output() {
    let mut registry = SessionRegistry::new();
    registry.reconcile(
        &["host1".to_string(), "host2".to_string()],
        TerminalSize::new(40, 10),
    );
    registry.reconcile(&["host1".to_string()], TerminalSize::new(40, 10));

    // host2 was removed from the target list but output dispatched earlier
    // still lands in its session
    route_data(&registry, "host2", &OutputPayload::new("late").encode());
    let host2 = registry.get("host2").unwrap();
    assert!(host2.is_orphaned());
    wait_for(host2, |screen| screen.contents().contains("late"));
}

// ─── dispatch tests ───

/// Backend that records calls and replays a per-asset script. Assets in
/// `hold_open` keep their stream open forever (events never stop arriving).
struct ScriptedBackend {
    calls: parking_lot::Mutex<Vec<String>>,
    scripts: HashMap<String, Vec<ExecEvent>>,
    hold_open: HashSet<String>,
    open_senders: parking_lot::Mutex<Vec<mpsc::Sender<ExecEvent>>>,
}

impl ScriptedBackend {
    fn new(scripts: HashMap<String, Vec<ExecEvent>>, hold_open: HashSet<String>) -> Self {
        Self {
            calls: parking_lot::Mutex::new(Vec::new()),
            scripts,
            hold_open,
            open_senders: parking_lot::Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl ExecBackend for ScriptedBackend {
    fn execute(
        &self,
        _owner: &str,
        _command_name: &str,
        asset_id: &str,
    ) -> mpsc::Receiver<ExecEvent> {
        self.calls.lock().push(asset_id.to_string());
        let (tx, rx) = mpsc::channel(64);
        if let Some(events) = self.scripts.get(asset_id) {
            for event in events {
                tx.try_send(event.clone()).unwrap();
            }
        }
        if self.hold_open.contains(asset_id) {
            self.open_senders.lock().push(tx);
        }
        rx
    }
}

fn data_event(text: &str) -> ExecEvent {
    ExecEvent::Data(OutputPayload::new(text).encode())
}

#[tokio::test]
async fn test_dispatch_all_issues_one_call_per_asset() {
    let scripts = HashMap::from([
        ("host1".to_string(), vec![data_event("a")]),
        ("host2".to_string(), vec![data_event("b")]),
    ]);
    let backend = Arc::new(ScriptedBackend::new(scripts, HashSet::new()));
    let (tx, mut rx) = mpsc::channel(64);
    let mut dispatcher = Dispatcher::new(Arc::clone(&backend) as Arc<dyn ExecBackend>, tx);

    dispatcher.dispatch_all(
        "org1",
        "deploy",
        &["host1".to_string(), "host2".to_string()],
    );
    assert_eq!(backend.calls(), vec!["host1", "host2"]);

    let mut seen = HashSet::new();
    for _ in 0..2 {
        let event = timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        seen.insert(event.asset_id);
    }
    assert!(seen.contains("host1") && seen.contains("host2"));
}

#[tokio::test]
async fn test_dispatch_is_not_blocked_by_open_stream() {
    // host1's stream never ends; host2's output must flow regardless
    let scripts = HashMap::from([("host2".to_string(), vec![data_event("done")])]);
    let hold_open = HashSet::from(["host1".to_string()]);
    let backend = Arc::new(ScriptedBackend::new(scripts, hold_open));
    let (tx, mut rx) = mpsc::channel(64);
    let mut dispatcher = Dispatcher::new(Arc::clone(&backend) as Arc<dyn ExecBackend>, tx);

    dispatcher.dispatch_all(
        "org1",
        "deploy",
        &["host1".to_string(), "host2".to_string()],
    );

    let event = timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.asset_id, "host2");
    dispatcher.shutdown();
}

#[tokio::test]
async fn test_redispatch_same_asset_produces_independent_streams() {
    let scripts = HashMap::from([("host1".to_string(), vec![data_event("run")])]);
    let backend = Arc::new(ScriptedBackend::new(scripts, HashSet::new()));
    let (tx, mut rx) = mpsc::channel(64);
    let mut dispatcher = Dispatcher::new(Arc::clone(&backend) as Arc<dyn ExecBackend>, tx);

    let first = dispatcher.dispatch("org1", "deploy", "host1");
    let second = dispatcher.dispatch("org1", "deploy", "host1");
    assert_ne!(first, second);
    assert_eq!(backend.calls(), vec!["host1", "host1"]);

    let mut dispatch_ids = HashSet::new();
    for _ in 0..2 {
        let event = timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.asset_id, "host1");
        dispatch_ids.insert(event.dispatch_id);
    }
    assert_eq!(dispatch_ids.len(), 2);
}

#[tokio::test]
async fn test_error_event_is_forwarded_and_terminal() {
    let scripts = HashMap::from([(
        "host1".to_string(),
        vec![data_event("partial"), ExecEvent::Error("timeout".into())],
    )]);
    let backend = Arc::new(ScriptedBackend::new(scripts, HashSet::new()));
    let (tx, mut rx) = mpsc::channel(64);
    let mut dispatcher = Dispatcher::new(Arc::clone(&backend) as Arc<dyn ExecBackend>, tx);
    dispatcher.dispatch("org1", "deploy", "host1");
    drop(dispatcher);

    let first = rx.recv().await.unwrap();
    assert!(matches!(first.event, ExecEvent::Data(_)));
    let second = rx.recv().await.unwrap();
    assert!(matches!(second.event, ExecEvent::Error(ref msg) if msg == "timeout"));
    // The pump stops after the error; the channel closes
    assert!(rx.recv().await.is_none());
}

// ─── local backend tests ───

fn local_backend(dir: &std::path::Path, cmd: &str) -> LocalBackend {
    let path = write_store(
        dir,
        &format!(
            r"
commands:
  - owner: org1
    name: greet
    cmd: {cmd}
    assets:
      - host1
assets:
  - owner: org1
    name: host1
    kind: ssh
"
        ),
    );
    let (store, _) = load_store(Some(&path)).unwrap();
    LocalBackend::new(Arc::new(parking_lot::Mutex::new(store)))
}

async fn collect_events(mut rx: mpsc::Receiver<ExecEvent>) -> Vec<ExecEvent> {
    let mut events = Vec::new();
    while let Some(event) = timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("backend stream stalled")
    {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_local_backend_streams_output() {
    let dir = tempfile::tempdir().unwrap();
    let backend = local_backend(dir.path(), "echo hello");
    let events = collect_events(backend.execute("org1", "greet", "host1")).await;

    let combined: String = events
        .iter()
        .filter_map(|e| match e {
            ExecEvent::Data(raw) => Some(OutputPayload::decode(raw).unwrap().text),
            ExecEvent::Error(_) => None,
        })
        .collect();
    assert!(combined.contains("hello"), "got: {combined:?}");
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, ExecEvent::Error(_))),
        "unexpected error event"
    );
}

#[tokio::test]
async fn test_local_backend_unknown_command_errors() {
    let dir = tempfile::tempdir().unwrap();
    let backend = local_backend(dir.path(), "echo hello");
    let events = collect_events(backend.execute("org1", "missing", "host1")).await;
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], ExecEvent::Error(_)));
}

#[tokio::test]
async fn test_local_backend_nonzero_exit_reports_error() {
    let dir = tempfile::tempdir().unwrap();
    let backend = local_backend(dir.path(), "exit 3");
    let events = collect_events(backend.execute("org1", "greet", "host1")).await;
    match events.last() {
        Some(ExecEvent::Error(msg)) => assert!(msg.contains('3'), "got: {msg}"),
        other => panic!("Expected trailing error event, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_local_backend_exposes_asset_env() {
    let dir = tempfile::tempdir().unwrap();
    let backend = local_backend(dir.path(), "echo asset=$FLEETRUN_ASSET");
    let events = collect_events(backend.execute("org1", "greet", "host1")).await;
    let combined: String = events
        .iter()
        .filter_map(|e| match e {
            ExecEvent::Data(raw) => Some(OutputPayload::decode(raw).unwrap().text),
            ExecEvent::Error(_) => None,
        })
        .collect();
    assert!(combined.contains("asset=host1"), "got: {combined:?}");
}
