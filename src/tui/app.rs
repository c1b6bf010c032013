use std::sync::Arc;

use log::{error, info};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::dispatch::{Dispatcher, StreamEvent};
use crate::exec::backend::{ExecBackend, ExecEvent};
use crate::exec::format_dispatch_message;
use crate::model::asset::Asset;
use crate::model::command::Command;
use crate::router;
use crate::session::registry::SessionRegistry;
use crate::session::terminal::TerminalSize;
use crate::store::{Store, StoreError};

use super::editor::EditorState;
use super::log_state::LogBuffer;

/// Events dispatched to the main application loop
pub enum AppEvent {
    LogUpdated,
}

/// Which pane currently has keyboard focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Form,
    Grid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// One-line user-visible feedback (save/delete results)
#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

/// Main application state for the TUI
pub struct App {
    pub store: Arc<Mutex<Store>>,
    /// The command being edited; single source of truth while the app runs
    pub command: Command,
    /// Identity the command is stored under; updated only on successful save
    pub saved_owner: String,
    pub saved_name: String,
    /// Assets registered for the owning organization
    pub assets: Vec<Asset>,
    pub registry: SessionRegistry,
    pub dispatcher: Dispatcher,
    pub event_tx: mpsc::Sender<AppEvent>,
    pub event_rx: mpsc::Receiver<AppEvent>,
    pub editor: EditorState,
    pub focus: Focus,
    /// Index into `display_assets()` of the grid cell with focus
    pub focused_session: usize,
    pub notice: Option<Notice>,
    pub should_quit: bool,
    /// Whether the log panel is shown instead of the session grid
    pub show_logs: bool,
    pub log_buffer: LogBuffer,
    /// Scroll offset for the log panel (0 = bottom / newest)
    pub log_scroll: usize,
    /// Geometry of one grid cell, measured by the last render pass
    cell_size: TerminalSize,
}

impl App {
    /// Build the app around an already-loaded command.
    ///
    /// `stream_tx` is the sending half of the channel the event loop drains
    /// for backend stream events; the receiving half stays with the caller
    /// so the loop can select on it next to the input events.
    #[must_use]
    pub fn new(
        store: Arc<Mutex<Store>>,
        command: Command,
        backend: Arc<dyn ExecBackend>,
        stream_tx: mpsc::Sender<StreamEvent>,
        log_buffer: LogBuffer,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(256);
        let assets = store.lock().list_assets(&command.owner);
        let saved_owner = command.owner.clone();
        let saved_name = command.name.clone();
        let mut app = App {
            store,
            command,
            saved_owner,
            saved_name,
            assets,
            registry: SessionRegistry::new(),
            dispatcher: Dispatcher::new(backend, stream_tx),
            event_tx,
            event_rx,
            editor: EditorState::default(),
            focus: Focus::Form,
            focused_session: 0,
            notice: None,
            should_quit: false,
            show_logs: false,
            log_buffer,
            log_scroll: 0,
            cell_size: TerminalSize::default(),
        };
        app.reconcile_sessions();
        app
    }

    /// Assets that can be offered as command targets.
    #[must_use]
    pub fn targetable_assets(&self) -> Vec<&Asset> {
        self.assets.iter().filter(|a| a.is_targetable()).collect()
    }

    /// Bring the session registry in line with the command's target list.
    ///
    /// Called whenever `command.assets` changes structurally; cheap and
    /// idempotent otherwise. Sessions are created with the grid geometry of
    /// the last render pass, so surfaces exist before output can arrive.
    pub fn reconcile_sessions(&mut self) {
        let created = self
            .registry
            .reconcile(&self.command.assets, self.cell_size);
        if !created.is_empty() {
            info!("Created {} session(s)", created.len());
        }
        let shown = self.display_assets().len();
        if self.focused_session >= shown {
            self.focused_session = shown.saturating_sub(1);
        }
    }

    /// Dispatch the saved command against a single asset.
    ///
    /// Uses the persisted identity, not the edited fields: unsaved edits to
    /// name or command text do not affect what runs.
    pub fn run_asset(&mut self, asset_id: &str) {
        let identity = format!("{}/{}", self.saved_owner, self.saved_name);
        if let Some(session) = self.registry.get(asset_id) {
            let _ = session.echo(format_dispatch_message(&identity, asset_id));
        }
        self.dispatcher
            .dispatch(&self.saved_owner, &self.saved_name, asset_id);
        self.dispatcher.reap();
    }

    /// Dispatch the saved command against every current target, one
    /// independent execution per asset.
    pub fn run_all(&mut self) {
        for asset_id in self.command.assets.clone() {
            self.run_asset(&asset_id);
        }
    }

    /// Run whatever session cell has focus. Orphaned cells are view-only:
    /// dispatch requires the asset to be a current target.
    pub fn run_focused(&mut self) {
        if let Some(asset_id) = self.focused_asset_id()
            && self.command.assets.contains(&asset_id)
        {
            self.run_asset(&asset_id);
        }
    }

    /// Persist the edited command wholesale under its saved identity.
    ///
    /// On a name collision the locally edited `name` rolls back to the last
    /// known-good value so local and stored identifiers stay consistent;
    /// every other edit is preserved for the user to correct and retry.
    pub fn save(&mut self) {
        let result = {
            let mut store = self.store.lock();
            store
                .update_command(&self.saved_owner, &self.saved_name, self.command.clone())
                .and_then(|()| store.save())
        };
        match result {
            Ok(()) => {
                self.saved_owner = self.command.owner.clone();
                self.saved_name = self.command.name.clone();
                self.notify_info("Saved");
            }
            Err(e @ StoreError::NameTaken { .. }) => {
                self.command.name = self.saved_name.clone();
                self.notify_error(format!("Failed to save: {e}"));
            }
            Err(e) => {
                self.notify_error(format!("Failed to save: {e}"));
            }
        }
    }

    /// Delete the command and quit.
    pub fn delete(&mut self) {
        let result = {
            let mut store = self.store.lock();
            store
                .delete_command(&self.command)
                .and_then(|()| store.save())
        };
        match result {
            Ok(()) => {
                info!("Deleted command '{}'", self.command.identity());
                self.should_quit = true;
            }
            Err(e) => {
                self.notify_error(format!("Failed to delete: {e}"));
            }
        }
    }

    /// Route one tagged backend event into its session.
    pub fn handle_stream_event(&mut self, event: StreamEvent) {
        match event.event {
            ExecEvent::Data(raw) => router::route_data(&self.registry, &event.asset_id, &raw),
            ExecEvent::Error(msg) => {
                error!(
                    "Dispatch {} for asset '{}' failed: {msg}",
                    event.dispatch_id, event.asset_id
                );
                router::route_error(&self.registry, &event.asset_id, &msg);
            }
        }
        self.dispatcher.reap();
    }

    /// Handle app events (called from event loop)
    pub fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::LogUpdated => {
                // Redraw happens automatically on next frame
            }
        }
    }

    pub fn notify_info(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice {
            kind: NoticeKind::Info,
            text: text.into(),
        });
    }

    pub fn notify_error(&mut self, text: impl Into<String>) {
        let text = text.into();
        error!("{text}");
        self.notice = Some(Notice {
            kind: NoticeKind::Error,
            text,
        });
    }

    /// Abort all stream pump tasks
    pub fn shutdown(&mut self) {
        self.dispatcher.shutdown();
    }

    /// Check if any session has new output that needs rendering
    #[must_use]
    pub fn any_session_dirty(&self) -> bool {
        self.registry.sessions().any(|s| s.is_dirty())
    }

    /// Clear dirty flags on all sessions (call after rendering)
    pub fn clear_session_dirty(&self) {
        for session in self.registry.sessions() {
            session.clear_dirty();
        }
    }

    #[must_use]
    pub fn cell_size(&self) -> TerminalSize {
        self.cell_size
    }

    /// Record the grid cell geometry measured by the render pass, resizing
    /// existing sessions when it changed. Session creation never resizes;
    /// this is the only resize path.
    pub fn update_cell_geometry(&mut self, size: TerminalSize) {
        if size != self.cell_size {
            self.cell_size = size;
            self.registry.resize_all(size);
        }
    }

    /// The assets shown in the session grid: the command's current targets
    /// in list order, then any orphaned sessions so their buffered output
    /// stays reachable.
    #[must_use]
    pub fn display_assets(&self) -> Vec<String> {
        let mut shown = self.command.assets.clone();
        let mut orphans: Vec<String> = self
            .registry
            .sessions()
            .filter(|s| s.is_orphaned())
            .map(|s| s.asset_id().to_string())
            .filter(|id| !shown.contains(id))
            .collect();
        orphans.sort();
        shown.extend(orphans);
        shown
    }

    /// The asset id of the focused grid cell, if the grid is non-empty.
    #[must_use]
    pub fn focused_asset_id(&self) -> Option<String> {
        self.display_assets().get(self.focused_session).cloned()
    }

    /// Move grid focus by `delta`, clamped to the grid.
    pub fn move_session_focus(&mut self, delta: isize) {
        let len = self.display_assets().len();
        if len == 0 {
            return;
        }
        self.focused_session = self
            .focused_session
            .saturating_add_signed(delta)
            .min(len - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullBackend;

    impl ExecBackend for NullBackend {
        fn execute(&self, _: &str, _: &str, _: &str) -> mpsc::Receiver<ExecEvent> {
            let (_tx, rx) = mpsc::channel(1);
            rx
        }
    }

    fn write_store(dir: &std::path::Path) -> std::path::PathBuf {
        let path = dir.join("fleetrun.yaml");
        std::fs::write(
            &path,
            r#"
commands:
  - owner: org1
    name: deploy
    display_name: Deploy
    cmd: uptime
    assets:
      - host1
      - host2
  - owner: org1
    name: restart
    cmd: systemctl restart app
assets:
  - owner: org1
    name: host1
    display_name: Host 1
    kind: ssh
  - owner: org1
    name: host2
    display_name: Host 2
    kind: ssh
  - owner: org1
    name: desktop1
    display_name: Desktop
    kind: rdp
"#,
        )
        .unwrap();
        path
    }

    fn make_app(dir: &std::path::Path) -> App {
        let store = Store::from_file(&write_store(dir)).unwrap();
        let command = store.get_command("org1", "deploy").unwrap();
        let (stream_tx, _stream_rx) = mpsc::channel(16);
        App::new(
            Arc::new(Mutex::new(store)),
            command,
            Arc::new(NullBackend),
            stream_tx,
            LogBuffer::new(),
        )
    }

    #[test]
    fn test_sessions_created_on_startup() {
        let dir = tempfile::tempdir().unwrap();
        let app = make_app(dir.path());
        assert!(app.registry.contains("host1"));
        assert!(app.registry.contains("host2"));
        assert_eq!(app.registry.len(), 2);
    }

    #[test]
    fn test_targetable_assets_excludes_rdp() {
        let dir = tempfile::tempdir().unwrap();
        let app = make_app(dir.path());
        let names: Vec<&str> = app
            .targetable_assets()
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(names, vec!["host1", "host2"]);
    }

    #[test]
    fn test_save_rename_collision_rolls_back_name_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = make_app(dir.path());
        app.command.name = "restart".into();
        app.command.cmd = "uptime -p".into();
        app.save();
        assert_eq!(app.command.name, "deploy");
        assert_eq!(app.command.cmd, "uptime -p");
        assert!(matches!(
            app.notice,
            Some(Notice {
                kind: NoticeKind::Error,
                ..
            })
        ));
    }

    #[test]
    fn test_save_rename_updates_routing_identity() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = make_app(dir.path());
        app.command.name = "deploy-v2".into();
        app.save();
        assert_eq!(app.saved_name, "deploy-v2");
        assert!(app.store.lock().get_command("org1", "deploy-v2").is_ok());
        assert!(app.store.lock().get_command("org1", "deploy").is_err());
    }

    #[test]
    fn test_asset_removal_keeps_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = make_app(dir.path());
        app.command.assets = vec!["host1".into()];
        app.reconcile_sessions();
        assert_eq!(app.registry.len(), 2);
        assert!(app.registry.get("host2").unwrap().is_orphaned());
    }
}
