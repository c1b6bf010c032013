use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use super::terminal::{TerminalSession, TerminalSize};

/// Keyed collection of terminal sessions, one per asset identifier.
///
/// Insert-only: reconciliation creates sessions for assets it has not seen
/// and marks sessions orphaned when their asset leaves the target list, but
/// nothing is ever removed. Output dispatched before a removal must still
/// find its session.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, Arc<TerminalSession>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, asset_id: &str) -> Option<&Arc<TerminalSession>> {
        self.sessions.get(asset_id)
    }

    #[must_use]
    pub fn contains(&self, asset_id: &str) -> bool {
        self.sessions.contains_key(asset_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn sessions(&self) -> impl Iterator<Item = &Arc<TerminalSession>> {
        self.sessions.values()
    }

    /// Bring the registry in line with the command's current target list.
    ///
    /// Creates a session (sized to the given surface geometry) for every
    /// identifier that has none, processing the list in its given order.
    /// Existing sessions are left untouched apart from clearing their
    /// orphaned flag; sessions whose asset is absent from the list are
    /// flagged orphaned. Returns the identifiers that got a new session.
    pub fn reconcile(&mut self, assets: &[String], size: TerminalSize) -> Vec<String> {
        let mut created = Vec::new();
        for asset_id in assets {
            if let Some(session) = self.sessions.get(asset_id) {
                session.set_orphaned(false);
            } else {
                debug!("Creating session for asset '{asset_id}'");
                self.sessions
                    .insert(asset_id.clone(), Arc::new(TerminalSession::new(asset_id, size)));
                created.push(asset_id.clone());
            }
        }
        for (asset_id, session) in &self.sessions {
            if !assets.contains(asset_id) && !session.is_orphaned() {
                debug!("Session for asset '{asset_id}' is now orphaned");
                session.set_orphaned(true);
            }
        }
        created
    }

    /// Resize every session to a new surface geometry (layout change).
    ///
    /// Reconciliation never resizes; this is the explicit pass driven by the
    /// render loop when the grid geometry changes.
    pub fn resize_all(&self, size: TerminalSize) {
        for session in self.sessions.values() {
            if let Err(e) = session.resize(size) {
                debug!("Failed to resize session '{}': {e}", session.asset_id());
            }
        }
    }
}
