//! Routing of streamed execution output into terminal sessions
//!
//! Events arrive tagged with their originating asset identifier; the router
//! resolves the session from the registry and appends. An event for an asset
//! with no session is dropped silently — output can legitimately arrive
//! after the target list changed or the view went away, and must never fault.

use log::{debug, warn};

use crate::exec::backend::OutputPayload;
use crate::session::registry::SessionRegistry;

/// Normalize a payload's text for appending: an empty payload becomes a
/// single newline so the terminal visibly advances on heartbeat events;
/// anything else is taken verbatim with one newline after it.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    if text.is_empty() {
        "\n".to_string()
    } else {
        format!("{text}\n")
    }
}

/// Append a decoded data payload to the session for `asset_id`.
pub fn route_data(registry: &SessionRegistry, asset_id: &str, raw_payload: &str) {
    let payload = match OutputPayload::decode(raw_payload) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Dropping undecodable payload for asset '{asset_id}': {e}");
            return;
        }
    };
    let Some(session) = registry.get(asset_id) else {
        debug!("No session for asset '{asset_id}', dropping output event");
        return;
    };
    if let Err(e) = session.append_text(&normalize_text(&payload.text)) {
        debug!("Failed to append to session '{asset_id}': {e}");
    }
}

/// Append a stream error message to the session for `asset_id`.
///
/// Errors land in the same stream as ordinary output, distinguishable only
/// by content; the failure is scoped to this asset and never escalated.
pub fn route_error(registry: &SessionRegistry, asset_id: &str, message: &str) {
    let Some(session) = registry.get(asset_id) else {
        debug!("No session for asset '{asset_id}', dropping error event");
        return;
    };
    if let Err(e) = session.append_text(&normalize_text(message)) {
        debug!("Failed to append to session '{asset_id}': {e}");
    }
}
