use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Decoded shape of one streamed output chunk.
///
/// The wire form is a serialized JSON object carrying at least `text`;
/// unknown fields from richer backends are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputPayload {
    pub text: String,
}

impl OutputPayload {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Serialize to the wire form.
    #[must_use]
    pub fn encode(&self) -> String {
        // A struct of one string field cannot fail to serialize
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Decode a raw payload.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error if the payload is not a
    /// JSON object with a `text` field.
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// One event on a dispatch's stream.
#[derive(Debug, Clone)]
pub enum ExecEvent {
    /// A raw serialized output payload; zero or more per dispatch.
    Data(String),
    /// Terminal failure; at most once per dispatch, after which no further
    /// `Data` events arrive for that dispatch.
    Error(String),
}

/// The execution collaborator.
///
/// `execute` initiates exactly one execution of the server-side command
/// definition identified by `owner`/`command_name` against `asset_id` and
/// returns immediately with the dispatch's event stream. Streams from
/// concurrent dispatches are fully independent; there is no explicit
/// termination event, the channel simply closes.
pub trait ExecBackend: Send + Sync {
    fn execute(&self, owner: &str, command_name: &str, asset_id: &str)
    -> mpsc::Receiver<ExecEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_round_trip() {
        let raw = OutputPayload::new("hello").encode();
        assert_eq!(OutputPayload::decode(&raw).unwrap().text, "hello");
    }

    #[test]
    fn test_payload_ignores_extra_fields() {
        let decoded = OutputPayload::decode(r#"{"text":"hi","seq":3}"#).unwrap();
        assert_eq!(decoded.text, "hi");
    }

    #[test]
    fn test_payload_decode_rejects_garbage() {
        assert!(OutputPayload::decode("not json").is_err());
        assert!(OutputPayload::decode(r#"{"no_text":1}"#).is_err());
    }
}
