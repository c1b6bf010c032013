//! Fire-and-forget dispatch of command executions
//!
//! Every dispatch opens one independent backend stream and spawns a pump
//! task that forwards the stream's events, tagged with the originating asset
//! identifier, into a single consumer channel. There is no ordering or
//! synchronization between dispatches, including two dispatches against the
//! same asset: their events interleave in whatever order they arrive.

use std::sync::Arc;

use log::debug;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::exec::backend::{ExecBackend, ExecEvent};

/// A backend stream event tagged with its originating dispatch.
///
/// The asset identifier is attached here, at dispatch time, so routing never
/// depends on the backend echoing it back in payloads.
#[derive(Debug)]
pub struct StreamEvent {
    pub asset_id: String,
    pub dispatch_id: Uuid,
    pub event: ExecEvent,
}

pub struct Dispatcher {
    backend: Arc<dyn ExecBackend>,
    events_tx: mpsc::Sender<StreamEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(backend: Arc<dyn ExecBackend>, events_tx: mpsc::Sender<StreamEvent>) -> Self {
        Self {
            backend,
            events_tx,
            tasks: Vec::new(),
        }
    }

    /// Issue one execution against one asset and return immediately.
    ///
    /// The caller guarantees `asset_id` is a current target of the command;
    /// no membership check happens here. Returns the dispatch identifier
    /// used to tag the stream's events.
    pub fn dispatch(&mut self, owner: &str, command_name: &str, asset_id: &str) -> Uuid {
        let dispatch_id = Uuid::new_v4();
        debug!("Dispatch {dispatch_id}: '{owner}/{command_name}' → '{asset_id}'");

        let mut stream = self.backend.execute(owner, command_name, asset_id);
        let tx = self.events_tx.clone();
        let asset_id = asset_id.to_string();

        self.tasks.push(tokio::spawn(async move {
            while let Some(event) = stream.recv().await {
                // Error is terminal for this dispatch; nothing follows it
                let is_error = matches!(event, ExecEvent::Error(_));
                if tx
                    .send(StreamEvent {
                        asset_id: asset_id.clone(),
                        dispatch_id,
                        event,
                    })
                    .await
                    .is_err()
                {
                    debug!("Dispatch {dispatch_id}: consumer gone, dropping stream");
                    return;
                }
                if is_error {
                    break;
                }
            }
            debug!("Dispatch {dispatch_id}: stream ended");
        }));

        dispatch_id
    }

    /// Issue one independent execution per asset, in list order, none
    /// blocked on any other.
    pub fn dispatch_all(&mut self, owner: &str, command_name: &str, assets: &[String]) {
        debug!(
            "Dispatching '{owner}/{command_name}' to {} assets",
            assets.len()
        );
        for asset_id in assets {
            self.dispatch(owner, command_name, asset_id);
        }
    }

    /// Drop handles of pump tasks that have already finished.
    pub fn reap(&mut self) {
        self.tasks.retain(|t| !t.is_finished());
    }

    /// Number of pump tasks still running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_finished()).count()
    }

    /// Abort all pump tasks. There is no per-dispatch cancel; this is the
    /// app-shutdown backstop so streams cannot outlive the consumer.
    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}
