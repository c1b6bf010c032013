use std::io::Read;
use std::sync::Arc;
use std::thread::spawn;

use log::{debug, error};
use parking_lot::Mutex;
use portable_pty::{Child, CommandBuilder, MasterPty, PtySize, native_pty_system};
use tokio::sync::mpsc;

use crate::exec::backend::{ExecBackend, ExecEvent, OutputPayload};
use crate::store::Store;

const EVENT_CHANNEL_CAPACITY: usize = 256;
const PTY_SIZE: PtySize = PtySize {
    rows: 24,
    cols: 80,
    pixel_width: 0,
    pixel_height: 0,
};

#[derive(Debug, thiserror::Error)]
enum SpawnError {
    #[error("Unable to open PTY: {0}")]
    Pty(String),
    #[error("Unable to spawn command: {0}")]
    Process(String),
}

type SpawnedPty = (Box<dyn Child + Send + Sync>, Box<dyn MasterPty + Send>);

fn build_command(cmd_text: &str, asset_id: &str) -> CommandBuilder {
    debug!("Building command '{cmd_text}' for asset '{asset_id}'");
    let mut builder = CommandBuilder::new("sh");
    builder.args(["-c", cmd_text]);
    for (key, value) in std::env::vars() {
        builder.env(key, value);
    }
    builder.env("TERM", "xterm-256color");
    builder.env("FLEETRUN_ASSET", asset_id);
    builder
}

fn spawn_pty(cmd_text: &str, asset_id: &str) -> Result<SpawnedPty, SpawnError> {
    let pty_system = native_pty_system();
    let pair = pty_system
        .openpty(PTY_SIZE)
        .map_err(|e| SpawnError::Pty(e.to_string()))?;

    let child = pair
        .slave
        .spawn_command(build_command(cmd_text, asset_id))
        .map_err(|e| SpawnError::Process(e.to_string()))?;

    drop(pair.slave); // This will make the reader close when the child process exits

    Ok((child, pair.master))
}

/// Read PTY output chunk by chunk, emitting one payload per chunk, then wait
/// for the child and report a nonzero exit as the dispatch's error event.
fn spawn_stream_reader(
    mut reader: Box<dyn Read + Send>,
    mut child: Box<dyn Child + Send + Sync>,
    master: Box<dyn MasterPty + Send>,
    tx: mpsc::Sender<ExecEvent>,
) {
    spawn(move || {
        // Keep the master alive for the duration of the read loop
        let _master = master;
        loop {
            let mut buf = [0u8; 1024];
            match reader.read(&mut buf) {
                Ok(0) => {
                    debug!("PTY reader EOF");
                    break;
                }
                Ok(n) => {
                    let payload = OutputPayload::new(String::from_utf8_lossy(&buf[..n]));
                    if tx.blocking_send(ExecEvent::Data(payload.encode())).is_err() {
                        debug!("Stream receiver dropped, stopping PTY reader");
                        return;
                    }
                }
                Err(e) => {
                    error!("PTY reader thread error: {e:?}");
                    let _ = tx.blocking_send(ExecEvent::Error(format!("read error: {e}")));
                    return;
                }
            }
        }

        match child.wait() {
            Ok(status) if status.exit_code() != 0 => {
                let _ = tx.blocking_send(ExecEvent::Error(format!(
                    "command exited with code {}",
                    status.exit_code()
                )));
            }
            Ok(_) => {}
            Err(e) => {
                let _ = tx.blocking_send(ExecEvent::Error(format!("wait failed: {e}")));
            }
        }
    });
}

/// Backend that executes the stored command in a local PTY.
///
/// Stands in for a remote transport: the command definition is resolved from
/// the store by identity at dispatch time, exactly as a server would resolve
/// it, and the target asset is exposed to the child via `FLEETRUN_ASSET`.
pub struct LocalBackend {
    store: Arc<Mutex<Store>>,
}

impl LocalBackend {
    #[must_use]
    pub fn new(store: Arc<Mutex<Store>>) -> Self {
        Self { store }
    }
}

impl ExecBackend for LocalBackend {
    fn execute(
        &self,
        owner: &str,
        command_name: &str,
        asset_id: &str,
    ) -> mpsc::Receiver<ExecEvent> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let cmd_text = match self.store.lock().get_command(owner, command_name) {
            Ok(cmd) => cmd.cmd,
            Err(e) => {
                // Channel is empty, the error event always fits
                let _ = tx.try_send(ExecEvent::Error(e.to_string()));
                return rx;
            }
        };

        match spawn_pty(&cmd_text, asset_id) {
            Ok((child, master)) => match master.try_clone_reader() {
                Ok(reader) => spawn_stream_reader(reader, child, master, tx),
                Err(e) => {
                    let _ = tx.try_send(ExecEvent::Error(format!(
                        "Failed to clone PTY reader: {e}"
                    )));
                }
            },
            Err(e) => {
                let _ = tx.try_send(ExecEvent::Error(e.to_string()));
            }
        }

        rx
    }
}
