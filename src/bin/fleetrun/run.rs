use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use log::warn;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use fleetrun::dispatch::Dispatcher;
use fleetrun::exec::backend::{ExecEvent, OutputPayload};
use fleetrun::exec::local::LocalBackend;
use fleetrun::model::command::Command;
use fleetrun::router::normalize_text;
use fleetrun::store::Store;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Restrict execution to a single target asset
    #[arg(long)]
    asset: Option<String>,
}

/// Execute the command across its assets headlessly, printing each streamed
/// line prefixed with the asset it came from. Exits non-zero if any stream
/// reported an error.
pub async fn run(
    store: Store,
    command: &Command,
    args: &RunArgs,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let assets: Vec<String> = match args.asset {
        Some(ref asset) => {
            if !command.assets.contains(asset) {
                eprintln!(
                    "Asset '{asset}' is not a target of '{}'",
                    command.identity()
                );
                return Ok(ExitCode::FAILURE);
            }
            vec![asset.clone()]
        }
        None => command.assets.clone(),
    };

    if assets.is_empty() {
        eprintln!("Command '{}' has no target assets", command.identity());
        return Ok(ExitCode::SUCCESS);
    }

    let store = Arc::new(Mutex::new(store));
    let backend = Arc::new(LocalBackend::new(Arc::clone(&store)));
    let (stream_tx, mut stream_rx) = mpsc::channel(256);

    let mut dispatcher = Dispatcher::new(backend, stream_tx);
    dispatcher.dispatch_all(&command.owner, &command.name, &assets);
    // Pump tasks keep their own sender clones; dropping the dispatcher's
    // closes ours so the loop below ends when every stream has finished.
    drop(dispatcher);

    let mut failed = false;
    while let Some(event) = stream_rx.recv().await {
        match event.event {
            ExecEvent::Data(raw) => match OutputPayload::decode(&raw) {
                Ok(payload) => {
                    for line in normalize_text(&payload.text).lines() {
                        println!("{:<12} │ {line}", event.asset_id);
                    }
                }
                Err(e) => {
                    warn!("Dropping undecodable payload for '{}': {e}", event.asset_id);
                }
            },
            ExecEvent::Error(msg) => {
                failed = true;
                eprintln!("{:<12} │ {msg}", event.asset_id);
            }
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
