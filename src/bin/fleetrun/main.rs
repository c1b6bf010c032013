mod run;
mod tui;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use fleetrun::{load_store, resolve_command};

#[derive(Parser, Debug)]
#[command(
    name = "fleetrun",
    about = "Edit and fan out shell commands across remote assets"
)]
struct Cli {
    /// Path to store file (auto-detected if not specified)
    #[arg(short, long)]
    store: Option<String>,

    /// Command to open, as owner/name (defaults to the first in the store)
    #[arg(short, long)]
    command: Option<String>,

    /// Log file path (enables file logging in addition to TUI log panel)
    #[arg(long)]
    log_file: Option<String>,

    #[command(subcommand)]
    subcommand: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute the command across its assets without opening the TUI
    Run(run::RunArgs),
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (store, _store_path) = load_store(cli.store.as_deref())?;
    let command = resolve_command(&store, cli.command.as_deref())?;

    match cli.subcommand {
        Some(Commands::Run(ref args)) => run::run(store, &command, args).await,
        None => tui::run(store, command, cli.log_file).await,
    }
}
