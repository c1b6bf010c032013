use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use crossterm::event::{Event, EventStream};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use log::{debug, error};
use parking_lot::Mutex;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;

use fleetrun::dispatch::StreamEvent;
use fleetrun::exec::local::LocalBackend;
use fleetrun::model::command::Command;
use fleetrun::store::Store;
use fleetrun::tui::app::App;
use fleetrun::tui::log_state::LogBuffer;

/// Launch the interactive TUI.
///
/// # Errors
///
/// Returns an error if terminal setup or the event loop fails.
pub async fn run(
    store: Store,
    command: Command,
    log_file: Option<String>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Initialize the log buffer and custom logger
    let log_buffer = LogBuffer::new();
    let log_file = log_file.as_ref().map(std::fs::File::create).transpose()?;
    fleetrun::logger::init(log_buffer.clone(), log_file);

    // Install panic hook that restores the terminal before printing the panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app
    let store = Arc::new(Mutex::new(store));
    let exec_backend = Arc::new(LocalBackend::new(Arc::clone(&store)));
    let (stream_tx, stream_rx) = mpsc::channel(256);
    let mut app = App::new(store, command, exec_backend, stream_tx, log_buffer);

    // Connect the logger to the app's event channel for redraw notifications
    fleetrun::logger::connect_event_sender(app.event_tx.clone());

    // Main event loop
    let result = run_event_loop(&mut terminal, &mut app, stream_rx).await;

    // Shutdown: abort stream pump tasks
    app.shutdown();

    // Cleanup terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        error!("Application error: {e}");
        eprintln!("Error: {e}");
    }

    Ok(ExitCode::SUCCESS)
}

async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    mut stream_rx: mpsc::Receiver<StreamEvent>,
) -> Result<(), Box<dyn std::error::Error>> {
    use std::time::Duration;

    let mut event_stream = EventStream::new();
    let mut needs_render = true;

    // Frame rate limiter: ~60 FPS max
    let mut render_tick = tokio::time::interval(Duration::from_millis(16));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        if needs_render {
            app.clear_session_dirty();
            terminal.draw(|frame| app.render(frame))?;
            needs_render = false;
        }

        if app.should_quit {
            break;
        }

        // Wait for events
        tokio::select! {
            // Periodic tick to check for dirty sessions
            _ = render_tick.tick() => {
                if app.any_session_dirty() {
                    needs_render = true;
                }
            }
            // Crossterm events
            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) => {
                        needs_render = true;
                        app.handle_key(key);
                    }
                    Some(Ok(Event::Resize(_w, _h))) => {
                        // Grid geometry is re-measured by the render pass
                        needs_render = true;
                    }
                    Some(Err(e)) => {
                        error!("Event error: {e}");
                        break;
                    }
                    None => break,
                    _ => {}
                }
            }
            // Backend stream events, routed into sessions
            maybe_stream_event = stream_rx.recv() => {
                needs_render = true;
                if let Some(stream_event) = maybe_stream_event {
                    app.handle_stream_event(stream_event);
                }
            }
            // App events (logger redraw notifications)
            maybe_app_event = app.event_rx.recv() => {
                needs_render = true;
                if let Some(app_event) = maybe_app_event {
                    app.handle_app_event(app_event);
                }
            }
            // Defense-in-depth: handle Ctrl+C even if crossterm misses it
            _ = tokio::signal::ctrl_c() => {
                debug!("Received Ctrl+C signal");
                break;
            }
        }
    }

    Ok(())
}
