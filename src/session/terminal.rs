use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::spawn;

use log::debug;
use parking_lot::Mutex;

const DEFAULT_SCROLLBACK_SIZE: usize = 2000;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session update channel disconnected")]
    UpdateChannelDisconnected,
}

/// Terminal dimensions in columns and rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalSize {
    pub cols: u16,
    pub rows: u16,
}

impl TerminalSize {
    #[must_use]
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols: cols.max(2),
            rows: rows.max(2),
        }
    }
}

impl Default for TerminalSize {
    /// Bootstrap geometry used before the first render pass has measured the
    /// session's real surface.
    fn default() -> Self {
        Self { cols: 80, rows: 24 }
    }
}

#[derive(Debug)]
enum SessionUpdate {
    Feed(Vec<u8>),
    Resize(TerminalSize),
    Scroll(isize),
    SetScroll(usize),
}

/// Insert a carriage return before every bare line feed so plain text renders
/// with the cursor returning to column zero (the vt100 parser does not do
/// this on its own).
fn convert_eol(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut prev = 0u8;
    for &b in bytes {
        if b == b'\n' && prev != b'\r' {
            out.push(b'\r');
        }
        out.push(b);
        prev = b;
    }
    out
}

/// Spawn the thread that applies queued updates to the vt100 parser and sets
/// the dirty flag for the render loop.
fn spawn_update_writer(
    parser: Arc<Mutex<vt100::Parser>>,
    dirty: Arc<AtomicBool>,
    scroll: Arc<AtomicUsize>,
    scrollback_size: usize,
) -> crossbeam_channel::Sender<SessionUpdate> {
    let (update_tx, update_rx) = crossbeam_channel::bounded(1000);

    spawn(move || {
        loop {
            let res = update_rx.recv();
            let mut parser = parser.lock();
            if let Ok(update) = res {
                apply_update(&mut parser, &scroll, scrollback_size, update);

                // Drain any pending updates to batch processing
                while let Ok(update) = update_rx.try_recv() {
                    apply_update(&mut parser, &scroll, scrollback_size, update);
                }
            } else {
                debug!("Session update channel closed");
                break;
            }

            dirty.store(true, Ordering::Release);
        }
    });

    update_tx
}

fn apply_update(
    parser: &mut vt100::Parser,
    scroll: &AtomicUsize,
    scrollback_size: usize,
    update: SessionUpdate,
) {
    match update {
        SessionUpdate::Feed(bytes) => {
            parser.process(&bytes);
        }
        SessionUpdate::Resize(size) => {
            parser.set_size(size.rows, size.cols);
        }
        SessionUpdate::Scroll(delta) => {
            let pos = scroll.load(Ordering::Relaxed);
            let new_pos = pos.saturating_add_signed(delta).min(scrollback_size);
            if pos != new_pos {
                parser.set_scrollback(new_pos);
                scroll.store(new_pos, Ordering::Relaxed);
            }
        }
        SessionUpdate::SetScroll(rows) => {
            let rows = rows.min(scrollback_size);
            parser.set_scrollback(rows);
            scroll.store(rows, Ordering::Relaxed);
        }
    }
}

/// One live, append-only output stream bound to a single asset.
///
/// The binding is permanent: the asset identifier never changes and the
/// session is never torn down while the app runs, even if the asset is
/// dropped from the command's target list (it is merely marked orphaned).
pub struct TerminalSession {
    asset_id: String,
    update_tx: crossbeam_channel::Sender<SessionUpdate>,
    parser: Arc<Mutex<vt100::Parser>>,
    dirty: Arc<AtomicBool>,
    orphaned: AtomicBool,
}

impl TerminalSession {
    #[must_use]
    pub fn new(asset_id: &str, size: TerminalSize) -> Self {
        let parser = Arc::new(Mutex::new(vt100::Parser::new(
            size.rows,
            size.cols,
            DEFAULT_SCROLLBACK_SIZE,
        )));
        let dirty = Arc::new(AtomicBool::new(false));
        let scroll = Arc::new(AtomicUsize::new(0));
        let update_tx = spawn_update_writer(
            Arc::clone(&parser),
            Arc::clone(&dirty),
            scroll,
            DEFAULT_SCROLLBACK_SIZE,
        );

        Self {
            asset_id: asset_id.to_string(),
            update_tx,
            parser,
            dirty,
            orphaned: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    /// Access the vt100 parser (for rendering)
    #[must_use]
    pub fn parser(&self) -> &Arc<Mutex<vt100::Parser>> {
        &self.parser
    }

    /// Check if the session has new output since last clear
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Clear the dirty flag (call after rendering)
    pub fn clear_dirty(&self) {
        self.dirty.store(false, Ordering::Release);
    }

    /// Whether the asset is no longer in the command's target list.
    #[must_use]
    pub fn is_orphaned(&self) -> bool {
        self.orphaned.load(Ordering::Relaxed)
    }

    pub fn set_orphaned(&self, orphaned: bool) {
        self.orphaned.store(orphaned, Ordering::Relaxed);
    }

    fn send(&self, update: SessionUpdate) -> Result<(), SessionError> {
        self.update_tx
            .send(update)
            .map_err(|_| SessionError::UpdateChannelDisconnected)
    }

    /// Append text to the stream, converting bare line feeds.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UpdateChannelDisconnected` if the writer thread
    /// is gone.
    pub fn append_text(&self, text: &str) -> Result<(), SessionError> {
        self.send(SessionUpdate::Feed(convert_eol(text)))
    }

    /// Write raw bytes (already carrying control sequences) to the stream.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UpdateChannelDisconnected` if the writer thread
    /// is gone.
    pub fn echo(&self, bytes: Vec<u8>) -> Result<(), SessionError> {
        self.send(SessionUpdate::Feed(bytes))
    }

    /// Resize the session surface.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UpdateChannelDisconnected` if the writer thread
    /// is gone.
    pub fn resize(&self, size: TerminalSize) -> Result<(), SessionError> {
        self.send(SessionUpdate::Resize(size))
    }

    /// Scroll the output by a number of lines (positive = into history).
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UpdateChannelDisconnected` if the writer thread
    /// is gone.
    pub fn scroll(&self, delta: isize) -> Result<(), SessionError> {
        self.send(SessionUpdate::Scroll(delta))
    }

    /// Jump to a scrollback position (0 = live tail).
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UpdateChannelDisconnected` if the writer thread
    /// is gone.
    pub fn set_scroll(&self, rows: usize) -> Result<(), SessionError> {
        self.send(SessionUpdate::SetScroll(rows))
    }
}

impl std::fmt::Debug for TerminalSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalSession")
            .field("asset_id", &self.asset_id)
            .field("orphaned", &self.is_orphaned())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_eol_inserts_carriage_returns() {
        assert_eq!(convert_eol("a\nb"), b"a\r\nb");
        assert_eq!(convert_eol("a\r\nb"), b"a\r\nb");
        assert_eq!(convert_eol("\n"), b"\r\n");
        assert_eq!(convert_eol(""), b"");
    }

    #[test]
    fn test_append_advances_cursor() {
        let session = TerminalSession::new("host1", TerminalSize::new(20, 5));
        session.append_text("hello\n").unwrap();
        // Wait for the writer thread to drain the update
        for _ in 0..100 {
            if session.is_dirty() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        let parser = session.parser().lock();
        assert_eq!(parser.screen().cursor_position(), (1, 0));
        assert!(parser.screen().contents().starts_with("hello"));
    }
}
