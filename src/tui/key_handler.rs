use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::debug;

use super::app::{App, Focus};
use super::editor::toggle_asset;

impl App {
    /// Handle keyboard input
    #[expect(
        clippy::too_many_lines,
        reason = "key handler covers all keyboard shortcuts in one match"
    )]
    pub fn handle_key(&mut self, key: KeyEvent) {
        // Any keypress dismisses the last save/delete notice
        self.notice = None;

        // Global keys
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        // Phase 1: asset picker open — keys operate on the target list
        if self.editor.is_picking() {
            let targetable: Vec<String> = self
                .targetable_assets()
                .iter()
                .map(|a| a.name.clone())
                .collect();
            match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    self.editor.move_picker_cursor(-1, targetable.len());
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.editor.move_picker_cursor(1, targetable.len());
                }
                KeyCode::Char(' ') => {
                    if let super::editor::EditorState::PickingAssets { cursor } = self.editor
                        && let Some(asset_id) = targetable.get(cursor)
                    {
                        debug!("Toggling target asset '{asset_id}'");
                        toggle_asset(&mut self.command, asset_id);
                        self.reconcile_sessions();
                    }
                }
                KeyCode::Enter | KeyCode::Esc => {
                    self.editor.cancel();
                }
                _ => {}
            }
            return;
        }

        // Phase 2: a text field is being edited
        if self.editor.is_editing() {
            match key.code {
                KeyCode::Enter => {
                    self.editor.commit(&mut self.command);
                }
                KeyCode::Esc => {
                    self.editor.cancel();
                }
                KeyCode::Backspace => {
                    self.editor.pop_char();
                }
                KeyCode::Char(c) => {
                    self.editor.push_char(c);
                }
                _ => {}
            }
            return;
        }

        // Phase 3: log panel has its own navigation
        if self.show_logs {
            match key.code {
                KeyCode::Char('l') | KeyCode::Esc => {
                    self.show_logs = false;
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    self.log_scroll = self.log_scroll.saturating_add(1);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    self.log_scroll = self.log_scroll.saturating_sub(1);
                }
                KeyCode::PageUp => {
                    self.log_scroll = self.log_scroll.saturating_add(10);
                }
                KeyCode::PageDown => {
                    self.log_scroll = self.log_scroll.saturating_sub(10);
                }
                KeyCode::Char('q') => {
                    self.should_quit = true;
                }
                _ => {}
            }
            return;
        }

        // Keys shared by both panes
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return;
            }
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Form => Focus::Grid,
                    Focus::Grid => Focus::Form,
                };
                return;
            }
            KeyCode::Char('l') => {
                self.show_logs = true;
                self.log_scroll = 0;
                return;
            }
            KeyCode::Char('R') => {
                self.run_all();
                return;
            }
            KeyCode::Char('s') => {
                self.save();
                return;
            }
            KeyCode::Char('D') => {
                self.delete();
                return;
            }
            _ => {}
        }

        match self.focus {
            Focus::Form => match key.code {
                KeyCode::Up | KeyCode::Char('k') => self.editor.select_prev(),
                KeyCode::Down | KeyCode::Char('j') => self.editor.select_next(),
                KeyCode::Enter => self.editor.begin_edit(&self.command),
                _ => {}
            },
            Focus::Grid => match key.code {
                KeyCode::Left | KeyCode::Char('h') => self.move_session_focus(-1),
                KeyCode::Right => self.move_session_focus(1),
                KeyCode::Up | KeyCode::Char('k') => self.move_session_focus(-2),
                KeyCode::Down | KeyCode::Char('j') => self.move_session_focus(2),
                KeyCode::Enter | KeyCode::Char('r') => self.run_focused(),
                KeyCode::PageUp => self.scroll_focused(10),
                KeyCode::PageDown => self.scroll_focused(-10),
                KeyCode::End => {
                    if let Some(asset_id) = self.focused_asset_id()
                        && let Some(session) = self.registry.get(&asset_id)
                        && let Err(e) = session.set_scroll(0)
                    {
                        debug!("Failed to reset scroll: {e}");
                    }
                }
                _ => {}
            },
        }
    }

    fn scroll_focused(&mut self, delta: isize) {
        if let Some(asset_id) = self.focused_asset_id()
            && let Some(session) = self.registry.get(&asset_id)
            && let Err(e) = session.scroll(delta)
        {
            debug!("Failed to scroll session '{asset_id}': {e}");
        }
    }
}
