use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Clear, Paragraph};

use crate::session::terminal::TerminalSize;
use crate::{logger, theme};

use super::app::{App, Focus, NoticeKind};
use super::editor::{EditorState, Field, field_value};
use super::terminal_widget::PseudoTerminal;

const GRID_COLUMNS: usize = 2;
const FORM_HEIGHT: u16 = 7;

impl App {
    /// Render the app
    pub fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();

        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(FORM_HEIGHT),
                Constraint::Min(4),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(size);

        self.render_form(frame, outer[0]);
        if self.show_logs {
            self.render_log_panel(frame, outer[1]);
        } else {
            self.render_grid(frame, outer[1]);
        }
        self.render_notice(frame, outer[2]);
        render_toolbar(frame, outer[3], self.focus, self.show_logs);

        if self.editor.is_picking() {
            self.render_asset_picker(frame, size);
        }
    }

    fn render_form(&self, frame: &mut Frame, area: Rect) {
        let mut lines = Vec::with_capacity(Field::ALL.len() + 1);
        lines.push(Line::from(vec![
            Span::styled(
                " Edit Command ",
                Style::default()
                    .fg(theme::ACCENT)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{}/{}", self.saved_owner, self.saved_name),
                Style::default().fg(theme::DIM),
            ),
        ]));

        let current = self.editor.field();
        for field in Field::ALL {
            let selected = self.focus == Focus::Form && field == current;
            let marker = if selected { "❯ " } else { "  " };
            let marker_style = Style::default().fg(theme::ACCENT);
            let label_style = if selected {
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme::FIELD_LABEL)
            };

            let mut spans = vec![
                Span::styled(marker, marker_style),
                Span::styled(format!("{:<13}", field.label()), label_style),
            ];
            if selected && self.editor.is_editing() {
                spans.push(Span::raw(self.editor.buffer().unwrap_or("").to_string()));
                spans.push(Span::styled("█", Style::default().fg(theme::ACCENT)));
            } else {
                spans.push(Span::raw(field_value(&self.command, field)));
            }
            lines.push(Line::from(spans));
        }

        frame.render_widget(Paragraph::new(lines), area);
    }

    fn render_grid(&mut self, frame: &mut Frame, area: Rect) {
        let shown = self.display_assets();
        if shown.is_empty() {
            let placeholder = Paragraph::new("No target assets. Edit the Assets field to add some.")
                .style(Style::default().fg(theme::DIM));
            frame.render_widget(placeholder, area);
            return;
        }

        let rows = shown.len().div_ceil(GRID_COLUMNS);
        let row_ratio = u32::try_from(rows).unwrap_or(1).max(1);
        let row_areas = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Ratio(1, row_ratio); rows])
            .split(area);

        let mut cells: Vec<Rect> = Vec::with_capacity(shown.len());
        for row_area in row_areas.iter() {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(vec![Constraint::Ratio(1, 2); GRID_COLUMNS])
                .split(*row_area);
            cells.extend(cols.iter().copied());
        }

        // All cells share one geometry; sessions are resized when it changes
        let inner_w = cells[0].width.saturating_sub(2);
        let inner_h = cells[0].height.saturating_sub(2);
        self.update_cell_geometry(TerminalSize::new(inner_w, inner_h));

        for (idx, asset_id) in shown.iter().enumerate() {
            let cell = cells[idx];
            let focused = self.focus == Focus::Grid && idx == self.focused_session;
            let orphaned = self
                .registry
                .get(asset_id)
                .is_some_and(|s| s.is_orphaned());

            let mut title = vec![Span::styled(
                format!(" {asset_id} "),
                if orphaned {
                    Style::default().fg(theme::DIM)
                } else {
                    Style::default().fg(Color::White)
                },
            )];
            if orphaned {
                title.push(Span::styled(
                    "(orphaned) ",
                    Style::default().fg(theme::DIM),
                ));
            }

            let border_style = if focused {
                Style::default().fg(theme::ACCENT)
            } else {
                Style::default().fg(theme::DIM)
            };
            let block = Block::bordered()
                .border_type(BorderType::Rounded)
                .border_style(border_style)
                .title(Line::from(title));
            let inner = block.inner(cell);
            frame.render_widget(block, cell);

            if let Some(session) = self.registry.get(asset_id) {
                let parser = session.parser().lock();
                let widget = PseudoTerminal::new(parser.screen()).show_cursor(focused);
                frame.render_widget(widget, inner);
            }
        }
    }

    fn render_notice(&self, frame: &mut Frame, area: Rect) {
        let Some(ref notice) = self.notice else {
            return;
        };
        let color = match notice.kind {
            NoticeKind::Info => theme::SUCCESS,
            NoticeKind::Error => theme::FAILURE,
        };
        let line = Line::from(Span::styled(
            format!(" {}", notice.text),
            Style::default().fg(color),
        ));
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_asset_picker(&self, frame: &mut Frame, screen: Rect) {
        let EditorState::PickingAssets { cursor } = self.editor else {
            return;
        };
        let targetable = self.targetable_assets();

        let height = u16::try_from(targetable.len())
            .unwrap_or(u16::MAX)
            .max(1)
            .saturating_add(2);
        let width = 44u16.min(screen.width);
        let popup = centered_rect(screen, width, height.min(screen.height));

        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(theme::ACCENT))
            .title(" Select assets (space toggles) ");
        let inner = block.inner(popup);
        frame.render_widget(Clear, popup);
        frame.render_widget(block, popup);

        if targetable.is_empty() {
            let empty = Paragraph::new("No remote-shell assets registered.")
                .style(Style::default().fg(theme::DIM));
            frame.render_widget(empty, inner);
            return;
        }

        let lines: Vec<Line> = targetable
            .iter()
            .enumerate()
            .map(|(idx, asset)| {
                let selected = self.command.assets.iter().any(|a| *a == asset.name);
                let mark = if selected { "●" } else { "○" };
                let style = if idx == cursor {
                    Style::default()
                        .fg(Color::White)
                        .bg(Color::Rgb(50, 50, 50))
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                Line::from(vec![
                    Span::styled(
                        format!(" {mark} "),
                        if selected {
                            Style::default().fg(theme::ACCENT)
                        } else {
                            Style::default().fg(theme::DIM)
                        },
                    ),
                    Span::styled(asset.label().to_string(), style),
                    Span::styled(
                        format!("  ({})", asset.name),
                        Style::default().fg(theme::DIM),
                    ),
                ])
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn render_log_panel(&self, frame: &mut Frame, area: Rect) {
        let entries = self.log_buffer.entries();
        let count = entries.len();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(1)])
            .split(area);

        let header = Line::from(vec![Span::styled(
            format!(" Logs ({count}) "),
            Style::default()
                .fg(theme::ACCENT)
                .add_modifier(Modifier::BOLD),
        )]);
        frame.render_widget(Paragraph::new(header), chunks[0]);

        let content_area = chunks[1];
        if entries.is_empty() {
            let empty =
                Paragraph::new("No log messages yet.").style(Style::default().fg(theme::DIM));
            frame.render_widget(empty, content_area);
            return;
        }

        let visible_height = content_area.height as usize;
        let max_scroll = count.saturating_sub(visible_height);
        let scroll = self.log_scroll.min(max_scroll);

        // Show entries from bottom (newest last), scrolled up by `scroll`
        let start = count.saturating_sub(visible_height + scroll);
        let end = count.saturating_sub(scroll);

        let lines: Vec<Line> = entries[start..end]
            .iter()
            .map(|entry| {
                Line::from(vec![
                    Span::styled(
                        format!("{:>6.1}s ", entry.elapsed.as_secs_f64()),
                        Style::default().fg(theme::DIM),
                    ),
                    Span::styled(
                        format!("{:5}", entry.level),
                        Style::default().fg(logger::level_color(entry.level)),
                    ),
                    Span::styled(
                        format!(" {}: ", entry.target),
                        Style::default().fg(theme::DIM),
                    ),
                    Span::raw(&entry.message),
                ])
            })
            .collect();

        frame.render_widget(Paragraph::new(lines), content_area);
    }
}

fn centered_rect(screen: Rect, width: u16, height: u16) -> Rect {
    let x = screen.x + screen.width.saturating_sub(width) / 2;
    let y = screen.y + screen.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(screen.width), height.min(screen.height))
}

fn render_toolbar(frame: &mut Frame, area: Rect, focus: Focus, show_logs: bool) {
    let hints: &[(&str, &str)] = if show_logs {
        &[("l", "close logs"), ("↑↓", "scroll"), ("q", "quit")]
    } else if focus == Focus::Grid {
        &[
            ("r", "run"),
            ("R", "run all"),
            ("tab", "form"),
            ("pgup/pgdn", "scroll"),
            ("l", "logs"),
            ("q", "quit"),
        ]
    } else {
        &[
            ("enter", "edit"),
            ("s", "save"),
            ("D", "delete"),
            ("R", "run all"),
            ("tab", "sessions"),
            ("l", "logs"),
            ("q", "quit"),
        ]
    };

    let key_style = Style::default()
        .fg(theme::TOOLBAR_KEY_FG)
        .bg(theme::TOOLBAR_KEY_BG);
    let desc_style = Style::default()
        .fg(theme::TOOLBAR_DESC)
        .bg(theme::TOOLBAR_BG);

    let mut spans = Vec::with_capacity(hints.len() * 2);
    for (key, desc) in hints {
        spans.push(Span::styled(format!(" {key} "), key_style));
        spans.push(Span::styled(format!(" {desc} "), desc_style));
    }
    let toolbar =
        Paragraph::new(Line::from(spans)).style(Style::default().bg(theme::TOOLBAR_BG));
    frame.render_widget(toolbar, area);
}
