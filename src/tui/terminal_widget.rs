use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::Widget;

/// Map a vt100 color to a ratatui color
fn map_color(color: vt100::Color) -> Color {
    match color {
        vt100::Color::Default => Color::Reset,
        vt100::Color::Idx(i) => Color::Indexed(i),
        vt100::Color::Rgb(r, g, b) => Color::Rgb(r, g, b),
    }
}

fn cell_style(cell: &vt100::Cell) -> Style {
    let mut modifier = Modifier::empty();
    if cell.bold() {
        modifier |= Modifier::BOLD;
    }
    if cell.italic() {
        modifier |= Modifier::ITALIC;
    }
    if cell.underline() {
        modifier |= Modifier::UNDERLINED;
    }
    if cell.inverse() {
        modifier |= Modifier::REVERSED;
    }
    Style::default()
        .fg(map_color(cell.fgcolor()))
        .bg(map_color(cell.bgcolor()))
        .add_modifier(modifier)
}

/// Widget that renders a `vt100::Screen` into a ratatui buffer.
///
/// The cursor is only drawn for the focused session cell, so the grid does
/// not show a dozen blinking blocks at once.
pub struct PseudoTerminal<'a> {
    screen: &'a vt100::Screen,
    show_cursor: bool,
}

impl<'a> PseudoTerminal<'a> {
    #[must_use]
    pub fn new(screen: &'a vt100::Screen) -> Self {
        Self {
            screen,
            show_cursor: false,
        }
    }

    #[must_use]
    pub fn show_cursor(mut self, show: bool) -> Self {
        self.show_cursor = show;
        self
    }
}

impl Widget for PseudoTerminal<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let rows = area.height.min(self.screen.size().0);
        let cols = area.width.min(self.screen.size().1);

        for row in 0..rows {
            for col in 0..cols {
                let Some(cell) = self.screen.cell(row, col) else {
                    continue;
                };
                let x = area.x + col;
                let y = area.y + row;
                if x >= area.right() || y >= area.bottom() {
                    continue;
                }
                let Some(buf_cell) = buf.cell_mut((x, y)) else {
                    continue;
                };

                let contents = cell.contents();
                match contents.chars().next() {
                    // First char only; for wide chars this covers the main cell
                    Some(c) => buf_cell.set_char(c),
                    None => buf_cell.set_char(' '),
                };
                buf_cell.set_style(cell_style(cell));
            }
        }

        if self.show_cursor && !self.screen.hide_cursor() {
            let (cursor_row, cursor_col) = self.screen.cursor_position();
            let cx = area.x + cursor_col;
            let cy = area.y + cursor_row;
            if cx < area.right()
                && cy < area.bottom()
                && let Some(cell) = buf.cell_mut((cx, cy))
            {
                cell.set_style(Style::default().fg(Color::Black).bg(Color::White));
            }
        }
    }
}
