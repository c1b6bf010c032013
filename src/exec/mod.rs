//! Command execution against remote assets
//!
//! [`backend::ExecBackend`] is the seam to whatever actually runs the
//! command: each dispatch yields an independent event stream of serialized
//! output payloads, terminated implicitly when the channel closes.
//! [`local::LocalBackend`] is the bundled implementation, running the stored
//! command in a local PTY per dispatch.

use anstyle::{AnsiColor, Reset, RgbColor, Style};

use crate::theme;

pub mod backend;
pub mod local;

const PRIMARY_COLOR: Style = Style::new().fg_color(Some(anstyle::Color::Rgb(RgbColor(
    theme::ACCENT_RGB.0,
    theme::ACCENT_RGB.1,
    theme::ACCENT_RGB.2,
))));
const DIM_COLOR: Style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::BrightBlack)));

fn render_arrow() -> String {
    format!("{PRIMARY_COLOR}❱{Reset}")
}

/// Banner echoed into a session when a dispatch is issued against its asset.
#[must_use]
pub fn format_dispatch_message(identity: &str, asset_id: &str) -> Vec<u8> {
    format!(
        "{} {identity} {DIM_COLOR}→ {asset_id}{Reset}\r\n",
        render_arrow()
    )
    .into()
}
