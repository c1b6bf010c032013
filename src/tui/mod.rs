//! Interactive terminal interface
//!
//! The TUI is a single screen: a form pane for editing the command's fields
//! and a grid of per-asset terminal cells that receive streamed execution
//! output. Keyboard focus moves between the two panes; a log panel can be
//! toggled over the grid.

pub mod app;
pub mod editor;
pub mod key_handler;
pub mod log_state;
pub mod render;
pub mod terminal_widget;
