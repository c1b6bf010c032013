//! Per-asset terminal sessions and their registry
//!
//! Each target asset gets exactly one [`terminal::TerminalSession`]: a live,
//! append-only vt100 surface that receives routed execution output for the
//! lifetime of the app. The [`registry::SessionRegistry`] owns the sessions
//! and enforces the one-session-per-asset invariant; sessions are created on
//! demand and never destroyed, so late output from a dispatch issued before
//! an asset was deselected still has somewhere to land.

pub mod registry;
pub mod terminal;
