//! Entities edited and targeted by the application
//!
//! A [`command::Command`] is a named, reusable shell command owned by an
//! organization and aimed at a set of target assets. An [`asset::Asset`] is a
//! remotely reachable machine registered with the store; only assets whose
//! kind supports a remote shell can be targeted.

pub mod asset;
pub mod command;
