//! Core implementation of the Fleetrun command dispatcher
//!
//! Fleetrun edits a named, organization-scoped shell command and executes it
//! concurrently across a set of remote assets, streaming each execution's
//! output into a per-asset terminal session. Sessions are keyed by asset
//! identifier, created on demand, and never torn down while the app runs, so
//! late output from an execution always has somewhere to land.

use std::path::PathBuf;

use log::debug;

pub mod dispatch;
pub mod exec;
pub mod logger;
pub mod model;
pub mod router;
pub mod session;
pub mod store;
pub mod theme;
pub mod tui;

use store::{Store, StoreError};

/// Load the store from a file (or auto-detect), returning the `Store` and
/// the path it was loaded from.
///
/// # Errors
///
/// Returns `StoreError` if no store file can be found, or if it cannot be
/// read, parsed, or validated.
pub fn load_store(store_file: Option<&str>) -> Result<(Store, PathBuf), StoreError> {
    let store_path = match store_file {
        Some(file) => {
            let store_path = PathBuf::from(file);
            if !store_path.exists() {
                return Err(StoreError::StoreNotFound(store_path));
            }
            store_path
        }
        None => Store::find_store()?,
    };
    debug!("Loading store from {}", store_path.display());
    let store = Store::from_file(&store_path)?;
    Ok((store, store_path))
}

/// Resolve which command the app should open: an explicit `owner/name`
/// identity, or the first command in the store when none is given.
///
/// # Errors
///
/// Returns `StoreError::CommandNotFound` if the named command does not
/// exist, the identity is malformed, or the store holds no commands at all.
pub fn resolve_command(
    store: &Store,
    identity: Option<&str>,
) -> Result<model::command::Command, StoreError> {
    match identity {
        Some(identity) => {
            let (owner, name) =
                identity
                    .split_once('/')
                    .ok_or_else(|| StoreError::CommandNotFound {
                        owner: String::new(),
                        name: identity.to_string(),
                    })?;
            store.get_command(owner, name)
        }
        None => store
            .first_command()
            .cloned()
            .ok_or_else(|| StoreError::CommandNotFound {
                owner: String::new(),
                name: String::new(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_store(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("fleetrun.yaml");
        std::fs::write(
            &path,
            r"
commands:
  - owner: org1
    name: deploy
    cmd: uptime
assets: []
",
        )
        .unwrap();
        path
    }

    #[test]
    fn test_load_store_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_store(dir.path());
        let (store, loaded_from) = load_store(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(loaded_from, path);
        assert!(store.get_command("org1", "deploy").is_ok());
    }

    #[test]
    fn test_load_store_missing_file() {
        assert!(matches!(
            load_store(Some("/nonexistent/fleetrun.yaml")),
            Err(StoreError::StoreNotFound(_))
        ));
    }

    #[test]
    fn test_resolve_command_by_identity() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = load_store(Some(write_store(dir.path()).to_str().unwrap())).unwrap();
        assert_eq!(
            resolve_command(&store, Some("org1/deploy")).unwrap().name,
            "deploy"
        );
        assert!(resolve_command(&store, Some("no-slash")).is_err());
        assert!(resolve_command(&store, Some("org1/other")).is_err());
    }

    #[test]
    fn test_resolve_command_defaults_to_first() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = load_store(Some(write_store(dir.path()).to_str().unwrap())).unwrap();
        assert_eq!(resolve_command(&store, None).unwrap().name, "deploy");
    }
}
