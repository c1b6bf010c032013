//! File-backed command and asset store
//!
//! The store is the persistence collaborator behind the editor: commands are
//! fetched and saved wholesale by `owner/name` identity, assets are listed
//! per owner. While the app runs, the in-memory command being edited is the
//! source of truth; nothing is written back until an explicit save.

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::asset::Asset;
use crate::model::command::Command;

const STORE_FILE_NAMES: [&str; 2] = ["fleetrun.yaml", ".fleetrun.yaml"];

/// Errors that can occur while loading or mutating the store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No store file found in current directory or its parents: {0}")]
    StoreNotFound(PathBuf),
    #[error("Unable to read store file {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("Unable to parse YAML store file {path}: {source}")]
    Yaml {
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("Duplicate command in store: {0}")]
    DuplicateCommand(String),
    #[error("Duplicate asset in store: {0}")]
    DuplicateAsset(String),
    #[error("Invalid store: {0}")]
    Validation(String),
    #[error("No such command: {owner}/{name}")]
    CommandNotFound { owner: String, name: String },
    #[error("A command named {owner}/{name} already exists")]
    NameTaken { owner: String, name: String },
}

/// On-disk shape of the store file
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    commands: Vec<Command>,
    #[serde(default)]
    assets: Vec<Asset>,
}

/// YAML-file-backed store of commands and assets
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    data: StoreFile,
}

impl Store {
    /// Load and validate a store file.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the file cannot be read or parsed, or if
    /// validation fails (duplicate identities, empty names or command text).
    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        debug!("Loading store from {}", path.display());
        let raw = std::fs::read_to_string(path).map_err(|e| StoreError::Io {
            source: e,
            path: path.to_path_buf(),
        })?;
        let data: StoreFile = serde_yaml::from_str(&raw).map_err(|e| StoreError::Yaml {
            source: e,
            path: path.to_path_buf(),
        })?;
        let store = Self {
            path: path.to_path_buf(),
            data,
        };
        store.validate()?;
        Ok(store)
    }

    /// Locate a store file in the current directory or its parents.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StoreNotFound` if no store file exists up the
    /// directory tree.
    pub fn find_store() -> Result<PathBuf, StoreError> {
        let cwd = std::env::current_dir().map_err(|e| StoreError::Io {
            source: e,
            path: PathBuf::from("."),
        })?;
        for dir in cwd.ancestors() {
            for name in STORE_FILE_NAMES {
                let candidate = dir.join(name);
                if candidate.exists() {
                    return Ok(candidate);
                }
            }
        }
        Err(StoreError::StoreNotFound(cwd))
    }

    fn validate(&self) -> Result<(), StoreError> {
        let mut seen = std::collections::HashSet::new();
        for cmd in &self.data.commands {
            if cmd.name.trim().is_empty() {
                return Err(StoreError::Validation(format!(
                    "Command owned by '{}' has an empty name",
                    cmd.owner
                )));
            }
            if cmd.cmd.trim().is_empty() {
                return Err(StoreError::Validation(format!(
                    "Command '{}' has an empty cmd string",
                    cmd.identity()
                )));
            }
            if !seen.insert(cmd.identity()) {
                return Err(StoreError::DuplicateCommand(cmd.identity()));
            }
        }
        let mut seen_assets = std::collections::HashSet::new();
        for asset in &self.data.assets {
            if asset.name.trim().is_empty() {
                return Err(StoreError::Validation(format!(
                    "Asset owned by '{}' has an empty name",
                    asset.owner
                )));
            }
            if !seen_assets.insert((asset.owner.clone(), asset.name.clone())) {
                return Err(StoreError::DuplicateAsset(asset.name.clone()));
            }
        }
        // Dangling asset references are tolerated: the asset may have been
        // deregistered after the command was saved.
        for cmd in &self.data.commands {
            for target in &cmd.assets {
                if !seen_assets.contains(&(cmd.owner.clone(), target.clone())) {
                    log::warn!(
                        "Command '{}' targets unknown asset '{target}'",
                        cmd.identity()
                    );
                }
            }
        }
        Ok(())
    }

    /// Fetch a command by identity.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::CommandNotFound` if no command matches.
    pub fn get_command(&self, owner: &str, name: &str) -> Result<Command, StoreError> {
        self.data
            .commands
            .iter()
            .find(|c| c.owner == owner && c.name == name)
            .cloned()
            .ok_or_else(|| StoreError::CommandNotFound {
                owner: owner.to_string(),
                name: name.to_string(),
            })
    }

    /// The first command in the store, if any. Used when the CLI names no
    /// command explicitly.
    #[must_use]
    pub fn first_command(&self) -> Option<&Command> {
        self.data.commands.first()
    }

    /// Replace the command stored under the given (pre-edit) identity.
    ///
    /// Renames are applied here: `updated` may carry a different `owner` or
    /// `name` than the key it is stored under.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::CommandNotFound` if the key identity does not
    /// exist, or `StoreError::NameTaken` if the rename collides with another
    /// stored command.
    pub fn update_command(
        &mut self,
        owner: &str,
        name: &str,
        updated: Command,
    ) -> Result<(), StoreError> {
        let idx = self
            .data
            .commands
            .iter()
            .position(|c| c.owner == owner && c.name == name)
            .ok_or_else(|| StoreError::CommandNotFound {
                owner: owner.to_string(),
                name: name.to_string(),
            })?;
        let renamed = updated.owner != owner || updated.name != name;
        if renamed
            && self
                .data
                .commands
                .iter()
                .any(|c| c.owner == updated.owner && c.name == updated.name)
        {
            return Err(StoreError::NameTaken {
                owner: updated.owner,
                name: updated.name,
            });
        }
        info!("Updating command '{}/{name}'", owner);
        self.data.commands[idx] = updated;
        Ok(())
    }

    /// Remove a command from the store.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::CommandNotFound` if the command is not stored.
    pub fn delete_command(&mut self, command: &Command) -> Result<(), StoreError> {
        let before = self.data.commands.len();
        self.data
            .commands
            .retain(|c| !(c.owner == command.owner && c.name == command.name));
        if self.data.commands.len() == before {
            return Err(StoreError::CommandNotFound {
                owner: command.owner.clone(),
                name: command.name.clone(),
            });
        }
        info!("Deleted command '{}'", command.identity());
        Ok(())
    }

    /// All assets registered for an owner, targetable or not.
    #[must_use]
    pub fn list_assets(&self, owner: &str) -> Vec<Asset> {
        self.data
            .assets
            .iter()
            .filter(|a| a.owner == owner)
            .cloned()
            .collect()
    }

    /// Persist the store wholesale to its backing file.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Yaml` if serialization fails or `StoreError::Io`
    /// if the file cannot be written.
    pub fn save(&self) -> Result<(), StoreError> {
        let raw = serde_yaml::to_string(&self.data).map_err(|e| StoreError::Yaml {
            source: e,
            path: self.path.clone(),
        })?;
        std::fs::write(&self.path, raw).map_err(|e| StoreError::Io {
            source: e,
            path: self.path.clone(),
        })?;
        debug!("Store saved to {}", self.path.display());
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
