use serde::{Deserialize, Serialize};

/// Transport capability of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// Reachable over a remote shell; can be targeted by commands.
    Ssh,
    /// Reachable over remote desktop only; listed but never targetable.
    Rdp,
}

/// A remotely reachable machine registered with the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    pub kind: AssetKind,
}

impl Asset {
    /// Whether this asset can be offered as a command target.
    #[must_use]
    pub fn is_targetable(&self) -> bool {
        self.kind == AssetKind::Ssh
    }

    /// Name shown in the asset picker; falls back to the identifier.
    #[must_use]
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }
}
