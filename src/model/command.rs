use serde::{Deserialize, Serialize};

/// A named shell command scoped to an owning organization, with the assets it
/// targets.
///
/// `owner` + `name` form the command's identity in the store. `name` is
/// mutable; renaming changes where subsequent store operations are routed, so
/// the app tracks the last persisted name separately.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    pub cmd: String,
    /// Target asset identifiers, in selection order. Duplicates carry no
    /// meaning; session creation is keyed, not positional.
    #[serde(default)]
    pub assets: Vec<String>,
}

impl Command {
    /// The `owner/name` identity string used in logs and CLI arguments.
    #[must_use]
    pub fn identity(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}
