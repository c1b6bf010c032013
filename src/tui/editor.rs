use crate::model::command::Command;

/// Editable fields of the command form, in navigation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Owner,
    Name,
    DisplayName,
    Cmd,
    Assets,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Owner,
        Field::Name,
        Field::DisplayName,
        Field::Cmd,
        Field::Assets,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Field::Owner => "Organization",
            Field::Name => "Name",
            Field::DisplayName => "Display name",
            Field::Cmd => "Command",
            Field::Assets => "Assets",
        }
    }

    #[must_use]
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    #[must_use]
    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Current value of a text field, as shown and edited in the form.
#[must_use]
pub fn field_value(command: &Command, field: Field) -> String {
    match field {
        Field::Owner => command.owner.clone(),
        Field::Name => command.name.clone(),
        Field::DisplayName => command.display_name.clone(),
        Field::Cmd => command.cmd.clone(),
        Field::Assets => command.assets.join(", "),
    }
}

/// State machine for the command form.
///
/// Text fields are edited through a staging buffer: the in-memory command is
/// only touched on commit, so cancelling an edit leaves it untouched. The
/// asset picker edits the target list live, since every toggle must drive
/// session reconciliation immediately.
#[derive(Debug, Clone)]
pub enum EditorState {
    /// Moving between fields
    Browsing { field: Field },
    /// Typing into a text field
    Editing { field: Field, buffer: String },
    /// Toggling targets in the asset picker
    PickingAssets { cursor: usize },
}

impl Default for EditorState {
    fn default() -> Self {
        EditorState::Browsing {
            field: Field::Owner,
        }
    }
}

impl EditorState {
    /// The field the editor is on, regardless of mode.
    #[must_use]
    pub fn field(&self) -> Field {
        match self {
            EditorState::Browsing { field } | EditorState::Editing { field, .. } => *field,
            EditorState::PickingAssets { .. } => Field::Assets,
        }
    }

    #[must_use]
    pub fn is_editing(&self) -> bool {
        matches!(self, EditorState::Editing { .. })
    }

    #[must_use]
    pub fn is_picking(&self) -> bool {
        matches!(self, EditorState::PickingAssets { .. })
    }

    /// The staged text of an in-progress edit, if any.
    #[must_use]
    pub fn buffer(&self) -> Option<&str> {
        match self {
            EditorState::Editing { buffer, .. } => Some(buffer),
            _ => None,
        }
    }

    /// Enter edit mode on the current field: text fields open a staging
    /// buffer seeded with the current value, the assets field opens the
    /// picker.
    pub fn begin_edit(&mut self, command: &Command) {
        if let EditorState::Browsing { field } = *self {
            *self = match field {
                Field::Assets => EditorState::PickingAssets { cursor: 0 },
                _ => EditorState::Editing {
                    field,
                    buffer: field_value(command, field),
                },
            };
        }
    }

    /// Append a character (only meaningful while editing).
    pub fn push_char(&mut self, c: char) {
        if let EditorState::Editing { buffer, .. } = self {
            buffer.push(c);
        }
    }

    /// Remove the last character (only meaningful while editing).
    pub fn pop_char(&mut self) {
        if let EditorState::Editing { buffer, .. } = self {
            buffer.pop();
        }
    }

    /// Commit the staged buffer into the command field and return to
    /// browsing. Returns true if the field's value actually changed.
    pub fn commit(&mut self, command: &mut Command) -> bool {
        let EditorState::Editing { field, buffer } = self else {
            return false;
        };
        let field = *field;
        let value = std::mem::take(buffer);
        let changed = field_value(command, field) != value;
        match field {
            Field::Owner => command.owner = value,
            Field::Name => command.name = value,
            Field::DisplayName => command.display_name = value,
            Field::Cmd => command.cmd = value,
            Field::Assets => {}
        }
        *self = EditorState::Browsing { field };
        changed
    }

    /// Abandon the staged edit (or close the picker) without touching the
    /// command's text fields.
    pub fn cancel(&mut self) {
        let field = self.field();
        *self = EditorState::Browsing { field };
    }

    pub fn select_next(&mut self) {
        if let EditorState::Browsing { field } = self {
            *field = field.next();
        }
    }

    pub fn select_prev(&mut self) {
        if let EditorState::Browsing { field } = self {
            *field = field.prev();
        }
    }

    /// Move the picker cursor, clamped to the picker's row count.
    pub fn move_picker_cursor(&mut self, delta: isize, rows: usize) {
        if let EditorState::PickingAssets { cursor } = self {
            let max = rows.saturating_sub(1);
            *cursor = cursor.saturating_add_signed(delta).min(max);
        }
    }
}

/// Toggle an asset in the command's target list, preserving selection order
/// for additions.
pub fn toggle_asset(command: &mut Command, asset_id: &str) {
    if command.assets.iter().any(|a| a == asset_id) {
        command.assets.retain(|a| a != asset_id);
    } else {
        command.assets.push(asset_id.to_string());
    }
}
