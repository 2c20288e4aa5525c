//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s. Hosts pass
//! raw `KeyboardEvent.key` values; the editor decides what each action
//! means in the current mode (e.g. Escape cancels a crop in crop mode and
//! clears the selection elsewhere).

use crate::input::Modifiers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    // ── Tool switching ──
    ToolSelect,
    ToolBrush,
    ToolEraser,
    ToolCrop,
    ToolArrow,
    AddText,

    // ── Edit ──
    Undo,
    Redo,
    Delete,
    Group,
    Ungroup,

    // ── Z-order ──
    SendBackward,
    BringForward,
    SendToBack,
    BringToFront,

    // ── Modal ──
    /// Cancel crop / rename, or clear the selection.
    Cancel,
    /// Apply the active crop.
    Confirm,
}

/// Resolves key events into shortcut actions.
///
/// On macOS `meta` is ⌘; elsewhere `ctrl` serves the same role.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"z"`, `"Delete"`).
    /// Returns `None` if the key combo has no binding.
    pub fn resolve(key: &str, ctrl: bool, shift: bool, _alt: bool, meta: bool) -> Option<ShortcutAction> {
        let cmd = ctrl || meta;

        // ── Modifier combos first (most specific) ──
        if cmd && shift {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Redo),
                "g" | "G" => Some(ShortcutAction::Ungroup),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Undo),
                "y" | "Y" => Some(ShortcutAction::Redo),
                "g" | "G" => Some(ShortcutAction::Group),
                "[" => Some(ShortcutAction::SendToBack),
                "]" => Some(ShortcutAction::BringToFront),
                _ => None,
            };
        }

        // ── Single keys ──
        match key {
            "v" | "V" => Some(ShortcutAction::ToolSelect),
            "b" | "B" => Some(ShortcutAction::ToolBrush),
            "e" | "E" => Some(ShortcutAction::ToolEraser),
            "c" | "C" => Some(ShortcutAction::ToolCrop),
            "a" | "A" => Some(ShortcutAction::ToolArrow),
            "t" | "T" => Some(ShortcutAction::AddText),
            "[" => Some(ShortcutAction::SendBackward),
            "]" => Some(ShortcutAction::BringForward),
            "Delete" | "Backspace" => Some(ShortcutAction::Delete),
            "Escape" => Some(ShortcutAction::Cancel),
            "Enter" => Some(ShortcutAction::Confirm),
            _ => None,
        }
    }

    pub fn resolve_with(key: &str, modifiers: Modifiers) -> Option<ShortcutAction> {
        Self::resolve(key, modifiers.ctrl, modifiers.shift, modifiers.alt, modifiers.meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_tool_shortcuts() {
        assert_eq!(
            ShortcutMap::resolve("v", false, false, false, false),
            Some(ShortcutAction::ToolSelect)
        );
        assert_eq!(
            ShortcutMap::resolve("B", false, false, false, false),
            Some(ShortcutAction::ToolBrush)
        );
        assert_eq!(
            ShortcutMap::resolve("e", false, false, false, false),
            Some(ShortcutAction::ToolEraser)
        );
        assert_eq!(
            ShortcutMap::resolve("c", false, false, false, false),
            Some(ShortcutAction::ToolCrop)
        );
        assert_eq!(
            ShortcutMap::resolve("a", false, false, false, false),
            Some(ShortcutAction::ToolArrow)
        );
    }

    #[test]
    fn resolve_undo_redo() {
        assert_eq!(
            ShortcutMap::resolve("z", false, false, false, true),
            Some(ShortcutAction::Undo)
        );
        assert_eq!(
            ShortcutMap::resolve("z", true, false, false, false),
            Some(ShortcutAction::Undo)
        );
        assert_eq!(
            ShortcutMap::resolve("z", false, true, false, true),
            Some(ShortcutAction::Redo)
        );
        assert_eq!(
            ShortcutMap::resolve("y", true, false, false, false),
            Some(ShortcutAction::Redo)
        );
    }

    #[test]
    fn resolve_grouping() {
        assert_eq!(
            ShortcutMap::resolve("g", false, false, false, true),
            Some(ShortcutAction::Group)
        );
        assert_eq!(
            ShortcutMap::resolve("G", false, true, false, true),
            Some(ShortcutAction::Ungroup)
        );
        assert_eq!(ShortcutMap::resolve("g", false, false, false, false), None);
    }

    #[test]
    fn resolve_z_order() {
        assert_eq!(
            ShortcutMap::resolve("[", false, false, false, false),
            Some(ShortcutAction::SendBackward)
        );
        assert_eq!(
            ShortcutMap::resolve("]", false, false, false, false),
            Some(ShortcutAction::BringForward)
        );
        assert_eq!(
            ShortcutMap::resolve("[", false, false, false, true),
            Some(ShortcutAction::SendToBack)
        );
        assert_eq!(
            ShortcutMap::resolve("]", true, false, false, false),
            Some(ShortcutAction::BringToFront)
        );
    }

    #[test]
    fn resolve_modal_keys() {
        assert_eq!(
            ShortcutMap::resolve_with("Escape", Modifiers::NONE),
            Some(ShortcutAction::Cancel)
        );
        assert_eq!(
            ShortcutMap::resolve_with("Enter", Modifiers::NONE),
            Some(ShortcutAction::Confirm)
        );
        assert_eq!(
            ShortcutMap::resolve_with("Backspace", Modifiers::NONE),
            Some(ShortcutAction::Delete)
        );
    }

    #[test]
    fn resolve_unknown_key() {
        assert_eq!(ShortcutMap::resolve("q", false, false, false, false), None);
        assert_eq!(ShortcutMap::resolve("x", false, false, false, true), None);
    }
}
