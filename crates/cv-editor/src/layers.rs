//! Layer panel.
//!
//! A derived view of the scene's top-level objects, topmost first. The
//! editor refreshes it whenever scene events are flushed. Display index
//! `i` maps to z-index `(rows - 1) - i`.
//!
//! An object without a label gets a default one the first time the panel
//! sees it. The default is stored on the object, so it stays put when the
//! object's content changes later.

use crate::editor::Editor;
use crate::error::EditorError;
use crate::selection::Selection;
use crate::store::SceneMutation;
use cv_core::*;

#[derive(Debug, Clone, PartialEq)]
pub struct LayerRow {
    pub id: ObjectId,
    pub label: String,
    /// Object type name, e.g. `rect` or `group`.
    pub kind: &'static str,
    pub visible: bool,
    pub selected: bool,
    /// The background row: it cannot be selected or moved.
    pub locked: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct RenameState {
    id: ObjectId,
    draft: String,
}

#[derive(Debug, Default)]
pub struct LayerPanel {
    rows: Vec<LayerRow>,
    highlighted: Option<usize>,
    rename: Option<RenameState>,
}

/// Label shown for an object that has none of its own.
pub fn default_label(object: &Drawable, max_chars: usize) -> String {
    match (&object.custom_type, &object.kind) {
        (Some(CustomType::Arrow), _) => "ARROW".into(),
        (Some(CustomType::Background), _) => "BACKGROUND".into(),
        (_, ObjectKind::Text { content, .. }) if !content.trim().is_empty() => {
            let mut chars = content.chars();
            let head: String = chars.by_ref().take(max_chars).collect();
            if chars.next().is_some() {
                format!("{head}...")
            } else {
                head
            }
        }
        (_, kind) => kind.type_name().to_uppercase(),
    }
}

/// Store a default label on every top-level object that has none.
/// Returns how many objects were labelled.
pub fn assign_default_labels(scene: &mut SceneGraph, max_chars: usize) -> usize {
    let missing: Vec<(ObjectId, String)> = scene
        .iter()
        .filter(|object| object.layer_label.as_deref().is_none_or(|l| l.trim().is_empty()))
        .map(|object| (object.id, default_label(object, max_chars)))
        .collect();
    let count = missing.len();
    for (id, label) in missing {
        scene.assign_label(id, label);
    }
    count
}

impl LayerPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the rows from the scene.
    pub fn refresh(&mut self, scene: &SceneGraph, selection: &Selection, max_chars: usize) {
        self.rows = scene
            .iter()
            .rev()
            .map(|object| LayerRow {
                id: object.id,
                label: object
                    .layer_label
                    .clone()
                    .filter(|l| !l.trim().is_empty())
                    .unwrap_or_else(|| default_label(object, max_chars)),
                kind: object.kind.type_name(),
                visible: object.visible,
                selected: selection.contains(object.id),
                locked: object.is_background(),
            })
            .collect();
        self.highlighted = self.rows.iter().position(|r| r.selected);
        if let Some(rename) = &self.rename
            && !scene.contains(rename.id)
        {
            log::debug!("layer {} vanished mid-rename", rename.id);
            self.rename = None;
        }
    }

    /// Rows, topmost object first.
    pub fn rows(&self) -> &[LayerRow] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Result<&LayerRow, EditorError> {
        self.rows.get(index).ok_or(EditorError::LayerOutOfRange {
            index,
            len: self.rows.len(),
        })
    }

    /// First selected row.
    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn is_renaming(&self) -> bool {
        self.rename.is_some()
    }

    /// Row being renamed and its draft label.
    pub fn rename_draft(&self) -> Option<(usize, &str)> {
        let rename = self.rename.as_ref()?;
        let index = self.rows.iter().position(|r| r.id == rename.id)?;
        Some((index, rename.draft.as_str()))
    }

    /// Z-index of display row `index`.
    pub fn z_for(&self, index: usize) -> usize {
        self.rows.len().saturating_sub(1).saturating_sub(index)
    }

    fn ensure_idle(&self) -> Result<(), EditorError> {
        if self.rename.is_some() {
            log::warn!("layer action ignored while a rename is open");
            return Err(EditorError::RenameInProgress);
        }
        Ok(())
    }

    fn begin_rename(&mut self, index: usize) -> Result<(), EditorError> {
        self.ensure_idle()?;
        let row = self.row(index)?;
        self.rename = Some(RenameState {
            id: row.id,
            draft: row.label.clone(),
        });
        Ok(())
    }

    fn set_draft(&mut self, draft: &str) -> bool {
        match &mut self.rename {
            Some(rename) => {
                rename.draft = draft.to_string();
                true
            }
            None => false,
        }
    }

    /// Close the rename; yields the target and the new label unless the
    /// draft is blank.
    fn take_rename(&mut self) -> Option<(ObjectId, String)> {
        let rename = self.rename.take()?;
        let label = rename.draft.trim();
        if label.is_empty() {
            log::debug!("blank label for {}; keeping the old one", rename.id);
            return None;
        }
        Some((rename.id, label.to_string()))
    }

    fn cancel_rename(&mut self) -> bool {
        self.rename.take().is_some()
    }
}

impl Editor {
    pub fn layers(&self) -> &LayerPanel {
        &self.layers
    }

    /// Select the object in display row `index`.
    pub fn layer_select(&mut self, index: usize) -> Result<ObjectId, EditorError> {
        self.layers.ensure_idle()?;
        let row = self.layers.row(index)?;
        if row.locked {
            return Err(EditorError::BackgroundLocked);
        }
        let id = row.id;
        self.set_selection(Selection::Single(id));
        self.flush();
        Ok(id)
    }

    /// Flip the visibility of row `index`. Returns the new visibility.
    pub fn layer_toggle_visibility(&mut self, index: usize) -> Result<bool, EditorError> {
        self.layers.ensure_idle()?;
        let row = self.layers.row(index)?;
        let (id, visible) = (row.id, !row.visible);
        self.record(if visible { "show layer" } else { "hide layer" }, |ed| {
            ed.store.apply(SceneMutation::SetVisible { id, visible });
            Ok(visible)
        })
    }

    /// Delete the object in row `index`, background included.
    pub fn layer_delete(&mut self, index: usize) -> Result<ObjectId, EditorError> {
        self.layers.ensure_idle()?;
        let id = self.layers.row(index)?.id;
        self.record("delete layer", |ed| {
            ed.store.apply(SceneMutation::Remove { id });
            if ed.selection.contains(id) {
                let rest = ed.selection.retained(|s| s != id);
                ed.set_selection(rest);
            }
            Ok(id)
        })
    }

    /// Move the row at `source` so it is displayed at `target`.
    ///
    /// Rows are topmost first, so the object lands at z-index
    /// `(rows - 1) - target`. The background row can be neither moved nor
    /// displaced.
    pub fn layer_reorder(&mut self, source: usize, target: usize) -> Result<bool, EditorError> {
        self.layers.ensure_idle()?;
        let id = self.layers.row(source)?.id;
        let locked = self.layers.row(source)?.locked || self.layers.row(target)?.locked;
        if locked {
            log::warn!("reorder {source} -> {target} would move the background");
            return Err(EditorError::BackgroundLocked);
        }
        if source == target {
            return Ok(false);
        }
        let z = self.layers.z_for(target);
        self.record("reorder layers", |ed| Ok(ed.store.apply(SceneMutation::Reorder { id, z })))
    }

    /// Open an inline rename on row `index`, seeded with its current label.
    pub fn layer_begin_rename(&mut self, index: usize) -> Result<(), EditorError> {
        self.layers.begin_rename(index)
    }

    pub fn layer_set_rename_draft(&mut self, draft: &str) -> bool {
        self.layers.set_draft(draft)
    }

    /// Commit the open rename (Enter or blur). A blank draft leaves the
    /// label unchanged. Returns true if the label changed.
    pub fn layer_commit_rename(&mut self) -> Result<bool, EditorError> {
        let Some((id, label)) = self.layers.take_rename() else {
            return Ok(false);
        };
        let current = self.store.scene().get(id).and_then(|d| d.layer_label.clone());
        if current.as_deref() == Some(label.as_str()) {
            return Ok(false);
        }
        self.record("rename layer", |ed| {
            Ok(ed.store.apply(SceneMutation::SetLabel { id, label: Some(label) }))
        })
    }

    /// Abandon the open rename (Escape).
    pub fn layer_cancel_rename(&mut self) -> bool {
        self.layers.cancel_rename()
    }
}
