//! Undo/Redo command stack.
//!
//! Every user-visible change is captured as a pair of canvas snapshots
//! (before and after). Undo and redo swap the whole scene back in, which
//! keeps grouping, crop and effect results trivially reversible.
//!
//! Operations open a batch, mutate the live scene, and close the batch.
//! Batches nest: a pointer gesture (drag, brush stroke) is one batch and
//! any discrete operation it triggers folds into it. Only the outermost
//! batch pushes a command, and only if the scene actually changed.

use cv_core::{CanvasDocument, SceneGraph};

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub before: CanvasDocument,
    pub after: CanvasDocument,
    pub description: String,
}

pub struct CommandStack {
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
    max_depth: usize,
    /// Batch nesting depth (0 = not batching).
    batch_depth: usize,
    /// Scene captured when the outermost batch opened.
    batch_snapshot: Option<(CanvasDocument, String)>,
}

impl CommandStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_depth: max_depth.max(1),
            batch_depth: 0,
            batch_snapshot: None,
        }
    }

    pub fn begin_batch(&mut self, scene: &SceneGraph, description: &str) {
        if self.batch_depth == 0 {
            self.batch_snapshot = Some((CanvasDocument::from_scene(scene), description.to_string()));
        }
        self.batch_depth += 1;
    }

    /// Close a batch. Returns true if a command was pushed.
    pub fn end_batch(&mut self, scene: &SceneGraph) -> bool {
        if self.batch_depth == 0 {
            return false;
        }
        self.batch_depth -= 1;
        if self.batch_depth > 0 {
            return false;
        }
        let Some((before, description)) = self.batch_snapshot.take() else {
            return false;
        };
        let after = CanvasDocument::from_scene(scene);
        if before == after {
            return false;
        }
        log::debug!("undo step: {description}");
        self.undo_stack.push(Snapshot {
            before,
            after,
            description,
        });
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
        true
    }

    pub fn is_batching(&self) -> bool {
        self.batch_depth > 0
    }

    /// Pop the latest command; returns the scene to restore.
    pub fn undo(&mut self) -> Option<CanvasDocument> {
        let cmd = self.undo_stack.pop()?;
        let before = cmd.before.clone();
        self.redo_stack.push(cmd);
        Some(before)
    }

    /// Re-apply the latest undone command; returns the scene to restore.
    pub fn redo(&mut self) -> Option<CanvasDocument> {
        let cmd = self.redo_stack.pop()?;
        let after = cmd.after.clone();
        self.undo_stack.push(cmd);
        Some(after)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().map(|c| c.description.as_str())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|c| c.description.as_str())
    }

    /// Drop all history (after loading a different canvas).
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.batch_depth = 0;
        self.batch_snapshot = None;
    }
}
