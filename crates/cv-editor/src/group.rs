//! Grouping and ungrouping.
//!
//! A new group is axis-aligned and unscaled, sized to the union of its
//! members' canvas bounds. Members are re-expressed relative to the group
//! centre. Ungrouping composes the group's matrix with each child's and
//! decomposes the result back into a canvas-space transform, so every
//! child stays exactly where it was drawn (up to skew, which a transform
//! cannot represent).

use crate::editor::Editor;
use crate::error::EditorError;
use crate::selection::Selection;
use crate::store::SceneMutation;
use cv_core::kurbo::{Affine, Rect};
use cv_core::*;

/// Wrap top-level `members` into a new group with id `group_id`.
///
/// Returns `None` (and changes nothing) unless there are at least two
/// distinct members, all top-level and none of them the background.
pub fn group_objects(scene: &mut SceneGraph, members: &[ObjectId], group_id: ObjectId) -> Option<ObjectId> {
    let mut unique: Vec<ObjectId> = Vec::with_capacity(members.len());
    for id in members {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }
    if unique.len() < 2 || scene.contains(group_id) {
        return None;
    }

    let mut bounds: Option<Rect> = None;
    for id in &unique {
        let object = scene.get(*id)?;
        if object.is_background() || scene.parent(*id).is_some() {
            return None;
        }
        let b = object.bounds();
        bounds = Some(bounds.map_or(b, |acc| acc.union(b)));
    }
    let bounds = bounds?;

    let group = Drawable::new(
        group_id,
        ObjectKind::Group {
            width: bounds.width(),
            height: bounds.height(),
        },
    )
    .at(bounds.x0, bounds.y0);
    let offset = group.center().to_vec2();

    for id in &unique {
        scene.update(*id, |d| d.translate(-offset.x, -offset.y));
    }
    if !scene.wrap(group, &unique) {
        // Validated above; undo the offsets if the graph still refused.
        for id in &unique {
            scene.update(*id, |d| d.translate(offset.x, offset.y));
        }
        return None;
    }
    log::debug!("grouped {} objects into {group_id}", unique.len());
    Some(group_id)
}

/// Dissolve a top-level group. Children come back as top-level objects
/// at the group's z-index, keeping their ids, with their on-canvas
/// placement preserved. Returns the children in draw order.
pub fn ungroup_object(scene: &mut SceneGraph, group_id: ObjectId) -> Option<Vec<ObjectId>> {
    let group = scene.get(group_id)?;
    if !group.kind.is_group() || scene.parent(group_id).is_some() {
        return None;
    }
    let matrix = group.matrix();
    let opacity = group.style.opacity;
    let visible = group.visible;

    // Compute every child's canvas transform before touching the graph,
    // so the scene never holds a half-ungrouped state.
    let placed: Vec<(ObjectId, Transform)> = scene
        .children(group_id)
        .into_iter()
        .filter_map(|id| scene.get(id).map(|child| (id, compose(matrix, child))))
        .collect();

    let restored = scene.unwrap(group_id)?;
    for (id, transform) in placed {
        scene.update(id, |d| {
            d.transform = transform;
            d.style.opacity *= opacity;
            d.visible &= visible;
        });
    }
    log::debug!("ungrouped {group_id} into {} objects", restored.len());
    Some(restored)
}

/// Canvas transform of `child` drawn inside a parent with matrix `parent`.
///
/// The child's own flips are factored out before decomposing and put
/// back afterwards: they act on the local axes and commute with scaling.
pub fn compose(parent: Affine, child: &Drawable) -> Transform {
    let size = child.size();
    let mut unflipped = child.transform;
    unflipped.flip_x = false;
    unflipped.flip_y = false;
    let mut t = Transform::from_matrix(parent * unflipped.matrix(size), size);
    t.flip_x ^= child.transform.flip_x;
    t.flip_y ^= child.transform.flip_y;
    t
}

impl Editor {
    /// Group the current selection (at least two objects) and select the
    /// new group.
    pub fn group(&mut self) -> Result<ObjectId, EditorError> {
        let scene = self.store.scene();
        let members: Vec<ObjectId> = self
            .selection
            .ids()
            .into_iter()
            .filter(|id| scene.get(*id).is_some_and(|d| !d.is_background()) && scene.parent(*id).is_none())
            .collect();
        if members.len() < 2 {
            log::warn!("group needs at least two selected objects, have {}", members.len());
            return Err(EditorError::NotEnoughObjects(members.len()));
        }
        self.record("group", |ed| {
            let group_id = ObjectId::with_prefix("group");
            let applied = ed.store.apply(SceneMutation::Group {
                members: members.clone(),
                group_id,
                tag: None,
                label: None,
            });
            if !applied {
                return Err(EditorError::NotEnoughObjects(members.len()));
            }
            ed.set_selection(Selection::Single(group_id));
            Ok(group_id)
        })
    }

    /// Dissolve the selected group and select its former children.
    pub fn ungroup(&mut self) -> Result<Vec<ObjectId>, EditorError> {
        let Some(id) = self
            .selection
            .single()
            .filter(|id| self.store.scene().get(*id).is_some_and(|d| d.kind.is_group()))
        else {
            log::warn!("ungroup: selection is not a single group");
            return Err(EditorError::NotAGroup);
        };
        self.record("ungroup", |ed| {
            let children = ungroup_object(ed.store.scene_mut(), id).ok_or(EditorError::NotAGroup)?;
            ed.set_selection(Selection::from_ids(children.iter().copied()));
            Ok(children)
        })
    }
}
