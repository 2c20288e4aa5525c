//! The scene store: the single owner of the scene graph.
//!
//! Tools and UI panels never touch the graph directly. They describe what
//! they want as [`SceneMutation`]s, which the store applies. The graph
//! records a [`SceneEvent`](cv_core::SceneEvent) for each change, and the
//! editor fans those out to the layer panel and subscribers.

use crate::group::{group_objects, ungroup_object};
use cv_core::kurbo::{Point, Size};
use cv_core::*;

/// A single change to the scene, produced by tools and panel actions.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneMutation {
    /// Add on top of the stack (backgrounds go to the bottom).
    Add { object: Box<Drawable> },
    Insert { object: Box<Drawable>, z: usize },
    Remove { id: ObjectId },
    /// Swap an object's contents in place, keeping its id and z-index.
    Replace { object: Box<Drawable> },
    Move { id: ObjectId, dx: f64, dy: f64 },
    SetTransform { id: ObjectId, transform: Transform },
    SetStyle { id: ObjectId, style: Style },
    SetLabel { id: ObjectId, label: Option<String> },
    SetVisible { id: ObjectId, visible: bool },
    SetText { id: ObjectId, content: String },
    /// Re-place a line between two canvas points.
    SetLine { id: ObjectId, start: Point, end: Point },
    /// Replace a freehand path with canvas-space points.
    SetPath { id: ObjectId, points: Vec<Point> },
    /// Attach an eraser stroke, already in the object's local space.
    Erase { id: ObjectId, stroke: EraserStroke },
    Reorder { id: ObjectId, z: usize },
    Group {
        members: Vec<ObjectId>,
        group_id: ObjectId,
        tag: Option<CustomType>,
        label: Option<String>,
    },
    Ungroup { id: ObjectId },
}

#[derive(Debug, Default)]
pub struct SceneStore {
    scene: SceneGraph,
}

impl SceneStore {
    pub fn new(size: Size) -> Self {
        Self {
            scene: SceneGraph::new(size),
        }
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub(crate) fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    /// Swap in a whole new scene (load, undo, redo). Emits `Cleared`
    /// followed by an `ObjectAdded` per top-level object.
    pub fn replace(&mut self, mut scene: SceneGraph) {
        // Events recorded before the swap still describe real changes.
        let mut events = self.scene.drain_events();
        scene.drain_events();
        events.push(SceneEvent::Cleared);
        if scene.size() != self.scene.size() {
            events.push(SceneEvent::Resized);
        }
        events.extend(scene.top_level().into_iter().map(SceneEvent::ObjectAdded));
        self.scene = scene;
        for event in events {
            self.scene.notify(event);
        }
    }

    /// Apply a mutation. Returns false if it referred to a missing object
    /// or was otherwise rejected.
    pub fn apply(&mut self, mutation: SceneMutation) -> bool {
        log::trace!("apply {mutation:?}");
        let scene = &mut self.scene;
        match mutation {
            SceneMutation::Add { object } => {
                scene.add(*object);
                true
            }
            SceneMutation::Insert { object, z } => {
                scene.insert_at(*object, z);
                true
            }
            SceneMutation::Remove { id } => scene.remove(id).is_some(),
            SceneMutation::Replace { object } => scene.update(object.id, |d| *d = *object).is_some(),
            SceneMutation::Move { id, dx, dy } => scene.update(id, |d| d.translate(dx, dy)).is_some(),
            SceneMutation::SetTransform { id, transform } => {
                scene.update(id, |d| d.transform = transform).is_some()
            }
            SceneMutation::SetStyle { id, style } => scene.update(id, |d| d.style = style).is_some(),
            SceneMutation::SetLabel { id, label } => scene.update(id, |d| d.layer_label = label).is_some(),
            SceneMutation::SetVisible { id, visible } => scene.update(id, |d| d.visible = visible).is_some(),
            SceneMutation::SetText { id, content } => {
                let is_text = scene.get(id).is_some_and(|d| matches!(d.kind, ObjectKind::Text { .. }));
                is_text
                    && scene
                        .update(id, |d| {
                            let center = d.center();
                            if let ObjectKind::Text { content: c, .. } = &mut d.kind {
                                *c = content;
                            }
                            // Keep the box centred where it was as it grows.
                            let size = d.size();
                            d.transform.set_center(size, center);
                        })
                        .is_some()
            }
            SceneMutation::SetLine { id, start, end } => scene
                .update(id, |d| {
                    let center = start.midpoint(end);
                    d.kind = ObjectKind::Line {
                        start: (start - center).to_point(),
                        end: (end - center).to_point(),
                    };
                    let size = d.size();
                    d.transform = Transform::default();
                    d.transform.set_center(size, center);
                })
                .is_some(),
            SceneMutation::SetPath { id, points } => scene
                .update(id, |d| {
                    let (local, center) = centre_points(&points);
                    d.kind = ObjectKind::Path { points: local };
                    let size = d.size();
                    d.transform = Transform::default();
                    d.transform.set_center(size, center);
                })
                .is_some(),
            SceneMutation::Erase { id, stroke } => scene.update(id, |d| d.eraser.push(stroke)).is_some(),
            SceneMutation::Reorder { id, z } => scene.move_to(id, z),
            SceneMutation::Group {
                members,
                group_id,
                tag,
                label,
            } => {
                let Some(id) = group_objects(scene, &members, group_id) else {
                    return false;
                };
                scene.update(id, |g| {
                    g.custom_type = tag;
                    g.layer_label = label;
                });
                true
            }
            SceneMutation::Ungroup { id } => ungroup_object(scene, id).is_some(),
        }
    }

    pub fn apply_all(&mut self, mutations: impl IntoIterator<Item = SceneMutation>) {
        for mutation in mutations {
            if !self.apply(mutation) {
                log::debug!("mutation had no effect");
            }
        }
    }
}

/// Express canvas points relative to their bounding-box centre.
pub(crate) fn centre_points(points: &[Point]) -> (Vec<Point>, Point) {
    let center = points_bounds(points).center();
    let local = points.iter().map(|p| (*p - center).to_point()).collect();
    (local, center)
}
