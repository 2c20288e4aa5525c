//! The scene graph: an ordered stack of drawables with nested groups.
//!
//! Objects live in a `petgraph` stable graph. Edges go from a group to
//! its children; top-level objects have no parent and are ordered by the
//! `stack` (index 0 is drawn first, i.e. bottom of the z-order). Child
//! order inside a group is kept explicitly per group.
//!
//! Every structural change is recorded as a [`SceneEvent`] so views like
//! the layer panel can stay in sync without inspecting the graph on every
//! frame. The background object (`customType = background`) is pinned to
//! z-index 0 and there is never more than one.

use crate::id::ObjectId;
use crate::model::Drawable;
use kurbo::{Affine, Size};
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use std::collections::HashMap;

/// Change notification emitted by the scene graph (and the editor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEvent {
    ObjectAdded(ObjectId),
    ObjectRemoved(ObjectId),
    ObjectModified(ObjectId),
    Reordered,
    Cleared,
    Resized,
    SelectionChanged,
}

#[derive(Debug, Clone)]
pub struct SceneGraph {
    graph: StableDiGraph<Drawable, ()>,
    /// Top-level z-order, bottom first.
    stack: Vec<NodeIndex>,
    /// Child order per group node, bottom first.
    child_order: HashMap<NodeIndex, Vec<NodeIndex>>,
    id_index: HashMap<ObjectId, NodeIndex>,
    /// Canvas dimensions in scene units.
    size: Size,
    /// Monotonic mutation counter.
    generation: u64,
    /// Generation at which each object was last touched.
    touched: HashMap<ObjectId, u64>,
    events: Vec<SceneEvent>,
}

impl SceneGraph {
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            graph: StableDiGraph::new(),
            stack: Vec::new(),
            child_order: HashMap::new(),
            id_index: HashMap::new(),
            size,
            generation: 0,
            touched: HashMap::new(),
            events: Vec::new(),
        }
    }

    // ─── Canvas ──────────────────────────────────────────────────────────

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn set_size(&mut self, size: Size) {
        if self.size != size {
            self.size = size;
            self.events.push(SceneEvent::Resized);
        }
    }

    // ─── Lookup ──────────────────────────────────────────────────────────

    pub fn get(&self, id: ObjectId) -> Option<&Drawable> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.id_index.contains_key(&id)
    }

    /// Number of top-level objects.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Top-level object ids, bottom of the z-order first.
    pub fn top_level(&self) -> Vec<ObjectId> {
        self.stack.iter().map(|idx| self.graph[*idx].id).collect()
    }

    /// Top-level objects, bottom of the z-order first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Drawable> {
        self.stack.iter().map(|idx| &self.graph[*idx])
    }

    /// Children of a group in draw order. Empty for non-groups.
    pub fn children(&self, id: ObjectId) -> Vec<ObjectId> {
        self.index_of(id)
            .and_then(|idx| self.child_order.get(&idx))
            .map(|order| order.iter().map(|c| self.graph[*c].id).collect())
            .unwrap_or_default()
    }

    pub fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        let idx = self.index_of(id)?;
        self.parent_index(idx).map(|p| self.graph[p].id)
    }

    /// Z-index of a top-level object.
    pub fn z_index(&self, id: ObjectId) -> Option<usize> {
        let idx = self.index_of(id)?;
        self.stack.iter().position(|s| *s == idx)
    }

    pub fn background(&self) -> Option<ObjectId> {
        self.stack
            .first()
            .map(|idx| &self.graph[*idx])
            .filter(|d| d.is_background())
            .map(|d| d.id)
    }

    /// Lowest z-index a non-background object may occupy.
    pub fn floor(&self) -> usize {
        usize::from(self.background().is_some())
    }

    /// Local → canvas matrix of an object, composing all ancestor groups.
    pub fn world_matrix(&self, id: ObjectId) -> Option<Affine> {
        let mut idx = self.index_of(id)?;
        let mut m = self.graph[idx].matrix();
        while let Some(parent) = self.parent_index(idx) {
            m = self.graph[parent].matrix() * m;
            idx = parent;
        }
        Some(m)
    }

    /// Generation at which the object was last added or modified.
    pub fn touched_at(&self, id: ObjectId) -> Option<u64> {
        self.touched.get(&id).copied()
    }

    // ─── Mutation ────────────────────────────────────────────────────────

    /// Add an object on top of the stack. A background object replaces
    /// any existing background and goes to the bottom instead.
    pub fn add(&mut self, object: Drawable) -> ObjectId {
        let z = if object.is_background() { 0 } else { self.stack.len() };
        self.insert_at(object, z)
    }

    /// Insert a top-level object at z-index `z` (clamped above the background).
    pub fn insert_at(&mut self, object: Drawable, z: usize) -> ObjectId {
        if let Some(existing) = self.get(object.id).map(|d| d.id) {
            log::warn!("replacing existing object {existing}");
            self.remove(existing);
        }
        let is_background = object.is_background();
        if is_background && let Some(old) = self.background() {
            self.remove(old);
        }
        let id = object.id;
        let idx = self.graph.add_node(object);
        self.id_index.insert(id, idx);
        let z = if is_background {
            0
        } else {
            z.clamp(self.floor(), self.stack.len())
        };
        self.stack.insert(z, idx);
        self.touch(id);
        self.events.push(SceneEvent::ObjectAdded(id));
        id
    }

    /// Remove an object (and, for groups, all descendants).
    pub fn remove(&mut self, id: ObjectId) -> Option<Drawable> {
        let idx = self.index_of(id)?;
        if let Some(parent) = self.parent_index(idx)
            && let Some(order) = self.child_order.get_mut(&parent)
        {
            order.retain(|c| *c != idx);
        }
        self.stack.retain(|s| *s != idx);
        for child in self.child_order.remove(&idx).unwrap_or_default() {
            let child_id = self.graph[child].id;
            self.remove(child_id);
        }
        let removed = self.graph.remove_node(idx)?;
        self.id_index.remove(&id);
        self.touched.remove(&id);
        self.events.push(SceneEvent::ObjectRemoved(id));
        Some(removed)
    }

    /// Mutate an object in place, recording a modification event.
    /// Returns `None` if the object does not exist.
    pub fn update<R>(&mut self, id: ObjectId, f: impl FnOnce(&mut Drawable) -> R) -> Option<R> {
        let idx = self.index_of(id)?;
        let result = f(&mut self.graph[idx]);
        // The id is the graph key; changing it through `update` is not allowed.
        self.graph[idx].id = id;
        self.touch(id);
        self.events.push(SceneEvent::ObjectModified(id));
        Some(result)
    }

    /// Store a layer label derived from the object itself. Records no
    /// event and leaves the modification generation alone.
    pub fn assign_label(&mut self, id: ObjectId, label: String) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        self.graph[idx].layer_label = Some(label);
        true
    }

    /// Move a top-level object to z-index `z`. The background never moves
    /// and nothing may go beneath it. Returns true if the order changed.
    pub fn move_to(&mut self, id: ObjectId, z: usize) -> bool {
        let Some(from) = self.z_index(id) else {
            return false;
        };
        if self.background() == Some(id) {
            return false;
        }
        let idx = self.stack.remove(from);
        let to = z.clamp(self.floor(), self.stack.len());
        self.stack.insert(to, idx);
        if from == to {
            return false;
        }
        self.events.push(SceneEvent::Reordered);
        true
    }

    /// Wrap top-level `members` into `group`, which is pushed on top of the
    /// stack. Members keep their relative order and must already carry
    /// transforms local to the group. Returns false (and changes nothing)
    /// if any member is missing, nested, or the background.
    pub fn wrap(&mut self, group: Drawable, members: &[ObjectId]) -> bool {
        let mut indices: Vec<(usize, NodeIndex)> = Vec::with_capacity(members.len());
        for id in members {
            match (self.index_of(*id), self.z_index(*id)) {
                (Some(idx), Some(z)) if !self.graph[idx].is_background() => indices.push((z, idx)),
                _ => return false,
            }
        }
        indices.sort_by_key(|(z, _)| *z);
        indices.dedup();

        let group_id = group.id;
        let group_idx = self.graph.add_node(group);
        self.id_index.insert(group_id, group_idx);
        let mut order = Vec::with_capacity(indices.len());
        for (_, idx) in indices {
            self.stack.retain(|s| *s != idx);
            self.graph.add_edge(group_idx, idx, ());
            order.push(idx);
            let child_id = self.graph[idx].id;
            self.touch(child_id);
            self.events.push(SceneEvent::ObjectRemoved(child_id));
        }
        self.child_order.insert(group_idx, order);
        self.stack.push(group_idx);
        self.touch(group_id);
        self.events.push(SceneEvent::ObjectAdded(group_id));
        true
    }

    /// Dissolve a top-level group, putting its children back on the stack
    /// at the group's z-index. Child transforms are left untouched; callers
    /// re-express them in canvas space. Returns the children in draw order.
    pub fn unwrap(&mut self, group_id: ObjectId) -> Option<Vec<ObjectId>> {
        let group_idx = self.index_of(group_id)?;
        if !self.graph[group_idx].kind.is_group() {
            return None;
        }
        let z = self.z_index(group_id)?;
        let order = self.child_order.remove(&group_idx).unwrap_or_default();
        for child in &order {
            if let Some(edge) = self.graph.find_edge(group_idx, *child) {
                self.graph.remove_edge(edge);
            }
        }
        self.stack.remove(z);
        for (offset, child) in order.iter().enumerate() {
            self.stack.insert(z + offset, *child);
        }
        self.graph.remove_node(group_idx);
        self.id_index.remove(&group_id);
        self.touched.remove(&group_id);
        self.events.push(SceneEvent::ObjectRemoved(group_id));

        let ids: Vec<ObjectId> = order.iter().map(|c| self.graph[*c].id).collect();
        for id in &ids {
            self.touch(*id);
            self.events.push(SceneEvent::ObjectAdded(*id));
        }
        Some(ids)
    }

    /// Attach `child` (not yet in the graph) as the last child of `group`.
    /// Used when rebuilding nested groups from a saved document.
    pub fn push_child(&mut self, group_id: ObjectId, child: Drawable) -> Option<ObjectId> {
        let group_idx = self.index_of(group_id)?;
        if !self.graph[group_idx].kind.is_group() || self.contains(child.id) {
            return None;
        }
        let id = child.id;
        let idx = self.graph.add_node(child);
        self.id_index.insert(id, idx);
        self.graph.add_edge(group_idx, idx, ());
        self.child_order.entry(group_idx).or_default().push(idx);
        self.touch(id);
        Some(id)
    }

    /// Remove every object.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.stack.clear();
        self.child_order.clear();
        self.id_index.clear();
        self.touched.clear();
        self.generation += 1;
        self.events.push(SceneEvent::Cleared);
    }

    /// Record an out-of-band event (e.g. selection changes from the editor).
    pub fn notify(&mut self, event: SceneEvent) {
        self.events.push(event);
    }

    /// Take all events recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    // ─── Internals ───────────────────────────────────────────────────────

    fn index_of(&self, id: ObjectId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    fn parent_index(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph.neighbors_directed(idx, Direction::Incoming).next()
    }

    fn touch(&mut self, id: ObjectId) {
        self.generation += 1;
        self.touched.insert(id, self.generation);
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new(Size::new(800.0, 600.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CustomType, ObjectKind};

    fn rect(w: f64, h: f64) -> Drawable {
        Drawable::with_kind(ObjectKind::Rectangle {
            width: w,
            height: h,
        })
    }

    fn background() -> Drawable {
        rect(800.0, 600.0).tagged(CustomType::Background)
    }

    #[test]
    fn add_stacks_on_top() {
        let mut sg = SceneGraph::default();
        let a = sg.add(rect(10.0, 10.0));
        let b = sg.add(rect(20.0, 20.0));
        assert_eq!(sg.top_level(), vec![a, b]);
        assert_eq!(sg.z_index(b), Some(1));
    }

    #[test]
    fn background_pins_to_bottom_and_replaces_previous() {
        let mut sg = SceneGraph::default();
        let a = sg.add(rect(10.0, 10.0));
        let bg1 = sg.add(background());
        assert_eq!(sg.top_level(), vec![bg1, a]);

        let bg2 = sg.add(background());
        assert_eq!(sg.top_level(), vec![bg2, a]);
        assert!(!sg.contains(bg1));
        assert_eq!(sg.background(), Some(bg2));
    }

    #[test]
    fn nothing_moves_beneath_the_background() {
        let mut sg = SceneGraph::default();
        let bg = sg.add(background());
        let a = sg.add(rect(1.0, 1.0));
        let b = sg.add(rect(1.0, 1.0));
        assert!(sg.move_to(b, 0));
        assert_eq!(sg.top_level(), vec![bg, b, a]);
        assert!(!sg.move_to(bg, 2));
        assert_eq!(sg.background(), Some(bg));
    }

    #[test]
    fn wrap_and_unwrap_restore_stack_position() {
        let mut sg = SceneGraph::default();
        let a = sg.add(rect(1.0, 1.0));
        let b = sg.add(rect(1.0, 1.0));
        let c = sg.add(rect(1.0, 1.0));
        let group = Drawable::with_kind(ObjectKind::Group {
            width: 1.0,
            height: 1.0,
        });
        let gid = group.id;
        assert!(sg.wrap(group, &[c, a]));
        assert_eq!(sg.top_level(), vec![b, gid]);
        assert_eq!(sg.children(gid), vec![a, c]);
        assert_eq!(sg.parent(a), Some(gid));

        let restored = sg.unwrap(gid).unwrap();
        assert_eq!(restored, vec![a, c]);
        assert_eq!(sg.top_level(), vec![b, a, c]);
        assert!(!sg.contains(gid));
        assert_eq!(sg.parent(a), None);
    }

    #[test]
    fn wrap_rejects_background_members() {
        let mut sg = SceneGraph::default();
        let bg = sg.add(background());
        let a = sg.add(rect(1.0, 1.0));
        let group = Drawable::with_kind(ObjectKind::Group {
            width: 1.0,
            height: 1.0,
        });
        assert!(!sg.wrap(group, &[bg, a]));
        assert_eq!(sg.top_level(), vec![bg, a]);
    }

    #[test]
    fn removing_group_removes_descendants() {
        let mut sg = SceneGraph::default();
        let a = sg.add(rect(1.0, 1.0));
        let group = Drawable::with_kind(ObjectKind::Group {
            width: 1.0,
            height: 1.0,
        });
        let gid = group.id;
        sg.wrap(group, &[a]);
        sg.remove(gid);
        assert!(!sg.contains(a));
        assert!(sg.is_empty());
    }

    #[test]
    fn assign_label_is_silent() {
        let mut sg = SceneGraph::default();
        let a = sg.add(rect(1.0, 1.0));
        let before = sg.touched_at(a).unwrap();
        sg.drain_events();
        assert!(sg.assign_label(a, "RECT".into()));
        assert_eq!(sg.get(a).unwrap().layer_label.as_deref(), Some("RECT"));
        assert_eq!(sg.touched_at(a), Some(before));
        assert!(sg.drain_events().is_empty());
        assert!(!sg.assign_label(ObjectId::intern("scene_ghost"), "X".into()));
    }

    #[test]
    fn update_records_event_and_generation() {
        let mut sg = SceneGraph::default();
        let a = sg.add(rect(1.0, 1.0));
        let before = sg.touched_at(a).unwrap();
        sg.drain_events();
        sg.update(a, |d| d.visible = false);
        assert!(sg.touched_at(a).unwrap() > before);
        assert_eq!(sg.drain_events(), vec![SceneEvent::ObjectModified(a)]);
        assert!(!sg.get(a).unwrap().visible);
    }

    #[test]
    fn world_matrix_composes_group_transform() {
        let mut sg = SceneGraph::default();
        let child = rect(10.0, 10.0).at(-5.0, -5.0);
        let cid = sg.add(child);
        let group = Drawable::with_kind(ObjectKind::Group {
            width: 10.0,
            height: 10.0,
        })
        .at(100.0, 100.0);
        let gid = group.id;
        sg.wrap(group, &[cid]);
        let m = sg.world_matrix(cid).unwrap();
        let center = m * kurbo::Point::ZERO;
        assert!((center.x - 105.0).abs() < 1e-9 && (center.y - 105.0).abs() < 1e-9);
        assert_eq!(sg.z_index(gid), Some(0));
    }
}
