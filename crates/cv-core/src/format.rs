//! Canvas JSON format: the `canvas_json` blob saved alongside a slide.
//!
//! Objects serialise flat (kind, transform, style and metadata side by
//! side, camelCase keys). Groups nest their children under
//! `objects`, with child transforms local to the group.

use crate::model::Drawable;
use crate::scene::SceneGraph;
use kurbo::Size;
use serde::{Deserialize, Serialize};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("invalid canvas JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported canvas format version {0}")]
    UnsupportedVersion(u32),
    #[error("duplicate object id {0}")]
    DuplicateId(String),
    #[error("object {0} has children but is not a group")]
    NotAGroup(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasDocument {
    pub version: u32,
    pub width: f64,
    pub height: f64,
    pub objects: Vec<ObjectRecord>,
}

/// A serialised object plus, for groups, its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    #[serde(flatten)]
    pub object: Drawable,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<ObjectRecord>,
}

impl CanvasDocument {
    /// Snapshot a scene graph.
    pub fn from_scene(scene: &SceneGraph) -> Self {
        let size = scene.size();
        Self {
            version: FORMAT_VERSION,
            width: size.width,
            height: size.height,
            objects: scene
                .top_level()
                .into_iter()
                .filter_map(|id| record(scene, id))
                .collect(),
        }
    }

    /// Rebuild a scene graph. Object ids are preserved.
    pub fn into_scene(self) -> Result<SceneGraph, FormatError> {
        if self.version > FORMAT_VERSION {
            return Err(FormatError::UnsupportedVersion(self.version));
        }
        let mut scene = SceneGraph::new(Size::new(self.width, self.height));
        for rec in self.objects {
            let ObjectRecord { object, objects } = rec;
            if scene.contains(object.id) {
                return Err(FormatError::DuplicateId(object.id.to_string()));
            }
            let id = scene.add(object);
            attach_children(&mut scene, id, objects)?;
        }
        scene.drain_events();
        Ok(scene)
    }

    pub fn to_json(&self) -> Result<String, FormatError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, FormatError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn record(scene: &SceneGraph, id: crate::ObjectId) -> Option<ObjectRecord> {
    let object = scene.get(id)?.clone();
    let objects = scene
        .children(id)
        .into_iter()
        .filter_map(|child| record(scene, child))
        .collect();
    Some(ObjectRecord { object, objects })
}

fn attach_children(
    scene: &mut SceneGraph,
    parent: crate::ObjectId,
    children: Vec<ObjectRecord>,
) -> Result<(), FormatError> {
    if !children.is_empty() && !scene.get(parent).is_some_and(|p| p.kind.is_group()) {
        return Err(FormatError::NotAGroup(parent.to_string()));
    }
    for rec in children {
        let ObjectRecord { object, objects } = rec;
        let child_id = object.id;
        if scene.push_child(parent, object).is_none() {
            return Err(FormatError::DuplicateId(child_id.to_string()));
        }
        attach_children(scene, child_id, objects)?;
    }
    Ok(())
}

/// Serialise a scene straight to `canvas_json`.
pub fn scene_to_json(scene: &SceneGraph) -> Result<String, FormatError> {
    CanvasDocument::from_scene(scene).to_json()
}

/// Parse `canvas_json` straight into a scene graph.
pub fn scene_from_json(json: &str) -> Result<SceneGraph, FormatError> {
    CanvasDocument::from_json(json)?.into_scene()
}
