pub mod format;
pub mod id;
pub mod image_data;
pub mod model;
pub mod scene;
pub mod transform;

pub use format::{CanvasDocument, FormatError, scene_from_json, scene_to_json};
pub use id::ObjectId;
pub use image_data::{ImageData, ImageDataError};
pub use model::*;
pub use scene::{SceneEvent, SceneGraph};
pub use transform::Transform;

// Re-export kurbo geometry so downstream crates share one version.
pub use kurbo;
