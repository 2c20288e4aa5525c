//! Canvas editor state: scene store, tools, layer panel, grouping, crop,
//! background fill, remote effects and undo.
//!
//! [`Editor`] is the entry point. Hosts feed it [`InputEvent`]s and key
//! presses, call its operations from toolbar and panel buttons, and
//! [`subscribe`](Editor::subscribe) to [`SceneEvent`](cv_core::SceneEvent)s
//! to know when to repaint.

pub mod commands;
pub mod config;
pub mod crop;
pub mod editor;
pub mod effects;
pub mod error;
pub mod fill;
pub mod group;
pub mod input;
pub mod layers;
pub mod selection;
pub mod shortcuts;
pub mod store;
pub mod tools;

pub use commands::CommandStack;
pub use config::EditorConfig;
pub use crop::{CropState, CropTool};
pub use editor::{Editor, ObjectProperties, ShapeKind};
pub use effects::{EffectRequest, EffectTicket};
pub use error::EditorError;
pub use input::{InputEvent, Modifiers};
pub use layers::{LayerPanel, LayerRow};
pub use selection::Selection;
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use store::{SceneMutation, SceneStore};
pub use tools::ToolMode;
