//! The editor: owns the scene store, the tools and the layer panel.
//!
//! Every public operation follows the same shape: validate, mutate the
//! scene inside a history batch, then flush the recorded scene events to
//! the layer panel and any subscribers. Pointer gestures (down → up) form
//! one batch, so a whole drag or brush stroke undoes in one step.

use crate::commands::CommandStack;
use crate::config::{EditorConfig, clamp_brush, clamp_eraser};
use crate::crop::CropTool;
use crate::effects::EffectSlot;
use crate::error::EditorError;
use crate::input::{InputEvent, Modifiers};
use crate::layers::{LayerPanel, assign_default_labels};
use crate::selection::Selection;
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::store::{SceneMutation, SceneStore};
use crate::tools::{ArrowTool, BrushTool, EraserTool, SelectTool, Tool, ToolContext, ToolMode, ToolOutput};
use cv_core::image_data::{encode_png, png_data_url};
use cv_core::kurbo::{Point, Rect, Size};
use cv_core::*;
use cv_remote::SavedCanvas;
use cv_render::{Rasterizer, SoftwareRasterizer, hit_test};
use std::collections::HashMap;

type Listener = Box<dyn FnMut(&SceneEvent) + Send>;

/// Shapes offered by the shapes menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Rectangle,
    Circle,
    Triangle,
    Line,
}

impl ShapeKind {
    /// Prefix of the auto-assigned layer label.
    pub fn label(&self) -> &'static str {
        match self {
            ShapeKind::Rectangle => "Rectangle",
            ShapeKind::Circle => "Circle",
            ShapeKind::Triangle => "Triangle",
            ShapeKind::Line => "Line",
        }
    }

    /// Geometry sized relative to the canvas.
    fn geometry(&self, canvas: Size) -> ObjectKind {
        let (w, h) = (canvas.width, canvas.height);
        match self {
            ShapeKind::Rectangle => ObjectKind::Rectangle {
                width: w * 0.25,
                height: h * 0.25,
            },
            ShapeKind::Circle => ObjectKind::Circle {
                radius: w.min(h) * 0.125,
            },
            ShapeKind::Triangle => ObjectKind::Triangle {
                width: w * 0.2,
                height: h * 0.2,
            },
            ShapeKind::Line => ObjectKind::Line {
                start: Point::new(-w * 0.15, 0.0),
                end: Point::new(w * 0.15, 0.0),
            },
        }
    }
}

/// Properties sidebar view of the selected object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectProperties {
    pub id: ObjectId,
    pub left: f64,
    pub top: f64,
    /// Effective (scaled) size.
    pub width: f64,
    pub height: f64,
    pub angle: f64,
    pub flip_x: bool,
    pub flip_y: bool,
    pub fill: Option<Paint>,
    pub stroke: Option<Stroke>,
    /// Content, for text objects.
    pub text: Option<String>,
}

pub struct Editor {
    pub(crate) store: SceneStore,
    pub(crate) config: EditorConfig,
    pub(crate) selection: Selection,
    pub(crate) layers: LayerPanel,
    pub(crate) history: CommandStack,
    pub(crate) rasterizer: Box<dyn Rasterizer + Send + Sync>,
    pub(crate) effects: EffectSlot,
    pub(crate) mode: ToolMode,
    select_tool: SelectTool,
    brush_tool: BrushTool,
    eraser_tool: EraserTool,
    arrow_tool: ArrowTool,
    pub(crate) crop_tool: CropTool,
    /// Per-kind counters behind "Rectangle 3"-style labels.
    counters: HashMap<&'static str, usize>,
    subscribers: Vec<Listener>,
    /// A pointer gesture's history batch is open.
    gesture_open: bool,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        let config = config.clamped();
        let mut editor = Self {
            store: SceneStore::new(config.canvas_size()),
            history: CommandStack::new(config.undo_depth),
            config,
            selection: Selection::None,
            layers: LayerPanel::new(),
            rasterizer: Box::new(SoftwareRasterizer),
            effects: EffectSlot::default(),
            mode: ToolMode::Select,
            select_tool: SelectTool::new(),
            brush_tool: BrushTool::new(),
            eraser_tool: EraserTool::new(),
            arrow_tool: ArrowTool::new(),
            crop_tool: CropTool::new(),
            counters: HashMap::new(),
            subscribers: Vec::new(),
            gesture_open: false,
        };
        editor.refresh_layers();
        editor
    }

    /// Swap the rasterizer used for crop, effects and thumbnails.
    #[must_use]
    pub fn with_rasterizer(mut self, rasterizer: impl Rasterizer + Send + Sync + 'static) -> Self {
        self.rasterizer = Box::new(rasterizer);
        self
    }

    pub fn scene(&self) -> &SceneGraph {
        self.store.scene()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Live marquee rectangle while box-selecting.
    pub fn marquee(&self) -> Option<Rect> {
        self.select_tool.marquee_rect
    }

    /// Eraser stroke in progress.
    pub fn eraser_preview(&self) -> &[Point] {
        self.eraser_tool.preview()
    }

    // ─── Events ──────────────────────────────────────────────────────────

    /// Register a callback for scene and selection events.
    pub fn subscribe(&mut self, listener: impl FnMut(&SceneEvent) + Send + 'static) {
        self.subscribers.push(Box::new(listener));
    }

    /// Deliver pending scene events: prune the selection, refresh the
    /// layer panel, then notify subscribers.
    pub(crate) fn flush(&mut self) {
        let mut events = self.store.scene_mut().drain_events();
        if events.is_empty() {
            return;
        }
        let scene = self.store.scene();
        let pruned = self
            .selection
            .retained(|id| scene.contains(id) && scene.parent(id).is_none());
        if pruned != self.selection {
            self.selection = pruned;
            events.push(SceneEvent::SelectionChanged);
        }
        self.refresh_layers();
        for event in &events {
            for listener in &mut self.subscribers {
                listener(event);
            }
        }
    }

    fn refresh_layers(&mut self) {
        self.label_new_objects();
        self.layers
            .refresh(self.store.scene(), &self.selection, self.config.label_max_chars);
    }

    /// Give unlabelled top-level objects their default label.
    fn label_new_objects(&mut self) {
        let max_chars = self.config.label_max_chars;
        let labelled = assign_default_labels(self.store.scene_mut(), max_chars);
        if labelled > 0 {
            log::debug!("assigned {labelled} default layer labels");
        }
    }

    pub(crate) fn set_selection(&mut self, selection: Selection) {
        if selection != self.selection {
            self.selection = selection;
            self.store.scene_mut().notify(SceneEvent::SelectionChanged);
        }
    }

    /// Run `f` as one undoable step, then flush.
    pub(crate) fn record<T>(
        &mut self,
        description: &str,
        f: impl FnOnce(&mut Self) -> Result<T, EditorError>,
    ) -> Result<T, EditorError> {
        self.history.begin_batch(self.store.scene(), description);
        let result = f(self);
        self.label_new_objects();
        if self.history.end_batch(self.store.scene()) {
            log::debug!("recorded {description}");
        }
        self.flush();
        result
    }

    // ─── Tools ───────────────────────────────────────────────────────────

    fn with_tool(
        &mut self,
        hit: Option<ObjectId>,
        f: impl FnOnce(&mut dyn Tool, &ToolContext<'_>) -> ToolOutput,
    ) -> ToolOutput {
        let ctx = ToolContext {
            scene: self.store.scene(),
            config: &self.config,
            selection: &self.selection,
            hit,
        };
        let tool: &mut dyn Tool = match self.mode {
            ToolMode::Select | ToolMode::ShapesMenu | ToolMode::BucketMenu | ToolMode::RemoveMenu => {
                &mut self.select_tool
            }
            ToolMode::Brush => &mut self.brush_tool,
            ToolMode::Eraser => &mut self.eraser_tool,
            ToolMode::Arrow => &mut self.arrow_tool,
            ToolMode::Crop => &mut self.crop_tool,
        };
        f(tool, &ctx)
    }

    fn apply_output(&mut self, out: ToolOutput) -> bool {
        let mut changed = false;
        for mutation in out.mutations {
            changed |= self.store.apply(mutation);
        }
        if let Some(selection) = out.selection {
            self.set_selection(selection);
        }
        if let Some(next) = out.next_mode {
            self.set_tool(next);
        }
        changed
    }

    fn close_gesture(&mut self) {
        if self.gesture_open {
            self.gesture_open = false;
            self.label_new_objects();
            self.history.end_batch(self.store.scene());
        }
    }

    /// Switch the active tool. The old tool tears down its transient
    /// state; drawing tools and crop start with an empty selection.
    pub fn set_tool(&mut self, mode: ToolMode) {
        if mode == self.mode {
            return;
        }
        log::debug!("tool {} -> {}", self.mode.name(), mode.name());
        let out = self.with_tool(None, |tool, ctx| tool.exit(ctx));
        self.apply_output(out);
        self.close_gesture();

        self.mode = mode;
        if mode.selects() {
            self.select_tool.set_mode(mode);
        }
        if mode.draws() {
            self.set_selection(Selection::None);
        }
        let out = self.with_tool(None, |tool, ctx| tool.enter(ctx));
        self.apply_output(out);
        self.flush();
    }

    /// Feed a pointer or key event to the active tool. Returns true if
    /// the scene changed or a shortcut ran.
    pub fn handle_input(&mut self, event: &InputEvent) -> bool {
        if let InputEvent::Key { key, modifiers } = event {
            return self.handle_key(key, *modifiers);
        }
        let hit = match event {
            InputEvent::PointerDown { x, y, .. } if self.mode.selects() => {
                hit_test(self.store.scene(), Point::new(*x, *y))
            }
            _ => None,
        };
        if matches!(event, InputEvent::PointerDown { .. }) && !self.gesture_open {
            self.history.begin_batch(self.store.scene(), self.mode.name());
            self.gesture_open = true;
        }
        let out = self.with_tool(hit, |tool, ctx| tool.handle(event, ctx));
        let changed = self.apply_output(out);
        if matches!(event, InputEvent::PointerUp { .. }) {
            self.close_gesture();
        }
        self.flush();
        changed
    }

    /// Resolve and run a keyboard shortcut. An open layer rename takes
    /// Escape and Enter; other keys belong to its text field.
    pub fn handle_key(&mut self, key: &str, modifiers: Modifiers) -> bool {
        if self.layers.is_renaming() {
            return match key {
                "Escape" => self.layer_cancel_rename(),
                "Enter" => match self.layer_commit_rename() {
                    Ok(changed) => changed,
                    Err(err) => {
                        log::warn!("rename: {err}");
                        false
                    }
                },
                _ => false,
            };
        }
        match ShortcutMap::resolve_with(key, modifiers) {
            Some(action) => self.perform(action),
            None => false,
        }
    }

    /// Run a shortcut action. Failures are logged and reported as false.
    pub fn perform(&mut self, action: ShortcutAction) -> bool {
        let result = match action {
            ShortcutAction::ToolSelect => self.switch(ToolMode::Select),
            ShortcutAction::ToolBrush => self.switch(ToolMode::Brush),
            ShortcutAction::ToolEraser => self.switch(ToolMode::Eraser),
            ShortcutAction::ToolCrop => self.switch(ToolMode::Crop),
            ShortcutAction::ToolArrow => self.switch(ToolMode::Arrow),
            ShortcutAction::AddText => self.add_text().map(|_| true),
            ShortcutAction::Undo => Ok(self.undo()),
            ShortcutAction::Redo => Ok(self.redo()),
            ShortcutAction::Delete => self.delete_selected().map(|ids| !ids.is_empty()),
            ShortcutAction::Group => self.group().map(|_| true),
            ShortcutAction::Ungroup => self.ungroup().map(|_| true),
            ShortcutAction::SendBackward => self.send_backward(),
            ShortcutAction::BringForward => self.bring_forward(),
            ShortcutAction::SendToBack => self.send_to_back(),
            ShortcutAction::BringToFront => self.bring_to_front(),
            ShortcutAction::Cancel => Ok(self.cancel()),
            ShortcutAction::Confirm if self.mode == ToolMode::Crop => self.apply_crop().map(|_| true),
            ShortcutAction::Confirm => Ok(false),
        };
        match result {
            Ok(done) => done,
            Err(err) => {
                log::warn!("{action:?}: {err}");
                false
            }
        }
    }

    fn switch(&mut self, mode: ToolMode) -> Result<bool, EditorError> {
        self.set_tool(mode);
        Ok(true)
    }

    /// Escape: leave crop, else clear the selection.
    fn cancel(&mut self) -> bool {
        if self.mode == ToolMode::Crop {
            return self.cancel_crop();
        }
        let had = !self.selection.is_empty();
        self.clear_selection();
        had
    }

    // ─── Object creation ─────────────────────────────────────────────────

    fn next_label(&mut self, prefix: &'static str) -> String {
        let n = self.counters.entry(prefix).or_insert(0);
        *n += 1;
        format!("{prefix} {n}")
    }

    /// Add `object` centred on the canvas, selected, in select mode.
    fn add_centred(&mut self, mut object: Drawable, description: &str) -> Result<ObjectId, EditorError> {
        self.set_tool(ToolMode::Select);
        let size = self.store.scene().size();
        let center = Point::new(size.width / 2.0, size.height / 2.0);
        let local = object.size();
        object.transform.set_center(local, center);
        let id = object.id;
        self.record(description, |ed| {
            ed.store.apply(SceneMutation::Add {
                object: Box::new(object),
            });
            ed.set_selection(Selection::Single(id));
            Ok(id)
        })
    }

    /// Insert a shape sized relative to the canvas and select it.
    pub fn add_shape(&mut self, kind: ShapeKind) -> Result<ObjectId, EditorError> {
        let geometry = kind.geometry(self.store.scene().size());
        let color = self.config.foreground;
        let style = match kind {
            ShapeKind::Line => Style::stroked(color, self.config.brush_width),
            _ => Style::filled(color),
        };
        let label = self.next_label(kind.label());
        let object = Drawable::with_kind(geometry).styled(style).labelled(label);
        self.add_centred(object, "add shape")
    }

    pub fn add_text(&mut self) -> Result<ObjectId, EditorError> {
        let label = self.next_label("Text");
        let object = Drawable::with_kind(ObjectKind::Text {
            content: "Text".into(),
            font_size: self.config.font_size,
            font_family: self.config.font_family.clone(),
        })
        .styled(Style::filled(self.config.foreground))
        .labelled(label);
        self.add_centred(object, "add text")
    }

    /// Decode an uploaded image and add it, shrunk to fit the canvas.
    pub fn add_image(&mut self, bytes: &[u8]) -> Result<ObjectId, EditorError> {
        let image = ImageData::decode(bytes)?;
        let canvas = self.store.scene().size();
        let (w, h) = (f64::from(image.width()), f64::from(image.height()));
        let fit = if w > 0.0 && h > 0.0 {
            (canvas.width / w).min(canvas.height / h).min(1.0)
        } else {
            1.0
        };
        let label = self.next_label("Image");
        let mut object = Drawable::with_kind(ObjectKind::Image { image }).labelled(label);
        object.set_scale(fit, fit);
        self.add_centred(object, "add image")
    }

    // ─── Edits ───────────────────────────────────────────────────────────

    /// Remove the selected objects. The background is never deleted here.
    pub fn delete_selected(&mut self) -> Result<Vec<ObjectId>, EditorError> {
        let scene = self.store.scene();
        let doomed: Vec<ObjectId> = self
            .selection
            .ids()
            .into_iter()
            .filter(|id| scene.get(*id).is_some_and(|d| !d.is_background()))
            .collect();
        if doomed.is_empty() {
            log::warn!("delete with nothing selected");
            return Err(EditorError::NoSelection);
        }
        self.record("delete", |ed| {
            for id in &doomed {
                ed.store.apply(SceneMutation::Remove { id: *id });
            }
            ed.set_selection(Selection::None);
            Ok(doomed)
        })
    }

    fn restack(&mut self, description: &str, target: impl FnOnce(usize, usize) -> usize) -> Result<bool, EditorError> {
        let id = self.selected_one()?;
        let scene = self.store.scene();
        let (Some(z), top) = (scene.z_index(id), scene.len().saturating_sub(1)) else {
            return Err(EditorError::NoSelection);
        };
        let to = target(z, top);
        self.record(description, |ed| Ok(ed.store.apply(SceneMutation::Reorder { id, z: to })))
    }

    pub fn bring_forward(&mut self) -> Result<bool, EditorError> {
        self.restack("bring forward", |z, top| (z + 1).min(top))
    }

    pub fn send_backward(&mut self) -> Result<bool, EditorError> {
        self.restack("send backward", |z, _| z.saturating_sub(1))
    }

    pub fn bring_to_front(&mut self) -> Result<bool, EditorError> {
        self.restack("bring to front", |_, top| top)
    }

    /// Lowest spot above the background.
    pub fn send_to_back(&mut self) -> Result<bool, EditorError> {
        self.restack("send to back", |_, _| 0)
    }

    /// Returns the clamped width.
    pub fn set_brush_width(&mut self, width: f64) -> f64 {
        self.config.brush_width = clamp_brush(width);
        self.config.brush_width
    }

    /// Returns the clamped width.
    pub fn set_eraser_width(&mut self, width: f64) -> f64 {
        self.config.eraser_width = clamp_eraser(width);
        self.config.eraser_width
    }

    pub fn set_foreground(&mut self, color: Color) {
        self.config.foreground = color;
    }

    pub fn set_background(&mut self, color: Color) {
        self.config.background = color;
    }

    /// Select top-level, selectable objects by id; others are ignored.
    pub fn select(&mut self, ids: impl IntoIterator<Item = ObjectId>) {
        let scene = self.store.scene();
        let selection = Selection::from_ids(ids.into_iter().filter(|id| {
            scene.parent(*id).is_none() && scene.get(*id).is_some_and(|d| d.selectable && !d.is_background())
        }));
        self.set_selection(selection);
        self.flush();
    }

    pub fn clear_selection(&mut self) {
        self.set_selection(Selection::None);
        self.flush();
    }

    // ─── Properties ──────────────────────────────────────────────────────

    fn selected_one(&self) -> Result<ObjectId, EditorError> {
        match &self.selection {
            Selection::None => Err(EditorError::NoSelection),
            Selection::Single(id) => Ok(*id),
            Selection::Multi(_) => Err(EditorError::NotSingleSelection),
        }
    }

    pub fn selected_properties(&self) -> Option<ObjectProperties> {
        let object = self.store.scene().get(self.selection.single()?)?;
        let t = &object.transform;
        let size = t.effective_size(object.size());
        Some(ObjectProperties {
            id: object.id,
            left: t.left,
            top: t.top,
            width: size.width,
            height: size.height,
            angle: t.angle,
            flip_x: t.flip_x,
            flip_y: t.flip_y,
            fill: object.style.fill.clone(),
            stroke: object.style.stroke.clone(),
            text: match &object.kind {
                ObjectKind::Text { content, .. } => Some(content.clone()),
                _ => None,
            },
        })
    }

    /// Edit the single selected object through a mutation built from it.
    fn edit_selected(
        &mut self,
        description: &str,
        build: impl FnOnce(&Drawable) -> Option<SceneMutation>,
    ) -> Result<bool, EditorError> {
        let id = self.selected_one()?;
        let object = self.store.scene().get(id).ok_or(EditorError::NoSelection)?;
        let Some(mutation) = build(object) else {
            return Ok(false);
        };
        self.record(description, |ed| Ok(ed.store.apply(mutation)))
    }

    fn edit_transform(&mut self, description: &str, f: impl FnOnce(&mut Drawable)) -> Result<bool, EditorError> {
        self.edit_selected(description, |object| {
            let mut edited = object.clone();
            f(&mut edited);
            Some(SceneMutation::SetTransform {
                id: object.id,
                transform: edited.transform,
            })
        })
    }

    pub fn set_position(&mut self, left: f64, top: f64) -> Result<bool, EditorError> {
        self.edit_transform("move", |d| d.set_position(left, top))
    }

    /// Resize to an effective size by adjusting the scale.
    pub fn set_size(&mut self, width: f64, height: f64) -> Result<bool, EditorError> {
        self.edit_transform("resize", |d| {
            let base = d.size();
            let (sx, sy) = d.scale();
            let sx = if base.width > 0.0 { width.abs() / base.width } else { sx };
            let sy = if base.height > 0.0 { height.abs() / base.height } else { sy };
            d.set_scale(sx, sy);
        })
    }

    /// Rotate about the object's centre.
    pub fn set_angle(&mut self, degrees: f64) -> Result<bool, EditorError> {
        self.edit_transform("rotate", |d| d.set_rotation(degrees))
    }

    pub fn toggle_flip_x(&mut self) -> Result<bool, EditorError> {
        self.edit_transform("flip horizontally", |d| {
            let (fx, fy) = d.flips();
            d.set_flips(!fx, fy);
        })
    }

    pub fn toggle_flip_y(&mut self) -> Result<bool, EditorError> {
        self.edit_transform("flip vertically", |d| {
            let (fx, fy) = d.flips();
            d.set_flips(fx, !fy);
        })
    }

    pub fn set_fill(&mut self, color: Color) -> Result<bool, EditorError> {
        self.edit_selected("fill", |object| {
            Some(SceneMutation::SetStyle {
                id: object.id,
                style: Style {
                    fill: Some(Paint::solid(color)),
                    ..object.style.clone()
                },
            })
        })
    }

    pub fn set_stroke(&mut self, color: Color, width: f64) -> Result<bool, EditorError> {
        self.edit_selected("stroke", |object| {
            Some(SceneMutation::SetStyle {
                id: object.id,
                style: Style {
                    stroke: Some(Stroke::solid(color, width.max(0.0))),
                    ..object.style.clone()
                },
            })
        })
    }

    /// Replace the content of the selected text object.
    pub fn set_text(&mut self, content: &str) -> Result<bool, EditorError> {
        self.edit_selected("edit text", |object| match &object.kind {
            ObjectKind::Text { .. } => Some(SceneMutation::SetText {
                id: object.id,
                content: content.to_string(),
            }),
            _ => None,
        })
    }

    // ─── History and persistence ─────────────────────────────────────────

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        if self.gesture_open {
            return false;
        }
        match self.history.undo() {
            Some(doc) => self.restore(doc, "undo"),
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        if self.gesture_open {
            return false;
        }
        match self.history.redo() {
            Some(doc) => self.restore(doc, "redo"),
            None => false,
        }
    }

    /// Put a snapshot back. Selection, pending effect and rename are
    /// dropped since they may refer to objects that no longer exist.
    fn restore(&mut self, doc: CanvasDocument, what: &str) -> bool {
        match doc.into_scene() {
            Ok(scene) => {
                self.reset_to(scene);
                true
            }
            Err(err) => {
                log::error!("{what}: snapshot could not be restored: {err}");
                false
            }
        }
    }

    fn reset_to(&mut self, scene: SceneGraph) {
        if self.effects.cancel() {
            log::debug!("pending effect cancelled by scene reset");
        }
        self.layer_cancel_rename();
        self.store.replace(scene);
        self.set_selection(Selection::None);
        self.flush();
    }

    pub fn to_json(&self) -> Result<String, EditorError> {
        Ok(scene_to_json(self.store.scene())?)
    }

    /// Load a saved canvas, replacing the scene and clearing history.
    pub fn load_json(&mut self, json: &str) -> Result<(), EditorError> {
        let scene = scene_from_json(json)?;
        self.set_tool(ToolMode::Select);
        self.reset_to(scene);
        self.history.clear();
        Ok(())
    }

    /// Canvas JSON plus a PNG data URL of the rendered canvas.
    pub fn snapshot_for_save(&self) -> Result<SavedCanvas, EditorError> {
        let pixels = self.rasterizer.render_canvas(self.store.scene());
        let png = encode_png(&pixels)?;
        Ok(SavedCanvas {
            canvas_json: self.to_json()?,
            rendered_image: png_data_url(&png),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};

    #[test]
    fn shapes_are_labelled_per_kind() {
        let mut ed = Editor::default();
        ed.add_shape(ShapeKind::Rectangle).unwrap();
        ed.add_shape(ShapeKind::Circle).unwrap();
        let id = ed.add_shape(ShapeKind::Rectangle).unwrap();

        assert_eq!(ed.selection(), &Selection::Single(id));
        let labels: Vec<&str> = ed.layers().rows().iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["Rectangle 2", "Circle 1", "Rectangle 1"]);
    }

    #[test]
    fn shapes_scale_with_canvas_and_centre() {
        let mut ed = Editor::new(EditorConfig {
            canvas_width: 400.0,
            canvas_height: 200.0,
            ..EditorConfig::default()
        });
        let id = ed.add_shape(ShapeKind::Rectangle).unwrap();
        let rect = ed.scene().get(id).unwrap();
        assert_eq!(rect.size(), Size::new(100.0, 50.0));
        assert_eq!(rect.center(), Point::new(200.0, 100.0));
    }

    #[test]
    fn drawing_modes_clear_selection() {
        let mut ed = Editor::default();
        ed.add_shape(ShapeKind::Circle).unwrap();
        ed.set_tool(ToolMode::Brush);
        assert!(ed.selection().is_empty());
        assert_eq!(ed.mode(), ToolMode::Brush);
    }

    #[test]
    fn brush_gesture_is_one_undo_step() {
        let mut ed = Editor::default();
        ed.set_tool(ToolMode::Brush);
        ed.handle_input(&InputEvent::down(10.0, 10.0));
        ed.handle_input(&InputEvent::moved(20.0, 20.0));
        ed.handle_input(&InputEvent::moved(30.0, 10.0));
        ed.handle_input(&InputEvent::up(40.0, 10.0));
        assert_eq!(ed.scene().len(), 1);

        assert!(ed.undo());
        assert!(ed.scene().is_empty());
        assert!(ed.redo());
        assert_eq!(ed.scene().len(), 1);
    }

    #[test]
    fn widths_are_clamped() {
        let mut ed = Editor::default();
        assert_eq!(ed.set_brush_width(0.0), 1.0);
        assert_eq!(ed.set_brush_width(250.0), 100.0);
        assert_eq!(ed.set_eraser_width(1.0), 5.0);
        assert_eq!(ed.set_eraser_width(42.0), 42.0);
    }

    #[test]
    fn delete_spares_the_background() {
        let mut ed = Editor::default();
        let bg = ed.fill_background().unwrap();
        let shape = ed.add_shape(ShapeKind::Triangle).unwrap();
        ed.select([bg, shape]);
        assert_eq!(ed.selection(), &Selection::Single(shape));
        assert_eq!(ed.delete_selected().unwrap(), vec![shape]);
        assert_eq!(ed.scene().top_level(), vec![bg]);
        assert!(matches!(ed.delete_selected(), Err(EditorError::NoSelection)));
    }

    #[test]
    fn z_order_stays_above_background() {
        let mut ed = Editor::default();
        let bg = ed.fill_background().unwrap();
        let a = ed.add_shape(ShapeKind::Rectangle).unwrap();
        let b = ed.add_shape(ShapeKind::Circle).unwrap();
        ed.select([b]);
        assert!(ed.send_to_back().unwrap());
        assert_eq!(ed.scene().top_level(), vec![bg, b, a]);
        assert!(!ed.send_backward().unwrap());
        assert!(ed.bring_to_front().unwrap());
        assert_eq!(ed.scene().top_level(), vec![bg, a, b]);
    }

    #[test]
    fn properties_follow_edits() {
        let mut ed = Editor::default();
        ed.add_shape(ShapeKind::Rectangle).unwrap();
        ed.set_position(10.0, 20.0).unwrap();
        ed.set_size(400.0, 75.0).unwrap();
        ed.toggle_flip_x().unwrap();
        ed.set_fill(Color::WHITE).unwrap();

        let props = ed.selected_properties().unwrap();
        assert_eq!((props.left, props.top), (10.0, 20.0));
        assert_eq!((props.width, props.height), (400.0, 75.0));
        assert!(props.flip_x && !props.flip_y);
        assert_eq!(props.fill, Some(Paint::solid(Color::WHITE)));
        assert_eq!(props.text, None);
        assert!(!ed.set_text("nope").unwrap());
    }

    #[test]
    fn rotation_keeps_the_centre() {
        let mut ed = Editor::default();
        let id = ed.add_shape(ShapeKind::Rectangle).unwrap();
        let before = ed.scene().get(id).unwrap().center();
        ed.set_angle(30.0).unwrap();
        let after = ed.scene().get(id).unwrap().center();
        assert!((before - after).hypot() < 1e-9);
    }

    #[test]
    fn subscribers_see_changes() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut ed = Editor::default();
        ed.subscribe(move |event| sink.lock().unwrap().push(*event));
        let id = ed.add_text().unwrap();
        let events = seen.lock().unwrap().clone();
        assert!(events.contains(&SceneEvent::ObjectAdded(id)));
        assert!(events.contains(&SceneEvent::SelectionChanged));
    }

    #[test]
    fn shortcuts_drive_the_editor() {
        let mut ed = Editor::default();
        assert!(ed.handle_key("t", Modifiers::NONE));
        assert_eq!(ed.scene().len(), 1);
        assert!(ed.handle_key("Escape", Modifiers::NONE));
        assert!(ed.selection().is_empty());
        let cmd = Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        };
        assert!(ed.handle_key("z", cmd));
        assert!(ed.scene().is_empty());
        assert!(ed.handle_key("c", Modifiers::NONE));
        assert_eq!(ed.mode(), ToolMode::Crop);
        assert!(ed.handle_key("Escape", Modifiers::NONE));
        assert_eq!(ed.mode(), ToolMode::Select);
    }

    #[test]
    fn json_round_trip_through_editor() {
        let mut ed = Editor::default();
        ed.add_shape(ShapeKind::Circle).unwrap();
        ed.add_text().unwrap();
        let json = ed.to_json().unwrap();

        let mut other = Editor::default();
        other.load_json(&json).unwrap();
        assert_eq!(other.scene().len(), 2);
        assert!(!other.can_undo());
        assert_eq!(other.to_json().unwrap(), json);
    }

    #[test]
    fn save_snapshot_has_png_thumbnail() {
        let mut ed = Editor::default();
        ed.fill_background().unwrap();
        let saved = ed.snapshot_for_save().unwrap();
        assert!(saved.rendered_image.starts_with("data:image/png;base64,"));
        assert!(saved.canvas_json.contains("background"));
    }
}
