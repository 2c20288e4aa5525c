//! Crop engine.
//!
//! Entering crop mode puts a rectangle overlay on the canvas. The overlay
//! is not a scene object; it lives in the [`CropTool`] and can be dragged
//! by its body or resized by its bottom-right handle, and never leaves the
//! canvas. Applying the crop rasterizes that region, replaces the whole
//! scene with the result as a locked background image, and resizes the
//! canvas to the rectangle's exact size.
//!
//! ```text
//! Idle ──enter──▶ Cropping ──apply──▶ Applied
//!                    │
//!                    └──cancel / leave mode──▶ Cancelled
//! ```

use crate::editor::Editor;
use crate::error::EditorError;
use crate::input::InputEvent;
use crate::selection::Selection;
use crate::store::SceneMutation;
use crate::tools::{Tool, ToolContext, ToolMode, ToolOutput};
use cv_core::kurbo::{Point, Rect, Size};
use cv_core::*;

/// Grab radius around the resize handle, in canvas units.
const HANDLE_RADIUS: f64 = 10.0;
/// Smallest crop rectangle side.
const MIN_CROP_SIDE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CropState {
    Idle,
    Cropping(Rect),
    /// The canvas was cropped to this region.
    Applied(Rect),
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CropDrag {
    Move { last: Point },
    Resize,
}

#[derive(Debug)]
pub struct CropTool {
    state: CropState,
    drag: Option<CropDrag>,
}

impl Default for CropTool {
    fn default() -> Self {
        Self {
            state: CropState::Idle,
            drag: None,
        }
    }
}

impl CropTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CropState {
        self.state
    }

    /// The live crop rectangle, while cropping.
    pub fn rect(&self) -> Option<Rect> {
        match self.state {
            CropState::Cropping(rect) => Some(rect),
            _ => None,
        }
    }

    /// Replace the crop rectangle (e.g. from the host's transform handles).
    /// The rectangle is clipped to a `canvas`-sized canvas.
    pub fn set_rect(&mut self, rect: Rect, canvas: Size) -> Result<(), EditorError> {
        if !matches!(self.state, CropState::Cropping(_)) {
            return Err(EditorError::NoCropRegion);
        }
        let clipped = clip_to_canvas(rect, canvas).ok_or(EditorError::CropOutsideCanvas)?;
        self.state = CropState::Cropping(clipped);
        Ok(())
    }

    pub fn cancel(&mut self) -> bool {
        self.drag = None;
        if matches!(self.state, CropState::Cropping(_)) {
            self.state = CropState::Cancelled;
            return true;
        }
        false
    }

    pub(crate) fn finish(&mut self, region: Rect) {
        self.drag = None;
        self.state = CropState::Applied(region);
    }
}

fn normalize(rect: Rect) -> Rect {
    let rect = rect.abs();
    Rect::from_origin_size(
        rect.origin(),
        Size::new(rect.width().max(MIN_CROP_SIDE), rect.height().max(MIN_CROP_SIDE)),
    )
}

fn canvas_bounds(canvas: Size) -> Rect {
    Rect::from_origin_size(Point::ZERO, canvas)
}

/// The part of `rect` on the canvas, if it is at least a pixel each way.
pub fn clip_to_canvas(rect: Rect, canvas: Size) -> Option<Rect> {
    let clipped = normalize(rect).intersect(canvas_bounds(canvas));
    (clipped.width() >= MIN_CROP_SIDE && clipped.height() >= MIN_CROP_SIDE).then_some(clipped)
}

/// Shift `rect` back onto the canvas without resizing it.
fn keep_inside(rect: Rect, canvas: Size) -> Rect {
    let x = rect.x0.clamp(0.0, (canvas.width - rect.width()).max(0.0));
    let y = rect.y0.clamp(0.0, (canvas.height - rect.height()).max(0.0));
    Rect::from_origin_size((x, y), rect.size())
}

/// Pixel buffer for a crop rectangle: origin kept, size rounded.
pub fn pixel_region(rect: Rect) -> Rect {
    let size = Size::new(
        rect.width().round().max(MIN_CROP_SIDE),
        rect.height().round().max(MIN_CROP_SIDE),
    );
    Rect::from_origin_size(rect.origin(), size)
}

impl Tool for CropTool {
    fn mode(&self) -> ToolMode {
        ToolMode::Crop
    }

    fn enter(&mut self, ctx: &ToolContext<'_>) -> ToolOutput {
        self.drag = None;
        let canvas = ctx.scene.size();
        let rect = clip_to_canvas(ctx.config.crop.rect(), canvas).unwrap_or_else(|| canvas_bounds(canvas));
        self.state = CropState::Cropping(rect);
        ToolOutput::default()
    }

    fn exit(&mut self, _ctx: &ToolContext<'_>) -> ToolOutput {
        self.cancel();
        ToolOutput::default()
    }

    fn handle(&mut self, event: &InputEvent, ctx: &ToolContext<'_>) -> ToolOutput {
        let CropState::Cropping(rect) = self.state else {
            return ToolOutput::default();
        };
        let canvas = ctx.scene.size();
        match event {
            InputEvent::PointerDown { x, y, .. } => {
                let p = Point::new(*x, *y);
                let handle = Point::new(rect.x1, rect.y1);
                self.drag = if (p - handle).hypot() <= HANDLE_RADIUS {
                    Some(CropDrag::Resize)
                } else if rect.contains(p) {
                    Some(CropDrag::Move { last: p })
                } else {
                    None
                };
            }
            InputEvent::PointerMove { x, y, .. } => {
                let p = Point::new(*x, *y);
                match self.drag {
                    Some(CropDrag::Move { last }) => {
                        self.state = CropState::Cropping(keep_inside(rect + (p - last), canvas));
                        self.drag = Some(CropDrag::Move { last: p });
                    }
                    Some(CropDrag::Resize) => {
                        let size = Size::new(
                            (p.x - rect.x0).clamp(MIN_CROP_SIDE, (canvas.width - rect.x0).max(MIN_CROP_SIDE)),
                            (p.y - rect.y0).clamp(MIN_CROP_SIDE, (canvas.height - rect.y0).max(MIN_CROP_SIDE)),
                        );
                        self.state = CropState::Cropping(Rect::from_origin_size(rect.origin(), size));
                    }
                    None => {}
                }
            }
            InputEvent::PointerUp { .. } => self.drag = None,
            InputEvent::Key { .. } => {}
        }
        ToolOutput::default()
    }
}

impl Editor {
    pub fn crop_rect(&self) -> Option<Rect> {
        self.crop_tool.rect()
    }

    pub fn crop_state(&self) -> CropState {
        self.crop_tool.state()
    }

    pub fn set_crop_rect(&mut self, rect: Rect) -> Result<(), EditorError> {
        let canvas = self.store.scene().size();
        self.crop_tool.set_rect(rect, canvas)
    }

    /// Crop the canvas to the overlay rectangle.
    ///
    /// Everything in the scene is discarded and replaced by a single,
    /// non-selectable background image of the cropped region; the canvas
    /// takes the rectangle's size. Returns the new background's id.
    pub fn apply_crop(&mut self) -> Result<ObjectId, EditorError> {
        let Some(rect) = self.crop_tool.rect() else {
            log::warn!("apply_crop without an active crop rectangle");
            return Err(EditorError::NoCropRegion);
        };
        let Some(region) = clip_to_canvas(rect, self.store.scene().size()) else {
            log::warn!("crop rectangle {rect:?} is off the canvas");
            return Err(EditorError::CropOutsideCanvas);
        };
        let pixels = self.rasterizer.render_region(self.store.scene(), pixel_region(region));
        let (pw, ph) = (f64::from(pixels.width()), f64::from(pixels.height()));
        let image = ImageData::new(pixels);

        let id = self.record("crop", |ed| {
            let scene = ed.store.scene_mut();
            scene.clear();
            scene.set_size(region.size());
            let mut background = Drawable::with_kind(ObjectKind::Image { image })
                .at(0.0, 0.0)
                .tagged(CustomType::Background);
            if pw > 0.0 && ph > 0.0 {
                background.set_scale(region.width() / pw, region.height() / ph);
            }
            background.selectable = false;
            let id = background.id;
            ed.store.apply(SceneMutation::Add {
                object: Box::new(background),
            });
            ed.set_selection(Selection::None);
            Ok(id)
        })?;
        log::debug!("cropped canvas to {region:?}");
        self.crop_tool.finish(region);
        self.set_tool(ToolMode::Select);
        Ok(id)
    }

    /// Drop the crop overlay and return to select mode.
    pub fn cancel_crop(&mut self) -> bool {
        if self.crop_tool.rect().is_none() {
            return false;
        }
        self.set_tool(ToolMode::Select);
        true
    }
}
