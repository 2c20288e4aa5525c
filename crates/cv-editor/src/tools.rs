//! Tool system for canvas interactions.
//!
//! Exactly one [`ToolMode`] is active. Each tool translates input events
//! into [`SceneMutation`]s plus optional selection and mode changes,
//! which the editor applies through the store. Switching modes calls the
//! old tool's `exit` so it can tear down transient state (a half-drawn
//! arrow, the crop overlay).
//!
//! | Mode | Pointer drag does |
//! |------|-------------------|
//! | Select (and the menu modes) | move selection / marquee |
//! | Brush | freehand erasable stroke |
//! | Eraser | mask erasable objects under the stroke |
//! | Arrow | line + arrowhead, grouped on release |
//! | Crop | move / resize the crop rectangle |

use crate::config::EditorConfig;
use crate::input::InputEvent;
use crate::selection::Selection;
use crate::store::SceneMutation;
use cv_core::kurbo::{Point, Rect, Size};
use cv_core::*;
use cv_render::hit_test_rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolMode {
    #[default]
    Select,
    Brush,
    Eraser,
    /// Shape picker open; the canvas behaves as in select mode.
    ShapesMenu,
    Crop,
    /// Fill / gradient picker open.
    BucketMenu,
    /// Background / text removal picker open.
    RemoveMenu,
    Arrow,
}

impl ToolMode {
    pub fn name(&self) -> &'static str {
        match self {
            ToolMode::Select => "select",
            ToolMode::Brush => "brush",
            ToolMode::Eraser => "eraser",
            ToolMode::ShapesMenu => "shapes",
            ToolMode::Crop => "crop",
            ToolMode::BucketMenu => "bucket",
            ToolMode::RemoveMenu => "remove",
            ToolMode::Arrow => "arrow",
        }
    }

    /// Modes in which pointer input selects and moves objects.
    pub fn selects(&self) -> bool {
        matches!(
            self,
            ToolMode::Select | ToolMode::ShapesMenu | ToolMode::BucketMenu | ToolMode::RemoveMenu
        )
    }

    /// Modes that own the pointer exclusively and drop the selection.
    pub fn draws(&self) -> bool {
        matches!(
            self,
            ToolMode::Brush | ToolMode::Eraser | ToolMode::Arrow | ToolMode::Crop
        )
    }
}

/// Read-only view of editor state handed to tools.
pub struct ToolContext<'a> {
    pub scene: &'a SceneGraph,
    pub config: &'a EditorConfig,
    pub selection: &'a Selection,
    /// Topmost selectable object under the pointer, if any.
    pub hit: Option<ObjectId>,
}

/// What a tool wants done in response to an event.
#[derive(Debug, Default, PartialEq)]
pub struct ToolOutput {
    pub mutations: Vec<SceneMutation>,
    pub selection: Option<Selection>,
    pub next_mode: Option<ToolMode>,
}

impl ToolOutput {
    pub fn mutations(mutations: Vec<SceneMutation>) -> Self {
        Self {
            mutations,
            ..Self::default()
        }
    }

    pub fn select(selection: Selection) -> Self {
        Self {
            selection: Some(selection),
            ..Self::default()
        }
    }
}

pub trait Tool {
    fn mode(&self) -> ToolMode;

    /// Handle an input event.
    fn handle(&mut self, event: &InputEvent, ctx: &ToolContext<'_>) -> ToolOutput;

    /// Called when the mode becomes active.
    fn enter(&mut self, _ctx: &ToolContext<'_>) -> ToolOutput {
        ToolOutput::default()
    }

    /// Called when the mode is left; drop any transient state.
    fn exit(&mut self, _ctx: &ToolContext<'_>) -> ToolOutput {
        ToolOutput::default()
    }
}

// ─── Select Tool ─────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct SelectTool {
    mode: ToolMode,
    /// Last pointer position while dragging the selection.
    drag_from: Option<Point>,
    /// Marquee (rubber-band) selection anchor.
    marquee_start: Option<Point>,
    /// Current marquee rectangle, updated during drag.
    pub marquee_rect: Option<Rect>,
}

impl SelectTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select and the menu modes share this tool.
    pub(crate) fn set_mode(&mut self, mode: ToolMode) {
        self.mode = mode;
    }

    fn reset(&mut self) {
        self.drag_from = None;
        self.marquee_start = None;
        self.marquee_rect = None;
    }
}

impl Tool for SelectTool {
    fn mode(&self) -> ToolMode {
        self.mode
    }

    fn handle(&mut self, event: &InputEvent, ctx: &ToolContext<'_>) -> ToolOutput {
        match event {
            InputEvent::PointerDown { x, y, modifiers } => {
                self.reset();
                let p = Point::new(*x, *y);
                if let Some(hit) = ctx.hit {
                    self.drag_from = Some(p);
                    if modifiers.shift {
                        // Shift+click toggles; no drag from a deselect.
                        let next = ctx.selection.toggled(hit);
                        if !next.contains(hit) {
                            self.drag_from = None;
                        }
                        return ToolOutput::select(next);
                    }
                    if !ctx.selection.contains(hit) {
                        return ToolOutput::select(Selection::Single(hit));
                    }
                    // Clicking an already-selected object keeps the selection for dragging.
                    ToolOutput::default()
                } else {
                    self.marquee_start = Some(p);
                    self.marquee_rect = Some(Rect::from_points(p, p));
                    if modifiers.shift {
                        ToolOutput::default()
                    } else {
                        ToolOutput::select(Selection::None)
                    }
                }
            }
            InputEvent::PointerMove { x, y, .. } => {
                let p = Point::new(*x, *y);
                if let Some(from) = self.drag_from {
                    let (dx, dy) = (p.x - from.x, p.y - from.y);
                    self.drag_from = Some(p);
                    if dx == 0.0 && dy == 0.0 {
                        return ToolOutput::default();
                    }
                    let moves = ctx
                        .selection
                        .ids()
                        .into_iter()
                        .filter(|id| {
                            ctx.scene
                                .get(*id)
                                .is_some_and(|d| d.selectable && !d.is_background())
                        })
                        .map(|id| SceneMutation::Move { id, dx, dy })
                        .collect();
                    return ToolOutput::mutations(moves);
                }
                if let Some(start) = self.marquee_start {
                    self.marquee_rect = Some(Rect::from_points(start, p));
                }
                ToolOutput::default()
            }
            InputEvent::PointerUp { modifiers, .. } => {
                let marquee = self.marquee_rect.take();
                self.reset();
                let Some(rect) = marquee else {
                    return ToolOutput::default();
                };
                if rect.area() < 1.0 {
                    return ToolOutput::default();
                }
                let hits = hit_test_rect(ctx.scene, rect);
                let selection = if modifiers.shift {
                    Selection::from_ids(ctx.selection.ids().into_iter().chain(hits))
                } else {
                    Selection::from_ids(hits)
                };
                ToolOutput::select(selection)
            }
            InputEvent::Key { .. } => ToolOutput::default(),
        }
    }

    fn exit(&mut self, _ctx: &ToolContext<'_>) -> ToolOutput {
        self.reset();
        ToolOutput::default()
    }
}

// ─── Brush Tool ──────────────────────────────────────────────────────────

/// Minimum distance between recorded brush samples.
const MIN_SAMPLE_DISTANCE: f64 = 1.0;

/// Freehand strokes. Each stroke becomes an erasable path painted with
/// the foreground colour at the configured brush width.
#[derive(Debug, Default)]
pub struct BrushTool {
    stroke: Option<ObjectId>,
    points: Vec<Point>,
}

impl BrushTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_drawing(&self) -> bool {
        self.stroke.is_some()
    }
}

impl Tool for BrushTool {
    fn mode(&self) -> ToolMode {
        ToolMode::Brush
    }

    fn handle(&mut self, event: &InputEvent, ctx: &ToolContext<'_>) -> ToolOutput {
        match event {
            InputEvent::PointerDown { x, y, .. } => {
                let p = Point::new(*x, *y);
                let mut stroke = Drawable::with_kind(ObjectKind::Path { points: vec![Point::ZERO] })
                    .styled(Style::stroked(ctx.config.foreground, ctx.config.brush_width));
                stroke.transform.set_center(stroke.size(), p);
                stroke.erasable = true;
                self.stroke = Some(stroke.id);
                self.points = vec![p];
                ToolOutput::mutations(vec![SceneMutation::Add {
                    object: Box::new(stroke),
                }])
            }
            InputEvent::PointerMove { x, y, .. } | InputEvent::PointerUp { x, y, .. } => {
                let Some(id) = self.stroke else {
                    return ToolOutput::default();
                };
                let p = Point::new(*x, *y);
                let far_enough = self
                    .points
                    .last()
                    .is_none_or(|last| (p - *last).hypot() >= MIN_SAMPLE_DISTANCE);
                let is_up = matches!(event, InputEvent::PointerUp { .. });
                if is_up {
                    self.stroke = None;
                }
                if !far_enough {
                    return ToolOutput::default();
                }
                self.points.push(p);
                let points = if is_up {
                    std::mem::take(&mut self.points)
                } else {
                    self.points.clone()
                };
                ToolOutput::mutations(vec![SceneMutation::SetPath { id, points }])
            }
            InputEvent::Key { .. } => ToolOutput::default(),
        }
    }

    fn exit(&mut self, _ctx: &ToolContext<'_>) -> ToolOutput {
        self.stroke = None;
        self.points.clear();
        ToolOutput::default()
    }
}

// ─── Eraser Tool ─────────────────────────────────────────────────────────

/// Masks erasable objects. On release, the stroke is mapped into the
/// local space of every erasable object it touches and attached there;
/// the rasterizer treats those strokes as transparency.
#[derive(Debug, Default)]
pub struct EraserTool {
    points: Vec<Point>,
    active: bool,
}

impl EraserTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canvas-space points of the stroke in progress, for the overlay.
    pub fn preview(&self) -> &[Point] {
        &self.points
    }
}

impl Tool for EraserTool {
    fn mode(&self) -> ToolMode {
        ToolMode::Eraser
    }

    fn handle(&mut self, event: &InputEvent, ctx: &ToolContext<'_>) -> ToolOutput {
        match event {
            InputEvent::PointerDown { x, y, .. } => {
                self.active = true;
                self.points = vec![Point::new(*x, *y)];
                ToolOutput::default()
            }
            InputEvent::PointerMove { x, y, .. } => {
                if self.active {
                    self.points.push(Point::new(*x, *y));
                }
                ToolOutput::default()
            }
            InputEvent::PointerUp { x, y, .. } => {
                if !self.active {
                    return ToolOutput::default();
                }
                self.active = false;
                self.points.push(Point::new(*x, *y));
                let points = std::mem::take(&mut self.points);
                ToolOutput::mutations(erase_along(ctx.scene, &points, ctx.config.eraser_width))
            }
            InputEvent::Key { .. } => ToolOutput::default(),
        }
    }

    fn exit(&mut self, _ctx: &ToolContext<'_>) -> ToolOutput {
        self.active = false;
        self.points.clear();
        ToolOutput::default()
    }
}

/// Eraser mutations for a canvas-space stroke of `width`.
pub fn erase_along(scene: &SceneGraph, points: &[Point], width: f64) -> Vec<SceneMutation> {
    if points.is_empty() {
        return Vec::new();
    }
    let reach = points_bounds(points).inflate(width / 2.0, width / 2.0);
    let mut out = Vec::new();
    let mut pending: Vec<ObjectId> = scene.top_level();
    while let Some(id) = pending.pop() {
        let Some(object) = scene.get(id) else { continue };
        if object.kind.is_group() {
            pending.extend(scene.children(id));
            continue;
        }
        if !object.erasable || !object.visible {
            continue;
        }
        let Some(world) = scene.world_matrix(id) else { continue };
        let det = world.determinant();
        if det.abs() <= f64::EPSILON {
            continue;
        }
        let half_stroke = object.style.stroke.as_ref().map_or(0.0, |s| s.width / 2.0);
        let local_box = Rect::from_center_size(Point::ZERO, object.size()).inflate(half_stroke, half_stroke);
        let bounds = world.transform_rect_bbox(local_box);
        if bounds.intersect(reach).area() <= 0.0 && !touches(bounds, reach) {
            continue;
        }
        let inverse = world.inverse();
        out.push(SceneMutation::Erase {
            id,
            stroke: EraserStroke {
                points: points.iter().map(|p| inverse * *p).collect(),
                width: width / det.abs().sqrt(),
            },
        });
    }
    out
}

/// Overlap test that also accepts degenerate (zero-width) boxes.
fn touches(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && a.x1 >= b.x0 && a.y0 <= b.y1 && a.y1 >= b.y0
}

// ─── Arrow Tool ──────────────────────────────────────────────────────────

/// Arrowhead rotation in degrees for a shaft from `start` to `end`.
///
/// The head is an apex-up triangle, so it is turned a quarter past the
/// shaft direction: `atan2(dy, dx) · 180/π + 90`.
pub fn arrowhead_angle(start: Point, end: Point) -> f64 {
    let (dx, dy) = (end.x - start.x, end.y - start.y);
    dy.atan2(dx) * 180.0 / std::f64::consts::PI + 90.0
}

#[derive(Debug, Clone, Copy)]
struct ArrowDraft {
    start: Point,
    line: ObjectId,
    head: ObjectId,
}

/// Shaft shorter than this on release is discarded.
const MIN_ARROW_LENGTH: f64 = 1.0;

/// Drag to draw an arrow. The shaft and head are live objects while
/// dragging; on release they are grouped into one `arrow` object and the
/// editor returns to select mode.
#[derive(Debug, Default)]
pub struct ArrowTool {
    draft: Option<ArrowDraft>,
}

impl ArrowTool {
    pub fn new() -> Self {
        Self::default()
    }

    fn head_transform(ctx: &ToolContext<'_>, start: Point, end: Point) -> Transform {
        let size = ctx.config.arrow_head_size;
        let mut t = Transform::default();
        t.angle = arrowhead_angle(start, end);
        t.set_center(Size::new(size, size), end);
        t
    }

    fn drag_to(&self, ctx: &ToolContext<'_>, draft: ArrowDraft, end: Point) -> Vec<SceneMutation> {
        vec![
            SceneMutation::SetLine {
                id: draft.line,
                start: draft.start,
                end,
            },
            SceneMutation::SetTransform {
                id: draft.head,
                transform: Self::head_transform(ctx, draft.start, end),
            },
        ]
    }
}

impl Tool for ArrowTool {
    fn mode(&self) -> ToolMode {
        ToolMode::Arrow
    }

    fn handle(&mut self, event: &InputEvent, ctx: &ToolContext<'_>) -> ToolOutput {
        match event {
            InputEvent::PointerDown { x, y, .. } => {
                let start = Point::new(*x, *y);
                let mut out = self.exit(ctx);
                let color = ctx.config.foreground;
                let mut line = Drawable::with_kind(ObjectKind::Line {
                    start: Point::ZERO,
                    end: Point::ZERO,
                })
                .styled(Style::stroked(color, ctx.config.arrow_stroke_width));
                line.transform.set_center(line.size(), start);

                let size = ctx.config.arrow_head_size;
                let mut head = Drawable::with_kind(ObjectKind::Triangle {
                    width: size,
                    height: size,
                })
                .styled(Style::filled(color));
                head.transform = Self::head_transform(ctx, start, start);

                self.draft = Some(ArrowDraft {
                    start,
                    line: line.id,
                    head: head.id,
                });
                out.mutations.push(SceneMutation::Add { object: Box::new(line) });
                out.mutations.push(SceneMutation::Add { object: Box::new(head) });
                out
            }
            InputEvent::PointerMove { x, y, .. } => match self.draft {
                Some(draft) => ToolOutput::mutations(self.drag_to(ctx, draft, Point::new(*x, *y))),
                None => ToolOutput::default(),
            },
            InputEvent::PointerUp { x, y, .. } => {
                let Some(draft) = self.draft.take() else {
                    return ToolOutput::default();
                };
                let end = Point::new(*x, *y);
                let mut out = ToolOutput {
                    next_mode: Some(ToolMode::Select),
                    ..ToolOutput::default()
                };
                if (end - draft.start).hypot() < MIN_ARROW_LENGTH {
                    log::debug!("arrow too short; discarded");
                    out.mutations = vec![
                        SceneMutation::Remove { id: draft.line },
                        SceneMutation::Remove { id: draft.head },
                    ];
                    return out;
                }
                let group_id = ObjectId::with_prefix("arrow");
                out.mutations = self.drag_to(ctx, draft, end);
                out.mutations.push(SceneMutation::Group {
                    members: vec![draft.line, draft.head],
                    group_id,
                    tag: Some(CustomType::Arrow),
                    label: None,
                });
                out.selection = Some(Selection::Single(group_id));
                out
            }
            InputEvent::Key { .. } => ToolOutput::default(),
        }
    }

    fn exit(&mut self, _ctx: &ToolContext<'_>) -> ToolOutput {
        match self.draft.take() {
            Some(draft) => ToolOutput::mutations(vec![
                SceneMutation::Remove { id: draft.line },
                SceneMutation::Remove { id: draft.head },
            ]),
            None => ToolOutput::default(),
        }
    }
}
