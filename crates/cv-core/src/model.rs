//! Drawable object model.
//!
//! Every entity on the canvas is a [`Drawable`]: a kind-specific geometry
//! ([`ObjectKind`]) placed by a [`Transform`], painted with a [`Style`],
//! and tagged with editor metadata (layer label, custom type, flags).
//! Geometry is always expressed in local coordinates centred on the
//! object's origin; groups hold their children in the same way.

use crate::id::ObjectId;
use crate::image_data::ImageData;
use crate::transform::Transform;
use kurbo::{Affine, BezPath, Circle, Point, Rect, Shape, Size};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Approximate glyph advance as a fraction of the font size.
pub const TEXT_ADVANCE: f64 = 0.6;
/// Line height as a multiple of the font size.
pub const TEXT_LINE_HEIGHT: f64 = 1.16;

// ─── Colors & Paint ──────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Helper to parse a single hex digit.
fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a hex color string: `#RGB`, `#RRGGBB`, `#RRGGBBAA`.
    /// The leading `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();
        let pair = |i: usize| -> Option<f32> {
            Some(f32::from(hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?) / 255.0)
        };
        match bytes.len() {
            3 => {
                let r = hex_val(bytes[0])?;
                let g = hex_val(bytes[1])?;
                let b = hex_val(bytes[2])?;
                Some(Self::rgba(
                    f32::from(r * 17) / 255.0,
                    f32::from(g * 17) / 255.0,
                    f32::from(b * 17) / 255.0,
                    1.0,
                ))
            }
            6 => Some(Self::rgba(pair(0)?, pair(2)?, pair(4)?, 1.0)),
            8 => Some(Self::rgba(pair(0)?, pair(2)?, pair(4)?, pair(6)?)),
            _ => None,
        }
    }

    /// Emit as `#RRGGBB`, or `#RRGGBBAA` when not fully opaque.
    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// Linear interpolation between two colors.
    pub fn lerp(&self, other: &Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        Color::rgba(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
            self.a + (other.a - self.a) * t,
        )
    }
}

/// A gradient stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub offset: f32, // 0.0 .. 1.0
    pub color: Color,
}

/// Fill paint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Paint {
    Solid { color: Color },
    /// Linear gradient across the object's local box.
    /// `angle` 0° runs left → right, 90° top → bottom.
    LinearGradient { angle: f32, stops: Vec<GradientStop> },
}

impl Paint {
    pub const fn solid(color: Color) -> Self {
        Paint::Solid { color }
    }

    /// Two-stop left → right gradient.
    pub fn horizontal(from: Color, to: Color) -> Self {
        Paint::LinearGradient {
            angle: 0.0,
            stops: vec![
                GradientStop { offset: 0.0, color: from },
                GradientStop { offset: 1.0, color: to },
            ],
        }
    }

    /// Sample the paint at `local`, a point inside a box of `size`
    /// centred on the origin.
    pub fn sample(&self, local: Point, size: Size) -> Color {
        match self {
            Paint::Solid { color } => *color,
            Paint::LinearGradient { angle, stops } => {
                let (sin, cos) = f64::from(*angle).to_radians().sin_cos();
                // Project onto the gradient axis, normalised to the box extent.
                let extent = (size.width * cos).abs() + (size.height * sin).abs();
                let t = if extent <= f64::EPSILON {
                    0.0
                } else {
                    (local.x * cos + local.y * sin) / extent + 0.5
                };
                sample_stops(stops, t as f32)
            }
        }
    }
}

fn sample_stops(stops: &[GradientStop], t: f32) -> Color {
    let Some(first) = stops.first() else {
        return Color::TRANSPARENT;
    };
    if t <= first.offset {
        return first.color;
    }
    for pair in stops.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            let local = if span <= f32::EPSILON { 1.0 } else { (t - a.offset) / span };
            return a.color.lerp(&b.color, local);
        }
    }
    stops.last().map_or(first.color, |s| s.color)
}

// ─── Stroke & Style ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub dash: SmallVec<[f64; 2]>,
}

impl Stroke {
    pub fn solid(color: Color, width: f64) -> Self {
        Self {
            color,
            width,
            dash: SmallVec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Paint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Stroke>,
    pub opacity: f32,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: None,
            stroke: None,
            opacity: 1.0,
        }
    }
}

impl Style {
    pub fn filled(color: Color) -> Self {
        Self {
            fill: Some(Paint::solid(color)),
            ..Self::default()
        }
    }

    pub fn stroked(color: Color, width: f64) -> Self {
        Self {
            stroke: Some(Stroke::solid(color, width)),
            ..Self::default()
        }
    }
}

// ─── Metadata ────────────────────────────────────────────────────────────

/// Free-form type tag (`customType`) attached by the editor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CustomType {
    /// The single full-canvas backdrop, always at z-index 0.
    Background,
    /// A compound line + arrowhead produced by the arrow tool.
    Arrow,
    /// The primary generated/uploaded image on a slide.
    MainImage,
    Other(String),
}

impl CustomType {
    pub fn as_str(&self) -> &str {
        match self {
            CustomType::Background => "background",
            CustomType::Arrow => "arrow",
            CustomType::MainImage => "mainImage",
            CustomType::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "background" => CustomType::Background,
            "arrow" => CustomType::Arrow,
            "mainImage" => CustomType::MainImage,
            other => CustomType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for CustomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CustomType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CustomType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(CustomType::parse(&s))
    }
}

/// A stroke of the eraser brush, stored in the erased object's local space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EraserStroke {
    pub points: Vec<Point>,
    pub width: f64,
}

// ─── Object kinds ────────────────────────────────────────────────────────

/// Kind-specific geometry, in local coordinates centred on the origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ObjectKind {
    #[serde(rename = "rect")]
    Rectangle { width: f64, height: f64 },
    Circle { radius: f64 },
    /// Isosceles triangle, apex at the top centre.
    Triangle { width: f64, height: f64 },
    Line { start: Point, end: Point },
    /// Freehand stroke (brush output). Painted with the style's stroke.
    Path { points: Vec<Point> },
    #[serde(rename = "textbox")]
    Text {
        content: String,
        #[serde(rename = "fontSize")]
        font_size: f64,
        #[serde(rename = "fontFamily")]
        font_family: String,
    },
    Image {
        #[serde(rename = "src")]
        image: ImageData,
    },
    /// Compound object; children live in the scene graph.
    Group { width: f64, height: f64 },
}

impl ObjectKind {
    /// Lowercase type name, as used by the canvas JSON format.
    pub fn type_name(&self) -> &'static str {
        match self {
            ObjectKind::Rectangle { .. } => "rect",
            ObjectKind::Circle { .. } => "circle",
            ObjectKind::Triangle { .. } => "triangle",
            ObjectKind::Line { .. } => "line",
            ObjectKind::Path { .. } => "path",
            ObjectKind::Text { .. } => "textbox",
            ObjectKind::Image { .. } => "image",
            ObjectKind::Group { .. } => "group",
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, ObjectKind::Group { .. })
    }

    /// Unscaled size of the local box.
    pub fn size(&self) -> Size {
        match self {
            ObjectKind::Rectangle { width, height }
            | ObjectKind::Triangle { width, height }
            | ObjectKind::Group { width, height } => Size::new(*width, *height),
            ObjectKind::Circle { radius } => Size::new(radius * 2.0, radius * 2.0),
            ObjectKind::Line { start, end } => {
                Size::new((end.x - start.x).abs(), (end.y - start.y).abs())
            }
            ObjectKind::Path { points } => points_bounds(points).size(),
            ObjectKind::Text {
                content, font_size, ..
            } => {
                let longest = content.lines().map(|l| l.chars().count()).max().unwrap_or(0);
                let lines = content.lines().count().max(1);
                Size::new(
                    longest as f64 * font_size * TEXT_ADVANCE,
                    lines as f64 * font_size * TEXT_LINE_HEIGHT,
                )
            }
            ObjectKind::Image { image } => {
                Size::new(f64::from(image.width()), f64::from(image.height()))
            }
        }
    }

    /// Fillable outline in local coordinates. Lines and paths are open
    /// and only ever stroked; their outline is the polyline itself.
    pub fn outline(&self) -> BezPath {
        match self {
            ObjectKind::Circle { radius } => Circle::new(Point::ZERO, *radius).to_path(0.1),
            ObjectKind::Triangle { width, height } => {
                let (hw, hh) = (width / 2.0, height / 2.0);
                let mut path = BezPath::new();
                path.move_to((0.0, -hh));
                path.line_to((hw, hh));
                path.line_to((-hw, hh));
                path.close_path();
                path
            }
            ObjectKind::Line { start, end } => {
                let mut path = BezPath::new();
                path.move_to(*start);
                path.line_to(*end);
                path
            }
            ObjectKind::Path { points } => polyline(points),
            _ => Rect::from_center_size(Point::ZERO, self.size()).to_path(0.1),
        }
    }

    /// Whether the kind has an interior that a fill paints.
    pub fn is_closed(&self) -> bool {
        !matches!(self, ObjectKind::Line { .. } | ObjectKind::Path { .. })
    }
}

/// Axis-aligned bounds of a point set (`Rect::ZERO` when empty).
pub fn points_bounds(points: &[Point]) -> Rect {
    let mut iter = points.iter();
    let Some(first) = iter.next() else {
        return Rect::ZERO;
    };
    iter.fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p))
}

/// Open polyline through `points`.
pub fn polyline(points: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    let mut iter = points.iter();
    if let Some(first) = iter.next() {
        path.move_to(*first);
        for p in iter {
            path.line_to(*p);
        }
    }
    path
}

// ─── Drawable ────────────────────────────────────────────────────────────

/// A node in the scene graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drawable {
    pub id: ObjectId,
    #[serde(flatten)]
    pub kind: ObjectKind,
    #[serde(flatten)]
    pub transform: Transform,
    #[serde(default)]
    pub style: Style,
    /// Human-readable name shown in the layer panel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_type: Option<CustomType>,
    #[serde(default)]
    pub erasable: bool,
    #[serde(default = "default_true")]
    pub selectable: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub eraser: Vec<EraserStroke>,
}

fn default_true() -> bool {
    true
}

impl Drawable {
    pub fn new(id: ObjectId, kind: ObjectKind) -> Self {
        Self {
            id,
            kind,
            transform: Transform::default(),
            style: Style::default(),
            layer_label: None,
            custom_type: None,
            erasable: false,
            selectable: true,
            visible: true,
            eraser: Vec::new(),
        }
    }

    /// New object with an auto-generated id prefixed by its kind.
    pub fn with_kind(kind: ObjectKind) -> Self {
        let id = ObjectId::with_prefix(kind.type_name());
        Self::new(id, kind)
    }

    #[must_use]
    pub fn at(mut self, left: f64, top: f64) -> Self {
        self.transform.left = left;
        self.transform.top = top;
        self
    }

    #[must_use]
    pub fn styled(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.layer_label = Some(label.into());
        self
    }

    #[must_use]
    pub fn tagged(mut self, custom_type: CustomType) -> Self {
        self.custom_type = Some(custom_type);
        self
    }

    pub fn is_background(&self) -> bool {
        self.custom_type == Some(CustomType::Background)
    }

    pub fn size(&self) -> Size {
        self.kind.size()
    }

    /// Local → parent matrix.
    pub fn matrix(&self) -> Affine {
        self.transform.matrix(self.size())
    }

    /// Centre in parent coordinates.
    pub fn center(&self) -> Point {
        self.transform.center(self.size())
    }

    /// Axis-aligned bounds in parent coordinates, including stroke.
    pub fn bounds(&self) -> Rect {
        let half_stroke = self.style.stroke.as_ref().map_or(0.0, |s| s.width / 2.0);
        let local = Rect::from_center_size(Point::ZERO, self.size()).inflate(half_stroke, half_stroke);
        self.matrix().transform_rect_bbox(local)
    }
}

/// The uniform transform contract shared by every drawable variant.
pub trait Transformable {
    fn transform(&self) -> &Transform;
    fn transform_mut(&mut self) -> &mut Transform;
    fn local_size(&self) -> Size;

    fn position(&self) -> Point {
        let t = self.transform();
        Point::new(t.left, t.top)
    }

    fn set_position(&mut self, left: f64, top: f64) {
        let t = self.transform_mut();
        t.left = left;
        t.top = top;
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        let t = self.transform_mut();
        t.left += dx;
        t.top += dy;
    }

    fn scale(&self) -> (f64, f64) {
        (self.transform().scale_x, self.transform().scale_y)
    }

    fn set_scale(&mut self, scale_x: f64, scale_y: f64) {
        let t = self.transform_mut();
        t.scale_x = scale_x;
        t.scale_y = scale_y;
    }

    fn rotation(&self) -> f64 {
        self.transform().angle
    }

    /// Rotate in place about the object's centre.
    fn set_rotation(&mut self, degrees: f64) {
        let size = self.local_size();
        let center = self.transform().center(size);
        let t = self.transform_mut();
        t.angle = degrees;
        t.set_center(size, center);
    }

    fn flips(&self) -> (bool, bool) {
        (self.transform().flip_x, self.transform().flip_y)
    }

    fn set_flips(&mut self, flip_x: bool, flip_y: bool) {
        let t = self.transform_mut();
        t.flip_x = flip_x;
        t.flip_y = flip_y;
    }
}

impl Transformable for Drawable {
    fn transform(&self) -> &Transform {
        &self.transform
    }

    fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    fn local_size(&self) -> Size {
        self.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_hex_roundtrip() {
        let c = Color::from_hex("#6C5CE7").unwrap();
        assert_eq!(c.to_hex(), "#6C5CE7");

        let c2 = Color::from_hex("#FF000080").unwrap();
        assert!((c2.a - 128.0 / 255.0).abs() < 0.01);
        assert_eq!(c2.to_hex().len(), 9);

        assert_eq!(Color::from_hex("fff").unwrap(), Color::WHITE);
        assert!(Color::from_hex("#12345").is_none());
    }

    #[test]
    fn horizontal_gradient_runs_left_to_right() {
        let paint = Paint::horizontal(Color::BLACK, Color::WHITE);
        let size = Size::new(200.0, 100.0);
        assert_eq!(paint.sample(Point::new(-100.0, 0.0), size), Color::BLACK);
        assert_eq!(paint.sample(Point::new(100.0, 0.0), size), Color::WHITE);
        let mid = paint.sample(Point::new(0.0, 30.0), size);
        assert!((mid.r - 0.5).abs() < 1e-3);
    }

    #[test]
    fn text_size_tracks_longest_line() {
        let kind = ObjectKind::Text {
            content: "ab\nabcd".into(),
            font_size: 10.0,
            font_family: "Inter".into(),
        };
        let size = kind.size();
        assert!((size.width - 4.0 * 10.0 * TEXT_ADVANCE).abs() < 1e-9);
        assert!((size.height - 2.0 * 10.0 * TEXT_LINE_HEIGHT).abs() < 1e-9);
    }

    #[test]
    fn rotation_keeps_center_fixed() {
        let mut obj = Drawable::with_kind(ObjectKind::Rectangle {
            width: 100.0,
            height: 40.0,
        })
        .at(10.0, 10.0);
        let before = obj.center();
        obj.set_rotation(45.0);
        let after = obj.center();
        assert!((before - after).hypot() < 1e-9);
    }

    #[test]
    fn bounds_cover_rotated_box() {
        let mut obj = Drawable::with_kind(ObjectKind::Rectangle {
            width: 10.0,
            height: 10.0,
        });
        obj.set_rotation(45.0);
        let b = obj.bounds();
        assert!((b.width() - 10.0 * 2f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn custom_type_string_forms() {
        assert_eq!(CustomType::parse("background"), CustomType::Background);
        assert_eq!(CustomType::parse("sticker").as_str(), "sticker");
        assert_eq!(CustomType::MainImage.to_string(), "mainImage");
    }
}
