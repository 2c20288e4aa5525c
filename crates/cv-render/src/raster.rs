//! Scene graph → RGBA pixels.
//!
//! A small CPU rasterizer used wherever the editor needs actual pixels:
//! crop extraction, effect payloads, and the thumbnail saved with a slide.
//! Pixels are sampled at their centres (no anti-aliasing) and composited
//! source-over in draw order.

use cv_core::kurbo::{Affine, BezPath, ParamCurveNearest, Point, Rect, Shape};
use cv_core::{Drawable, ObjectId, ObjectKind, SceneGraph};
use image::{Rgba, RgbaImage};

/// Renders parts of a scene to pixels.
pub trait Rasterizer {
    /// Render the canvas-space `region` at one pixel per scene unit.
    fn render_region(&self, scene: &SceneGraph, region: Rect) -> RgbaImage;

    /// Render a single object (and its children) cropped to its bounds.
    /// Returns the pixels and the canvas-space region they cover.
    fn render_object(&self, scene: &SceneGraph, id: ObjectId) -> Option<(RgbaImage, Rect)>;

    /// Render the whole canvas.
    fn render_canvas(&self, scene: &SceneGraph) -> RgbaImage {
        let size = scene.size();
        self.render_region(scene, Rect::new(0.0, 0.0, size.width, size.height))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareRasterizer;

/// Destination buffer positioned in canvas space.
struct Target {
    pixels: RgbaImage,
    origin: Point,
}

impl Rasterizer for SoftwareRasterizer {
    fn render_region(&self, scene: &SceneGraph, region: Rect) -> RgbaImage {
        let mut target = Target::new(region);
        for id in scene.top_level() {
            self.paint(scene, id, Affine::IDENTITY, 1.0, &mut target);
        }
        target.pixels
    }

    fn render_object(&self, scene: &SceneGraph, id: ObjectId) -> Option<(RgbaImage, Rect)> {
        let object = scene.get(id)?;
        let parent = match scene.parent(id) {
            Some(p) => scene.world_matrix(p)?,
            None => Affine::IDENTITY,
        };
        let region = (parent * object.matrix())
            .transform_rect_bbox(local_bounds(object))
            .expand();
        let mut target = Target::new(region);
        self.paint(scene, id, parent, 1.0, &mut target);
        Some((target.pixels, region))
    }
}

impl SoftwareRasterizer {
    fn paint(&self, scene: &SceneGraph, id: ObjectId, parent: Affine, opacity: f32, target: &mut Target) {
        let Some(object) = scene.get(id) else {
            return;
        };
        if !object.visible {
            return;
        }
        let world = parent * object.matrix();
        let opacity = opacity * object.style.opacity;

        if let ObjectKind::Group { .. } = object.kind {
            for child in scene.children(id) {
                self.paint(scene, child, world, opacity, target);
            }
            return;
        }
        if let ObjectKind::Text { content, .. } = &object.kind {
            // Glyph shaping needs a font context the host owns.
            log::trace!("skipping text {} {:?}", object.id, content);
            return;
        }
        paint_object(object, world, opacity, target);
    }
}

impl Target {
    fn new(region: Rect) -> Self {
        let width = region.width().round().max(1.0) as u32;
        let height = region.height().round().max(1.0) as u32;
        Self {
            pixels: RgbaImage::new(width, height),
            origin: region.origin(),
        }
    }

    /// Pixel range covered by a canvas-space rect, clipped to the buffer.
    fn pixel_span(&self, bbox: Rect) -> Option<(u32, u32, u32, u32)> {
        let local = bbox - self.origin.to_vec2();
        let x0 = local.x0.floor().max(0.0);
        let y0 = local.y0.floor().max(0.0);
        let x1 = local.x1.ceil().min(f64::from(self.pixels.width()));
        let y1 = local.y1.ceil().min(f64::from(self.pixels.height()));
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }

    fn blend(&mut self, x: u32, y: u32, src: [f32; 4]) {
        if src[3] <= 0.0 {
            return;
        }
        let dst = self.pixels.get_pixel(x, y).0;
        let da = f32::from(dst[3]) / 255.0;
        let sa = src[3];
        let out_a = sa + da * (1.0 - sa);
        let mut out = [0u8; 4];
        for c in 0..3 {
            let dc = f32::from(dst[c]) / 255.0;
            let v = (src[c] * sa + dc * da * (1.0 - sa)) / out_a;
            out[c] = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        }
        out[3] = (out_a.clamp(0.0, 1.0) * 255.0).round() as u8;
        self.pixels.put_pixel(x, y, Rgba(out));
    }
}

/// Local box including half the stroke width.
fn local_bounds(object: &Drawable) -> Rect {
    let half = object.style.stroke.as_ref().map_or(0.0, |s| s.width / 2.0);
    Rect::from_center_size(Point::ZERO, object.size()).inflate(half, half)
}

fn paint_object(object: &Drawable, world: Affine, opacity: f32, target: &mut Target) {
    if world.determinant().abs() <= f64::EPSILON {
        return;
    }
    let inverse = world.inverse();
    let Some((x0, y0, x1, y1)) = target.pixel_span(world.transform_rect_bbox(local_bounds(object)))
    else {
        return;
    };
    let outline = object.kind.outline();
    let size = object.size();
    for py in y0..y1 {
        for px in x0..x1 {
            let canvas = target.origin + (f64::from(px) + 0.5, f64::from(py) + 0.5);
            let local = inverse * canvas;
            if is_erased(object, local) {
                continue;
            }
            if let Some(mut color) = sample(object, &outline, local, size) {
                color[3] *= opacity;
                target.blend(px, py, color);
            }
        }
    }
}

/// Colour of the object at a local point, stroke drawn over fill.
fn sample(object: &Drawable, outline: &BezPath, local: Point, size: cv_core::kurbo::Size) -> Option<[f32; 4]> {
    if let Some(stroke) = &object.style.stroke
        && stroke.width > 0.0
        && distance_to_path(outline, local) <= stroke.width / 2.0
    {
        let c = stroke.color;
        return Some([c.r, c.g, c.b, c.a]);
    }
    if let ObjectKind::Image { image } = &object.kind {
        let u = local.x + size.width / 2.0;
        let v = local.y + size.height / 2.0;
        if u < 0.0 || v < 0.0 || u >= size.width || v >= size.height {
            return None;
        }
        let p = image.pixels().get_pixel(u as u32, v as u32).0;
        return Some([
            f32::from(p[0]) / 255.0,
            f32::from(p[1]) / 255.0,
            f32::from(p[2]) / 255.0,
            f32::from(p[3]) / 255.0,
        ]);
    }
    if object.kind.is_closed()
        && let Some(fill) = &object.style.fill
        && outline.contains(local)
    {
        let c = fill.sample(local, size);
        return Some([c.r, c.g, c.b, c.a]);
    }
    None
}

fn is_erased(object: &Drawable, local: Point) -> bool {
    object.eraser.iter().any(|stroke| {
        distance_to_polyline(&stroke.points, local) <= stroke.width / 2.0
    })
}

/// Shortest distance from `p` to any segment of `path`.
pub(crate) fn distance_to_path(path: &BezPath, p: Point) -> f64 {
    let mut best = f64::INFINITY;
    let mut any = false;
    for seg in path.segments() {
        any = true;
        best = best.min(seg.nearest(p, 1e-3).distance_sq);
    }
    if !any {
        // A lone move-to: distance to that point.
        if let Some(start) = path.elements().first().and_then(|e| e.end_point()) {
            return (start - p).hypot();
        }
        return f64::INFINITY;
    }
    best.sqrt()
}

/// Shortest distance from `p` to a polyline (a single point is a dot).
pub(crate) fn distance_to_polyline(points: &[Point], p: Point) -> f64 {
    match points {
        [] => f64::INFINITY,
        [only] => (*only - p).hypot(),
        _ => distance_to_path(&cv_core::polyline(points), p),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cv_core::kurbo::Size;
    use cv_core::{Color, CustomType, EraserStroke, Paint, Style};

    fn red_rect(left: f64, top: f64, w: f64, h: f64) -> Drawable {
        Drawable::with_kind(ObjectKind::Rectangle {
            width: w,
            height: h,
        })
        .at(left, top)
        .styled(Style::filled(Color::rgba(1.0, 0.0, 0.0, 1.0)))
    }

    #[test]
    fn renders_rect_in_place() {
        let mut scene = SceneGraph::new(Size::new(20.0, 20.0));
        scene.add(red_rect(5.0, 5.0, 10.0, 10.0));
        let img = SoftwareRasterizer.render_canvas(&scene);
        assert_eq!(img.dimensions(), (20, 20));
        assert_eq!(img.get_pixel(10, 10).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(2, 2).0, [0, 0, 0, 0]);
    }

    #[test]
    fn region_is_offset_into_canvas() {
        let mut scene = SceneGraph::new(Size::new(100.0, 100.0));
        scene.add(red_rect(50.0, 50.0, 10.0, 10.0));
        let img = SoftwareRasterizer.render_region(&scene, Rect::new(50.0, 50.0, 60.0, 60.0));
        assert_eq!(img.dimensions(), (10, 10));
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(9, 9).0, [255, 0, 0, 255]);
    }

    #[test]
    fn later_objects_paint_over_earlier() {
        let mut scene = SceneGraph::new(Size::new(10.0, 10.0));
        scene.add(red_rect(0.0, 0.0, 10.0, 10.0));
        scene.add(
            Drawable::with_kind(ObjectKind::Rectangle {
                width: 10.0,
                height: 10.0,
            })
            .styled(Style::filled(Color::rgba(0.0, 0.0, 1.0, 1.0))),
        );
        let img = SoftwareRasterizer.render_canvas(&scene);
        assert_eq!(img.get_pixel(5, 5).0, [0, 0, 255, 255]);
    }

    #[test]
    fn hidden_objects_are_skipped() {
        let mut scene = SceneGraph::new(Size::new(10.0, 10.0));
        let mut obj = red_rect(0.0, 0.0, 10.0, 10.0);
        obj.visible = false;
        scene.add(obj);
        let img = SoftwareRasterizer.render_canvas(&scene);
        assert_eq!(img.get_pixel(5, 5).0[3], 0);
    }

    #[test]
    fn eraser_strokes_cut_holes() {
        let mut scene = SceneGraph::new(Size::new(10.0, 10.0));
        let mut obj = red_rect(0.0, 0.0, 10.0, 10.0);
        obj.eraser.push(EraserStroke {
            points: vec![Point::ZERO],
            width: 4.0,
        });
        scene.add(obj);
        let img = SoftwareRasterizer.render_canvas(&scene);
        assert_eq!(img.get_pixel(5, 5).0[3], 0);
        assert_eq!(img.get_pixel(0, 0).0[3], 255);
    }

    #[test]
    fn gradient_background_spans_canvas_width() {
        let mut scene = SceneGraph::new(Size::new(100.0, 10.0));
        scene.add(
            Drawable::with_kind(ObjectKind::Rectangle {
                width: 100.0,
                height: 10.0,
            })
            .styled(Style {
                fill: Some(Paint::horizontal(Color::BLACK, Color::WHITE)),
                ..Style::default()
            })
            .tagged(CustomType::Background),
        );
        let img = SoftwareRasterizer.render_canvas(&scene);
        assert!(img.get_pixel(0, 5).0[0] < 10);
        assert!(img.get_pixel(99, 5).0[0] > 245);
    }

    #[test]
    fn render_object_crops_to_bounds() {
        let mut scene = SceneGraph::new(Size::new(100.0, 100.0));
        scene.add(red_rect(0.0, 0.0, 100.0, 100.0));
        let id = scene.add(
            Drawable::with_kind(ObjectKind::Rectangle {
                width: 20.0,
                height: 10.0,
            })
            .at(30.0, 40.0)
            .styled(Style::filled(Color::rgba(0.0, 1.0, 0.0, 1.0))),
        );
        let (img, region) = SoftwareRasterizer.render_object(&scene, id).unwrap();
        assert_eq!(region, Rect::new(30.0, 40.0, 50.0, 50.0));
        assert_eq!(img.dimensions(), (20, 10));
        // Only the object itself, not the red rect beneath it.
        assert_eq!(img.get_pixel(10, 5).0, [0, 255, 0, 255]);
    }

    #[test]
    fn polyline_distance() {
        let pts = [Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        assert!((distance_to_polyline(&pts, Point::new(5.0, 3.0)) - 3.0).abs() < 1e-6);
        assert!((distance_to_polyline(&pts[..1], Point::new(3.0, 4.0)) - 5.0).abs() < 1e-9);
    }
}
