//! Hit testing: point → object lookup.
//!
//! Reverse-walks the top-level stack (front-to-back) to find which object
//! is under a canvas position. Groups are hit as a whole; their children
//! are never returned individually.

use crate::raster::distance_to_path;
use cv_core::kurbo::{Point, Rect};
use cv_core::{Drawable, ObjectId, SceneGraph};

/// Minimum pick tolerance for thin open shapes (lines, brush strokes).
const PICK_TOLERANCE: f64 = 4.0;

/// Find the topmost selectable, visible object at `point`.
/// Returns `None` if only the background (or nothing) is there.
pub fn hit_test(scene: &SceneGraph, point: Point) -> Option<ObjectId> {
    scene
        .iter()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .filter(|obj| obj.visible && obj.selectable && !obj.is_background())
        .find(|obj| hits(obj, point))
        .map(|obj| obj.id)
}

fn hits(object: &Drawable, point: Point) -> bool {
    let m = object.matrix();
    if m.determinant().abs() <= f64::EPSILON {
        return false;
    }
    let local = m.inverse() * point;
    if object.kind.is_closed() {
        let size = object.size();
        let half_stroke = object.style.stroke.as_ref().map_or(0.0, |s| s.width / 2.0);
        return Rect::from_center_size(Point::ZERO, size)
            .inflate(half_stroke, half_stroke)
            .contains(local);
    }
    let tolerance = object
        .style
        .stroke
        .as_ref()
        .map_or(PICK_TOLERANCE, |s| (s.width / 2.0).max(PICK_TOLERANCE));
    distance_to_path(&object.kind.outline(), local) <= tolerance
}

/// All selectable top-level objects whose bounds intersect `rect`.
/// Used for marquee (box) selection.
pub fn hit_test_rect(scene: &SceneGraph, rect: Rect) -> Vec<ObjectId> {
    let rect = rect.abs();
    scene
        .iter()
        .filter(|obj| obj.visible && obj.selectable && !obj.is_background())
        .filter(|obj| {
            let b = obj.bounds();
            b.x0 < rect.x1 && b.x1 > rect.x0 && b.y0 < rect.y1 && b.y1 > rect.y0
        })
        .map(|obj| obj.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cv_core::kurbo::Size;
    use cv_core::{Color, CustomType, ObjectKind, Style};

    fn scene() -> (SceneGraph, ObjectId, ObjectId) {
        let mut sg = SceneGraph::new(Size::new(800.0, 600.0));
        sg.add(
            Drawable::with_kind(ObjectKind::Rectangle {
                width: 800.0,
                height: 600.0,
            })
            .tagged(CustomType::Background),
        );
        let a = sg.add(
            Drawable::with_kind(ObjectKind::Rectangle {
                width: 100.0,
                height: 100.0,
            })
            .at(10.0, 10.0),
        );
        let b = sg.add(
            Drawable::with_kind(ObjectKind::Line {
                start: Point::new(-50.0, 0.0),
                end: Point::new(50.0, 0.0),
            })
            .at(200.0, 200.0)
            .styled(Style::stroked(Color::BLACK, 2.0)),
        );
        (sg, a, b)
    }

    #[test]
    fn hit_topmost_rect() {
        let (sg, a, _) = scene();
        assert_eq!(hit_test(&sg, Point::new(50.0, 50.0)), Some(a));
    }

    #[test]
    fn background_is_never_hit() {
        let (sg, _, _) = scene();
        assert_eq!(hit_test(&sg, Point::new(700.0, 500.0)), None);
    }

    #[test]
    fn lines_hit_within_tolerance() {
        let (sg, _, b) = scene();
        assert_eq!(hit_test(&sg, Point::new(250.0, 203.0)), Some(b));
        assert_eq!(hit_test(&sg, Point::new(250.0, 220.0)), None);
    }

    #[test]
    fn marquee_collects_intersecting() {
        let (sg, a, b) = scene();
        assert_eq!(hit_test_rect(&sg, Rect::new(0.0, 0.0, 20.0, 20.0)), vec![a]);
        let all = hit_test_rect(&sg, Rect::new(300.0, 300.0, 0.0, 0.0));
        assert_eq!(all, vec![a, b]);
    }
}
