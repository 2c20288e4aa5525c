//! Background fill and gradient.
//!
//! The canvas has at most one background object, pinned to z-index 0.
//! Filling creates it on first use and reuses it afterwards: whatever the
//! background was (e.g. a cropped image), it becomes a canvas-sized
//! rectangle carrying the new paint, keeping its id and label.

use crate::editor::Editor;
use crate::error::EditorError;
use crate::store::SceneMutation;
use crate::tools::ToolMode;
use cv_core::kurbo::Size;
use cv_core::*;

/// Canvas-sized background rectangle painted with `paint`.
pub fn background_object(size: Size, paint: Paint) -> Drawable {
    let mut background = Drawable::with_kind(ObjectKind::Rectangle {
        width: size.width,
        height: size.height,
    })
    .at(0.0, 0.0)
    .styled(Style {
        fill: Some(paint),
        ..Style::default()
    })
    .tagged(CustomType::Background);
    background.selectable = false;
    background
}

/// Mutation that paints the background, creating it if needed, plus
/// the background's id.
pub fn paint_background(scene: &SceneGraph, paint: Paint) -> (ObjectId, SceneMutation) {
    let size = scene.size();
    match scene.background().and_then(|id| scene.get(id)) {
        Some(existing) => {
            let mut reused = background_object(size, paint);
            reused.id = existing.id;
            reused.layer_label = existing.layer_label.clone();
            reused.visible = existing.visible;
            (
                existing.id,
                SceneMutation::Replace {
                    object: Box::new(reused),
                },
            )
        }
        None => {
            let created = background_object(size, paint);
            (
                created.id,
                SceneMutation::Add {
                    object: Box::new(created),
                },
            )
        }
    }
}

impl Editor {
    /// Fill the whole canvas with the foreground colour.
    pub fn fill_background(&mut self) -> Result<ObjectId, EditorError> {
        let paint = Paint::solid(self.config.foreground);
        self.apply_background(paint, "fill background")
    }

    /// Paint a left-to-right gradient from the foreground to the
    /// background colour across the full canvas width.
    pub fn gradient_background(&mut self) -> Result<ObjectId, EditorError> {
        let paint = Paint::horizontal(self.config.foreground, self.config.background);
        self.apply_background(paint, "gradient background")
    }

    fn apply_background(&mut self, paint: Paint, description: &str) -> Result<ObjectId, EditorError> {
        let id = self.record(description, |ed| {
            let (id, mutation) = paint_background(ed.store.scene(), paint);
            ed.store.apply(mutation);
            Ok(id)
        })?;
        if self.mode == ToolMode::BucketMenu {
            self.set_tool(ToolMode::Select);
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SceneStore;

    #[test]
    fn first_fill_creates_background_at_bottom() {
        let mut store = SceneStore::new(Size::new(300.0, 200.0));
        let shape = Drawable::with_kind(ObjectKind::Circle { radius: 5.0 });
        let shape_id = shape.id;
        store.apply(SceneMutation::Add { object: Box::new(shape) });

        let (bg, m) = paint_background(store.scene(), Paint::solid(Color::WHITE));
        store.apply(m);
        assert_eq!(store.scene().background(), Some(bg));
        assert_eq!(store.scene().top_level(), vec![bg, shape_id]);
        assert_eq!(store.scene().get(bg).unwrap().size(), Size::new(300.0, 200.0));
    }

    #[test]
    fn refill_reuses_the_background() {
        let mut store = SceneStore::new(Size::new(300.0, 200.0));
        let (first, m) = paint_background(store.scene(), Paint::solid(Color::WHITE));
        store.apply(m);
        store.apply(SceneMutation::Add {
            object: Box::new(Drawable::with_kind(ObjectKind::Circle { radius: 5.0 })),
        });

        let (again, m) = paint_background(store.scene(), Paint::horizontal(Color::BLACK, Color::WHITE));
        assert_eq!(again, first);
        store.apply(m);
        let scene = store.scene();
        assert_eq!(scene.background(), Some(first));
        assert_eq!(scene.len(), 2);
        let bgs = scene.iter().filter(|d| d.is_background()).count();
        assert_eq!(bgs, 1);
        assert!(matches!(
            scene.get(first).unwrap().style.fill,
            Some(Paint::LinearGradient { .. })
        ));
    }
}
