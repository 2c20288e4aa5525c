//! Integration tests: background/text removal through the editor.
//!
//! Effect services are replaced by in-process mocks so the tests cover
//! ticketing, replacement and failure handling without a network.

use async_trait::async_trait;
use cv_core::image_data::encode_png;
use cv_core::*;
use cv_editor::*;
use cv_remote::{Effect, EffectService, RemoteError};
use image::{Rgba, RgbaImage};
use pretty_assertions::assert_eq;
use std::sync::Mutex;

fn editor() -> Editor {
    let _ = env_logger::builder().is_test(true).try_init();
    Editor::default()
}

fn png(width: u32, height: u32, colour: [u8; 4]) -> Vec<u8> {
    encode_png(&RgbaImage::from_pixel(width, height, Rgba(colour))).unwrap()
}

/// Answers every request with a flat image of the same size.
#[derive(Default)]
struct Flatten {
    seen: Mutex<Vec<Effect>>,
}

#[async_trait]
impl EffectService for Flatten {
    async fn apply(&self, effect: Effect, png_bytes: Vec<u8>) -> Result<Vec<u8>, RemoteError> {
        self.seen.lock().unwrap().push(effect);
        let input = ImageData::decode(&png_bytes).map_err(|e| RemoteError::Request(e.to_string()))?;
        Ok(png(input.width(), input.height(), [0, 0, 0, 0]))
    }
}

/// Always fails the way an unhealthy backend would.
struct Unavailable;

#[async_trait]
impl EffectService for Unavailable {
    async fn apply(&self, _effect: Effect, _png: Vec<u8>) -> Result<Vec<u8>, RemoteError> {
        Err(RemoteError::Status {
            status: 503,
            body: "service unavailable".into(),
        })
    }
}

#[tokio::test]
async fn failed_removal_keeps_the_original_selected() {
    let mut ed = editor();
    let photo = ed.add_image(&png(40, 30, [200, 10, 10, 255])).unwrap();
    let before = ed.to_json().unwrap();

    let err = ed.run_effect(&Unavailable, Effect::RemoveBackground).await.unwrap_err();
    assert!(matches!(err, EditorError::Effect(RemoteError::Status { status: 503, .. })));

    assert_eq!(ed.selection(), &Selection::Single(photo));
    assert_eq!(ed.scene().top_level(), vec![photo]);
    assert_eq!(ed.to_json().unwrap(), before);
    assert!(!ed.is_busy());
    assert!(!ed.can_redo());
}

#[tokio::test]
async fn removal_swaps_in_the_result_at_the_same_depth() {
    let mut ed = editor();
    ed.fill_background().unwrap();
    let photo = ed.add_image(&png(40, 30, [200, 10, 10, 255])).unwrap();
    let above = ed.add_shape(ShapeKind::Circle).unwrap();
    let bounds = ed.scene().get(photo).unwrap().bounds();
    ed.select([photo]);
    ed.set_tool(ToolMode::RemoveMenu);

    let service = Flatten::default();
    let result = ed.run_effect(&service, Effect::RemoveText).await.unwrap();

    assert_eq!(*service.seen.lock().unwrap(), vec![Effect::RemoveText]);
    assert_ne!(result, photo);
    let scene = ed.scene();
    assert!(!scene.contains(photo));
    assert_eq!(scene.z_index(result), Some(1));
    assert_eq!(scene.z_index(above), Some(2));
    let replacement = scene.get(result).unwrap();
    assert!(matches!(replacement.kind, ObjectKind::Image { .. }));
    assert_eq!(replacement.bounds(), bounds);
    assert!(replacement.selectable);
    assert_eq!(ed.selection(), &Selection::Single(result));
    assert_eq!(ed.layers().rows()[1].label, "Image 1");
    assert_eq!(ed.mode(), ToolMode::Select);

    assert!(ed.undo());
    assert!(ed.scene().contains(photo));
}

#[tokio::test]
async fn result_for_a_modified_object_is_discarded() {
    let mut ed = editor();
    let photo = ed.add_image(&png(20, 20, [0, 128, 0, 255])).unwrap();
    let request = ed.begin_effect(Effect::RemoveBackground).unwrap();
    assert!(ed.is_busy());
    assert_eq!(request.ticket.target, photo);

    ed.set_position(5.0, 5.0).unwrap();
    let answer = Flatten::default().apply(request.ticket.effect, request.png).await;
    let err = ed.complete_effect(request.ticket, answer).unwrap_err();
    assert!(matches!(err, EditorError::StaleEffect));
    assert!(!ed.is_busy());
    assert_eq!(ed.scene().top_level(), vec![photo]);
}

#[tokio::test]
async fn result_for_a_deleted_object_is_discarded() {
    let mut ed = editor();
    ed.add_image(&png(20, 20, [0, 128, 0, 255])).unwrap();
    let request = ed.begin_effect(Effect::RemoveBackground).unwrap();
    ed.delete_selected().unwrap();
    let answer = Flatten::default().apply(request.ticket.effect, request.png).await;
    assert!(matches!(
        ed.complete_effect(request.ticket, answer),
        Err(EditorError::StaleEffect)
    ));
    assert!(ed.scene().is_empty());
}

#[test]
fn cancelled_or_superseded_tickets_are_stale() {
    let mut ed = editor();
    let photo = ed.add_image(&png(10, 10, [1, 2, 3, 255])).unwrap();

    let first = ed.begin_effect(Effect::RemoveBackground).unwrap();
    assert!(matches!(
        ed.begin_effect(Effect::RemoveText),
        Err(EditorError::EffectPending)
    ));
    assert!(ed.cancel_effect());
    assert!(matches!(
        ed.complete_effect(first.ticket.clone(), Ok(first.png.clone())),
        Err(EditorError::StaleEffect)
    ));

    // Undo also drops the pending effect.
    let second = ed.begin_effect(Effect::RemoveBackground).unwrap();
    assert!(ed.undo());
    assert!(!ed.is_busy());
    assert!(matches!(
        ed.complete_effect(second.ticket, Ok(second.png)),
        Err(EditorError::StaleEffect)
    ));
    assert!(!ed.scene().contains(photo));
}

#[test]
fn effects_need_exactly_one_selected_object() {
    let mut ed = editor();
    assert!(matches!(
        ed.begin_effect(Effect::RemoveBackground),
        Err(EditorError::NoSelection)
    ));
    let a = ed.add_shape(ShapeKind::Rectangle).unwrap();
    let b = ed.add_shape(ShapeKind::Circle).unwrap();
    ed.select([a, b]);
    assert!(matches!(
        ed.begin_effect(Effect::RemoveBackground),
        Err(EditorError::NotSingleSelection)
    ));
    assert!(!ed.is_busy());
}
