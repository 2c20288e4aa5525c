//! Remote effects: background and text removal.
//!
//! An effect runs in three steps so no editor borrow spans the network
//! call:
//!
//! 1. [`Editor::begin_effect`] rasterizes the selected object and issues
//!    an [`EffectTicket`] recording the object's modification generation.
//! 2. The caller sends [`EffectRequest::png`] to an [`EffectService`].
//! 3. [`Editor::complete_effect`] swaps the returned image in, unless the
//!    ticket went stale: the object was modified or deleted, the effect
//!    was cancelled, or another effect replaced it.
//!
//! Only one effect may be pending at a time; [`Editor::is_busy`] is the
//! loading flag.

use crate::editor::Editor;
use crate::error::EditorError;
use crate::selection::Selection;
use crate::store::SceneMutation;
use crate::tools::ToolMode;
use cv_core::image_data::encode_png;
use cv_core::kurbo::Rect;
use cv_core::*;
use cv_remote::{Effect, EffectService, RemoteError};

/// Claim on the result of an in-flight effect.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectTicket {
    serial: u64,
    pub effect: Effect,
    pub target: ObjectId,
    /// Target's modification generation when the effect started.
    pub generation: u64,
    /// Canvas region the target was rendered from.
    pub region: Rect,
}

#[derive(Debug, Clone)]
pub struct EffectRequest {
    pub ticket: EffectTicket,
    /// The target rendered on its own, PNG-encoded.
    pub png: Vec<u8>,
}

/// Bookkeeping for the single pending effect.
#[derive(Debug, Default)]
pub(crate) struct EffectSlot {
    next_serial: u64,
    pending: Option<EffectTicket>,
}

impl EffectSlot {
    fn issue(&mut self, effect: Effect, target: ObjectId, generation: u64, region: Rect) -> EffectTicket {
        self.next_serial += 1;
        let ticket = EffectTicket {
            serial: self.next_serial,
            effect,
            target,
            generation,
            region,
        };
        self.pending = Some(ticket.clone());
        ticket
    }

    /// Take the pending ticket if `ticket` is it.
    fn redeem(&mut self, ticket: &EffectTicket) -> bool {
        if self.pending.as_ref().is_some_and(|p| p.serial == ticket.serial) {
            self.pending = None;
            return true;
        }
        false
    }

    pub(crate) fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    fn is_busy(&self) -> bool {
        self.pending.is_some()
    }
}

/// Latest modification generation of `id` and everything inside it.
fn generation_of(scene: &SceneGraph, id: ObjectId) -> Option<u64> {
    let mut latest = scene.touched_at(id)?;
    let mut pending = scene.children(id);
    while let Some(child) = pending.pop() {
        latest = latest.max(scene.touched_at(child).unwrap_or(0));
        pending.extend(scene.children(child));
    }
    Some(latest)
}

impl Editor {
    /// Whether an effect is in flight.
    pub fn is_busy(&self) -> bool {
        self.effects.is_busy()
    }

    /// Start an effect on the single selected object.
    pub fn begin_effect(&mut self, effect: Effect) -> Result<EffectRequest, EditorError> {
        if self.effects.is_busy() {
            log::warn!("{}: another effect is still running", effect.label());
            return Err(EditorError::EffectPending);
        }
        let target = match &self.selection {
            Selection::None => return Err(EditorError::NoSelection),
            Selection::Multi(_) => return Err(EditorError::NotSingleSelection),
            Selection::Single(id) => *id,
        };
        let scene = self.store.scene();
        let generation = generation_of(scene, target).ok_or(EditorError::NoSelection)?;
        let Some((pixels, region)) = self.rasterizer.render_object(scene, target) else {
            log::warn!("{}: {target} has nothing to render", effect.label());
            return Err(EditorError::NoSelection);
        };
        let png = encode_png(&pixels)?;
        let ticket = self.effects.issue(effect, target, generation, region);
        log::debug!("{} started on {target} ({} bytes)", effect.label(), png.len());
        Ok(EffectRequest { ticket, png })
    }

    /// Finish an effect with the service's answer.
    ///
    /// On success the target is replaced by an image of the result, at the
    /// target's z-index, covering the region it was rendered from, and the
    /// new image is selected. On failure or staleness nothing changes.
    pub fn complete_effect(
        &mut self,
        ticket: EffectTicket,
        result: Result<Vec<u8>, RemoteError>,
    ) -> Result<ObjectId, EditorError> {
        if !self.effects.redeem(&ticket) {
            log::warn!("{}: discarding result of a cancelled effect", ticket.effect.label());
            return Err(EditorError::StaleEffect);
        }
        let png = match result {
            Ok(png) => png,
            Err(err) => {
                log::error!("{} failed: {err}", ticket.effect.label());
                self.flush();
                return Err(EditorError::Effect(err));
            }
        };
        let scene = self.store.scene();
        if generation_of(scene, ticket.target) != Some(ticket.generation) {
            log::warn!(
                "{}: {} changed while the effect ran; discarding result",
                ticket.effect.label(),
                ticket.target
            );
            self.flush();
            return Err(EditorError::StaleEffect);
        }
        let image = ImageData::decode(&png)?;
        let z = scene.z_index(ticket.target);
        let label = scene.get(ticket.target).and_then(|d| d.layer_label.clone());

        let id = self.record(ticket.effect.label(), |ed| {
            let (w, h) = (f64::from(image.width()), f64::from(image.height()));
            let mut replacement = Drawable::with_kind(ObjectKind::Image { image }).at(ticket.region.x0, ticket.region.y0);
            replacement.layer_label = label;
            if w > 0.0 && h > 0.0 {
                replacement.transform.scale_x = ticket.region.width() / w;
                replacement.transform.scale_y = ticket.region.height() / h;
            }
            let id = replacement.id;
            ed.store.apply(SceneMutation::Remove { id: ticket.target });
            let object = Box::new(replacement);
            match z {
                Some(z) => ed.store.apply(SceneMutation::Insert { object, z }),
                None => ed.store.apply(SceneMutation::Add { object }),
            };
            ed.set_selection(Selection::Single(id));
            Ok(id)
        })?;
        if self.mode == ToolMode::RemoveMenu {
            self.set_tool(ToolMode::Select);
        }
        log::debug!("{} replaced {} with {id}", ticket.effect.label(), ticket.target);
        Ok(id)
    }

    /// Forget the pending effect; its result will be discarded.
    pub fn cancel_effect(&mut self) -> bool {
        self.effects.cancel()
    }

    /// Run an effect end to end against `service`.
    pub async fn run_effect(&mut self, service: &dyn EffectService, effect: Effect) -> Result<ObjectId, EditorError> {
        let request = self.begin_effect(effect)?;
        let result = service.apply(effect, request.png).await;
        self.complete_effect(request.ticket, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cv_core::kurbo::Size;

    #[test]
    fn only_the_latest_ticket_redeems_once() {
        let mut slot = EffectSlot::default();
        let target = ObjectId::intern("fx_target");
        let region = Rect::new(0.0, 0.0, 1.0, 1.0);
        let old = slot.issue(Effect::RemoveText, target, 3, region);
        slot.cancel();
        let new = slot.issue(Effect::RemoveText, target, 3, region);
        assert!(!slot.redeem(&old));
        assert!(slot.redeem(&new));
        assert!(!slot.redeem(&new));
        assert!(!slot.is_busy());
    }

    #[test]
    fn generation_covers_group_members() {
        let mut scene = SceneGraph::new(Size::new(100.0, 100.0));
        let a = scene.add(Drawable::with_kind(ObjectKind::Circle { radius: 2.0 }).at(0.0, 0.0));
        let b = scene.add(Drawable::with_kind(ObjectKind::Circle { radius: 2.0 }).at(20.0, 0.0));
        let group = ObjectId::intern("fx_group");
        crate::group::group_objects(&mut scene, &[a, b], group).unwrap();
        let before = generation_of(&scene, group).unwrap();
        scene.update(b, |d| d.visible = false);
        assert!(generation_of(&scene, group).unwrap() > before);
    }
}
