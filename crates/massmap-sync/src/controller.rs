//! Annotation controllers, one per entity kind.
//!
//! A controller owns the set of entities of its kind currently on the map and
//! is the only thing that mutates it. Each incoming batch is reconciled
//! against that set and the resulting operations are pushed to the shared
//! rendering surface.

use std::sync::Arc;

use massmap_core::{
  entity::{Annotation, Entity},
  surface::RenderSurface,
};

use crate::reconcile::{EntitySet, Reconciliation, reconcile};

pub struct AnnotationController<E, S> {
  live:    EntitySet<E>,
  surface: Arc<S>,
}

impl<E: Entity, S: RenderSurface> AnnotationController<E, S> {
  pub fn new(surface: Arc<S>) -> Self {
    Self {
      live: EntitySet::new(),
      surface,
    }
  }

  /// The entities currently rendered by this controller.
  pub fn live(&self) -> &EntitySet<E> { &self.live }

  /// Bring the surface in line with `incoming` and adopt it as the live set.
  ///
  /// When `incoming` repeats an id, the later entity wins. Operations are
  /// applied as removals, then additions, then in-place updates, so the
  /// surface never holds two annotations with the same id. A rejected
  /// operation is logged and the rest of the batch still goes through.
  pub fn update<I>(&mut self, incoming: I) -> Reconciliation<E>
  where
    I: IntoIterator<Item = E>,
  {
    let incoming: EntitySet<E> = incoming.into_iter().collect();
    let diff = reconcile(&self.live, &incoming);

    tracing::debug!(
      kind = %E::KIND,
      added = diff.to_add.len(),
      removed = diff.to_remove.len(),
      updated = diff.to_update.len(),
      "reconciled annotations"
    );

    self.apply(&diff);
    self.live = incoming;
    diff
  }

  /// Remove every annotation this controller has put on the surface.
  pub fn clear(&mut self) {
    let ids: Vec<String> = self.live.ids().map(str::to_string).collect();
    if !ids.is_empty()
      && let Err(error) = self.surface.remove_entities(E::KIND, &ids)
    {
      tracing::warn!(kind = %E::KIND, %error, "surface rejected clear");
    }
    self.live = EntitySet::new();
  }

  fn apply(&self, diff: &Reconciliation<E>) {
    if !diff.to_remove.is_empty()
      && let Err(error) = self.surface.remove_entities(E::KIND, &diff.to_remove)
    {
      tracing::warn!(kind = %E::KIND, %error, "surface rejected removals");
    }

    if !diff.to_add.is_empty() {
      let added = annotations(&diff.to_add);
      if let Err(error) = self.surface.add_entities(&added) {
        tracing::warn!(kind = %E::KIND, %error, "surface rejected additions");
      }
    }

    if !diff.to_update.is_empty() {
      let updated = annotations(&diff.to_update);
      if let Err(error) = self.surface.update_entities(&updated) {
        tracing::warn!(kind = %E::KIND, %error, "surface rejected updates");
      }
    }
  }
}

fn annotations<E: Entity>(entities: &[E]) -> Vec<Annotation> {
  entities.iter().cloned().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
  use massmap_core::{
    entity::{AnnotationKind, PeerEntity},
    location::{Coordinate, Location},
  };

  use super::*;
  use crate::testing::{RecordingSurface, SurfaceOp};

  fn peer(id: &str, lat: f64, lon: f64) -> PeerEntity {
    Location::new(id, Coordinate::new(lat, lon), 0).into()
  }

  fn strings(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn first_batch_adds_everything() {
    let surface = Arc::new(RecordingSurface::default());
    let mut controller = AnnotationController::new(surface.clone());

    controller.update([peer("a", 1.0, 1.0), peer("b", 2.0, 2.0)]);

    assert_eq!(surface.ops(), [SurfaceOp::Add(strings(&["a", "b"]))]);
    assert_eq!(controller.live().len(), 2);
  }

  #[test]
  fn operations_are_applied_remove_add_update() {
    let surface = Arc::new(RecordingSurface::default());
    let mut controller = AnnotationController::new(surface.clone());
    controller.update([peer("a", 1.0, 1.0), peer("b", 2.0, 2.0)]);
    surface.clear_ops();

    controller.update([peer("b", 2.5, 2.0), peer("c", 3.0, 3.0)]);

    assert_eq!(
      surface.ops(),
      [
        SurfaceOp::Remove(AnnotationKind::Peer, strings(&["a"])),
        SurfaceOp::Add(strings(&["c"])),
        SurfaceOp::Update(strings(&["b"])),
      ]
    );
  }

  #[test]
  fn unchanged_batch_touches_nothing() {
    let surface = Arc::new(RecordingSurface::default());
    let mut controller = AnnotationController::new(surface.clone());
    controller.update([peer("a", 1.0, 1.0)]);
    surface.clear_ops();

    let diff = controller.update([peer("a", 1.0, 1.0)]);

    assert!(diff.is_empty());
    assert!(surface.ops().is_empty());
  }

  #[test]
  fn duplicate_ids_in_batch_resolve_to_the_later_entity() {
    let surface = Arc::new(RecordingSurface::default());
    let mut controller = AnnotationController::new(surface.clone());

    controller.update([peer("a", 1.0, 1.0), peer("a", 5.0, 5.0)]);

    assert_eq!(controller.live().len(), 1);
    assert_eq!(
      controller.live().get("a").unwrap().coordinate(),
      Coordinate::new(5.0, 5.0)
    );
    assert_eq!(surface.ops(), [SurfaceOp::Add(strings(&["a"]))]);
  }

  #[test]
  fn rejected_operation_does_not_abort_the_batch() {
    let surface = Arc::new(RecordingSurface::default());
    let mut controller = AnnotationController::new(surface.clone());
    controller.update([peer("a", 1.0, 1.0), peer("b", 2.0, 2.0)]);
    surface.clear_ops();
    surface.reject_adds(true);

    controller.update([peer("b", 2.5, 2.0), peer("c", 3.0, 3.0)]);

    assert_eq!(
      surface.ops(),
      [
        SurfaceOp::Remove(AnnotationKind::Peer, strings(&["a"])),
        SurfaceOp::Update(strings(&["b"])),
      ]
    );
    assert!(controller.live().contains("c"));
  }

  #[test]
  fn clear_removes_all_live_ids() {
    let surface = Arc::new(RecordingSurface::default());
    let mut controller = AnnotationController::new(surface.clone());
    controller.update([peer("a", 1.0, 1.0), peer("b", 2.0, 2.0)]);
    surface.clear_ops();

    controller.clear();

    assert_eq!(
      surface.ops(),
      [SurfaceOp::Remove(AnnotationKind::Peer, strings(&["a", "b"]))]
    );
    assert!(controller.live().is_empty());

    controller.clear();
    assert_eq!(surface.ops().len(), 1, "clearing an empty set is a no-op");
  }
}
