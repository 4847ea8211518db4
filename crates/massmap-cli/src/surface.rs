//! A rendering surface that writes every operation to the log.

use std::{
  collections::HashMap,
  sync::{Mutex, MutexGuard},
};

use massmap_core::{
  entity::{Annotation, AnnotationKind},
  error::SurfaceError,
  location::Coordinate,
  surface::RenderSurface,
};

type Shown = HashMap<(AnnotationKind, String), Coordinate>;

/// Logs annotation changes and remembers what would be on screen.
#[derive(Debug, Default)]
pub struct TracingSurface {
  shown: Mutex<Shown>,
}

impl TracingSurface {
  pub fn new() -> Self { Self::default() }

  fn shown(&self) -> MutexGuard<'_, Shown> {
    self
      .shown
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Number of annotations of `kind` currently shown.
  pub fn count(&self, kind: AnnotationKind) -> usize {
    self.shown().keys().filter(|(k, _)| *k == kind).count()
  }
}

#[cfg(test)]
impl TracingSurface {
  fn position(&self, kind: AnnotationKind, id: &str) -> Option<Coordinate> {
    self.shown().get(&(kind, id.to_string())).copied()
  }
}

impl RenderSurface for TracingSurface {
  fn add_entities(&self, entities: &[Annotation]) -> Result<(), SurfaceError> {
    let mut shown = self.shown();
    for annotation in entities {
      let key = (annotation.kind(), annotation.identifier().to_string());
      let coordinate = annotation.coordinate();
      if shown.insert(key, coordinate).is_some() {
        tracing::debug!(id = annotation.identifier(), "annotation already shown");
      }
      tracing::info!(
        kind = %annotation.kind(),
        id = annotation.identifier(),
        lat = coordinate.latitude,
        lon = coordinate.longitude,
        "add"
      );
    }
    Ok(())
  }

  fn remove_entities(
    &self,
    kind: AnnotationKind,
    ids: &[String],
  ) -> Result<(), SurfaceError> {
    let mut shown = self.shown();
    for id in ids {
      shown.remove(&(kind, id.clone()));
      tracing::info!(%kind, %id, "remove");
    }
    Ok(())
  }

  fn update_entities(&self, entities: &[Annotation]) -> Result<(), SurfaceError> {
    let mut shown = self.shown();
    for annotation in entities {
      let key = (annotation.kind(), annotation.identifier().to_string());
      let Some(slot) = shown.get_mut(&key) else {
        tracing::warn!(
          kind = %annotation.kind(),
          id = annotation.identifier(),
          "ignoring update for annotation that is not shown"
        );
        continue;
      };
      *slot = annotation.coordinate();
      tracing::info!(
        kind = %annotation.kind(),
        id = annotation.identifier(),
        lat = slot.latitude,
        lon = slot.longitude,
        "update"
      );
    }
    Ok(())
  }
}
