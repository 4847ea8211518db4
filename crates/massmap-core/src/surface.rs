//! The `RenderSurface` trait: where annotations end up.
//!
//! The surface is an external collaborator (a map view, a log, a test
//! recorder). Controllers own *what* is on the map; the surface only draws it.

use std::sync::Arc;

use crate::{
  entity::{Annotation, AnnotationKind},
  error::SurfaceError,
};

/// A map that can show, move and hide annotations.
///
/// Implementations should tolerate adding an id that is already shown
/// (log and ignore rather than fail). Methods take `&self` so several
/// controllers can share one surface; implementations use interior
/// mutability where they need it.
pub trait RenderSurface {
  fn add_entities(&self, entities: &[Annotation]) -> Result<(), SurfaceError>;

  /// Remove the annotations of `kind` with the given ids. Removal is scoped by
  /// kind because a friend is also shown as a peer under the same id.
  fn remove_entities(
    &self,
    kind: AnnotationKind,
    ids: &[String],
  ) -> Result<(), SurfaceError>;

  fn update_entities(&self, entities: &[Annotation])
  -> Result<(), SurfaceError>;
}

impl<T: RenderSurface + ?Sized> RenderSurface for Arc<T> {
  fn add_entities(&self, entities: &[Annotation]) -> Result<(), SurfaceError> {
    (**self).add_entities(entities)
  }

  fn remove_entities(
    &self,
    kind: AnnotationKind,
    ids: &[String],
  ) -> Result<(), SurfaceError> {
    (**self).remove_entities(kind, ids)
  }

  fn update_entities(
    &self,
    entities: &[Annotation],
  ) -> Result<(), SurfaceError> {
    (**self).update_entities(entities)
  }
}
