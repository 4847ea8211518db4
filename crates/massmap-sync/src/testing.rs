//! Test doubles shared by the unit tests in this crate.

use std::sync::{
  Mutex,
  atomic::{AtomicUsize, Ordering},
};

use massmap_core::{
  entity::{Annotation, AnnotationKind},
  error::{RideError, SurfaceError},
  ride::{NextRideQuery, Ride, RideQuery},
  surface::RenderSurface,
};

/// One call made against a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOp {
  Add(Vec<String>),
  Remove(AnnotationKind, Vec<String>),
  Update(Vec<String>),
}

/// A surface that records every call and can be told to reject some of them.
#[derive(Debug, Default)]
pub struct RecordingSurface {
  ops:         Mutex<Vec<SurfaceOp>>,
  reject_adds: Mutex<bool>,
}

impl RecordingSurface {
  pub fn ops(&self) -> Vec<SurfaceOp> { self.ops.lock().unwrap().clone() }

  pub fn clear_ops(&self) { self.ops.lock().unwrap().clear(); }

  pub fn reject_adds(&self, reject: bool) {
    *self.reject_adds.lock().unwrap() = reject;
  }

  fn ids(entities: &[Annotation]) -> Vec<String> {
    entities.iter().map(|e| e.identifier().to_string()).collect()
  }
}

impl RenderSurface for RecordingSurface {
  fn add_entities(&self, entities: &[Annotation]) -> Result<(), SurfaceError> {
    if *self.reject_adds.lock().unwrap() {
      return Err(SurfaceError::NotAttached);
    }
    self.ops.lock().unwrap().push(SurfaceOp::Add(Self::ids(entities)));
    Ok(())
  }

  fn remove_entities(
    &self,
    kind: AnnotationKind,
    ids: &[String],
  ) -> Result<(), SurfaceError> {
    self
      .ops
      .lock()
      .unwrap()
      .push(SurfaceOp::Remove(kind, ids.to_vec()));
    Ok(())
  }

  fn update_entities(
    &self,
    entities: &[Annotation],
  ) -> Result<(), SurfaceError> {
    self
      .ops
      .lock()
      .unwrap()
      .push(SurfaceOp::Update(Self::ids(entities)));
    Ok(())
  }
}

/// A ride query that always gives the same answer.
#[derive(Debug)]
pub struct StaticRides {
  response: Result<Vec<Ride>, RideError>,
  calls:    AtomicUsize,
}

impl StaticRides {
  pub fn new(response: Result<Vec<Ride>, RideError>) -> Self {
    Self {
      response,
      calls: AtomicUsize::new(0),
    }
  }

  pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl RideQuery for StaticRides {
  async fn rides(&self, _query: NextRideQuery) -> Result<Vec<Ride>, RideError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.response.clone()
  }
}
