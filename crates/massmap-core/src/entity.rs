//! Map-placeable entities.
//!
//! Everything drawn on the map implements [`Entity`]. The concrete kinds are
//! wrapped in the tagged [`Annotation`] enum when they cross into the
//! rendering surface, so the surface never needs to inspect runtime types.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::{
  location::{Coordinate, Location},
  ride::Ride,
};

/// The kind of marker an entity is rendered as.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AnnotationKind {
  Peer,
  Friend,
  Ride,
}

/// Anything with a stable identifier and a position on the map.
///
/// `name` and `color` take part in change detection: the reconciler treats an
/// entity as updated when its coordinate, name or color differ.
pub trait Entity: Clone + Debug + Into<Annotation> {
  const KIND: AnnotationKind;

  fn identifier(&self) -> &str;
  fn coordinate(&self) -> Coordinate;
  fn name(&self) -> Option<&str> { None }
  fn color(&self) -> Option<&str> { None }

  /// Whether `self` and `other` would render identically.
  fn same_appearance(&self, other: &Self) -> bool {
    self.coordinate() == other.coordinate()
      && self.name() == other.name()
      && self.color() == other.color()
  }
}

// ─── Location-backed entities ────────────────────────────────────────────────

/// An anonymous rider.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerEntity {
  pub location: Location,
}

/// A rider whose id is in the caller's friend registry.
#[derive(Debug, Clone, PartialEq)]
pub struct FriendEntity {
  pub location: Location,
}

impl From<Location> for PeerEntity {
  fn from(location: Location) -> Self { Self { location } }
}

impl From<Location> for FriendEntity {
  fn from(location: Location) -> Self { Self { location } }
}

impl Entity for PeerEntity {
  const KIND: AnnotationKind = AnnotationKind::Peer;

  fn identifier(&self) -> &str { &self.location.id }
  fn coordinate(&self) -> Coordinate { self.location.coordinate() }
  fn name(&self) -> Option<&str> { self.location.name.as_deref() }
  fn color(&self) -> Option<&str> { self.location.color.as_deref() }
}

impl Entity for FriendEntity {
  const KIND: AnnotationKind = AnnotationKind::Friend;

  fn identifier(&self) -> &str { &self.location.id }
  fn coordinate(&self) -> Coordinate { self.location.coordinate() }
  fn name(&self) -> Option<&str> { self.location.name.as_deref() }
  fn color(&self) -> Option<&str> { self.location.color.as_deref() }
}

// ─── Ride marker ─────────────────────────────────────────────────────────────

/// The marker for the next organized ride.
#[derive(Debug, Clone, PartialEq)]
pub struct RideEntity {
  pub ride: Ride,
}

impl From<Ride> for RideEntity {
  fn from(ride: Ride) -> Self { Self { ride } }
}

impl Entity for RideEntity {
  const KIND: AnnotationKind = AnnotationKind::Ride;

  fn identifier(&self) -> &str { &self.ride.id }
  fn coordinate(&self) -> Coordinate { self.ride.coordinate }
  fn name(&self) -> Option<&str> { Some(&self.ride.title) }

  /// A rescheduled ride has to be redrawn even if it did not move.
  fn same_appearance(&self, other: &Self) -> bool {
    self.coordinate() == other.coordinate()
      && self.ride.title == other.ride.title
      && self.ride.start_time == other.ride.start_time
      && self.ride.location == other.ride.location
  }
}

// ─── Annotation ──────────────────────────────────────────────────────────────

/// An entity tagged with its kind, as handed to the rendering surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
  Peer(PeerEntity),
  Friend(FriendEntity),
  Ride(RideEntity),
}

impl Annotation {
  pub fn kind(&self) -> AnnotationKind {
    match self {
      Self::Peer(_) => AnnotationKind::Peer,
      Self::Friend(_) => AnnotationKind::Friend,
      Self::Ride(_) => AnnotationKind::Ride,
    }
  }

  pub fn identifier(&self) -> &str {
    match self {
      Self::Peer(e) => e.identifier(),
      Self::Friend(e) => e.identifier(),
      Self::Ride(e) => e.identifier(),
    }
  }

  pub fn coordinate(&self) -> Coordinate {
    match self {
      Self::Peer(e) => e.coordinate(),
      Self::Friend(e) => e.coordinate(),
      Self::Ride(e) => e.coordinate(),
    }
  }
}

impl From<PeerEntity> for Annotation {
  fn from(e: PeerEntity) -> Self { Self::Peer(e) }
}

impl From<FriendEntity> for Annotation {
  fn from(e: FriendEntity) -> Self { Self::Friend(e) }
}

impl From<RideEntity> for Annotation {
  fn from(e: RideEntity) -> Self { Self::Ride(e) }
}
