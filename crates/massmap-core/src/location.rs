//! Location snapshots, the unit delivered by the position poller.
//!
//! A [`Location`] is an immutable report of where one participant was at a
//! given moment. Identity is the participant id: two locations with the same
//! id describe the same entity, whatever their coordinates.

use serde::{Deserialize, Serialize};

/// Mean earth radius in kilometres, as used by the haversine formula.
const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Two coordinates closer than this are treated as the same place when
/// deciding whether a ride lookup can be reused.
pub const SAME_AREA_KM: f64 = 1.0;

// ─── Coordinate ──────────────────────────────────────────────────────────────

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
  pub latitude:  f64,
  pub longitude: f64,
}

impl Coordinate {
  pub fn new(latitude: f64, longitude: f64) -> Self {
    Self {
      latitude,
      longitude,
    }
  }

  /// Great-circle distance to `other` in kilometres.
  pub fn distance_km(&self, other: &Coordinate) -> f64 {
    let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (other.longitude - self.longitude).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
      + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
  }

  /// Whether `other` lies within [`SAME_AREA_KM`] of this coordinate.
  ///
  /// Distance based rather than grid based, so two points a few metres apart
  /// always match, wherever they fall relative to a grid line.
  pub fn same_area(&self, other: &Coordinate) -> bool {
    self.distance_km(other) < SAME_AREA_KM
  }
}

// ─── Location ────────────────────────────────────────────────────────────────

/// One participant's reported position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
  pub id:        String,
  pub latitude:  f64,
  pub longitude: f64,
  /// Unix seconds at which the position was reported.
  pub timestamp: i64,
  #[serde(default)]
  pub name:      Option<String>,
  #[serde(default)]
  pub color:     Option<String>,
}

impl Location {
  pub fn new(
    id: impl Into<String>,
    coordinate: Coordinate,
    timestamp: i64,
  ) -> Self {
    Self {
      id: id.into(),
      latitude: coordinate.latitude,
      longitude: coordinate.longitude,
      timestamp,
      name: None,
      color: None,
    }
  }

  pub fn coordinate(&self) -> Coordinate {
    Coordinate::new(self.latitude, self.longitude)
  }
}
