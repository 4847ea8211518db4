//! Organized ride events and the query collaborator that finds them.

use std::future::Future;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::RideError, location::Coordinate};

// ─── Ride ────────────────────────────────────────────────────────────────────

/// An upcoming organized ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ride {
  pub id:         String,
  pub title:      String,
  pub start_time: DateTime<Utc>,
  pub coordinate: Coordinate,
  /// Free-text meeting point, if the organizer gave one.
  pub location:   Option<String>,
}

impl Ride {
  /// Title and start time as shown in the ride notice.
  pub fn title_and_time(&self) -> String {
    format!("{} - {}", self.title, self.start_time.format("%d.%m.%Y %H:%M"))
  }
}

/// Pick the ride to surface from a list of candidates: the nearest one to
/// `around` that has not started before `now`. Ties go to the earlier start.
pub fn nearest_upcoming(
  rides: Vec<Ride>,
  around: Coordinate,
  now: DateTime<Utc>,
) -> Option<Ride> {
  rides
    .into_iter()
    .filter(|ride| ride.start_time >= now)
    .map(|ride| (ride.coordinate.distance_km(&around), ride))
    .min_by(|(da, a), (db, b)| {
      da.total_cmp(db).then_with(|| a.start_time.cmp(&b.start_time))
    })
    .map(|(_, ride)| ride)
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Parameters sent to the ride lookup collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextRideQuery {
  pub center_latitude:  f64,
  pub center_longitude: f64,
  #[serde(rename = "radius")]
  pub radius_km:        u32,
  pub year:             i32,
  pub month:            u32,
}

impl NextRideQuery {
  /// Build a query around `center` for the calendar month containing `now`.
  pub fn new(center: Coordinate, radius_km: u32, now: DateTime<Utc>) -> Self {
    Self {
      center_latitude: center.latitude,
      center_longitude: center.longitude,
      radius_km,
      year: now.year(),
      month: now.month(),
    }
  }
}

/// Abstraction over the service that lists rides for a region and month.
///
/// Implementations return the candidates in whatever order the service
/// produces them; selecting the ride to show is left to the caller.
pub trait RideQuery: Send + Sync {
  fn rides(
    &self,
    query: NextRideQuery,
  ) -> impl Future<Output = Result<Vec<Ride>, RideError>> + Send + '_;
}

impl<T: RideQuery> RideQuery for std::sync::Arc<T> {
  fn rides(
    &self,
    query: NextRideQuery,
  ) -> impl Future<Output = Result<Vec<Ride>, RideError>> + Send + '_ {
    (**self).rides(query)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn ride(id: &str, coordinate: Coordinate, start: DateTime<Utc>) -> Ride {
    Ride {
      id: id.into(),
      title: format!("Ride {id}"),
      start_time: start,
      coordinate,
      location: None,
    }
  }

  #[test]
  fn picks_nearest_future_ride() {
    let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
    let later = Utc.with_ymd_and_hms(2024, 3, 29, 19, 0, 0).unwrap();
    let around = Coordinate::new(52.52, 13.405);

    let rides = vec![
      ride("far", Coordinate::new(53.55, 9.99), later),
      ride("near", Coordinate::new(52.51, 13.39), later),
    ];
    let picked = nearest_upcoming(rides, around, now).unwrap();
    assert_eq!(picked.id, "near");
  }

  #[test]
  fn past_rides_are_skipped() {
    let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
    let past = Utc.with_ymd_and_hms(2024, 3, 1, 19, 0, 0).unwrap();
    let around = Coordinate::new(52.52, 13.405);

    let rides = vec![ride("gone", around, past)];
    assert!(nearest_upcoming(rides, around, now).is_none());
  }

  #[test]
  fn equal_distance_prefers_earlier_start() {
    let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
    let first = Utc.with_ymd_and_hms(2024, 3, 15, 19, 0, 0).unwrap();
    let second = Utc.with_ymd_and_hms(2024, 3, 29, 19, 0, 0).unwrap();
    let around = Coordinate::new(52.52, 13.405);

    let rides = vec![ride("b", around, second), ride("a", around, first)];
    assert_eq!(nearest_upcoming(rides, around, now).unwrap().id, "a");
  }

  #[test]
  fn query_uses_month_of_now() {
    let now = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
    let q = NextRideQuery::new(Coordinate::new(52.52, 13.405), 20, now);
    assert_eq!((q.year, q.month, q.radius_km), (2024, 4, 20));
  }

  #[test]
  fn title_and_time_formats_start() {
    let start = Utc.with_ymd_and_hms(2024, 3, 29, 19, 0, 0).unwrap();
    let r = ride("x", Coordinate::new(0.0, 0.0), start);
    assert_eq!(r.title_and_time(), "Ride x - 29.03.2024 19:00");
  }
}
