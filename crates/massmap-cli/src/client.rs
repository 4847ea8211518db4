//! HTTP client for the ride API.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::DateTime;
use massmap_core::{
  error::RideError,
  location::Coordinate,
  ride::{NextRideQuery, Ride, RideQuery},
};
use reqwest::Client;
use serde::Deserialize;

/// A ride as the API returns it. Rides without a meeting point have no
/// coordinates and cannot be placed on the map.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RideRecord {
  id:        u64,
  title:     String,
  /// Unix seconds.
  date_time: i64,
  latitude:  Option<f64>,
  longitude: Option<f64>,
  location:  Option<String>,
}

impl RideRecord {
  fn into_ride(self) -> Option<Ride> {
    let coordinate = Coordinate::new(self.latitude?, self.longitude?);
    Some(Ride {
      id: self.id.to_string(),
      title: self.title,
      start_time: DateTime::from_timestamp(self.date_time, 0)?,
      coordinate,
      location: self.location,
    })
  }
}

/// Decode a `/api/ride` response body, dropping rides that cannot be placed.
pub fn parse_rides(body: &[u8]) -> Result<Vec<Ride>, RideError> {
  let records: Vec<RideRecord> =
    serde_json::from_slice(body).map_err(|e| RideError::Decode(e.to_string()))?;

  Ok(
    records
      .into_iter()
      .filter_map(|record| {
        let id = record.id;
        let ride = record.into_ride();
        if ride.is_none() {
          tracing::debug!(id, "skipping ride without position");
        }
        ride
      })
      .collect(),
  )
}

/// Async HTTP client for the ride API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct RideApiClient {
  client:   Client,
  base_url: String,
}

impl RideApiClient {
  pub fn new(base_url: impl Into<String>) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self {
      client,
      base_url: base_url.into(),
    })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.base_url.trim_end_matches('/'), path)
  }
}

impl RideQuery for RideApiClient {
  /// `GET /api/ride?centerLatitude=..&centerLongitude=..&radius=..&year=..&month=..`
  async fn rides(&self, query: NextRideQuery) -> Result<Vec<Ride>, RideError> {
    let resp = self
      .client
      .get(self.url("/ride"))
      .query(&query)
      .send()
      .await
      .map_err(|e| RideError::Network(e.to_string()))?;

    if !resp.status().is_success() {
      return Err(RideError::Network(format!(
        "GET /api/ride → {}",
        resp.status()
      )));
    }

    let body = resp
      .bytes()
      .await
      .map_err(|e| RideError::Network(e.to_string()))?;
    parse_rides(&body)
  }
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};

  use super::*;

  #[test]
  fn decodes_rides() {
    let body = br#"[
      {
        "id": 4711,
        "title": "Critical Mass Hamburg",
        "dateTime": 1711738800,
        "latitude": 53.5503,
        "longitude": 9.9929,
        "location": "Moorweide",
        "slug": "hamburg"
      }
    ]"#;

    let rides = parse_rides(body).unwrap();

    assert_eq!(rides.len(), 1);
    let ride = &rides[0];
    assert_eq!(ride.id, "4711");
    assert_eq!(ride.title, "Critical Mass Hamburg");
    assert_eq!(
      ride.start_time,
      Utc.with_ymd_and_hms(2024, 3, 29, 19, 0, 0).unwrap()
    );
    assert_eq!(ride.coordinate, Coordinate::new(53.5503, 9.9929));
    assert_eq!(ride.location.as_deref(), Some("Moorweide"));
  }

  #[test]
  fn rides_without_position_are_skipped() {
    let body = br#"[
      {"id": 1, "title": "No place yet", "dateTime": 1711738800, "latitude": null, "longitude": null},
      {"id": 2, "title": "Berlin", "dateTime": 1711738800, "latitude": 52.52, "longitude": 13.405}
    ]"#;

    let rides = parse_rides(body).unwrap();

    assert_eq!(rides.len(), 1);
    assert_eq!(rides[0].id, "2");
    assert_eq!(rides[0].location, None);
  }

  #[test]
  fn empty_list_is_not_an_error() {
    assert!(parse_rides(b"[]").unwrap().is_empty());
  }

  #[test]
  fn malformed_body_is_a_decode_error() {
    let err = parse_rides(b"<html>maintenance</html>").unwrap_err();
    assert!(matches!(err, RideError::Decode(_)));
  }

  #[test]
  fn url_joins_base_and_path() {
    let client = RideApiClient::new("https://criticalmass.in/").unwrap();
    assert_eq!(client.url("/ride"), "https://criticalmass.in/api/ride");
  }
}
