//! Replay recorded position snapshots through a map session.

use std::{collections::HashSet, path::Path, sync::Arc};

use anyhow::Context as _;
use massmap_core::{
  entity::AnnotationKind,
  friends::FriendVerification,
  location::Location,
  permission::AccessPermission,
  preferences::{KeyValueStore, Preferences},
  ride::RideQuery,
};
use massmap_sync::{MapEvent, MapSession, NextRideLocator};
use tokio::sync::mpsc;

use crate::{settings::AppConfig, surface::TracingSurface};

/// Decode a replay file: a JSON array of batches, each an array of locations.
pub fn parse_batches(raw: &str) -> anyhow::Result<Vec<Vec<Location>>> {
  serde_json::from_str(raw).context("replay file is not an array of location batches")
}

/// What was on the map after the last batch.
#[derive(Debug, PartialEq, Eq)]
pub struct ReplaySummary {
  pub batches: usize,
  pub peers:   usize,
  pub friends: usize,
}

pub async fn replay<Q, K>(
  file: &Path,
  cfg: &AppConfig,
  query: Q,
  prefs: Preferences<K>,
) -> anyhow::Result<ReplaySummary>
where
  Q: RideQuery + 'static,
  K: KeyValueStore + Clone + 'static,
{
  let raw = tokio::fs::read_to_string(file)
    .await
    .with_context(|| format!("reading replay file {}", file.display()))?;
  let batches = parse_batches(&raw)?;
  run_batches(batches, cfg, query, prefs).await
}

pub async fn run_batches<Q, K>(
  batches: Vec<Vec<Location>>,
  cfg: &AppConfig,
  query: Q,
  prefs: Preferences<K>,
) -> anyhow::Result<ReplaySummary>
where
  Q: RideQuery + 'static,
  K: KeyValueStore + Clone + 'static,
{
  let surface = Arc::new(TracingSurface::new());
  let registry: HashSet<String> = cfg.friends.iter().cloned().collect();
  let locator = NextRideLocator::new(query, prefs.clone());

  let (tx, rx) = mpsc::unbounded_channel();
  let mut session = MapSession::new(
    surface.clone(),
    FriendVerification::new(registry),
    locator,
    prefs,
    cfg.features,
    &tx,
  );
  if let Some(own_id) = &cfg.own_id {
    session = session.with_own_id(own_id.clone());
  }

  let count = batches.len();
  tx.send(MapEvent::PermissionChanged(AccessPermission::Authorized))
    .context("map session stopped")?;
  for batch in batches {
    tx.send(MapEvent::PositionsChanged(batch))
      .context("map session stopped")?;
  }
  drop(tx);

  session.run(rx).await;

  Ok(ReplaySummary {
    batches: count,
    peers:   surface.count(AnnotationKind::Peer),
    friends: surface.count(AnnotationKind::Friend),
  })
}

#[cfg(test)]
mod tests {
  use std::{path::PathBuf, sync::Arc};

  use massmap_core::{
    error::RideError,
    feature::FeatureFlags,
    location::Coordinate,
    preferences::MemoryStore,
    ride::{NextRideQuery, Ride},
  };

  use super::*;

  struct NoRides;

  impl RideQuery for NoRides {
    async fn rides(&self, _query: NextRideQuery) -> Result<Vec<Ride>, RideError> {
      Ok(Vec::new())
    }
  }

  fn config(friends: &[&str]) -> AppConfig {
    AppConfig {
      api_base_url: "http://localhost".to_string(),
      store_path:   PathBuf::from("/tmp/unused.sqlite"),
      own_id:       Some("me".to_string()),
      friends:      friends.iter().map(|s| s.to_string()).collect(),
      features:     FeatureFlags {
        friends: true,
        ..FeatureFlags::default()
      },
    }
  }

  #[test]
  fn parses_batches() {
    let raw = r#"[
      [{"id": "a", "latitude": 52.5, "longitude": 13.4, "timestamp": 1}],
      []
    ]"#;
    let batches = parse_batches(raw).unwrap();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0][0].id, "a");
    assert!(batches[1].is_empty());
  }

  #[test]
  fn rejects_a_flat_list() {
    let raw = r#"[{"id": "a", "latitude": 52.5, "longitude": 13.4, "timestamp": 1}]"#;
    assert!(parse_batches(raw).is_err());
  }

  #[tokio::test]
  async fn last_batch_determines_the_map() {
    let loc = |id: &str, lat| Location::new(id, Coordinate::new(lat, 13.4), 0);
    let batches = vec![
      vec![loc("alice", 52.5), loc("bob", 52.6), loc("carol", 52.7)],
      vec![loc("alice", 52.51), loc("dave", 52.8)],
    ];
    let prefs = Preferences::new(Arc::new(MemoryStore::new()));

    let summary = run_batches(batches, &config(&["alice", "bob"]), NoRides, prefs)
      .await
      .unwrap();

    assert_eq!(
      summary,
      ReplaySummary {
        batches: 2,
        peers:   2,
        friends: 1,
      }
    );
  }
}
