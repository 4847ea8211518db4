//! `massmap`: command-line front end for the map sync core.
//!
//! # Usage
//!
//! ```
//! massmap next-ride --lat 52.52 --lon 13.405 --radius 30
//! massmap prefs show
//! massmap prefs set observationMode true
//! massmap replay snapshots.json
//! ```

mod client;
mod replay;
mod settings;
mod surface;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use chrono::Utc;
use clap::{Parser, Subcommand};
use client::RideApiClient;
use massmap_core::{
  error::RideError,
  location::Coordinate,
  preferences::{PreferenceKey, Preferences},
};
use massmap_store_sqlite::SqliteStore;
use massmap_sync::NextRideLocator;
use settings::AppConfig;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "massmap", author, version, about = "Ride discovery and map sync")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "massmap.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Find the nearest upcoming ride around a position.
  NextRide {
    #[arg(long, allow_negative_numbers = true)]
    lat:    f64,
    #[arg(long, allow_negative_numbers = true)]
    lon:    f64,
    /// Search radius in km; stored for later lookups.
    #[arg(long)]
    radius: Option<u32>,
  },

  /// Inspect or change stored preferences.
  Prefs {
    #[command(subcommand)]
    action: PrefsAction,
  },

  /// Feed recorded position snapshots through a map session.
  Replay { file: PathBuf },
}

#[derive(Subcommand, Debug)]
enum PrefsAction {
  Show,
  Set { key: String, value: String },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = AppConfig::load(&cli.config)?;

  if let Some(parent) = cfg.store_path.parent() {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }
  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;
  let prefs = Preferences::new(Arc::new(store));

  if let Err(error) = prefs.record_usage(Utc::now().date_naive()).await {
    tracing::warn!(%error, "could not record usage");
  }

  match cli.command {
    Command::NextRide { lat, lon, radius } => {
      if let Some(radius) = radius {
        prefs
          .set_next_ride_radius(radius)
          .await
          .context("failed to store radius")?;
      }
      let client = RideApiClient::new(&cfg.api_base_url)?;
      let locator = NextRideLocator::new(client, prefs.clone());

      match locator.next_ride(Coordinate::new(lat, lon)).await {
        Ok(ride) => {
          println!("{}", ride.title_and_time());
          if let Some(location) = ride.location {
            println!("{location}");
          }
        }
        Err(RideError::NoRideFound) => {
          let radius = prefs.next_ride_radius().await?;
          println!("No upcoming ride within {radius} km.");
        }
        Err(error) => return Err(error).context("next ride lookup failed"),
      }
    }

    Command::Prefs {
      action: PrefsAction::Show,
    } => {
      for (key, value) in prefs.snapshot().await? {
        let shown = value.map_or_else(|| "-".to_string(), |v| v.to_string());
        println!("{:<28} {shown}", key.as_ref());
      }
    }

    Command::Prefs {
      action: PrefsAction::Set { key, value },
    } => {
      let key = PreferenceKey::parse(&key)?;
      let value = key.parse_value(&value)?;
      prefs.set_value(key, value).await?;
      tracing::info!(%key, "preference stored");
    }

    Command::Replay { file } => {
      let client = RideApiClient::new(&cfg.api_base_url)?;
      let summary = replay::replay(&file, &cfg, client, prefs).await?;
      println!(
        "{} batches replayed: {} peers, {} friends on the map",
        summary.batches, summary.peers, summary.friends
      );
    }
  }

  Ok(())
}
