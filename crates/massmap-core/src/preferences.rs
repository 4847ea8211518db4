//! User preferences on top of an injected key-value store.
//!
//! The storage format belongs to the [`KeyValueStore`] implementation. This
//! module only knows the named scalar fields and their defaults. A stored
//! value of the wrong JSON type reads back as the field's default, the same
//! way a missing value does.

use std::{
  collections::HashMap,
  convert::Infallible,
  future::Future,
  str::FromStr,
  sync::{Arc, Mutex},
};

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::{Error, Result};

/// Search radius used when none has been stored.
pub const DEFAULT_NEXT_RIDE_RADIUS_KM: u32 = 20;

// ─── Store trait ─────────────────────────────────────────────────────────────

/// Abstraction over a persistent key-value store holding JSON scalars.
pub trait KeyValueStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<Value>, Self::Error>> + Send + 'a;

  fn set<'a>(
    &'a self,
    key: &'a str,
    value: Value,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn remove<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

impl<T: KeyValueStore> KeyValueStore for Arc<T> {
  type Error = T::Error;

  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<Value>, Self::Error>> + Send + 'a {
    (**self).get(key)
  }

  fn set<'a>(
    &'a self,
    key: &'a str,
    value: Value,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a {
    (**self).set(key, value)
  }

  fn remove<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a {
    (**self).remove(key)
  }
}

/// Volatile store for tests and for running without a database.
#[derive(Debug, Default)]
pub struct MemoryStore {
  values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn with_values<T>(&self, f: impl FnOnce(&mut HashMap<String, Value>) -> T) -> T {
    match self.values.lock() {
      Ok(mut guard) => f(&mut guard),
      Err(poisoned) => f(&mut poisoned.into_inner()),
    }
  }
}

impl KeyValueStore for MemoryStore {
  type Error = Infallible;

  async fn get(&self, key: &str) -> Result<Option<Value>, Infallible> {
    Ok(self.with_values(|v| v.get(key).cloned()))
  }

  async fn set(&self, key: &str, value: Value) -> Result<(), Infallible> {
    self.with_values(|v| v.insert(key.to_string(), value));
    Ok(())
  }

  async fn remove(&self, key: &str) -> Result<(), Infallible> {
    self.with_values(|v| v.remove(key));
    Ok(())
  }
}

// ─── Keys ────────────────────────────────────────────────────────────────────

/// Every preference the core reads or writes. The string form is the storage
/// key.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr,
  EnumIter,
)]
#[strum(serialize_all = "camelCase")]
pub enum PreferenceKey {
  Username,
  NextRideRadius,
  ObservationMode,
  LastMessageReadTimeInterval,
  Theme,
  LastDayUsed,
  DaysCounter,
  UsesCounter,
  LastRatedVersion,
}

impl PreferenceKey {
  /// Parse a value typed on the command line into the JSON shape stored for
  /// this key.
  pub fn parse_value(&self, raw: &str) -> Result<Value> {
    let invalid = || Error::InvalidPreference {
      key:   self.to_string(),
      value: raw.to_string(),
    };
    let value = match self {
      Self::Username | Self::Theme | Self::LastRatedVersion => {
        Value::String(raw.to_string())
      }
      Self::ObservationMode => {
        Value::Bool(bool::from_str(raw).map_err(|_| invalid())?)
      }
      Self::NextRideRadius | Self::DaysCounter | Self::UsesCounter => {
        Value::from(u64::from_str(raw).map_err(|_| invalid())?)
      }
      Self::LastMessageReadTimeInterval => {
        Value::from(f64::from_str(raw).map_err(|_| invalid())?)
      }
      Self::LastDayUsed => {
        let day = NaiveDate::from_str(raw).map_err(|_| invalid())?;
        Value::String(day.to_string())
      }
    };
    Ok(value)
  }
}

impl PreferenceKey {
  /// Look up a key by its storage name.
  pub fn parse(name: &str) -> Result<Self> {
    Self::from_str(name).map_err(|_| Error::UnknownPreference(name.to_string()))
  }
}

// ─── Typed view ──────────────────────────────────────────────────────────────

/// Typed accessors over a [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct Preferences<K> {
  store: K,
}

impl<K: KeyValueStore> Preferences<K> {
  pub fn new(store: K) -> Self { Self { store } }

  pub fn store(&self) -> &K { &self.store }

  async fn read(&self, key: PreferenceKey) -> Result<Option<Value>, K::Error> {
    self.store.get(key.as_ref()).await
  }

  async fn write(
    &self,
    key: PreferenceKey,
    value: Option<Value>,
  ) -> Result<(), K::Error> {
    match value {
      Some(v) => self.store.set(key.as_ref(), v).await,
      None => self.store.remove(key.as_ref()).await,
    }
  }

  async fn read_string(
    &self,
    key: PreferenceKey,
  ) -> Result<Option<String>, K::Error> {
    Ok(match self.read(key).await? {
      Some(Value::String(s)) => Some(s),
      Some(other) => {
        tracing::debug!(%key, ?other, "ignoring non-string preference");
        None
      }
      None => None,
    })
  }

  async fn read_u64(&self, key: PreferenceKey) -> Result<u64, K::Error> {
    Ok(self.read(key).await?.and_then(|v| v.as_u64()).unwrap_or(0))
  }

  // ── Identity ────────────────────────────────────────────────────────────

  pub async fn username(&self) -> Result<Option<String>, K::Error> {
    self.read_string(PreferenceKey::Username).await
  }

  pub async fn set_username(
    &self,
    username: Option<String>,
  ) -> Result<(), K::Error> {
    self
      .write(PreferenceKey::Username, username.map(Value::String))
      .await
  }

  // ── Map ─────────────────────────────────────────────────────────────────

  /// Search radius for the next-ride lookup in kilometres. Zero or unset
  /// means [`DEFAULT_NEXT_RIDE_RADIUS_KM`].
  pub async fn next_ride_radius(&self) -> Result<u32, K::Error> {
    let stored = self.read_u64(PreferenceKey::NextRideRadius).await?;
    Ok(match u32::try_from(stored) {
      Ok(0) | Err(_) => DEFAULT_NEXT_RIDE_RADIUS_KM,
      Ok(radius) => radius,
    })
  }

  pub async fn set_next_ride_radius(&self, radius_km: u32) -> Result<(), K::Error> {
    self
      .write(PreferenceKey::NextRideRadius, Some(Value::from(radius_km)))
      .await
  }

  /// Whether the user's own position is withheld from the map.
  pub async fn observation_mode(&self) -> Result<bool, K::Error> {
    Ok(
      self
        .read(PreferenceKey::ObservationMode)
        .await?
        .and_then(|v| v.as_bool())
        .unwrap_or(false),
    )
  }

  pub async fn set_observation_mode(&self, enabled: bool) -> Result<(), K::Error> {
    self
      .write(PreferenceKey::ObservationMode, Some(Value::Bool(enabled)))
      .await
  }

  pub async fn theme(&self) -> Result<Option<String>, K::Error> {
    self.read_string(PreferenceKey::Theme).await
  }

  pub async fn set_theme(&self, theme: Option<String>) -> Result<(), K::Error> {
    self.write(PreferenceKey::Theme, theme.map(Value::String)).await
  }

  // ── Chat ────────────────────────────────────────────────────────────────

  /// Timestamp of the newest chat message the user has seen. Stored as
  /// fractional unix seconds.
  pub async fn last_message_read(
    &self,
  ) -> Result<Option<DateTime<Utc>>, K::Error> {
    let secs = self
      .read(PreferenceKey::LastMessageReadTimeInterval)
      .await?
      .and_then(|v| v.as_f64())
      .filter(|s| *s > 0.0);
    Ok(secs.and_then(|s| {
      DateTime::from_timestamp(s.trunc() as i64, (s.fract() * 1e9) as u32)
    }))
  }

  pub async fn set_last_message_read(
    &self,
    at: DateTime<Utc>,
  ) -> Result<(), K::Error> {
    let secs = at.timestamp() as f64 + f64::from(at.timestamp_subsec_nanos()) / 1e9;
    self
      .write(PreferenceKey::LastMessageReadTimeInterval, Some(Value::from(secs)))
      .await
  }

  // ── Usage counters ──────────────────────────────────────────────────────

  pub async fn last_day_used(&self) -> Result<Option<NaiveDate>, K::Error> {
    Ok(
      self
        .read_string(PreferenceKey::LastDayUsed)
        .await?
        .and_then(|s| NaiveDate::from_str(&s).ok()),
    )
  }

  pub async fn days_counter(&self) -> Result<u64, K::Error> {
    self.read_u64(PreferenceKey::DaysCounter).await
  }

  pub async fn uses_counter(&self) -> Result<u64, K::Error> {
    self.read_u64(PreferenceKey::UsesCounter).await
  }

  /// Count one launch on `today`. The day counter only advances on the first
  /// launch of a given day.
  pub async fn record_usage(&self, today: NaiveDate) -> Result<(), K::Error> {
    let uses = self.uses_counter().await? + 1;
    self
      .write(PreferenceKey::UsesCounter, Some(Value::from(uses)))
      .await?;

    if self.last_day_used().await? != Some(today) {
      let days = self.days_counter().await? + 1;
      self
        .write(PreferenceKey::DaysCounter, Some(Value::from(days)))
        .await?;
      self
        .write(
          PreferenceKey::LastDayUsed,
          Some(Value::String(today.to_string())),
        )
        .await?;
    }
    Ok(())
  }

  pub async fn last_rated_version(&self) -> Result<Option<String>, K::Error> {
    self.read_string(PreferenceKey::LastRatedVersion).await
  }

  pub async fn set_last_rated_version(
    &self,
    version: Option<String>,
  ) -> Result<(), K::Error> {
    self
      .write(PreferenceKey::LastRatedVersion, version.map(Value::String))
      .await
  }

  // ── Raw access ──────────────────────────────────────────────────────────

  /// The stored value for every known key, in declaration order.
  pub async fn snapshot(
    &self,
  ) -> Result<Vec<(PreferenceKey, Option<Value>)>, K::Error> {
    use strum::IntoEnumIterator;

    let mut out = Vec::new();
    for key in PreferenceKey::iter() {
      out.push((key, self.read(key).await?));
    }
    Ok(out)
  }

  pub async fn set_value(
    &self,
    key: PreferenceKey,
    value: Value,
  ) -> Result<(), K::Error> {
    self.write(key, Some(value)).await
  }
}
