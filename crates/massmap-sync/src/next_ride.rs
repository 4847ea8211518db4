//! Next-ride lookup with request coalescing and a per-month cache.
//!
//! The locator is a small state machine:
//!
//! ```text
//! Idle ──▶ Fetching ──▶ Resolved ──▶ Idle
//!                  └──▶ Failed   ──▶ Idle
//! ```
//!
//! Only one query is ever in flight. A call that arrives while `Fetching`
//! waits for the in-flight result instead of issuing its own request. A
//! successful lookup is cached against the coordinate and calendar month it
//! was made for, and serves later calls within [`SAME_AREA_KM`] of that
//! coordinate; failures are never cached.

use std::{
  mem,
  sync::{Arc, Mutex, MutexGuard},
};

use chrono::{DateTime, Datelike, Utc};
use massmap_core::{
  error::RideError,
  location::{Coordinate, SAME_AREA_KM},
  preferences::{DEFAULT_NEXT_RIDE_RADIUS_KM, KeyValueStore, Preferences},
  ride::{NextRideQuery, Ride, RideQuery, nearest_upcoming},
};
use tokio::sync::oneshot;

use crate::clock::{Clock, SystemClock};

type Waiter = oneshot::Sender<Result<Ride, RideError>>;

/// Observable phase of the locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorPhase {
  Idle,
  Fetching,
  Resolved,
  Failed,
}

#[derive(Debug, Clone)]
struct CachedRide {
  center: Coordinate,
  year:   i32,
  month:  u32,
  ride:   Ride,
}

impl CachedRide {
  fn serves(&self, around: Coordinate, now: DateTime<Utc>) -> bool {
    self.center.same_area(&around)
      && self.year == now.year()
      && self.month == now.month()
  }
}

struct State {
  phase:      LocatorPhase,
  waiters:    Vec<Waiter>,
  cache:      Option<CachedRide>,
  /// Bumped by [`NextRideLocator::invalidate`]; a lookup started under an
  /// older generation is delivered but not cached.
  generation: u64,
}

fn lock_state(state: &Mutex<State>) -> MutexGuard<'_, State> {
  state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Armed for the duration of a lookup. If the lookup future is dropped before
/// it disarms (the query panicked or the task was aborted) the locator goes
/// back to `Idle` and every waiter gets an error instead of hanging.
struct AbortGuard<'a> {
  state: &'a Mutex<State>,
  armed: bool,
}

impl Drop for AbortGuard<'_> {
  fn drop(&mut self) {
    if !self.armed {
      return;
    }
    let waiters = {
      let mut state = lock_state(self.state);
      state.phase = LocatorPhase::Idle;
      mem::take(&mut state.waiters)
    };
    tracing::warn!(waiters = waiters.len(), "next ride lookup aborted");
    for waiter in waiters {
      let _ = waiter.send(Err(RideError::Network(
        "ride lookup aborted".to_string(),
      )));
    }
  }
}

struct Inner<Q, K, C> {
  query: Q,
  prefs: Preferences<K>,
  clock: C,
  state: Mutex<State>,
}

/// Finds the nearest upcoming ride around a coordinate.
///
/// Cheap to clone; clones share the same state machine and cache.
pub struct NextRideLocator<Q, K, C = SystemClock> {
  inner: Arc<Inner<Q, K, C>>,
}

impl<Q, K, C> Clone for NextRideLocator<Q, K, C> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<Q, K> NextRideLocator<Q, K, SystemClock>
where
  Q: RideQuery + 'static,
  K: KeyValueStore + 'static,
{
  pub fn new(query: Q, prefs: Preferences<K>) -> Self {
    Self::with_clock(query, prefs, SystemClock)
  }
}

impl<Q, K, C> NextRideLocator<Q, K, C>
where
  Q: RideQuery + 'static,
  K: KeyValueStore + 'static,
  C: Clock + 'static,
{
  pub fn with_clock(query: Q, prefs: Preferences<K>, clock: C) -> Self {
    Self {
      inner: Arc::new(Inner {
        query,
        prefs,
        clock,
        state: Mutex::new(State {
          phase:      LocatorPhase::Idle,
          waiters:    Vec::new(),
          cache:      None,
          generation: 0,
        }),
      }),
    }
  }

  fn lock(&self) -> MutexGuard<'_, State> { lock_state(&self.inner.state) }

  pub fn phase(&self) -> LocatorPhase { self.lock().phase }

  /// The most recently resolved ride, if it is still cached.
  pub fn current_ride(&self) -> Option<Ride> {
    self.lock().cache.as_ref().map(|c| c.ride.clone())
  }

  /// Drop the cached ride. A lookup already in flight still completes for its
  /// waiters, but its result is not cached.
  pub fn invalidate(&self) {
    let mut state = self.lock();
    state.generation += 1;
    state.cache = None;
  }

  /// Look up the next ride around `around`.
  ///
  /// Served from cache when a ride was already found near `around` in the
  /// current month; otherwise joins the in-flight lookup or starts a new one. The lookup itself runs on a spawned task, so dropping
  /// this future does not leave the locator stuck in `Fetching`.
  pub async fn next_ride(&self, around: Coordinate) -> Result<Ride, RideError> {
    let now = self.inner.clock.now();

    let (rx, start) = {
      let mut state = self.lock();
      if let Some(cached) = state.cache.as_ref().filter(|c| c.serves(around, now)) {
        tracing::debug!(ride = %cached.ride.id, "next ride served from cache");
        return Ok(cached.ride.clone());
      }

      let (tx, rx) = oneshot::channel();
      state.waiters.push(tx);

      if state.phase == LocatorPhase::Fetching {
        tracing::debug!("joining in-flight next ride lookup");
        (rx, None)
      } else {
        state.phase = LocatorPhase::Fetching;
        (rx, Some(state.generation))
      }
    };

    if let Some(generation) = start {
      let locator = self.clone();
      tokio::spawn(async move { locator.fetch(around, now, generation).await });
    }

    rx.await.unwrap_or_else(|_| {
      Err(RideError::Network("ride lookup was abandoned".to_string()))
    })
  }

  /// Callback form of [`Self::next_ride`]: runs the lookup on a spawned task
  /// and hands the result to `completion`.
  pub fn get_next_ride<F>(&self, around: Coordinate, completion: F)
  where
    F: FnOnce(Result<Ride, RideError>) + Send + 'static,
  {
    let locator = self.clone();
    tokio::spawn(async move { completion(locator.next_ride(around).await) });
  }

  async fn fetch(&self, around: Coordinate, now: DateTime<Utc>, generation: u64) {
    let mut guard = AbortGuard {
      state: &self.inner.state,
      armed: true,
    };
    let result = self.lookup(around, now).await;
    guard.armed = false;

    let waiters = {
      let mut state = self.lock();
      match &result {
        Ok(ride) => {
          state.phase = LocatorPhase::Resolved;
          if state.generation == generation {
            state.cache = Some(CachedRide {
              center: around,
              year:   now.year(),
              month:  now.month(),
              ride:   ride.clone(),
            });
          } else {
            tracing::debug!(ride = %ride.id, "not caching ride from stale lookup");
          }
        }
        Err(error) => {
          state.phase = LocatorPhase::Failed;
          tracing::warn!(%error, "next ride lookup failed");
        }
      }
      mem::take(&mut state.waiters)
    };

    for waiter in waiters {
      // The caller may have stopped waiting; that is fine.
      let _ = waiter.send(result.clone());
    }

    let mut state = self.lock();
    if matches!(state.phase, LocatorPhase::Resolved | LocatorPhase::Failed) {
      state.phase = LocatorPhase::Idle;
    }
  }

  async fn lookup(
    &self,
    around: Coordinate,
    now: DateTime<Utc>,
  ) -> Result<Ride, RideError> {
    let radius_km = match self.inner.prefs.next_ride_radius().await {
      Ok(radius) => radius,
      Err(error) => {
        tracing::warn!(%error, "could not read search radius, using default");
        DEFAULT_NEXT_RIDE_RADIUS_KM
      }
    };

    let query = NextRideQuery::new(around, radius_km, now);
    tracing::debug!(?query, "querying rides");
    let rides = self.inner.query.rides(query).await?;
    nearest_upcoming(rides, around, now).ok_or(RideError::NoRideFound)
  }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
