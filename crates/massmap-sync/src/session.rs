//! The map session: single owner of all map state.
//!
//! Every input (position batches, location fixes, permission changes and the
//! results of ride lookups started by the session itself) arrives as a
//! [`MapEvent`] and is handled in order by [`MapSession::handle`]. Lookups
//! run on spawned tasks and post their result back on the same channel, so no
//! state is ever touched from two places.

use std::{collections::HashSet, sync::Arc};

use massmap_core::{
  entity::{FriendEntity, PeerEntity, RideEntity},
  error::RideError,
  feature::{Feature, FeatureFlags},
  friends::{FriendRegistry, FriendVerification},
  location::{Coordinate, Location},
  permission::AccessPermission,
  preferences::{KeyValueStore, Preferences},
  ride::{Ride, RideQuery},
  surface::RenderSurface,
};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, WeakUnboundedSender};

use crate::{
  clock::{Clock, SystemClock},
  controller::AnnotationController,
  friends::FriendAnnotationController,
  next_ride::NextRideLocator,
  reconcile::EntitySet,
};

// ─── Events ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum MapEvent {
  /// A fresh snapshot of every participant's position.
  PositionsChanged(Vec<Location>),
  /// The first location fix after the map came up.
  InitialLocation(Coordinate),
  LocationUpdated(Coordinate),
  /// Centre the map somewhere without looking anything up.
  FocusLocation(Coordinate),
  PermissionChanged(AccessPermission),
  /// Posted by the session when a ride lookup it started completes.
  RideLookupFinished(Result<Ride, RideError>),
}

/// What the presentation layer shows when a ride is found.
#[derive(Debug, Clone, PartialEq)]
pub struct RideNotice {
  pub ride_id:    String,
  pub message:    String,
  pub coordinate: Coordinate,
}

impl From<&Ride> for RideNotice {
  fn from(ride: &Ride) -> Self {
    Self {
      ride_id:    ride.id.clone(),
      message:    ride.title_and_time(),
      coordinate: ride.coordinate,
    }
  }
}

type Presenter<T> = Box<dyn FnMut(T) + Send>;

// ─── Session ─────────────────────────────────────────────────────────────────

pub struct MapSession<S, R, Q, K, C = SystemClock> {
  peers:          AnnotationController<PeerEntity, S>,
  friends:        FriendAnnotationController<R, S>,
  rides:          AnnotationController<RideEntity, S>,
  locator:        NextRideLocator<Q, K, C>,
  prefs:          Preferences<K>,
  flags:          FeatureFlags,
  permission:     AccessPermission,
  own_id:         Option<String>,
  events:         WeakUnboundedSender<MapEvent>,
  focus:          Option<Coordinate>,
  /// Ride ids whose notice has already been shown.
  presented:      HashSet<String>,
  present_ride:   Presenter<RideNotice>,
  present_error:  Presenter<RideError>,
}

impl<S, R, Q, K, C> MapSession<S, R, Q, K, C>
where
  S: RenderSurface,
  R: FriendRegistry,
  Q: RideQuery + 'static,
  K: KeyValueStore + 'static,
  C: Clock + 'static,
{
  /// Build a session rendering onto `surface`.
  ///
  /// `events` is the sending half of the channel the session will be driven
  /// from. The session only keeps a weak handle to it, so the channel closes
  /// once every external sender is gone and no lookup is pending.
  pub fn new(
    surface: Arc<S>,
    verification: FriendVerification<R>,
    locator: NextRideLocator<Q, K, C>,
    prefs: Preferences<K>,
    flags: FeatureFlags,
    events: &UnboundedSender<MapEvent>,
  ) -> Self {
    Self {
      peers: AnnotationController::new(surface.clone()),
      friends: FriendAnnotationController::new(verification, surface.clone()),
      rides: AnnotationController::new(surface),
      locator,
      prefs,
      flags,
      permission: AccessPermission::default(),
      own_id: None,
      events: events.downgrade(),
      focus: None,
      presented: HashSet::new(),
      present_ride: Box::new(|_| {}),
      present_error: Box::new(|_| {}),
    }
  }

  /// The local participant's id, withheld from the map in observation mode.
  pub fn with_own_id(mut self, own_id: impl Into<String>) -> Self {
    self.own_id = Some(own_id.into());
    self
  }

  pub fn on_ride_notice<F>(mut self, present: F) -> Self
  where
    F: FnMut(RideNotice) + Send + 'static,
  {
    self.present_ride = Box::new(present);
    self
  }

  pub fn on_error<F>(mut self, present: F) -> Self
  where
    F: FnMut(RideError) + Send + 'static,
  {
    self.present_error = Box::new(present);
    self
  }

  pub fn permission(&self) -> AccessPermission { self.permission }

  pub fn peers(&self) -> &EntitySet<PeerEntity> { self.peers.live() }

  pub fn friends(&self) -> &EntitySet<FriendEntity> { self.friends.live() }

  pub fn rides(&self) -> &EntitySet<RideEntity> { self.rides.live() }

  /// Where the map was last asked to centre.
  pub fn focus(&self) -> Option<Coordinate> { self.focus }

  /// The "enable GPS" overlay is shown only after access was refused.
  pub fn gps_overlay_visible(&self) -> bool {
    self.permission == AccessPermission::Denied
  }

  /// Centre on the current ride, if one is known. Returns the new focus.
  pub fn ride_focus(&mut self) -> Option<Coordinate> {
    let coordinate = self.locator.current_ride().map(|ride| ride.coordinate)?;
    self.focus = Some(coordinate);
    Some(coordinate)
  }

  /// Handle events until the channel closes.
  pub async fn run(&mut self, mut events: UnboundedReceiver<MapEvent>) {
    while let Some(event) = events.recv().await {
      self.handle(event).await;
    }
    tracing::debug!("map event channel closed");
  }

  pub async fn handle(&mut self, event: MapEvent) {
    match event {
      MapEvent::PositionsChanged(batch) => self.positions_changed(batch).await,
      MapEvent::InitialLocation(coordinate) => {
        self.focus = Some(coordinate);
        self.request_ride(coordinate);
      }
      MapEvent::LocationUpdated(coordinate) => self.request_ride(coordinate),
      MapEvent::FocusLocation(coordinate) => self.focus = Some(coordinate),
      MapEvent::PermissionChanged(permission) => {
        self.permission_changed(permission)
      }
      MapEvent::RideLookupFinished(Ok(ride)) => self.ride_found(ride),
      MapEvent::RideLookupFinished(Err(error)) => self.ride_failed(error),
    }
  }

  async fn positions_changed(&mut self, mut batch: Vec<Location>) {
    let observing = match self.prefs.observation_mode().await {
      Ok(observing) => observing,
      Err(error) => {
        tracing::warn!(%error, "could not read observation mode");
        false
      }
    };
    if observing && let Some(own_id) = &self.own_id {
      batch.retain(|location| &location.id != own_id);
    }

    self.peers.update(batch.iter().cloned().map(PeerEntity::from));
    self.friends.display(&batch, &self.flags, self.permission);
  }

  fn permission_changed(&mut self, permission: AccessPermission) {
    tracing::info!(%permission, "location permission changed");
    self.permission = permission;
    if !permission.is_authorized() {
      self.friends.clear();
    }
  }

  fn request_ride(&self, around: Coordinate) {
    if !self.flags.is_active(Feature::Events) {
      return;
    }
    let Some(events) = self.events.upgrade() else {
      tracing::debug!("not looking up rides, session is shutting down");
      return;
    };
    self.locator.get_next_ride(around, move |result| {
      let _ = events.send(MapEvent::RideLookupFinished(result));
    });
  }

  fn ride_found(&mut self, ride: Ride) {
    let notice = RideNotice::from(&ride);
    self.rides.update([RideEntity::from(ride)]);

    if !self.presented.insert(notice.ride_id.clone()) {
      return;
    }
    tracing::info!(ride = %notice.ride_id, "presenting next ride");
    (self.present_ride)(notice);
  }

  fn ride_failed(&mut self, error: RideError) {
    if self.flags.is_active(Feature::ErrorHandler) {
      (self.present_error)(error);
    } else {
      tracing::info!(%error, "no next ride to show");
    }
  }
}
