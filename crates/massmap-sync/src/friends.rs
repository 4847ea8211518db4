//! The friend annotation controller.
//!
//! Shows the subset of a position snapshot that belongs to verified friends.
//! It only runs while the `friends` feature is on and location access is
//! authorized; otherwise the snapshot is ignored and the live set is left as
//! it was. Callers that turn either gate off must call
//! [`FriendAnnotationController::clear`] themselves.

use std::sync::Arc;

use massmap_core::{
  entity::FriendEntity,
  feature::{Feature, FeatureFlags},
  friends::{FriendRegistry, FriendVerification},
  location::Location,
  permission::AccessPermission,
  surface::RenderSurface,
};

use crate::{controller::AnnotationController, reconcile::EntitySet};

pub struct FriendAnnotationController<R, S> {
  verification: FriendVerification<R>,
  inner:        AnnotationController<FriendEntity, S>,
}

impl<R: FriendRegistry, S: RenderSurface> FriendAnnotationController<R, S> {
  pub fn new(verification: FriendVerification<R>, surface: Arc<S>) -> Self {
    Self {
      verification,
      inner: AnnotationController::new(surface),
    }
  }

  pub fn live(&self) -> &EntitySet<FriendEntity> { self.inner.live() }

  pub fn verification(&self) -> &FriendVerification<R> { &self.verification }

  /// Display the friends among `locations`. Returns `false` when a gate is
  /// closed and nothing was done.
  pub fn display<'a, I>(
    &mut self,
    locations: I,
    flags: &FeatureFlags,
    permission: AccessPermission,
  ) -> bool
  where
    I: IntoIterator<Item = &'a Location>,
  {
    if !flags.is_active(Feature::Friends) {
      return false;
    }
    if !permission.is_authorized() {
      tracing::info!(
        %permission,
        "friend annotations cannot be displayed without location access"
      );
      return false;
    }

    let friends = locations
      .into_iter()
      .filter(|location| self.verification.is_friend(&location.id))
      .cloned()
      .map(FriendEntity::from)
      .collect::<Vec<_>>();
    self.inner.update(friends);
    true
  }

  pub fn clear(&mut self) { self.inner.clear(); }
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use massmap_core::{entity::AnnotationKind, location::Coordinate};

  use super::*;
  use crate::testing::{RecordingSurface, SurfaceOp};

  fn location(id: &str) -> Location {
    Location::new(id, Coordinate::new(52.5, 13.4), 0)
  }

  fn controller(
    friends: &[&str],
  ) -> (
    FriendAnnotationController<HashSet<String>, RecordingSurface>,
    Arc<RecordingSurface>,
  ) {
    let registry: HashSet<String> = friends.iter().map(|s| s.to_string()).collect();
    let surface = Arc::new(RecordingSurface::default());
    let controller = FriendAnnotationController::new(
      FriendVerification::new(registry),
      surface.clone(),
    );
    (controller, surface)
  }

  fn enabled() -> FeatureFlags { FeatureFlags::default().with(Feature::Friends, true) }

  #[test]
  fn only_friends_are_displayed() {
    let (mut controller, surface) = controller(&["alice"]);
    let batch = [location("alice"), location("stranger")];

    assert!(controller.display(&batch, &enabled(), AccessPermission::Authorized));

    assert_eq!(controller.live().ids().collect::<Vec<_>>(), ["alice"]);
    assert_eq!(surface.ops(), [SurfaceOp::Add(vec!["alice".to_string()])]);
  }

  #[test]
  fn feature_off_leaves_live_set_untouched() {
    let (mut controller, surface) = controller(&["alice"]);
    controller.display(&[location("alice")], &enabled(), AccessPermission::Authorized);
    surface.clear_ops();

    let shown = controller.display(&[] as &[Location], &FeatureFlags::default(), AccessPermission::Authorized);

    assert!(!shown);
    assert!(controller.live().contains("alice"));
    assert!(surface.ops().is_empty());
  }

  #[test]
  fn missing_permission_leaves_live_set_untouched() {
    let (mut controller, surface) = controller(&["alice"]);
    controller.display(&[location("alice")], &enabled(), AccessPermission::Authorized);
    surface.clear_ops();

    let shown = controller.display(&[] as &[Location], &enabled(), AccessPermission::Denied);

    assert!(!shown);
    assert!(controller.live().contains("alice"));
    assert!(surface.ops().is_empty());
  }

  #[test]
  fn explicit_clear_removes_friends() {
    let (mut controller, surface) = controller(&["alice"]);
    controller.display(&[location("alice")], &enabled(), AccessPermission::Authorized);
    surface.clear_ops();

    controller.clear();

    assert_eq!(
      surface.ops(),
      [SurfaceOp::Remove(AnnotationKind::Friend, vec!["alice".to_string()])]
    );
  }
}
