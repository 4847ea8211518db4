//! Friend verification.
//!
//! The friend registry is owned elsewhere (pairing, QR exchange and so on);
//! this module only answers "is this participant a friend?".

use std::{
  collections::{BTreeSet, HashSet},
  sync::{Arc, RwLock},
};

/// Read-only view over the set of friend ids.
pub trait FriendRegistry {
  fn contains(&self, id: &str) -> bool;
}

impl FriendRegistry for HashSet<String> {
  fn contains(&self, id: &str) -> bool { HashSet::contains(self, id) }
}

impl FriendRegistry for BTreeSet<String> {
  fn contains(&self, id: &str) -> bool { BTreeSet::contains(self, id) }
}

impl<T: FriendRegistry + ?Sized> FriendRegistry for Arc<T> {
  fn contains(&self, id: &str) -> bool { (**self).contains(id) }
}

/// A registry shared with its owner, who mutates it behind the lock.
impl<T: FriendRegistry> FriendRegistry for RwLock<T> {
  fn contains(&self, id: &str) -> bool {
    match self.read() {
      Ok(guard) => guard.contains(id),
      Err(poisoned) => poisoned.into_inner().contains(id),
    }
  }
}

/// Decides whether a participant id belongs to a friend.
#[derive(Debug, Clone, Default)]
pub struct FriendVerification<R> {
  registry: R,
}

impl<R: FriendRegistry> FriendVerification<R> {
  pub fn new(registry: R) -> Self { Self { registry } }

  /// Total over every id; ids never seen before are simply not friends.
  pub fn is_friend(&self, id: &str) -> bool { self.registry.contains(id) }
}
