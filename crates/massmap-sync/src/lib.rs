//! Synchronization engine for the massmap map core.
//!
//! Turns position snapshots into minimal rendering operations, looks up the
//! next organized ride with request coalescing, and fans chat messages out to
//! observers. All state is owned by a single [`session::MapSession`]; async
//! results are fed back to it as [`session::MapEvent`]s.

pub mod chat;
pub mod clock;
pub mod controller;
pub mod friends;
pub mod next_ride;
pub mod reconcile;
pub mod session;

#[cfg(test)]
mod testing;

pub use controller::AnnotationController;
pub use friends::FriendAnnotationController;
pub use next_ride::NextRideLocator;
pub use reconcile::{EntitySet, Reconciliation, reconcile};
pub use session::{MapEvent, MapSession};
