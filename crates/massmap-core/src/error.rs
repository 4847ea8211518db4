//! Error types for `massmap-core`.

use thiserror::Error;

/// Failure of a next-ride lookup.
///
/// Cloneable so a single in-flight result can be handed to every coalesced
/// waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RideError {
  #[error("network failure: {0}")]
  Network(String),

  #[error("malformed ride response: {0}")]
  Decode(String),

  #[error("no upcoming ride found")]
  NoRideFound,
}

/// Rejection reported by a rendering surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
  #[error("rendering surface is not attached")]
  NotAttached,

  #[error("rendering surface rejected the operation: {0}")]
  Rejected(String),
}

/// Input rejected at the boundary before it reaches a component.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("chat message is empty")]
  EmptyMessage,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Ride(#[from] RideError),

  #[error(transparent)]
  Surface(#[from] SurfaceError),

  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error("unknown preference key: {0:?}")]
  UnknownPreference(String),

  #[error("invalid value for preference {key:?}: {value:?}")]
  InvalidPreference { key: String, value: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
