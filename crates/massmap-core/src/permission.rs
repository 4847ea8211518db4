//! Location access permission as reported by the platform.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Tri-state location permission. `Denied` is a state the core reacts to,
/// not an error.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AccessPermission {
  Authorized,
  Denied,
  #[default]
  Undetermined,
}

impl AccessPermission {
  pub fn is_authorized(&self) -> bool { matches!(self, Self::Authorized) }
}
