//! Feature flags.
//!
//! Flags are read once from configuration into a [`FeatureFlags`] value that
//! is passed to whichever component needs it. Tests construct their own.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// A switchable feature, named the way configuration refers to it.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr,
  EnumIter,
)]
#[strum(serialize_all = "camelCase")]
pub enum Feature {
  Events,
  Friends,
  ErrorHandler,
}

/// The set of enabled features. Everything defaults to off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
  pub events:        bool,
  pub friends:       bool,
  pub error_handler: bool,
}

impl FeatureFlags {
  pub fn is_active(&self, feature: Feature) -> bool {
    match feature {
      Feature::Events => self.events,
      Feature::Friends => self.friends,
      Feature::ErrorHandler => self.error_handler,
    }
  }

  /// Return a copy with `feature` switched to `active`.
  pub fn with(mut self, feature: Feature, active: bool) -> Self {
    match feature {
      Feature::Events => self.events = active,
      Feature::Friends => self.friends = active,
      Feature::ErrorHandler => self.error_handler = active,
    }
    self
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn all_features_default_to_off() {
    let flags = FeatureFlags::default();
    assert!(Feature::iter().all(|f| !flags.is_active(f)));
  }

  #[test]
  fn feature_names_round_trip() {
    assert_eq!(Feature::ErrorHandler.to_string(), "errorHandler");
    assert_eq!(Feature::from_str("friends").unwrap(), Feature::Friends);
  }

  #[test]
  fn with_toggles_only_the_named_feature() {
    let flags = FeatureFlags::default().with(Feature::Friends, true);
    assert!(flags.is_active(Feature::Friends));
    assert!(!flags.is_active(Feature::Events));
  }
}
