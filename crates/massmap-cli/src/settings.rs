//! Application configuration.
//!
//! Read from a TOML file and `MASSMAP_*` environment variables, in that
//! order. Nested keys use a double underscore in the environment, e.g.
//! `MASSMAP_FEATURES__EVENTS=true`.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use massmap_core::feature::FeatureFlags;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  #[serde(default = "default_api_base_url")]
  pub api_base_url: String,

  /// SQLite file holding preferences. A leading `~` is expanded.
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,

  /// The local participant's id.
  #[serde(default)]
  pub own_id: Option<String>,

  /// Ids of verified friends.
  #[serde(default)]
  pub friends: Vec<String>,

  #[serde(default)]
  pub features: FeatureFlags,
}

fn default_api_base_url() -> String { "https://criticalmass.in".to_string() }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/massmap/prefs.sqlite") }

impl AppConfig {
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("MASSMAP")
          .separator("__")
          .try_parsing(true)
          .list_separator(",")
          .with_list_parse_key("friends"),
      )
      .build()
      .context("failed to read config file")?;

    let mut cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise AppConfig")?;
    cfg.store_path = expand_tilde(&cfg.store_path);
    Ok(cfg)
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn write_config(name: &str, body: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("massmap-cli-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
  }

  #[test]
  fn missing_file_gives_defaults() {
    let cfg = AppConfig::load(Path::new("/nonexistent/massmap.toml")).unwrap();
    assert_eq!(cfg.api_base_url, "https://criticalmass.in");
    assert!(cfg.friends.is_empty());
    assert_eq!(cfg.features, FeatureFlags::default());
  }

  #[test]
  fn file_values_are_read() {
    let path = write_config(
      "full.toml",
      r#"
        api_base_url = "http://localhost:8080"
        store_path = "/tmp/prefs.sqlite"
        own_id = "me"
        friends = ["alice", "bob"]

        [features]
        events = true
        friends = true
      "#,
    );

    let cfg = AppConfig::load(&path).unwrap();

    assert_eq!(cfg.api_base_url, "http://localhost:8080");
    assert_eq!(cfg.store_path, PathBuf::from("/tmp/prefs.sqlite"));
    assert_eq!(cfg.own_id.as_deref(), Some("me"));
    assert_eq!(cfg.friends, ["alice", "bob"]);
    assert!(cfg.features.events);
    assert!(cfg.features.friends);
    assert!(!cfg.features.error_handler);
  }

  #[test]
  fn tilde_is_expanded() {
    let Ok(home) = std::env::var("HOME") else {
      return;
    };
    assert_eq!(
      expand_tilde(Path::new("~/prefs.sqlite")),
      PathBuf::from(home).join("prefs.sqlite")
    );
    assert_eq!(
      expand_tilde(Path::new("/abs/prefs.sqlite")),
      PathBuf::from("/abs/prefs.sqlite")
    );
  }
}
