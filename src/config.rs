use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::query::View;

/// Environment variable overriding `api.url`
pub const API_URL_ENV: &str = "CVSYNC_API_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub push: PushConfig,
  #[serde(default)]
  pub sync: SyncConfig,
  /// View shown at startup
  #[serde(default)]
  pub default_view: View,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the record store, e.g. `http://localhost:3001`
  #[serde(default)]
  pub url: String,
  #[serde(default = "default_request_timeout")]
  pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PushConfig {
  pub enabled: bool,
  /// Socket.IO event announcing a new record
  pub event: String,
  pub reconnect_delay_ms: u64,
  pub reconnect_attempts: u32,
}

impl Default for PushConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      event: "newCV".to_string(),
      reconnect_delay_ms: 1000,
      reconnect_attempts: 5,
    }
  }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncConfig {
  pub cache_ttl_secs: u64,
  pub page_size: u32,
  /// How long a "new record" notice stays up
  pub notice_secs: u64,
  /// Skip the refetch for pushed records whose category rules them out of a
  /// category view
  pub skip_disjoint_refetch: bool,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      cache_ttl_secs: 60,
      page_size: 12,
      notice_secs: 3,
      skip_disjoint_refetch: false,
    }
  }
}

impl SyncConfig {
  pub fn cache_ttl(&self) -> Duration {
    Duration::from_secs(self.cache_ttl_secs)
  }

  pub fn notice_duration(&self) -> Duration {
    Duration::from_secs(self.notice_secs)
  }
}

fn default_request_timeout() -> u64 {
  30
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./cvsync.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/cvsync/config.yaml
  ///
  /// `CVSYNC_API_URL` overrides `api.url` from the file.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      // The URL alone is enough to run
      None if std::env::var(API_URL_ENV).is_ok() => Self::parse("api: {}")?,
      None => {
        return Err(eyre!(
          "No configuration file found. Create one at ~/.config/cvsync/config.yaml\n\
                 or set {}.",
          API_URL_ENV
        ))
      }
    };

    config.with_env_overrides().validated()
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("cvsync.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("cvsync").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))
  }

  fn with_env_overrides(mut self) -> Self {
    if let Ok(url) = std::env::var(API_URL_ENV) {
      if !url.trim().is_empty() {
        self.api.url = url;
      }
    }
    self
  }

  fn validated(self) -> Result<Self> {
    if self.api.url.trim().is_empty() {
      return Err(eyre!(
        "api.url is not set. Add it to the config file or set {}.",
        API_URL_ENV
      ));
    }
    if self.sync.page_size == 0 {
      return Err(eyre!("sync.page_size must be at least 1"));
    }
    Ok(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::record::Category;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::parse("api:\n  url: http://localhost:3001\n")
      .unwrap()
      .validated()
      .unwrap();
    assert_eq!(config.api.url, "http://localhost:3001");
    assert_eq!(config.api.request_timeout_secs, 30);
    assert_eq!(config.push, PushConfig::default());
    assert_eq!(config.sync, SyncConfig::default());
    assert_eq!(config.sync.cache_ttl(), Duration::from_secs(60));
    assert_eq!(config.default_view, View::Accepted);
  }

  #[test]
  fn test_full_config() {
    let yaml = r#"
api:
  url: https://cv.example.com
  request_timeout_secs: 10
push:
  enabled: false
  event: cvCreated
  reconnect_attempts: 2
sync:
  page_size: 24
  skip_disjoint_refetch: true
default_view: gcms
"#;
    let config = Config::parse(yaml).unwrap().validated().unwrap();
    assert_eq!(config.api.request_timeout_secs, 10);
    assert!(!config.push.enabled);
    assert_eq!(config.push.event, "cvCreated");
    assert_eq!(config.push.reconnect_attempts, 2);
    assert_eq!(config.push.reconnect_delay_ms, 1000);
    assert_eq!(config.sync.page_size, 24);
    assert_eq!(config.sync.notice_secs, 3);
    assert!(config.sync.skip_disjoint_refetch);
    assert_eq!(config.default_view, View::Category(Category::Gcms));
  }

  #[test]
  fn test_missing_url_is_rejected() {
    let config = Config::parse("api: {}").unwrap();
    assert!(config.validated().is_err());
  }

  #[test]
  fn test_unknown_view_is_rejected() {
    assert!(Config::parse("api: {}\ndefault_view: archive\n").is_err());
  }

  #[test]
  fn test_missing_explicit_file() {
    let err = Config::load(Some(Path::new("/nonexistent/cvsync.yaml"))).unwrap_err();
    assert!(err.to_string().contains("not found"));
  }
}
