use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CachePolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub form: FormConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the school service (e.g., "http://localhost:5000")
  pub url: String,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
  pub freshness_secs: u64,
  pub retention_secs: u64,
  /// Retries after the first failed list call
  pub retry: u32,
  pub retry_delay_ms: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      freshness_secs: 120,
      retention_secs: 300,
      retry: 2,
      retry_delay_ms: 1000,
    }
  }
}

impl CacheConfig {
  pub fn policy(&self) -> CachePolicy {
    CachePolicy {
      freshness: Duration::from_secs(self.freshness_secs),
      retention: Duration::from_secs(self.retention_secs),
      retry: self.retry,
      retry_delay: Duration::from_millis(self.retry_delay_ms),
    }
  }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FormConfig {
  /// Exact number of digits in a phone number
  pub phone_digits: usize,
  pub max_photo_bytes: u64,
}

impl Default for FormConfig {
  fn default() -> Self {
    Self {
      phone_digits: 8,
      max_photo_bytes: 5 * 1024 * 1024,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
  /// Directory for log files (defaults to the user data directory)
  pub directory: Option<PathBuf>,
  /// Filter directives, used when RUST_LOG is not set
  pub filter: Option<String>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./gradedesk.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/gradedesk/config.yaml
  /// 4. ~/.config/gradedesk/config.yaml
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

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/gradedesk/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("gradedesk.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("gradedesk").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    if config.api.url.trim().is_empty() {
      return Err(eyre!("api.url must not be empty"));
    }
    Ok(config)
  }

  /// Header title: the configured one, or the host of the API URL.
  pub fn display_title(&self) -> String {
    if let Some(title) = &self.title {
      return title.clone();
    }
    url::Url::parse(&self.api.url)
      .ok()
      .and_then(|u| {
        u.host_str().map(|host| match u.port() {
          Some(port) => format!("{}:{}", host, port),
          None => host.to_string(),
        })
      })
      .unwrap_or_else(|| self.api.url.clone())
  }
}
