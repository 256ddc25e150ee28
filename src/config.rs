use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub server: ServerConfig,
  #[serde(default)]
  pub github: GitHubConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  /// Address the HTTP server listens on
  #[serde(default = "default_bind")]
  pub bind: SocketAddr,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      bind: default_bind(),
    }
  }
}

fn default_bind() -> SocketAddr {
  SocketAddr::from(([127, 0, 0, 1], 8000))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
  /// API base URL, overridable for GitHub Enterprise or tests
  pub api_url: String,
  pub owner: String,
  pub repo: String,
  /// Upstream request timeout in seconds
  pub timeout_secs: u64,
  pub user_agent: String,
}

impl Default for GitHubConfig {
  fn default() -> Self {
    Self {
      api_url: "https://api.github.com".to_string(),
      owner: "canonical".to_string(),
      repo: "open-documentation-academy".to_string(),
      timeout_secs: 10,
      user_agent: concat!("doc-academy/", env!("CARGO_PKG_VERSION")).to_string(),
    }
  }
}

impl GitHubConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// How long a successful fetch is served without contacting GitHub
  pub ttl_minutes: i64,
}

const DEFAULT_TTL_MINUTES: i64 = 30;

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      ttl_minutes: DEFAULT_TTL_MINUTES,
    }
  }
}

impl CacheConfig {
  /// Freshness window. Falls back to the default for values `Config::validate` rejects.
  pub fn ttl(&self) -> chrono::Duration {
    chrono::Duration::try_minutes(self.ttl_minutes)
      .filter(|ttl| *ttl > chrono::Duration::zero())
      .unwrap_or_else(|| chrono::Duration::minutes(DEFAULT_TTL_MINUTES))
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
  /// Write daily-rolling log files here instead of stderr
  pub directory: Option<PathBuf>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./doc-academy.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/doc-academy/config.yaml
  ///
  /// Falls back to built-in defaults when no file is found.
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
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("doc-academy.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("doc-academy").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Invalid config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    // An empty file deserializes to unit, not to an empty mapping
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    let config: Config = serde_yaml::from_str(contents)?;
    config.validate()?;
    Ok(config)
  }

  /// Reject values that deserialize fine but cannot work at runtime.
  fn validate(&self) -> Result<()> {
    let ttl = self.cache.ttl_minutes;
    if ttl <= 0 || chrono::Duration::try_minutes(ttl).is_none() {
      return Err(eyre!("cache.ttl_minutes must be a positive number of minutes, got {}", ttl));
    }
    if self.github.timeout_secs == 0 {
      return Err(eyre!("github.timeout_secs must be at least 1"));
    }
    Ok(())
  }

  /// Get an optional GitHub token from environment variables.
  ///
  /// Checks DOC_ACADEMY_GITHUB_TOKEN first, then GITHUB_TOKEN as fallback.
  /// Requests are anonymous when neither is set.
  pub fn github_token() -> Option<String> {
    std::env::var("DOC_ACADEMY_GITHUB_TOKEN")
      .or_else(|_| std::env::var("GITHUB_TOKEN"))
      .ok()
      .filter(|t| !t.trim().is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_match_upstream_listing() {
    let config = Config::default();
    assert_eq!(config.server.bind, "127.0.0.1:8000".parse::<SocketAddr>().unwrap());
    assert_eq!(config.github.api_url, "https://api.github.com");
    assert_eq!(config.github.owner, "canonical");
    assert_eq!(config.github.repo, "open-documentation-academy");
    assert_eq!(config.github.timeout(), Duration::from_secs(10));
    assert_eq!(config.cache.ttl(), chrono::Duration::minutes(30));
    assert!(config.log.directory.is_none());
  }

  #[test]
  fn test_partial_file_keeps_other_defaults() {
    let config = Config::parse(
      "server:\n  bind: 0.0.0.0:9000\ngithub:\n  repo: other-repo\ncache:\n  ttl_minutes: 5\n",
    )
    .unwrap();

    assert_eq!(config.server.bind, "0.0.0.0:9000".parse::<SocketAddr>().unwrap());
    assert_eq!(config.github.owner, "canonical");
    assert_eq!(config.github.repo, "other-repo");
    assert_eq!(config.github.timeout_secs, 10);
    assert_eq!(config.cache.ttl_minutes, 5);
  }

  #[test]
  fn test_empty_file_is_default() {
    let config = Config::parse("  \n").unwrap();
    assert_eq!(config.github.repo, "open-documentation-academy");
  }

  #[test]
  fn test_invalid_bind_is_rejected() {
    assert!(Config::parse("server:\n  bind: not-an-address\n").is_err());
  }

  #[test]
  fn test_out_of_range_ttl_is_rejected() {
    let err = Config::parse("cache:\n  ttl_minutes: 999999999999999\n").unwrap_err();
    assert!(err.to_string().contains("cache.ttl_minutes"));
  }

  #[test]
  fn test_non_positive_ttl_is_rejected() {
    assert!(Config::parse("cache:\n  ttl_minutes: -5\n").is_err());
    assert!(Config::parse("cache:\n  ttl_minutes: 0\n").is_err());
  }

  #[test]
  fn test_zero_timeout_is_rejected() {
    let err = Config::parse("github:\n  timeout_secs: 0\n").unwrap_err();
    assert!(err.to_string().contains("github.timeout_secs"));
  }

  #[test]
  fn test_ttl_never_panics_on_unvalidated_value() {
    let cache = CacheConfig {
      ttl_minutes: i64::MAX,
    };
    assert_eq!(cache.ttl(), chrono::Duration::minutes(30));
  }

  #[test]
  fn test_invalid_file_error_names_path() {
    let path = std::env::temp_dir().join(format!("doc-academy-{}.yaml", std::process::id()));
    std::fs::write(&path, "cache:\n  ttl_minutes: -1\n").unwrap();

    let err = Config::load(Some(&path)).unwrap_err();
    std::fs::remove_file(&path).unwrap();
    assert!(err.to_string().contains(&path.display().to_string()));
  }

  #[test]
  fn test_missing_explicit_path_is_error() {
    let err = Config::load(Some(Path::new("/nonexistent/doc-academy.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}
