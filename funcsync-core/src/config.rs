//! Runtime configuration.
//!
//! Loaded from `<home>/.funcsync/config.yaml`. Every field has a default, so
//! an absent file or a partial file are both valid.
//!
//! Like the rest of the crate, loading has two forms:
//! - `load_at(home)` — explicit home; used in tests with `TempDir`
//! - `load()` — derives home from `dirs::home_dir()`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How the addition phase walks the resources of one template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResourceScope {
    /// Register every function resource in the file.
    #[default]
    All,
    /// Stop after the first resource that yields a function.
    FirstMatch,
}

/// Bounded exponential backoff for waiting on a freshly created table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessPolicy {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay_ms: 200,
            max_delay_ms: 5_000,
        }
    }
}

impl ReadinessPolicy {
    /// A policy that polls without sleeping.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Delay before poll number `attempt` (0-based), capped at `max_delay_ms`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let ms = self
            .initial_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// YAML store root. Defaults to `<home>/.funcsync/registry`.
    pub registry_root: Option<PathBuf>,
    pub readiness: ReadinessPolicy,
    pub resource_scope: ResourceScope,
    /// Extensions (without the dot, case-insensitive) of template files.
    pub template_extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry_root: None,
            readiness: ReadinessPolicy::default(),
            resource_scope: ResourceScope::default(),
            template_extensions: vec!["yml".to_string(), "yaml".to_string()],
        }
    }
}

impl Config {
    /// Store root, resolved against `home` when not configured.
    pub fn registry_root_at(&self, home: &Path) -> PathBuf {
        self.registry_root
            .clone()
            .unwrap_or_else(|| funcsync_dir(home).join("registry"))
    }

    /// `true` if `path` has one of the configured template extensions.
    pub fn is_template(&self, path: &str) -> bool {
        let Some((_, ext)) = path.rsplit_once('.') else {
            return false;
        };
        self.template_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// `<home>/.funcsync/`
pub fn funcsync_dir(home: &Path) -> PathBuf {
    home.join(".funcsync")
}

/// `<home>/.funcsync/config.yaml`
pub fn config_path_at(home: &Path) -> PathBuf {
    funcsync_dir(home).join("config.yaml")
}

/// Load the config under `home`, falling back to defaults if absent.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, ConfigError> {
    load_at(&home()?)
}

pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let home = TempDir::new().unwrap();
        let config = load_at(home.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.resource_scope, ResourceScope::All);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let home = TempDir::new().unwrap();
        let path = config_path_at(home.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "resource_scope: first_match\nreadiness:\n  max_attempts: 3\n")
            .unwrap();

        let config = load_at(home.path()).unwrap();
        assert_eq!(config.resource_scope, ResourceScope::FirstMatch);
        assert_eq!(config.readiness.max_attempts, 3);
        assert_eq!(config.readiness.initial_delay_ms, 200);
        assert_eq!(config.template_extensions, vec!["yml", "yaml"]);
    }

    #[test]
    fn malformed_file_reports_path() {
        let home = TempDir::new().unwrap();
        let path = config_path_at(home.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "readiness: [unclosed").unwrap();

        let err = load_at(home.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.yaml"));
    }

    #[test]
    fn registry_root_defaults_under_home() {
        let config = Config::default();
        let root = config.registry_root_at(Path::new("/home/dev"));
        assert_eq!(root, PathBuf::from("/home/dev/.funcsync/registry"));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = ReadinessPolicy {
            max_attempts: 10,
            initial_delay_ms: 100,
            max_delay_ms: 500,
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(500));
        assert_eq!(policy.delay_for(70), Duration::from_millis(500));
    }

    #[test]
    fn template_extension_match_is_case_insensitive() {
        let config = Config::default();
        assert!(config.is_template("service/template.YAML"));
        assert!(config.is_template("a/b.yml"));
        assert!(!config.is_template("src/index.js"));
        assert!(!config.is_template("Makefile"));
    }
}
