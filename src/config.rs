//! Search configuration loaded from TOML.
//!
//! Every field has a default, so an absent file or a partial file is valid:
//!
//! ```toml
//! limit = 25
//! debounce_ms = 120
//! cache_dir = "~/.cache/symdex"
//! ```

use crate::error::Result;
use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming a config file to load instead of the default.
pub const CONFIG_ENV: &str = "SYMDEX_CONFIG";

/// Tunables for the query engine, sessions and index cache.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Results shown when a request does not name a limit.
    pub limit: usize,
    /// Upper bound applied to any requested limit.
    pub max_limit: usize,
    /// Quiet period before a typed query is issued.
    pub debounce_ms: u64,
    /// Recent queries remembered per session.
    pub result_cache_size: usize,
    /// Where persisted index blobs live. `~` is expanded.
    pub cache_dir: Option<PathBuf>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: crate::search::DEFAULT_LIMIT,
            max_limit: 200,
            debounce_ms: 80,
            result_cache_size: 64,
            cache_dir: None,
        }
    }
}

impl SearchConfig {
    /// Parses a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse config TOML")?;
        if config.max_limit == 0 {
            anyhow::bail!("max_limit must be at least 1");
        }
        Ok(config)
    }

    /// Loads the file named by `SYMDEX_CONFIG`, else `<config dir>/symdex/config.toml`,
    /// else defaults.
    pub fn discover() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::load(Path::new(&path));
        }
        match dirs::config_dir().map(|dir| dir.join("symdex").join("config.toml")) {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Resolves an optional requested limit against the defaults and the cap.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.limit).min(self.max_limit)
    }

    /// Directory for persisted index blobs, if one can be determined.
    pub fn cache_dir(&self) -> Option<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Some(expand_tilde(dir)),
            None => dirs::cache_dir().map(|dir| dir.join("symdex")),
        }
    }
}

/// Resolves a leading `~` component to the home directory.
///
/// `~user` forms and paths without a leading `~` are returned as given.
pub fn expand_tilde(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) if rest.as_os_str().is_empty() => home,
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use rstest::rstest;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let_assert!(Ok(config) = SearchConfig::from_toml("limit = 10\n"));
        check!(config.limit == 10);
        check!(config.debounce_ms == 80);
        check!(config.max_limit == 200);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        check!(SearchConfig::from_toml("limt = 10\n").is_err());
    }

    #[test]
    fn test_zero_max_limit_is_rejected() {
        check!(SearchConfig::from_toml("max_limit = 0\n").is_err());
    }

    #[rstest]
    #[case(None, 50)]
    #[case(Some(5), 5)]
    #[case(Some(1000), 200)]
    fn test_effective_limit(#[case] requested: Option<usize>, #[case] expected: usize) {
        check!(SearchConfig::default().effective_limit(requested) == expected);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "debounce_ms = 5\ncache_dir = \"/tmp/symdex-test\"\n").unwrap();

        let_assert!(Ok(config) = SearchConfig::load(&path));
        check!(config.debounce() == Duration::from_millis(5));
        check!(config.cache_dir() == Some(PathBuf::from("/tmp/symdex-test")));
    }

    #[rstest]
    #[case("/abs/path")]
    #[case("relative/~/docs")]
    #[case("~other/docs")]
    fn test_expand_tilde_leaves_other_paths(#[case] path: &str) {
        check!(expand_tilde(Path::new(path)) == PathBuf::from(path));
    }

    #[test]
    fn test_expand_tilde_uses_home() {
        let_assert!(Some(home) = dirs::home_dir());
        check!(expand_tilde(Path::new("~")) == home);
        check!(expand_tilde(Path::new("~/docs/search")) == home.join("docs/search"));

        let config = SearchConfig {
            cache_dir: Some(PathBuf::from("~/.cache/symdex")),
            ..SearchConfig::default()
        };
        check!(config.cache_dir() == Some(home.join(".cache/symdex")));
    }
}
