//! Configuration loaded from `qchain.toml`.
//!
//! ```toml
//! [render]
//! empty_select = "reject"   # or "star" (default)
//!
//! [log]
//! level = "info"            # any tracing filter directive, default "warn"
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{QchainError, QueryResult};
use crate::transpiler::{EmptySelectPolicy, RenderOptions};

/// File name looked up in the working directory.
pub const CONFIG_FILE: &str = "qchain.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub render: RenderConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub empty_select: EmptySelectPolicy,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> QueryResult<Self> {
        toml::from_str(content).map_err(|e| QchainError::Config(e.to_string()))
    }

    /// Load configuration from an explicit path.
    pub fn load(path: &Path) -> QueryResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load the first config file found, or defaults if there is none.
    ///
    /// Lookup order: `./qchain.toml`, then `<config dir>/qchain/config.toml`.
    pub fn discover() -> QueryResult<Self> {
        for path in Self::search_paths() {
            if path.is_file() {
                debug!(path = %path.display(), "loading config");
                return Self::load(&path);
            }
        }
        debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("qchain").join("config.toml"));
        }
        paths
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            empty_select: self.render.empty_select,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.log.level, "warn");
        assert_eq!(config.render_options(), RenderOptions::default());
    }

    #[test]
    fn test_reject_policy() {
        let config = Config::from_toml("[render]\nempty_select = \"reject\"\n").unwrap();
        assert_eq!(config.render.empty_select, EmptySelectPolicy::Reject);
        assert_eq!(config.render_options(), RenderOptions::strict());
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml("[log]\nlevel = \"debug\"\n").unwrap();
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.render.empty_select, EmptySelectPolicy::Star);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Config::from_toml("[render]\nempty_selct = \"star\"\n").unwrap_err();
        assert!(matches!(err, QchainError::Config(_)));
    }

    #[test]
    fn test_bad_policy_rejected() {
        let err = Config::from_toml("[render]\nempty_select = \"maybe\"\n").unwrap_err();
        assert!(err.to_string().starts_with("Configuration error:"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/qchain.toml")).unwrap_err();
        assert!(matches!(err, QchainError::Io(_)));
    }
}
