//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! gops has two configuration scopes:
//! - **Global**: User-level settings
//! - **Repo**: Repository-level overrides
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$GOPS_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/gops/config.toml`
//! 3. `~/.gops/config.toml` (canonical write location)
//!
//! # Repo Config Location
//!
//! `.git/gops/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use gitops_scaffold::core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Some(Path::new("/path/to/repo"))).unwrap();
//! println!("git timeout: {:?}", config.git_timeout());
//! if let Some(org) = config.org_url() {
//!     println!("organization: {}", org);
//! }
//! ```

pub mod schema;

pub use schema::{AzureConfig, ConfigFile, PrConfig, TimeoutConfig, KEYS};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::forge::azure::{DEFAULT_API_VERSION, DEFAULT_HTTP_TIMEOUT};
use crate::git::DEFAULT_GIT_TIMEOUT;

/// Environment variable naming an explicit global config file.
pub const CONFIG_ENV: &str = "GOPS_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Merged configuration from all sources.
///
/// Accessors apply precedence automatically: repo config overrides global
/// config, and unset keys fall back to built-in defaults.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: ConfigFile,
    /// Repository configuration (if in a repo)
    pub repo: Option<ConfigFile>,
    global_path: Option<PathBuf>,
    repo_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `repo_root` is provided, also loads repo-specific config.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or fail
    /// validation. Missing config files are not an error.
    pub fn load(repo_root: Option<&Path>) -> Result<Config, ConfigError> {
        let candidates = global_search_paths(|k| std::env::var(k).ok(), dirs::home_dir());
        Self::load_from(&candidates, repo_root)
    }

    /// Load using an explicit global search list.
    pub fn load_from(
        global_candidates: &[PathBuf],
        repo_root: Option<&Path>,
    ) -> Result<Config, ConfigError> {
        let (global, global_path) = match global_candidates.iter().find(|p| p.exists()) {
            Some(path) => (Self::read_file(path)?, Some(path.clone())),
            None => (ConfigFile::default(), None),
        };

        let repo_path = repo_root
            .map(Self::repo_config_path)
            .filter(|p| p.exists());
        let repo = repo_path.as_deref().map(Self::read_file).transpose()?;

        global.validate()?;
        if let Some(ref r) = repo {
            r.validate()?;
        }

        debug!(global = ?global_path, repo = ?repo_path, "configuration loaded");
        Ok(Config {
            global,
            repo,
            global_path,
            repo_path,
        })
    }

    /// Read and parse one config file.
    pub fn read_file(path: &Path) -> Result<ConfigFile, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the canonical path for global config.
    ///
    /// Returns `~/.gops/config.toml`.
    pub fn global_config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".gops/config.toml"))
    }

    /// Where `config set` writes: the loaded global file, else `$GOPS_CONFIG`,
    /// else the canonical location.
    pub fn global_write_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.global_path {
            return Ok(path.clone());
        }
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.is_empty() => Ok(PathBuf::from(path)),
            _ => Self::global_config_path(),
        }
    }

    /// Get the canonical path for repo config.
    ///
    /// Returns `.git/gops/config.toml` relative to the given repo root.
    pub fn repo_config_path(repo_root: &Path) -> PathBuf {
        repo_root.join(".git/gops/config.toml")
    }

    /// Write a config file atomically.
    ///
    /// Creates parent directories if needed, writes to a temp file in the
    /// same directory, syncs, then renames over the target.
    pub fn write_atomic(path: &Path, config: &ConfigFile) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        file.write_all(contents.as_bytes())
            .map_err(|e| ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;

        file.sync_all().map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    fn layered<T>(&self, pick: impl Fn(&ConfigFile) -> Option<T>) -> Option<T> {
        self.repo.as_ref().and_then(&pick).or_else(|| pick(&self.global))
    }

    /// Resolved value of a dotted key, defaults excluded.
    pub fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        if let Some(repo) = &self.repo {
            if let Some(value) = repo.get(key)? {
                return Ok(Some(value));
            }
        }
        self.global.get(key)
    }

    /// Configured organization URL, if any.
    pub fn org_url(&self) -> Option<String> {
        self.layered(|c| c.azure.as_ref().and_then(|a| a.org_url.clone()))
    }

    /// Defaults to `6.0`.
    pub fn api_version(&self) -> String {
        self.layered(|c| c.azure.as_ref().and_then(|a| a.api_version.clone()))
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string())
    }

    /// Defaults to 120 seconds.
    pub fn git_timeout(&self) -> Duration {
        self.layered(|c| c.timeouts.as_ref().and_then(|t| t.git_secs))
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_GIT_TIMEOUT)
    }

    /// Defaults to 30 seconds.
    pub fn http_timeout(&self) -> Duration {
        self.layered(|c| c.timeouts.as_ref().and_then(|t| t.http_secs))
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT)
    }

    /// Defaults to `true`.
    pub fn strict_branch_match(&self) -> bool {
        self.layered(|c| c.pr.as_ref().and_then(|p| p.strict_branch_match))
            .unwrap_or(true)
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded repo config file.
    pub fn repo_config_loaded_from(&self) -> Option<&Path> {
        self.repo_path.as_deref()
    }
}

/// Global config candidates in search order.
pub fn global_search_paths(
    env: impl Fn(&str) -> Option<String>,
    home: Option<PathBuf>,
) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(explicit) = env(CONFIG_ENV).filter(|v| !v.is_empty()) {
        paths.push(PathBuf::from(explicit));
    }
    if let Some(xdg) = env("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        paths.push(PathBuf::from(xdg).join("gops/config.toml"));
    }
    if let Some(home) = home {
        paths.push(home.join(".gops/config.toml"));
    }
    paths
}
