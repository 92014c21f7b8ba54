//! core::config
//!
//! Configuration schema, loading, and resolution.
//!
//! # Precedence
//!
//! Values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file (see [`schema`] for search locations)
//! 3. CLI flags, passed in as [`Overrides`]
//!
//! The result is an immutable [`Settings`] built once at startup and shared
//! with the store, the sync scheduler, and the HTTP layer.
//!
//! # Example
//!
//! ```no_run
//! use wikiedit::core::config::{Config, Overrides};
//!
//! let config = Config::load(None).unwrap();
//! let settings = config.resolve(Overrides::default()).unwrap();
//! println!("listening on {}", settings.addr);
//! ```

pub mod schema;

pub use schema::{CommitterConfig, FileConfig};

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::core::types::{Attribution, BranchName};

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

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Values supplied on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub addr: Option<SocketAddr>,
    pub redirect: Option<String>,
    pub sync_interval: Option<Duration>,
    pub sync_cooldown: Option<Duration>,
    pub allow_anonymous: Option<bool>,
    pub remote: Option<String>,
    pub store_dir: Option<PathBuf>,
    pub assets_dir: Option<PathBuf>,
    pub branch: Option<String>,
    pub attribution: Option<Attribution>,
}

/// Identity recorded as author and committer of every commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committer {
    pub name: String,
    pub email: String,
}

/// Settings consumed by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    /// Git working directory
    pub work_dir: PathBuf,
    /// Remote name
    pub remote_name: String,
    /// Tracked branch
    pub branch: BranchName,
    /// Author posture for commit messages
    pub attribution: Attribution,
    /// Commit identity
    pub committer: Committer,
}

impl StoreSettings {
    /// Defaults for a store at `work_dir`.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            remote_name: Config::DEFAULT_REMOTE_NAME.to_string(),
            branch: BranchName::default(),
            attribution: Attribution::default(),
            committer: Committer {
                name: Config::DEFAULT_COMMITTER_NAME.to_string(),
                email: Config::DEFAULT_COMMITTER_EMAIL.to_string(),
            },
        }
    }
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub addr: SocketAddr,
    pub redirect: String,
    pub sync_interval: Duration,
    pub sync_cooldown: Duration,
    pub allow_anonymous: bool,
    /// Remote URL for first-time bootstrap
    pub remote_url: Option<String>,
    pub assets_dir: Option<PathBuf>,
    pub store: StoreSettings,
}

/// Configuration loaded from disk, before CLI overrides.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed file contents (defaults when no file was found)
    pub file: FileConfig,
    loaded_from: Option<PathBuf>,
}

impl Config {
    pub const DEFAULT_ADDR: &'static str = "127.0.0.1:8080";
    pub const DEFAULT_REDIRECT: &'static str = "/edit/index";
    pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);
    pub const DEFAULT_SYNC_COOLDOWN: Duration = Duration::from_secs(10);
    pub const DEFAULT_REMOTE_NAME: &'static str = "origin";
    pub const DEFAULT_BRANCH: &'static str = "main";
    pub const DEFAULT_COMMITTER_NAME: &'static str = "wikiedit";
    pub const DEFAULT_COMMITTER_EMAIL: &'static str = "wikiedit@localhost";

    /// Wrap an already-parsed file config.
    pub fn from_file_config(file: FileConfig) -> Self {
        Self {
            file,
            loaded_from: None,
        }
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Otherwise the standard locations are
    /// searched and a missing file is not an error (defaults are used).
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed,
    /// or validated.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::locate(),
        };

        let Some(path) = path else {
            return Ok(Self::default());
        };

        let file = Self::read_file(&path)?;
        file.validate()?;

        Ok(Self {
            file,
            loaded_from: Some(path),
        })
    }

    /// Search the standard locations for a config file.
    fn locate() -> Option<PathBuf> {
        // 1. Check $WIKIEDIT_CONFIG
        if let Ok(path) = std::env::var("WIKIEDIT_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check $XDG_CONFIG_HOME/wikiedit/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("wikiedit/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. Check ~/.wikiedit/config.toml
        dirs::home_dir()
            .map(|home| home.join(".wikiedit/config.toml"))
            .filter(|path| path.exists())
    }

    /// Read and parse a config file.
    fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the path the config was loaded from, if any.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }

    /// Apply CLI overrides and defaults, producing the runtime settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a resolved value is invalid.
    pub fn resolve(self, overrides: Overrides) -> Result<Settings, ConfigError> {
        let file = self.file;

        let addr = match overrides.addr {
            Some(addr) => addr,
            None => file
                .addr
                .as_deref()
                .unwrap_or(Self::DEFAULT_ADDR)
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("invalid addr: {e}")))?,
        };

        let sync_interval = overrides
            .sync_interval
            .or(file.sync_interval)
            .unwrap_or(Self::DEFAULT_SYNC_INTERVAL);
        let sync_cooldown = overrides
            .sync_cooldown
            .or(file.sync_cooldown)
            .unwrap_or(Self::DEFAULT_SYNC_COOLDOWN);
        schema::validate_period("sync_interval", Some(sync_interval))?;
        schema::validate_period("sync_cooldown", Some(sync_cooldown))?;

        let branch = overrides
            .branch
            .or(file.branch)
            .unwrap_or_else(|| Self::DEFAULT_BRANCH.to_string());
        let branch = BranchName::new(branch).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let remote_name = file
            .remote_name
            .unwrap_or_else(|| Self::DEFAULT_REMOTE_NAME.to_string());
        schema::validate_remote_name(&remote_name)?;

        let committer = file.committer.unwrap_or_default();
        let committer = Committer {
            name: committer
                .name
                .unwrap_or_else(|| Self::DEFAULT_COMMITTER_NAME.to_string()),
            email: committer
                .email
                .unwrap_or_else(|| Self::DEFAULT_COMMITTER_EMAIL.to_string()),
        };

        Ok(Settings {
            addr,
            redirect: overrides
                .redirect
                .or(file.redirect)
                .unwrap_or_else(|| Self::DEFAULT_REDIRECT.to_string()),
            sync_interval,
            sync_cooldown,
            allow_anonymous: overrides
                .allow_anonymous
                .or(file.allow_anonymous)
                .unwrap_or(false),
            remote_url: overrides.remote.or(file.remote).filter(|r| !r.is_empty()),
            assets_dir: overrides.assets_dir.or(file.assets_dir),
            store: StoreSettings {
                work_dir: overrides
                    .store_dir
                    .or(file.store_dir)
                    .unwrap_or_else(|| PathBuf::from(".")),
                remote_name,
                branch,
                attribution: overrides
                    .attribution
                    .or(file.attribution)
                    .unwrap_or_default(),
                committer,
            },
        })
    }
}
