//! core::config::schema
//!
//! Configuration file schema.
//!
//! # Location
//!
//! Searched in order (first hit wins):
//! 1. `--config <path>`
//! 2. `$WIKIEDIT_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/wikiedit/config.toml`
//! 4. `~/.wikiedit/config.toml`
//!
//! # Validation
//!
//! Values are validated after parsing so a bad file fails at startup rather
//! than on the first request.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::{Attribution, BranchName};

/// Contents of the configuration file.
///
/// # Example
///
/// ```toml
/// addr = "0.0.0.0:8080"
/// redirect = "https://wiki.example.com"
/// sync_interval = "5m"
/// sync_cooldown = "10s"
/// allow_anonymous = false
/// remote = "git@github.com:example/wiki.git"
/// store_dir = "/var/lib/wikiedit"
/// branch = "main"
/// attribution = "digest"
///
/// [committer]
/// name = "wiki bot"
/// email = "wiki@example.com"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Address to listen on
    pub addr: Option<String>,

    /// Where `/` redirects to
    pub redirect: Option<String>,

    /// Period between unprompted syncs
    #[serde(with = "humantime_serde")]
    pub sync_interval: Option<Duration>,

    /// Minimum spacing between syncs
    #[serde(with = "humantime_serde")]
    pub sync_cooldown: Option<Duration>,

    /// Accept edits without a forwarded identity
    pub allow_anonymous: Option<bool>,

    /// Remote URL, used only when the store is first created
    pub remote: Option<String>,

    /// Remote name (default: "origin")
    pub remote_name: Option<String>,

    /// Branch to track (default: "main")
    pub branch: Option<String>,

    /// Git working directory holding the documents
    pub store_dir: Option<PathBuf>,

    /// Directory served under `/assets`
    pub assets_dir: Option<PathBuf>,

    /// How authors appear in commit messages
    pub attribution: Option<Attribution>,

    /// Identity used for commits made by the service
    pub committer: Option<CommitterConfig>,
}

/// Committer identity section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CommitterConfig {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(addr) = &self.addr {
            addr.parse::<SocketAddr>().map_err(|e| {
                ConfigError::InvalidValue(format!("invalid addr '{}': {}", addr, e))
            })?;
        }

        validate_period("sync_interval", self.sync_interval)?;
        validate_period("sync_cooldown", self.sync_cooldown)?;

        if let Some(branch) = &self.branch {
            BranchName::new(branch.as_str())
                .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        }

        if let Some(name) = &self.remote_name {
            validate_remote_name(name)?;
        }

        if let Some(committer) = &self.committer {
            if committer.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
                return Err(ConfigError::InvalidValue(
                    "committer name cannot be empty".into(),
                ));
            }
            if committer.email.as_deref().is_some_and(|e| e.trim().is_empty()) {
                return Err(ConfigError::InvalidValue(
                    "committer email cannot be empty".into(),
                ));
            }
        }

        Ok(())
    }
}

pub(crate) fn validate_period(key: &str, value: Option<Duration>) -> Result<(), ConfigError> {
    match value {
        Some(d) if d.is_zero() => Err(ConfigError::InvalidValue(format!(
            "{key} must be greater than zero"
        ))),
        _ => Ok(()),
    }
}

pub(crate) fn validate_remote_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() || name.starts_with('-') || name.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidValue(format!(
            "invalid remote name '{name}'"
        )));
    }
    Ok(())
}
