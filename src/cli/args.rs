//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! Every flag is optional. Unset flags fall back to the config file, then to
//! built-in defaults (see [`crate::core::config`]).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::core::config::Overrides;
use crate::core::types::Attribution;

/// wikiedit - web editor for a git-backed Markdown wiki
#[derive(Parser, Debug)]
#[command(name = "wikiedit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Address to listen on
    #[arg(long, value_name = "ADDR")]
    pub addr: Option<SocketAddr>,

    /// URL the / route redirects to
    #[arg(long, value_name = "URL")]
    pub redirect: Option<String>,

    /// How often to sync with the remote, besides syncs caused by edits
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub sync_interval: Option<Duration>,

    /// Minimum pause after a successful sync
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub sync_cooldown: Option<Duration>,

    /// (insecure!) Allow anyone to edit. Otherwise X-Forwarded-Email
    /// identifies the editor
    #[arg(long)]
    pub allow_anonymous: bool,

    /// Git remote used when bootstrapping the local store
    #[arg(long, value_name = "URL")]
    pub remote: Option<String>,

    /// Directory holding the store's working copy
    #[arg(long, value_name = "DIR")]
    pub store_dir: Option<PathBuf>,

    /// Directory served at /assets (Quill's quill.js and quill.snow.css)
    #[arg(long, value_name = "DIR")]
    pub assets_dir: Option<PathBuf>,

    /// Branch to edit and sync
    #[arg(long, value_name = "NAME")]
    pub branch: Option<String>,

    /// How authors appear in commit messages: digest or verbatim
    #[arg(long, value_name = "POSTURE")]
    pub attribution: Option<Attribution>,

    /// Config file to load instead of the default locations
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// The flags that override configuration.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            addr: self.addr,
            redirect: self.redirect.clone(),
            sync_interval: self.sync_interval,
            sync_cooldown: self.sync_cooldown,
            allow_anonymous: self.allow_anonymous.then_some(true),
            remote: self.remote.clone(),
            store_dir: self.store_dir.clone(),
            assets_dir: self.assets_dir.clone(),
            branch: self.branch.clone(),
            attribution: self.attribution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_flags_means_no_overrides() {
        let cli = Cli::try_parse_from(["wikiedit"]).unwrap();
        let overrides = cli.overrides();
        assert_eq!(overrides.allow_anonymous, None);
        assert_eq!(overrides.sync_interval, None);
        assert!(overrides.remote.is_none());
    }

    #[test]
    fn flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "wikiedit",
            "--addr",
            "0.0.0.0:9000",
            "--sync-interval",
            "90s",
            "--sync-cooldown",
            "1m 30s",
            "--allow-anonymous",
            "--remote",
            "git@example.com:wiki.git",
            "--attribution",
            "verbatim",
        ])
        .unwrap();
        let overrides = cli.overrides();

        assert_eq!(overrides.addr, Some("0.0.0.0:9000".parse().unwrap()));
        assert_eq!(overrides.sync_interval, Some(Duration::from_secs(90)));
        assert_eq!(overrides.sync_cooldown, Some(Duration::from_secs(90)));
        assert_eq!(overrides.allow_anonymous, Some(true));
        assert_eq!(overrides.remote.as_deref(), Some("git@example.com:wiki.git"));
        assert_eq!(overrides.attribution, Some(Attribution::Verbatim));
    }

    #[test]
    fn bad_duration_rejected() {
        assert!(Cli::try_parse_from(["wikiedit", "--sync-interval", "soon"]).is_err());
    }
}
