//! cli
//!
//! Process entry point: configuration, logging, startup and serving.
//!
//! # Startup
//!
//! 1. Parse flags and load the config file
//! 2. Install the tracing subscriber
//! 3. Bootstrap the store (fatal on failure: nothing is served)
//! 4. Spawn the sync scheduler
//! 5. Serve HTTP until Ctrl-C

pub mod args;

pub use args::Cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::core::config::{Config, Settings};
use crate::server::{self, AppState};
use crate::store::Store;
use crate::sync::SyncScheduler;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level is `info`, or `debug` with
/// `--debug`.
pub fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Run the application.
///
/// This is the main entry point called from `main.rs`.
pub async fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.debug);

    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(path) = config.loaded_from() {
        tracing::info!(path = %path.display(), "loaded config file");
    }
    let settings = config
        .resolve(cli.overrides())
        .context("resolving configuration")?;

    serve(settings).await
}

/// Bootstrap the store, start syncing, and serve until shutdown.
pub async fn serve(settings: Settings) -> Result<()> {
    let store_settings = settings.store.clone();
    let remote_url = settings.remote_url.clone();
    let store = tokio::task::spawn_blocking(move || {
        Store::bootstrap(store_settings, remote_url.as_deref())
    })
    .await
    .context("bootstrap task failed")?
    .context("bootstrapping the store")?;
    let store = Arc::new(store);

    let (scheduler, sync) =
        SyncScheduler::new(Arc::clone(&store), settings.sync_interval, settings.sync_cooldown);
    tokio::spawn(scheduler.run());

    let state = Arc::new(AppState {
        store,
        sync,
        redirect: settings.redirect.clone(),
        allow_anonymous: settings.allow_anonymous,
    });
    if settings.allow_anonymous {
        tracing::warn!("anonymous editing is enabled");
    }

    let app = server::router(state, settings.assets_dir.as_deref());
    let listener = tokio::net::TcpListener::bind(settings.addr)
        .await
        .with_context(|| format!("binding {}", settings.addr))?;
    tracing::info!(addr = %settings.addr, "listening");

    server::serve(listener, app).await.context("serving HTTP")
}
