//! sync
//!
//! Background reconciliation of the local store with its remote.
//!
//! # Architecture
//!
//! One [`SyncScheduler`] task runs for the life of the process. It wakes on
//! either of:
//! - the periodic tick (first tick one full interval after start)
//! - a request raised through a [`SyncHandle`] after a successful edit
//!
//! Requests go through a capacity-1 channel written with `try_send`, so any
//! number of requests raised while one is already pending collapse into a
//! single reconcile. Requesting never blocks.
//!
//! Each wake-up runs [`Reconciler::reconcile`] on the blocking pool. After a
//! success the scheduler sleeps for the cooldown before listening again;
//! after a failure it logs and goes straight back to waiting.
//!
//! ```text
//! Idle ──tick/request──▶ Reconciling ──ok──▶ Cooldown ──▶ Idle
//!                             └───────err─────────────────▶ Idle
//! ```
//!
//! The current [`SyncStatus`] is published on a `watch` channel.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};

use crate::store::{Store, StoreError};

/// Something that can be reconciled with a remote.
pub trait Reconciler: Send + Sync + 'static {
    type Error: std::fmt::Display + Send + 'static;

    /// Bring local and remote state together. Blocks.
    fn reconcile(&self) -> Result<(), Self::Error>;
}

impl Reconciler for Store {
    type Error = StoreError;

    fn reconcile(&self) -> Result<(), StoreError> {
        Store::reconcile(self)
    }
}

/// Where the scheduler is in its cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    #[default]
    Idle,
    Reconciling,
    Cooldown,
}

/// Snapshot of the scheduler.
///
/// The serialized form carries no error text: git output names remotes and
/// local paths, so it stays in-process and in the log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub state: SyncState,
    /// When the last successful reconcile finished.
    pub last_success: Option<DateTime<Utc>>,
    /// When the most recent reconcile failed, cleared by a success.
    pub last_failure: Option<DateTime<Utc>>,
    /// Error of the most recent reconcile, cleared by a success.
    #[serde(skip)]
    pub last_error: Option<String>,
    /// Completed reconciles, successful or not.
    pub runs: u64,
}

/// Cheap, cloneable handle for requesting a sync and observing status.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    requests: mpsc::Sender<()>,
    status: watch::Receiver<SyncStatus>,
}

impl SyncHandle {
    /// Ask for a reconcile soon. No-op if one is already pending.
    pub fn request(&self) {
        match self.requests.try_send(()) {
            Ok(()) => tracing::trace!("sync requested"),
            Err(mpsc::error::TrySendError::Full(())) => tracing::trace!("sync already pending"),
            Err(mpsc::error::TrySendError::Closed(())) => {
                tracing::warn!("sync requested but the scheduler has stopped")
            }
        }
    }

    /// The latest published status.
    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    /// A receiver that sees every status change.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.clone()
    }
}

enum Trigger {
    Interval,
    Requested,
}

impl Trigger {
    fn as_str(&self) -> &'static str {
        match self {
            Trigger::Interval => "interval",
            Trigger::Requested => "requested",
        }
    }
}

/// The background sync task.
pub struct SyncScheduler<R> {
    reconciler: Arc<R>,
    interval: Duration,
    cooldown: Duration,
    requests: mpsc::Receiver<()>,
    status: watch::Sender<SyncStatus>,
}

impl<R: Reconciler> SyncScheduler<R> {
    /// Create a scheduler and the handle that drives it.
    ///
    /// Nothing runs until [`SyncScheduler::run`] is awaited or spawned.
    pub fn new(reconciler: Arc<R>, interval: Duration, cooldown: Duration) -> (Self, SyncHandle) {
        let (request_tx, request_rx) = mpsc::channel(1);
        let (status_tx, status_rx) = watch::channel(SyncStatus::default());

        let scheduler = Self {
            reconciler,
            interval,
            cooldown,
            requests: request_rx,
            status: status_tx,
        };
        let handle = SyncHandle {
            requests: request_tx,
            status: status_rx,
        };
        (scheduler, handle)
    }

    /// Run until every [`SyncHandle`] has been dropped.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval = %humantime::format_duration(self.interval),
            cooldown = %humantime::format_duration(self.cooldown),
            "sync scheduler started"
        );

        loop {
            let trigger = tokio::select! {
                _ = ticker.tick() => Trigger::Interval,
                request = self.requests.recv() => match request {
                    Some(()) => Trigger::Requested,
                    None => break,
                },
            };

            if self.run_once(trigger).await {
                self.set_state(SyncState::Cooldown);
                tokio::time::sleep(self.cooldown).await;
            }
            self.set_state(SyncState::Idle);
        }

        tracing::info!("sync scheduler stopped");
    }

    /// One reconcile. Returns whether it succeeded.
    async fn run_once(&self, trigger: Trigger) -> bool {
        self.set_state(SyncState::Reconciling);
        tracing::debug!(trigger = trigger.as_str(), "reconciling");

        let reconciler = Arc::clone(&self.reconciler);
        let result = tokio::task::spawn_blocking(move || {
            reconciler.reconcile().map_err(|e| e.to_string())
        })
        .await
        .unwrap_or_else(|join_err| Err(format!("reconcile task failed: {join_err}")));

        match result {
            Ok(()) => {
                tracing::info!(trigger = trigger.as_str(), "sync succeeded");
                self.status.send_modify(|s| {
                    s.runs += 1;
                    s.last_success = Some(Utc::now());
                    s.last_error = None;
                    s.last_failure = None;
                });
                true
            }
            Err(error) => {
                tracing::warn!(trigger = trigger.as_str(), %error, "sync failed");
                self.status.send_modify(|s| {
                    s.runs += 1;
                    s.last_error = Some(error);
                    s.last_failure = Some(Utc::now());
                });
                false
            }
        }
    }

    fn set_state(&self, state: SyncState) {
        self.status.send_modify(|s| s.state = state);
    }
}
