//! Controller loop driving the engine.
//!
//! The controller:
//! - Reconciles the policy object on a periodic resync
//! - Reconciles on demand when triggered through a [`ControllerHandle`]
//! - Retries failed triggers with exponential backoff until the retry
//!   budget is exhausted, then falls back to the resync interval
//!
//! Only one policy object is managed. The sidecar container name is global,
//! so two policies would fight over the same slot in every workload.

use std::sync::Arc;
use std::time::Duration;

use sidecar_reconcile::{
    backoff_delay, ObjectKey, RetryTracker, BASE_RETRY_DELAY, DEFAULT_MAX_RETRIES,
    DEFAULT_RESYNC_INTERVAL, DEFAULT_RETRY_WINDOW,
};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::engine::{Engine, Outcome};

/// Capacity of the trigger queue.
const TRIGGER_QUEUE_DEPTH: usize = 64;

/// Controller loop configuration.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Interval between periodic resyncs.
    pub resync_interval: Duration,

    /// Retries per key within the retry window before backing off to resync.
    pub max_retries: u32,

    /// Window over which retries are counted.
    pub retry_window: Duration,

    /// Delay before the first retry; doubles on each further failure.
    pub retry_base_delay: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            resync_interval: DEFAULT_RESYNC_INTERVAL,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_window: DEFAULT_RETRY_WINDOW,
            retry_base_delay: BASE_RETRY_DELAY,
        }
    }
}

impl From<&Config> for ControllerConfig {
    fn from(config: &Config) -> Self {
        Self {
            resync_interval: Duration::from_secs(config.resync_interval_secs),
            max_retries: config.max_retries,
            retry_window: Duration::from_secs(config.retry_window_secs),
            retry_base_delay: BASE_RETRY_DELAY,
        }
    }
}

/// Sends reconciliation triggers to a running [`Controller`].
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: mpsc::Sender<ObjectKey>,
}

impl ControllerHandle {
    /// Request reconciliation of `key`. Returns false if the controller has
    /// stopped.
    pub async fn trigger(&self, key: ObjectKey) -> bool {
        self.tx.send(key).await.is_ok()
    }
}

/// Controller for the single sidecar policy.
pub struct Controller {
    engine: Arc<Engine>,
    policy: ObjectKey,
    config: ControllerConfig,
    triggers: mpsc::Receiver<ObjectKey>,
    retries: RetryTracker,
    retry_at: Option<Instant>,
}

impl Controller {
    /// Create a controller and the handle used to trigger it.
    pub fn new(
        engine: Arc<Engine>,
        policy: ObjectKey,
        config: ControllerConfig,
    ) -> (Self, ControllerHandle) {
        let (tx, triggers) = mpsc::channel(TRIGGER_QUEUE_DEPTH);
        let retries = RetryTracker::new(config.max_retries, config.retry_window);
        let controller = Self {
            engine,
            policy,
            config,
            triggers,
            retries,
            retry_at: None,
        };
        (controller, ControllerHandle { tx })
    }

    /// Run the controller loop until shutdown.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            policy = %self.policy,
            resync_interval_secs = self.config.resync_interval.as_secs(),
            max_retries = self.config.max_retries,
            "Starting controller loop"
        );

        let mut resync = tokio::time::interval(self.config.resync_interval);
        resync.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let retry_at = self.retry_at;

            tokio::select! {
                _ = resync.tick() => {
                    debug!("Periodic resync");
                    self.reconcile_policy().await;
                }
                Some(key) = self.triggers.recv() => {
                    if key == self.policy {
                        self.reconcile_policy().await;
                    } else {
                        warn!(key = %key, policy = %self.policy, "Ignoring trigger for unmanaged object");
                    }
                }
                _ = tokio::time::sleep_until(retry_at.unwrap_or_else(Instant::now)), if retry_at.is_some() => {
                    debug!("Retrying failed reconciliation");
                    self.reconcile_policy().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Controller shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Reconcile the policy object once and schedule any retry.
    async fn reconcile_policy(&mut self) {
        let retry_key = self.policy.to_string();

        match self.engine.reconcile(&self.policy).await {
            Ok(outcome) => {
                self.retries.clear(&retry_key);
                self.retry_at = None;
                match outcome {
                    Outcome::Gone => debug!(policy = %self.policy, "Policy not present"),
                    Outcome::Skipped => debug!(policy = %self.policy, "Policy already finalized"),
                    Outcome::Finalized(summary) => info!(
                        policy = %self.policy,
                        workloads_changed = summary.workloads_changed,
                        "Policy finalized"
                    ),
                    Outcome::Converged(summary) => debug!(
                        policy = %self.policy,
                        workloads_seen = summary.workloads_seen,
                        workloads_changed = summary.workloads_changed,
                        "Policy converged"
                    ),
                }
            }
            Err(e) => {
                let cause = e.store_error();
                let exhausted = self.retries.record_failure(&retry_key);
                if exhausted {
                    error!(
                        policy = %self.policy,
                        error = %e,
                        cause = %cause,
                        conflict = e.is_conflict(),
                        retryable = cause.is_retryable(),
                        "Reconciliation failed, retries exhausted until next resync"
                    );
                    self.retries.clear(&retry_key);
                    self.retry_at = None;
                } else {
                    let attempt = self.retries.attempts(&retry_key);
                    let delay = backoff_delay(self.config.retry_base_delay, attempt);
                    warn!(
                        policy = %self.policy,
                        error = %e,
                        cause = %cause,
                        conflict = e.is_conflict(),
                        retryable = cause.is_retryable(),
                        attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        "Reconciliation failed, will retry"
                    );
                    self.retry_at = Some(Instant::now() + delay);
                }
            }
        }
    }
}
