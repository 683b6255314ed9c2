//! Sidecar reconciliation primitives.
//!
//! This library holds the pure half of the sidecar engine: the decision
//! procedure that, given a desired sidecar image and a workload's current
//! containers, computes the minimal mutation. Key concepts:
//!
//! - **Desired state**: the declared sidecar policy (image, finalizers,
//!   deletion flag, status).
//! - **Workload**: an ordered container list the engine mutates.
//! - **Convergence**: making every workload's sidecar slot match the policy,
//!   or removing it once the policy is retracted.
//!
//! # Invariants
//!
//! - `patch` and `strip` are idempotent
//! - A workload's outcome depends only on its own containers and the image
//! - Non-sidecar containers are never modified or reordered

pub mod container;
pub mod error;
pub mod finalizer;
pub mod key;
pub mod model;
pub mod retry;
pub mod status;

use std::time::Duration;

pub use container::{
    patch, strip, Container, Patched, Stripped, SIDECAR_COMMAND, SIDECAR_CONTAINER_NAME,
};
pub use error::{ObjectKind, ReconcileError, StoreError};
pub use finalizer::{FinalizerPhase, FinalizerSet, SIDECAR_FINALIZER};
pub use key::{KeyError, ObjectKey};
pub use model::{DesiredState, Workload};
pub use retry::{backoff_delay, RetryTracker, BASE_RETRY_DELAY, MAX_RETRY_DELAY};
pub use status::{HealthyPolicy, PassSummary, StatusPolicy, HEALTHY_STATUS};

/// Default interval between periodic resyncs.
pub const DEFAULT_RESYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Default retry limit per key within the retry window.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default retry window.
pub const DEFAULT_RETRY_WINDOW: Duration = Duration::from_secs(10 * 60); // 10 minutes
