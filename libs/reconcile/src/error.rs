//! Error taxonomy for store access and reconciliation.
//!
//! There is no fatal category: every error means "the trigger failed, run
//! it again later". Correctness comes from idempotence, not local recovery.

use thiserror::Error;

use crate::key::ObjectKey;

/// Kind of stored object, for error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    DesiredState,
    Workload,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DesiredState => f.write_str("desired state"),
            Self::Workload => f.write_str("workload"),
        }
    }
}

/// Errors returned by store collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The object does not exist.
    #[error("{kind} not found: {key}")]
    NotFound { kind: ObjectKind, key: ObjectKey },

    /// The object changed since it was read (optimistic concurrency).
    #[error("{kind} {key} conflict: expected resource version {expected}, found {actual}")]
    Conflict {
        kind: ObjectKind,
        key: ObjectKey,
        expected: u64,
        actual: u64,
    },

    /// Any other read, list or write failure.
    #[error("store unavailable: {0}")]
    Transient(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Conflicts and transient failures resolve by refetching and retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Transient(_))
    }
}

/// Errors that fail a reconciliation trigger.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Reading the desired state failed.
    #[error("failed to fetch desired state {key}")]
    Fetch {
        key: ObjectKey,
        #[source]
        source: StoreError,
    },

    /// Persisting a finalizer change failed.
    #[error("failed to update finalizers on {key}")]
    Finalizer {
        key: ObjectKey,
        #[source]
        source: StoreError,
    },

    /// Listing workloads failed.
    #[error("failed to list workloads")]
    List(#[source] StoreError),

    /// Writing a workload failed; the rest of the pass was abandoned.
    #[error("failed to update workload {key}")]
    Workload {
        key: ObjectKey,
        #[source]
        source: StoreError,
    },

    /// Writing the status failed.
    #[error("failed to update status on {key}")]
    Status {
        key: ObjectKey,
        #[source]
        source: StoreError,
    },
}

impl ReconcileError {
    /// The underlying store error.
    pub fn store_error(&self) -> &StoreError {
        match self {
            Self::Fetch { source, .. }
            | Self::Finalizer { source, .. }
            | Self::List(source)
            | Self::Workload { source, .. }
            | Self::Status { source, .. } => source,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.store_error().is_conflict()
    }
}
