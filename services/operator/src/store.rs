//! Store interfaces the engine reads from and writes to.
//!
//! Every write is an optimistic-concurrency write: the store must reject it
//! with [`StoreError::Conflict`] if the object's resource version changed
//! since it was read. Successful writes return the stored object carrying
//! its new resource version.

use async_trait::async_trait;
use sidecar_reconcile::{DesiredState, ObjectKey, StoreError, Workload};

/// Access to desired-state objects.
#[async_trait]
pub trait DesiredStateStore: Send + Sync {
    /// Fetch a desired state. Missing objects yield [`StoreError::NotFound`].
    async fn get(&self, key: &ObjectKey) -> Result<DesiredState, StoreError>;

    /// Persist the object's finalizers.
    async fn update(&self, state: &DesiredState) -> Result<DesiredState, StoreError>;

    /// Persist the object's status.
    async fn update_status(&self, state: &DesiredState) -> Result<DesiredState, StoreError>;
}

/// Access to the workload fleet.
#[async_trait]
pub trait WorkloadStore: Send + Sync {
    /// List every workload.
    async fn list(&self) -> Result<Vec<Workload>, StoreError>;

    /// Persist the workload's containers.
    async fn update(&self, workload: &Workload) -> Result<Workload, StoreError>;
}
