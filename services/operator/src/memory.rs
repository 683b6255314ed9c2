//! In-memory store implementations.
//!
//! Used by the operator binary in standalone mode and by tests. The stores
//! enforce resource-version optimistic concurrency and support fault
//! injection so failure paths can be exercised.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use sidecar_reconcile::{DesiredState, ObjectKey, ObjectKind, StoreError, Workload};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::store::{DesiredStateStore, WorkloadStore};

/// Monotonic resource-version source shared by both stores.
#[derive(Debug, Default)]
struct VersionClock(AtomicU64);

impl VersionClock {
    fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

fn check_version(
    kind: ObjectKind,
    key: &ObjectKey,
    expected: u64,
    actual: u64,
) -> Result<(), StoreError> {
    if expected != actual {
        return Err(StoreError::Conflict {
            kind,
            key: key.clone(),
            expected,
            actual,
        });
    }
    Ok(())
}

fn injected(what: &str) -> StoreError {
    StoreError::Transient(format!("injected failure: {what}"))
}

/// In-memory desired-state store.
///
/// Objects whose deletion was requested are removed as soon as their
/// finalizer set is empty.
#[derive(Debug, Default)]
pub struct InMemoryDesiredStateStore {
    objects: RwLock<BTreeMap<ObjectKey, DesiredState>>,
    clock: VersionClock,
    fail_gets: AtomicBool,
    fail_updates: AtomicBool,
    update_calls: AtomicU64,
    status_update_calls: AtomicU64,
}

impl InMemoryDesiredStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace an object, as a user would.
    pub async fn apply(&self, mut state: DesiredState) -> DesiredState {
        state.resource_version = self.clock.next();
        info!(key = %state.key, image = %state.image, "Desired state applied");
        self.objects
            .write()
            .await
            .insert(state.key.clone(), state.clone());
        state
    }

    /// Change the sidecar image of an existing object.
    pub async fn set_image(&self, key: &ObjectKey, image: &str) -> Option<DesiredState> {
        let mut objects = self.objects.write().await;
        let state = objects.get_mut(key)?;
        state.image = image.to_string();
        state.resource_version = self.clock.next();
        Some(state.clone())
    }

    /// Request deletion of an object. Objects without finalizers go away
    /// immediately.
    pub async fn request_deletion(&self, key: &ObjectKey) -> bool {
        let mut objects = self.objects.write().await;
        let Some(state) = objects.get_mut(key) else {
            return false;
        };

        state.deletion_requested = true;
        state.resource_version = self.clock.next();
        if state.finalizers.is_empty() {
            objects.remove(key);
            debug!(key = %key, "Desired state deleted without finalizers");
        }
        true
    }

    /// Current copy of an object.
    pub async fn snapshot(&self, key: &ObjectKey) -> Option<DesiredState> {
        self.objects.read().await.get(key).cloned()
    }

    /// Make every `get` fail with a transient error.
    pub fn set_fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    /// Make every `update` and `update_status` fail with a transient error.
    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Number of `update` calls received (including failed ones).
    pub fn update_calls(&self) -> u64 {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Number of `update_status` calls received (including failed ones).
    pub fn status_update_calls(&self) -> u64 {
        self.status_update_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DesiredStateStore for InMemoryDesiredStateStore {
    async fn get(&self, key: &ObjectKey) -> Result<DesiredState, StoreError> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(injected("get"));
        }

        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: ObjectKind::DesiredState,
                key: key.clone(),
            })
    }

    async fn update(&self, state: &DesiredState) -> Result<DesiredState, StoreError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(injected("update"));
        }

        let mut objects = self.objects.write().await;
        let stored = objects
            .get_mut(&state.key)
            .ok_or_else(|| StoreError::NotFound {
                kind: ObjectKind::DesiredState,
                key: state.key.clone(),
            })?;
        check_version(
            ObjectKind::DesiredState,
            &state.key,
            state.resource_version,
            stored.resource_version,
        )?;

        stored.finalizers = state.finalizers.clone();
        stored.resource_version = self.clock.next();
        let updated = stored.clone();

        if updated.deletion_requested && updated.finalizers.is_empty() {
            objects.remove(&state.key);
            debug!(key = %state.key, "Desired state deleted after last finalizer removed");
        }

        Ok(updated)
    }

    async fn update_status(&self, state: &DesiredState) -> Result<DesiredState, StoreError> {
        self.status_update_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(injected("update_status"));
        }

        let mut objects = self.objects.write().await;
        let stored = objects
            .get_mut(&state.key)
            .ok_or_else(|| StoreError::NotFound {
                kind: ObjectKind::DesiredState,
                key: state.key.clone(),
            })?;
        check_version(
            ObjectKind::DesiredState,
            &state.key,
            state.resource_version,
            stored.resource_version,
        )?;

        stored.status = state.status.clone();
        stored.resource_version = self.clock.next();
        Ok(stored.clone())
    }
}

/// In-memory workload store.
#[derive(Debug, Default)]
pub struct InMemoryWorkloadStore {
    workloads: RwLock<BTreeMap<ObjectKey, Workload>>,
    clock: VersionClock,
    fail_list: AtomicBool,
    failing_updates: RwLock<HashSet<ObjectKey>>,
    update_calls: AtomicU64,
}

impl InMemoryWorkloadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a workload, as its owner would.
    pub async fn apply(&self, mut workload: Workload) -> Workload {
        workload.resource_version = self.clock.next();
        self.workloads
            .write()
            .await
            .insert(workload.key.clone(), workload.clone());
        workload
    }

    /// Delete a workload, as its owner would.
    pub async fn remove(&self, key: &ObjectKey) -> Option<Workload> {
        self.workloads.write().await.remove(key)
    }

    pub async fn snapshot(&self, key: &ObjectKey) -> Option<Workload> {
        self.workloads.read().await.get(key).cloned()
    }

    /// Make `list` fail with a transient error.
    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Make every `update` of `key` fail with a transient error.
    pub async fn fail_updates_for(&self, key: ObjectKey) {
        self.failing_updates.write().await.insert(key);
    }

    /// Drop all injected update failures.
    pub async fn clear_update_failures(&self) {
        self.failing_updates.write().await.clear();
    }

    /// Number of `update` calls received (including failed ones).
    pub fn update_calls(&self) -> u64 {
        self.update_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkloadStore for InMemoryWorkloadStore {
    async fn list(&self) -> Result<Vec<Workload>, StoreError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(injected("list"));
        }
        Ok(self.workloads.read().await.values().cloned().collect())
    }

    async fn update(&self, workload: &Workload) -> Result<Workload, StoreError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_updates.read().await.contains(&workload.key) {
            return Err(injected("workload update"));
        }

        let mut workloads = self.workloads.write().await;
        let stored = workloads
            .get_mut(&workload.key)
            .ok_or_else(|| StoreError::NotFound {
                kind: ObjectKind::Workload,
                key: workload.key.clone(),
            })?;
        check_version(
            ObjectKind::Workload,
            &workload.key,
            workload.resource_version,
            stored.resource_version,
        )?;

        stored.containers = workload.containers.clone();
        stored.resource_version = self.clock.next();
        Ok(stored.clone())
    }
}
