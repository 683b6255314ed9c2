//! Status reporting after a successful convergence pass.
//!
//! The status is only written when it differs from the stored value: a
//! redundant write would itself produce an update event and re-trigger
//! reconciliation.

use std::sync::Arc;

use sidecar_reconcile::{DesiredState, HealthyPolicy, PassSummary, ReconcileError, StatusPolicy};
use tracing::{debug, info};

use crate::store::DesiredStateStore;

/// Writes the derived status onto the desired state.
#[derive(Clone)]
pub struct StatusReporter {
    policy: Arc<dyn StatusPolicy>,
}

impl StatusReporter {
    pub fn new(policy: Arc<dyn StatusPolicy>) -> Self {
        Self { policy }
    }

    /// Write the status for `summary` if it differs from the current one.
    ///
    /// Returns the updated object when a write happened.
    pub async fn report(
        &self,
        store: &dyn DesiredStateStore,
        state: &DesiredState,
        summary: &PassSummary,
    ) -> Result<Option<DesiredState>, ReconcileError> {
        let target = self.policy.derive(summary);
        if target == state.status {
            debug!(key = %state.key, status = %target, "Status unchanged");
            return Ok(None);
        }

        let mut next = state.clone();
        next.status = target;
        let updated = store
            .update_status(&next)
            .await
            .map_err(|source| ReconcileError::Status {
                key: state.key.clone(),
                source,
            })?;

        info!(
            key = %updated.key,
            previous = %state.status,
            status = %updated.status,
            "Status updated"
        );
        Ok(Some(updated))
    }
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new(Arc::new(HealthyPolicy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDesiredStateStore;
    use sidecar_reconcile::{ObjectKey, HEALTHY_STATUS};

    /// Reports how many workloads were touched.
    struct CountingPolicy;

    impl StatusPolicy for CountingPolicy {
        fn derive(&self, summary: &PassSummary) -> String {
            format!("Converged ({}/{} updated)", summary.workloads_changed, summary.workloads_seen)
        }
    }

    #[tokio::test]
    async fn test_writes_once_then_suppresses() {
        let store = InMemoryDesiredStateStore::new();
        let state = store
            .apply(DesiredState::new(ObjectKey::new("default", "logger"), "logger:v1"))
            .await;
        let reporter = StatusReporter::default();
        let summary = PassSummary::default();

        let updated = reporter
            .report(&store, &state, &summary)
            .await
            .unwrap()
            .expect("first report writes");
        assert_eq!(updated.status, HEALTHY_STATUS);

        let second = reporter.report(&store, &updated, &summary).await.unwrap();
        assert!(second.is_none());
        assert_eq!(store.status_update_calls(), 1);
    }

    #[tokio::test]
    async fn test_custom_policy() {
        let store = InMemoryDesiredStateStore::new();
        let state = store
            .apply(DesiredState::new(ObjectKey::new("default", "logger"), "logger:v1"))
            .await;
        let reporter = StatusReporter::new(Arc::new(CountingPolicy));
        let summary = PassSummary {
            workloads_seen: 3,
            workloads_changed: 2,
        };

        let updated = reporter.report(&store, &state, &summary).await.unwrap().unwrap();
        assert_eq!(updated.status, "Converged (2/3 updated)");
    }

    #[tokio::test]
    async fn test_failed_write_surfaces() {
        let store = InMemoryDesiredStateStore::new();
        let state = store
            .apply(DesiredState::new(ObjectKey::new("default", "logger"), "logger:v1"))
            .await;
        store.set_fail_updates(true);

        let err = StatusReporter::default()
            .report(&store, &state, &PassSummary::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Status { .. }));
        assert!(store.snapshot(&state.key).await.unwrap().status.is_empty());
    }
}
