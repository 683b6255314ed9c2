//! Reconciliation engine.
//!
//! One call to [`Engine::reconcile`] handles one trigger for one desired
//! state:
//! - Fetch the desired state (gone means done)
//! - If deletion was requested, strip every workload and release the
//!   finalizer
//! - Otherwise ensure the finalizer, converge every workload, report status
//!
//! Any failure ends the trigger with an error and leaves the finalizer and
//! status untouched. The caller retries; idempotence makes that safe.

use std::sync::Arc;

use sidecar_reconcile::{
    DesiredState, FinalizerPhase, ObjectKey, PassSummary, ReconcileError, SIDECAR_FINALIZER,
};
use tracing::{debug, info, instrument};

use crate::convergence;
use crate::status::StatusReporter;
use crate::store::{DesiredStateStore, WorkloadStore};

/// What a successful trigger did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The desired state no longer exists.
    Gone,

    /// Deletion requested but the finalizer was already released.
    Skipped,

    /// Every workload was stripped and the finalizer released.
    Finalized(PassSummary),

    /// Every workload carries the desired sidecar.
    Converged(PassSummary),
}

/// The reconciliation engine.
pub struct Engine {
    desired: Arc<dyn DesiredStateStore>,
    workloads: Arc<dyn WorkloadStore>,
    reporter: StatusReporter,
}

impl Engine {
    /// Create an engine reporting the default healthy status.
    pub fn new(desired: Arc<dyn DesiredStateStore>, workloads: Arc<dyn WorkloadStore>) -> Self {
        Self::with_reporter(desired, workloads, StatusReporter::default())
    }

    pub fn with_reporter(
        desired: Arc<dyn DesiredStateStore>,
        workloads: Arc<dyn WorkloadStore>,
        reporter: StatusReporter,
    ) -> Self {
        Self {
            desired,
            workloads,
            reporter,
        }
    }

    /// Handle one trigger for `key`.
    #[instrument(skip(self, key), fields(key = %key))]
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<Outcome, ReconcileError> {
        let state = match self.desired.get(key).await {
            Ok(state) => state,
            Err(e) if e.is_not_found() => {
                debug!("Desired state not found, nothing to do");
                return Ok(Outcome::Gone);
            }
            Err(source) => {
                return Err(ReconcileError::Fetch {
                    key: key.clone(),
                    source,
                })
            }
        };

        let phase = state.phase();
        debug!(
            phase = %phase,
            image = %state.image,
            resource_version = state.resource_version,
            "Fetched desired state"
        );

        match phase {
            FinalizerPhase::Removed => Ok(Outcome::Skipped),
            FinalizerPhase::Finalizing => self.finalize(state).await,
            FinalizerPhase::NotRequested => {
                let state = self.add_finalizer(state).await?;
                self.converge(state).await
            }
            FinalizerPhase::Active => self.converge(state).await,
        }
    }

    async fn add_finalizer(&self, mut state: DesiredState) -> Result<DesiredState, ReconcileError> {
        info!(key = %state.key, "Adding finalizer");

        state.finalizers.insert(SIDECAR_FINALIZER);
        self.desired
            .update(&state)
            .await
            .map_err(|source| ReconcileError::Finalizer {
                key: state.key.clone(),
                source,
            })
    }

    async fn converge(&self, state: DesiredState) -> Result<Outcome, ReconcileError> {
        info!(key = %state.key, image = %state.image, "Deploying sidecar");

        let summary = convergence::converge(self.workloads.as_ref(), &state.image).await?;
        self.reporter
            .report(self.desired.as_ref(), &state, &summary)
            .await?;

        Ok(Outcome::Converged(summary))
    }

    async fn finalize(&self, mut state: DesiredState) -> Result<Outcome, ReconcileError> {
        info!(key = %state.key, "Removing sidecar from all workloads");

        let summary = convergence::finalize(self.workloads.as_ref()).await?;

        state.finalizers.remove(SIDECAR_FINALIZER);
        self.desired
            .update(&state)
            .await
            .map_err(|source| ReconcileError::Finalizer {
                key: state.key.clone(),
                source,
            })?;

        info!(
            key = %state.key,
            workloads_changed = summary.workloads_changed,
            "Finalizer released"
        );
        Ok(Outcome::Finalized(summary))
    }
}
