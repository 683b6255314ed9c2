//! Workload convergence passes.
//!
//! A pass lists the whole fleet and applies the patch (or strip) algorithm
//! to each workload independently, writing back only workloads that
//! changed. The first failed write abandons the rest of the pass; workloads
//! already written stay converged and re-derive a no-op on the next pass.

use sidecar_reconcile::{patch, strip, Container, PassSummary, ReconcileError, Workload};
use tracing::{debug, info, instrument, warn};

use crate::store::WorkloadStore;

/// Bring every workload's sidecar slot to `image`.
#[instrument(skip(store))]
pub async fn converge(
    store: &dyn WorkloadStore,
    image: &str,
) -> Result<PassSummary, ReconcileError> {
    run_pass(store, |workload| {
        let patched = patch(&workload.containers, image);
        patched.changed.then_some(patched.containers)
    })
    .await
}

/// Remove the sidecar from every workload.
#[instrument(skip(store))]
pub async fn finalize(store: &dyn WorkloadStore) -> Result<PassSummary, ReconcileError> {
    run_pass(store, |workload| {
        let stripped = strip(&workload.containers);
        stripped.removed.then_some(stripped.containers)
    })
    .await
}

/// Apply `mutate` to every workload; `Some` means the containers changed.
async fn run_pass<F>(store: &dyn WorkloadStore, mutate: F) -> Result<PassSummary, ReconcileError>
where
    F: Fn(&Workload) -> Option<Vec<Container>>,
{
    let workloads = store.list().await.map_err(ReconcileError::List)?;
    let mut summary = PassSummary {
        workloads_seen: workloads.len(),
        ..PassSummary::default()
    };

    for mut workload in workloads {
        let Some(containers) = mutate(&workload) else {
            continue;
        };

        workload.containers = containers;
        if let Err(e) = store.update(&workload).await {
            warn!(
                workload = %workload.key,
                error = %e,
                written = summary.workloads_changed,
                "Workload update failed, abandoning pass"
            );
            return Err(ReconcileError::Workload {
                key: workload.key,
                source: e,
            });
        }

        debug!(workload = %workload.key, "Workload updated");
        summary.workloads_changed += 1;
    }

    info!(
        workloads_seen = summary.workloads_seen,
        workloads_changed = summary.workloads_changed,
        workloads_unchanged = summary.workloads_unchanged(),
        "Convergence pass complete"
    );

    Ok(summary)
}
