//! Seeding the in-memory stores from a JSON file.
//!
//! ```json
//! {
//!   "desiredStates": [
//!     { "key": { "namespace": "default", "name": "sidecar" }, "image": "logger:v1" }
//!   ],
//!   "workloads": [
//!     { "key": { "namespace": "default", "name": "web" },
//!       "containers": [{ "name": "app", "image": "app:v1" }] }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use sidecar_reconcile::{DesiredState, Workload};
use thiserror::Error;
use tracing::info;

use crate::memory::{InMemoryDesiredStateStore, InMemoryWorkloadStore};

/// Errors loading a seed file.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse seed file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Initial contents for the in-memory stores.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seed {
    #[serde(default)]
    pub desired_states: Vec<DesiredState>,

    #[serde(default)]
    pub workloads: Vec<Workload>,
}

impl Seed {
    /// Read a seed from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, SeedError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| SeedError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load every object into the stores.
    pub async fn apply(
        self,
        desired: &InMemoryDesiredStateStore,
        workloads: &InMemoryWorkloadStore,
    ) {
        info!(
            desired_states = self.desired_states.len(),
            workloads = self.workloads.len(),
            "Seeding stores"
        );

        for state in self.desired_states {
            desired.apply(state).await;
        }
        for workload in self.workloads {
            workloads.apply(workload).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use sidecar_reconcile::ObjectKey;

    use super::*;

    #[tokio::test]
    async fn test_seed_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "desiredStates": [
                    {{ "key": {{ "namespace": "default", "name": "sidecar" }}, "image": "logger:v1" }}
                ],
                "workloads": [
                    {{ "key": {{ "namespace": "default", "name": "web" }},
                       "containers": [{{ "name": "app", "image": "app:v1" }}] }}
                ]
            }}"#
        )
        .unwrap();

        let seed = Seed::from_file(file.path()).unwrap();
        let desired = InMemoryDesiredStateStore::new();
        let workloads = InMemoryWorkloadStore::new();
        seed.apply(&desired, &workloads).await;

        let key = ObjectKey::new("default", "sidecar");
        assert_eq!(desired.snapshot(&key).await.unwrap().image, "logger:v1");
        let web = workloads
            .snapshot(&ObjectKey::new("default", "web"))
            .await
            .unwrap();
        assert_eq!(web.containers.len(), 1);
        assert!(web.resource_version > 0);
    }

    #[test]
    fn test_seed_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = Seed::from_file(file.path()).unwrap_err();
        assert!(matches!(err, SeedError::Parse { .. }));
    }

    #[test]
    fn test_seed_missing_file() {
        let err = Seed::from_file(Path::new("/nonexistent/seed.json")).unwrap_err();
        assert!(matches!(err, SeedError::Read { .. }));
    }
}
