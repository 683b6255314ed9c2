//! Stored objects the engine reads and writes.

use serde::{Deserialize, Serialize};

use crate::container::Container;
use crate::finalizer::{FinalizerPhase, FinalizerSet};
use crate::key::ObjectKey;

/// The declared sidecar policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesiredState {
    pub key: ObjectKey,

    /// Version assigned by the store on every write.
    #[serde(default)]
    pub resource_version: u64,

    /// Sidecar image every workload should run.
    pub image: String,

    #[serde(default)]
    pub finalizers: FinalizerSet,

    /// Set once by an external actor; never cleared.
    #[serde(default)]
    pub deletion_requested: bool,

    /// Last reported health. Empty until the first successful pass.
    #[serde(default)]
    pub status: String,
}

impl DesiredState {
    pub fn new(key: ObjectKey, image: impl Into<String>) -> Self {
        Self {
            key,
            resource_version: 0,
            image: image.into(),
            finalizers: FinalizerSet::new(),
            deletion_requested: false,
            status: String::new(),
        }
    }

    pub fn phase(&self) -> FinalizerPhase {
        FinalizerPhase::of(&self.finalizers, self.deletion_requested)
    }
}

/// A managed unit with an ordered container list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workload {
    pub key: ObjectKey,

    #[serde(default)]
    pub resource_version: u64,

    #[serde(default)]
    pub containers: Vec<Container>,
}

impl Workload {
    pub fn new(key: ObjectKey, containers: Vec<Container>) -> Self {
        Self {
            key,
            resource_version: 0,
            containers,
        }
    }

    /// The sidecar container, if one is present.
    pub fn sidecar(&self) -> Option<&Container> {
        self.containers.iter().find(|c| c.is_sidecar())
    }
}
