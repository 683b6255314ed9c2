//! Finalizer bookkeeping for the desired-state object.
//!
//! The engine holds a finalizer token on the desired state while it may
//! still have sidecars injected into workloads. Deletion of the desired
//! state is blocked until the token is removed, which only happens after
//! every workload has been stripped.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Token identifying this engine's stake in the deletion-gating set.
pub const SIDECAR_FINALIZER: &str = "finalizer.bvwells.github.com";

/// Set of finalizer tokens on an object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FinalizerSet(BTreeSet<String>);

impl FinalizerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a token. Returns true if it was not already present.
    pub fn insert(&mut self, token: &str) -> bool {
        self.0.insert(token.to_string())
    }

    /// Remove a token. Returns true if it was present.
    pub fn remove(&mut self, token: &str) -> bool {
        self.0.remove(token)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for FinalizerSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Lifecycle phase of a desired-state object, as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizerPhase {
    /// Token absent, deletion not requested. The engine must add the token.
    NotRequested,

    /// Token present, deletion not requested. Normal convergence.
    Active,

    /// Token present, deletion requested. The engine must clean up.
    Finalizing,

    /// Token absent, deletion requested. Nothing left for the engine to do.
    Removed,
}

impl FinalizerPhase {
    /// Derive the phase from the finalizer set and the deletion flag.
    pub fn of(finalizers: &FinalizerSet, deletion_requested: bool) -> Self {
        match (finalizers.contains(SIDECAR_FINALIZER), deletion_requested) {
            (false, false) => Self::NotRequested,
            (true, false) => Self::Active,
            (true, true) => Self::Finalizing,
            (false, true) => Self::Removed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotRequested => "not_requested",
            Self::Active => "active",
            Self::Finalizing => "finalizing",
            Self::Removed => "removed",
        }
    }
}

impl std::fmt::Display for FinalizerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_remove() {
        let mut set = FinalizerSet::new();
        assert!(set.insert(SIDECAR_FINALIZER));
        assert!(!set.insert(SIDECAR_FINALIZER));
        assert!(set.contains(SIDECAR_FINALIZER));
        assert_eq!(set.len(), 1);

        assert!(set.remove(SIDECAR_FINALIZER));
        assert!(!set.remove(SIDECAR_FINALIZER));
        assert!(set.is_empty());
    }

    #[test]
    fn test_foreign_tokens_untouched() {
        let mut set: FinalizerSet = ["example.com/other", SIDECAR_FINALIZER].into_iter().collect();
        set.remove(SIDECAR_FINALIZER);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["example.com/other"]);
    }

    #[test]
    fn test_phase_transitions() {
        let empty = FinalizerSet::new();
        let held: FinalizerSet = [SIDECAR_FINALIZER].into_iter().collect();

        assert_eq!(FinalizerPhase::of(&empty, false), FinalizerPhase::NotRequested);
        assert_eq!(FinalizerPhase::of(&held, false), FinalizerPhase::Active);
        assert_eq!(FinalizerPhase::of(&held, true), FinalizerPhase::Finalizing);
        assert_eq!(FinalizerPhase::of(&empty, true), FinalizerPhase::Removed);
    }

    #[test]
    fn test_token_held_by_existing_deployments() {
        // Objects finalized by earlier operator releases carry this exact token.
        let existing: FinalizerSet = ["finalizer.bvwells.github.com"].into_iter().collect();
        assert!(existing.contains(SIDECAR_FINALIZER));
        assert_eq!(FinalizerPhase::of(&existing, true), FinalizerPhase::Finalizing);
    }

    #[test]
    fn test_serializes_as_array() {
        let set: FinalizerSet = ["b", "a"].into_iter().collect();
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["a","b"]"#);

        let parsed: FinalizerSet = serde_json::from_str(r#"["x"]"#).unwrap();
        assert!(parsed.contains("x"));
    }
}
