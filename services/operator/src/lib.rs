//! Sidecar Operator Library
//!
//! The operator keeps every workload in the fleet running the sidecar
//! container declared by a single policy object, and removes it again when
//! the policy is deleted.
//!
//! ## Architecture
//!
//! ```text
//! Controller (resync / triggers / retries)
//! └── Engine                 (one trigger for one policy)
//!     ├── convergence        (patch or strip every workload)
//!     └── StatusReporter     (write status only when it changes)
//! ```
//!
//! The engine reaches stored objects only through the traits in [`store`].
//! [`memory`] provides in-memory implementations used for standalone runs
//! and tests.

pub mod config;
pub mod controller;
pub mod convergence;
pub mod engine;
pub mod memory;
pub mod seed;
pub mod status;
pub mod store;

// Re-export commonly used types
pub use controller::{Controller, ControllerConfig, ControllerHandle};
pub use engine::{Engine, Outcome};
pub use memory::{InMemoryDesiredStateStore, InMemoryWorkloadStore};
pub use status::StatusReporter;
pub use store::{DesiredStateStore, WorkloadStore};
