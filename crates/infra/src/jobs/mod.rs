//! Asynchronous job orchestration.
//!
//! ## Design
//!
//! - Clients submit work and poll for completion instead of blocking
//! - `JobStore` is the single source of truth for job state
//! - `TaskRunner` creates the job and detaches its routine
//! - A routine reports coarse progress and ends in exactly one of
//!   complete/fail; errors and panics never escape it
//! - Finished jobs are swept after a retention window
//!
//! ## Components
//!
//! - `Job`, `JobStatus`, `JobStatusView`: lifecycle and poller snapshot
//! - `JobStore` / `InMemoryJobStore`: job table plus retention sweep
//! - `TaskRunner` / `JobRoutine`: submission and detached execution
//! - `routines`: the concrete work (civic chat, representative profile)

pub mod routines;
pub mod runner;
pub mod store;
pub mod types;

pub use runner::{JobContext, JobRoutine, RunnerConfig, SubmitError, TaskRunner};
pub use store::{
    AtCapacity, InMemoryJobStore, JobManagerConfig, JobStore, JobStoreError, spawn_sweeper,
    sweep_expired,
};
pub use types::{Job, JobFailure, JobStats, JobStatus, JobStatusView};
