//! `civicdesk-core`: shared primitives for the civic lookup services.
//!
//! This crate holds identifiers and the domain error model only (no IO, no
//! runtime). Everything that touches the network, the filesystem or tokio
//! lives in `civicdesk-infra`.

pub mod error;
pub mod id;

pub use error::DomainError;
pub use id::{JobId, SubjectId};
