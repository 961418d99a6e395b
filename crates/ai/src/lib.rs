//! `civicdesk-ai`
//!
//! **Responsibility:** language-model collaborator boundary.
//!
//! - Callers (job routines) depend on the [`CivicAnalyst`] trait only.
//! - This crate knows nothing about jobs, caches or HTTP routing.
//! - Failures are reported as [`AiError`]; callers decide how to surface them.

pub mod analyst;
pub mod http;
pub mod result;

pub use analyst::{CivicAnalyst, UnconfiguredAnalyst};
pub use http::{HttpAnalyst, HttpAnalystConfig};
pub use result::{AiError, AnalysisRequest, AnalysisResult, ConversationTurn, SourceCitation};
