//! Source client adapters for external data providers.
//!
//! Domains without a real provider use
//! [`UnconfiguredSource`](crate::aggregator::UnconfiguredSource).

pub mod fec;
pub mod openstates;

pub use fec::{FecConfig, FecFinanceSource};
pub use openstates::{OpenStatesConfig, OpenStatesSource};
pub use crate::aggregator::UnconfiguredSource;
