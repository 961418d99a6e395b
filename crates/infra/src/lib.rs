//! Infrastructure layer: job orchestration, caching, aggregation, external
//! providers and configuration.

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod external;
pub mod jobs;
pub mod maintenance;
