//! `civicdesk-api`: the HTTP surface over job orchestration, the profile
//! aggregator and the cache.

pub mod app;
