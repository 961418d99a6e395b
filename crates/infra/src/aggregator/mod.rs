//! Multi-source representative profiles.
//!
//! Each data domain is fetched concurrently by its own adapter. All outcomes
//! are gathered (a failure never cancels siblings), failures become explicit
//! per-domain markers, and the composite is cached for a week.

pub mod profile;
pub mod scoring;
pub mod service;
pub mod sources;

pub use profile::{
    AggregatedProfile, AlignmentScores, CampaignFinance, Chamber, ContactInfo, DataQuality,
    Domain, DomainFailure, DomainSlot, Donor, NewsArticle, Position, QualityLevel, Rating,
    RatingsRecord, StateLegislator, Subject, VoteRecord,
};
pub use service::{AggregateError, Aggregator, PROFILE_TTL, cache_key};
pub use sources::{
    DomainSource, FinanceSource, NewsSource, RatingsSource, SourceError, SourceSet, StateSource,
    UnconfiguredSource,
};
