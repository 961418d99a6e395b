//! Source client boundary: one adapter per data domain.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use super::profile::{CampaignFinance, NewsArticle, RatingsRecord, StateLegislator, Subject};

/// Fetches one domain of data for a subject.
///
/// Adapters own their timeouts. On failure they return an error rather than
/// partial data; the aggregator turns it into a per-domain marker.
#[async_trait]
pub trait DomainSource: Send + Sync + 'static {
    type Output: Send + 'static;

    /// Human-readable provider name, listed in the profile's `sources`.
    fn name(&self) -> &str;

    async fn fetch(&self, subject: &Subject) -> Result<Self::Output, SourceError>;
}

pub type FinanceSource = Arc<dyn DomainSource<Output = CampaignFinance>>;
pub type RatingsSource = Arc<dyn DomainSource<Output = RatingsRecord>>;
pub type NewsSource = Arc<dyn DomainSource<Output = Vec<NewsArticle>>>;
pub type StateSource = Arc<dyn DomainSource<Output = Option<StateLegislator>>>;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("source not configured: {0}")]
    NotConfigured(String),

    #[error("subject has no {0}")]
    MissingIdentifier(&'static str),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected provider response: {0}")]
    Decode(String),
}

/// The adapters the aggregator fans out to.
#[derive(Clone)]
pub struct SourceSet {
    pub finance: FinanceSource,
    pub ratings: RatingsSource,
    pub news: NewsSource,
    pub state_info: StateSource,
}

impl SourceSet {
    /// Every domain fails with `NotConfigured`.
    pub fn unconfigured() -> Self {
        Self {
            finance: Arc::new(UnconfiguredSource::new("campaign finance")),
            ratings: Arc::new(UnconfiguredSource::new("ratings")),
            news: Arc::new(UnconfiguredSource::new("news")),
            state_info: Arc::new(UnconfiguredSource::new("state legislature")),
        }
    }

    pub fn with_finance(mut self, source: FinanceSource) -> Self {
        self.finance = source;
        self
    }

    pub fn with_ratings(mut self, source: RatingsSource) -> Self {
        self.ratings = source;
        self
    }

    pub fn with_news(mut self, source: NewsSource) -> Self {
        self.news = source;
        self
    }

    pub fn with_state_info(mut self, source: StateSource) -> Self {
        self.state_info = source;
        self
    }

    pub fn names(&self) -> Vec<String> {
        [
            self.finance.name(),
            self.ratings.name(),
            self.news.name(),
            self.state_info.name(),
        ]
        .into_iter()
        .map(str::to_string)
        .collect()
    }
}

impl std::fmt::Debug for SourceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Placeholder for a domain with no credentials or provider.
pub struct UnconfiguredSource<T> {
    label: String,
    _output: PhantomData<fn() -> T>,
}

impl<T> UnconfiguredSource<T> {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: format!("{} (not configured)", label.into()),
            _output: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Send + 'static> DomainSource for UnconfiguredSource<T> {
    type Output = T;

    fn name(&self) -> &str {
        &self.label
    }

    async fn fetch(&self, _subject: &Subject) -> Result<T, SourceError> {
        Err(SourceError::NotConfigured(self.label.clone()))
    }
}
