use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use civicdesk_core::SubjectId;

use super::profile::{AggregatedProfile, Domain, DomainSlot, Subject};
use super::scoring::{alignment_scores, data_quality};
use super::sources::{DomainSource, SourceError, SourceSet};
use crate::cache::{CacheError, TieredCache};

/// How long a built profile is served from cache.
pub const PROFILE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("profile cache unavailable: {0}")]
    Cache(#[from] CacheError),
}

pub fn cache_key(id: &SubjectId) -> String {
    format!("rep_profile_{id}")
}

/// Builds representative profiles from independent sources.
///
/// Domain failures end up inside the profile; only a cache that can neither
/// read nor write makes a call fail.
#[derive(Debug, Clone)]
pub struct Aggregator {
    cache: Arc<TieredCache>,
    sources: SourceSet,
    ttl: Duration,
}

impl Aggregator {
    pub fn new(cache: Arc<TieredCache>, sources: SourceSet) -> Self {
        Self {
            cache,
            sources,
            ttl: PROFILE_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn cache(&self) -> &Arc<TieredCache> {
        &self.cache
    }

    /// Cached profile if fresh, otherwise a newly built one.
    pub async fn get_representative_profile(
        &self,
        subject: &Subject,
    ) -> Result<AggregatedProfile, AggregateError> {
        let key = cache_key(&subject.id);
        if let Some(profile) = self.cache.get::<AggregatedProfile>(&key).await {
            info!(subject = %subject.id, "using cached profile");
            return Ok(profile);
        }
        self.refresh_profile(subject).await
    }

    /// Rebuild unconditionally and overwrite the cached copy.
    pub async fn refresh_profile(
        &self,
        subject: &Subject,
    ) -> Result<AggregatedProfile, AggregateError> {
        info!(subject = %subject.id, name = %subject.name, "building fresh profile");
        let profile = self.build(subject).await;
        self.cache
            .set(&cache_key(&subject.id), &profile, Some(self.ttl))
            .await?;
        Ok(profile)
    }

    /// Fan out to every domain and wait for all of them to settle.
    pub async fn build(&self, subject: &Subject) -> AggregatedProfile {
        let shared = Arc::new(subject.clone());

        let finance = spawn_fetch(self.sources.finance.clone(), shared.clone());
        let ratings = spawn_fetch(self.sources.ratings.clone(), shared.clone());
        let news = spawn_fetch(self.sources.news.clone(), shared.clone());
        let state_info = spawn_fetch(self.sources.state_info.clone(), shared);

        let (campaign_finance, ratings, news, state_info) = tokio::join!(
            settle(Domain::CampaignFinance, &subject.id, finance),
            settle(Domain::Ratings, &subject.id, ratings),
            settle(Domain::News, &subject.id, news),
            settle(Domain::StateInfo, &subject.id, state_info),
        );

        let alignment_scores = alignment_scores(&ratings);
        let data_quality = data_quality(&campaign_finance, &ratings, &news, &state_info);
        info!(
            subject = %subject.id,
            score = data_quality.score,
            completeness = data_quality.completeness,
            "profile built"
        );

        AggregatedProfile {
            id: subject.id.clone(),
            name: subject.name.clone(),
            party: subject.party.clone(),
            state: subject.state.clone(),
            district: subject.district.clone(),
            chamber: subject.chamber,
            contact: subject.contact.clone(),
            campaign_finance,
            ratings,
            news,
            state_info,
            alignment_scores,
            data_quality,
            last_updated: Utc::now(),
            sources: self.sources.names(),
        }
    }
}

fn spawn_fetch<T: Send + 'static>(
    source: Arc<dyn DomainSource<Output = T>>,
    subject: Arc<Subject>,
) -> JoinHandle<Result<T, SourceError>> {
    tokio::spawn(async move { source.fetch(&subject).await })
}

async fn settle<T>(
    domain: Domain,
    subject: &SubjectId,
    handle: JoinHandle<Result<T, SourceError>>,
) -> DomainSlot<T> {
    match handle.await {
        Ok(Ok(data)) => DomainSlot::Available(data),
        Ok(Err(err)) => {
            warn!(subject = %subject, domain = %domain, error = %err, "domain unavailable");
            DomainSlot::unavailable(domain, err.to_string())
        }
        Err(err) => {
            warn!(subject = %subject, domain = %domain, error = %err, "domain task aborted");
            DomainSlot::unavailable(domain, "source task aborted")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::profile::{CampaignFinance, NewsArticle, Rating, RatingsRecord, StateLegislator};
    use crate::cache::CacheConfig;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed<T> {
        value: T,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl<T: Clone + Send + Sync + 'static> DomainSource for Fixed<T> {
        type Output = T;

        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch(&self, _subject: &Subject) -> Result<T, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.value.clone())
        }
    }

    struct Broken;

    #[async_trait]
    impl DomainSource for Broken {
        type Output = CampaignFinance;

        fn name(&self) -> &str {
            "broken"
        }

        async fn fetch(&self, _subject: &Subject) -> Result<CampaignFinance, SourceError> {
            Err(SourceError::Status {
                status: 503,
                body: "maintenance".to_string(),
            })
        }
    }

    struct Panics;

    #[async_trait]
    impl DomainSource for Panics {
        type Output = Vec<NewsArticle>;

        fn name(&self) -> &str {
            "panics"
        }

        async fn fetch(&self, _subject: &Subject) -> Result<Vec<NewsArticle>, SourceError> {
            panic!("scraper bug");
        }
    }

    struct Slow;

    #[async_trait]
    impl DomainSource for Slow {
        type Output = Option<StateLegislator>;

        fn name(&self) -> &str {
            "slow"
        }

        async fn fetch(&self, _subject: &Subject) -> Result<Option<StateLegislator>, SourceError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(None)
        }
    }

    fn subject() -> Subject {
        Subject::new(SubjectId::new("A000360").unwrap(), "Ada Lovelace").with_state("WA")
    }

    fn ratings_source(calls: &Arc<AtomicUsize>) -> Arc<Fixed<RatingsRecord>> {
        Arc::new(Fixed {
            value: RatingsRecord {
                ratings: vec![Rating::new("AFL-CIO", "88"), Rating::new("Sierra Club", "76")],
                ..RatingsRecord::default()
            },
            calls: calls.clone(),
        })
    }

    fn aggregator(dir: &std::path::Path, sources: SourceSet) -> Aggregator {
        let cache = Arc::new(TieredCache::new(CacheConfig::default().with_dir(dir)));
        Aggregator::new(cache, sources)
    }

    #[tokio::test]
    async fn one_failing_domain_is_marked_and_others_survive() {
        let tmp = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let sources = SourceSet::unconfigured()
            .with_finance(Arc::new(Broken))
            .with_ratings(ratings_source(&calls))
            .with_news(Arc::new(Fixed { value: Vec::<NewsArticle>::new(), calls: calls.clone() }))
            .with_state_info(Arc::new(Slow));

        let profile = aggregator(tmp.path(), sources)
            .get_representative_profile(&subject())
            .await
            .unwrap();

        let failure = profile.campaign_finance.failure().unwrap();
        assert_eq!(failure.domain, Domain::CampaignFinance);
        assert!(failure.error.contains("503"));
        assert_eq!(profile.ratings.available().unwrap().ratings.len(), 2);
        assert!(profile.news.is_available());
        assert_eq!(profile.state_info, DomainSlot::Available(None));

        assert_eq!(profile.alignment_scores.worker_rights, Some(88));
        assert_eq!(profile.alignment_scores.environment, Some(76));
        assert_eq!(profile.alignment_scores.overall, Some(82));
        assert_eq!(profile.data_quality.completeness, 0.75);
        assert_eq!(profile.data_quality.score, 20);
    }

    #[tokio::test]
    async fn panicking_source_becomes_error_marker() {
        let tmp = tempfile::tempdir().unwrap();
        let sources = SourceSet::unconfigured().with_news(Arc::new(Panics));

        let profile = aggregator(tmp.path(), sources).build(&subject()).await;
        assert_eq!(profile.news.failure().unwrap().error, "source task aborted");
        assert_eq!(profile.data_quality.completeness, 0.0);
    }

    #[tokio::test]
    async fn second_lookup_is_served_from_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let agg = aggregator(
            tmp.path(),
            SourceSet::unconfigured().with_ratings(ratings_source(&calls)),
        );

        let first = agg.get_representative_profile(&subject()).await.unwrap();
        let second = agg.get_representative_profile(&subject()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);

        agg.refresh_profile(&subject()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cached_profile_survives_a_restart() {
        let tmp = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let sources = SourceSet::unconfigured().with_ratings(ratings_source(&calls));

        let built = aggregator(tmp.path(), sources.clone())
            .get_representative_profile(&subject())
            .await
            .unwrap();
        let reloaded = aggregator(tmp.path(), sources)
            .get_representative_profile(&subject())
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(built, reloaded);
    }

    #[tokio::test]
    async fn unusable_cache_is_the_only_hard_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("blocked");
        std::fs::write(&blocker, b"").unwrap();
        let cache = Arc::new(TieredCache::new(
            CacheConfig::default().with_dir(&blocker).with_max_memory_bytes(0),
        ));

        let err = Aggregator::new(cache, SourceSet::unconfigured())
            .get_representative_profile(&subject())
            .await
            .unwrap_err();
        assert!(matches!(err, AggregateError::Cache(CacheError::Unavailable { .. })));
    }

    #[test]
    fn key_uses_subject_id() {
        assert_eq!(cache_key(&SubjectId::new("A000360").unwrap()), "rep_profile_A000360");
    }
}
