//! `representative-profile`: build (or fetch cached) profile in the background.

use anyhow::Context as _;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::aggregator::{Aggregator, Subject};
use crate::jobs::runner::{JobContext, JobRoutine};

pub const JOB_TYPE: &str = "representative-profile";

/// Job input: the subject plus an optional cache bypass.
#[derive(Debug, Deserialize)]
struct ProfileRequest {
    #[serde(flatten)]
    subject: Subject,
    #[serde(default)]
    refresh: bool,
}

pub struct RepresentativeProfileRoutine {
    aggregator: Aggregator,
}

impl RepresentativeProfileRoutine {
    pub fn new(aggregator: Aggregator) -> Self {
        Self { aggregator }
    }
}

#[async_trait]
impl JobRoutine for RepresentativeProfileRoutine {
    async fn run(&self, ctx: JobContext) -> anyhow::Result<JsonValue> {
        let request: ProfileRequest = ctx.input_as()?;

        ctx.progress(10, "Checking cached profile...");
        let built = if request.refresh {
            self.aggregator.refresh_profile(&request.subject).await
        } else {
            self.aggregator
                .get_representative_profile(&request.subject)
                .await
        };
        let profile = built.context("Profile aggregation failed")?;

        ctx.progress(90, "Assembling profile...");
        serde_json::to_value(profile).context("failed to encode profile")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::SourceSet;
    use crate::cache::{CacheConfig, TieredCache};
    use crate::jobs::runner::{RunnerConfig, TaskRunner};
    use crate::jobs::store::InMemoryJobStore;
    use crate::jobs::types::JobStatus;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn profile_job_completes_with_degraded_profile() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = Arc::new(TieredCache::new(CacheConfig::default().with_dir(tmp.path())));
        let aggregator = Aggregator::new(cache, SourceSet::unconfigured());
        let runner = TaskRunner::new(InMemoryJobStore::arc(), RunnerConfig::default())
            .with_routine(JOB_TYPE, RepresentativeProfileRoutine::new(aggregator));

        let id = runner
            .submit(
                JOB_TYPE,
                json!({"id": "A000360", "name": "Ada Lovelace", "state": "WA", "refresh": true}),
            )
            .unwrap();

        let mut status = None;
        for _ in 0..200 {
            status = runner.store().status(id).status.filter(|s| s.is_terminal());
            if status.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(status, Some(JobStatus::Completed));

        let profile = runner.store().result(id).unwrap();
        assert_eq!(profile["id"], "A000360");
        assert_eq!(profile["campaign_finance"]["domain"], "campaign_finance");
        assert_eq!(profile["data_quality"]["completeness"], 0.0);
    }

    #[test]
    fn request_flattens_subject() {
        let request: ProfileRequest =
            serde_json::from_value(json!({"id": "S1", "name": "Grace Hopper"})).unwrap();
        assert!(!request.refresh);
        assert_eq!(request.subject.id.as_str(), "S1");
    }
}
