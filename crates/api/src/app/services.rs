//! Component wiring shared by every handler.

use std::sync::Arc;

use anyhow::Context as _;
use tracing::{info, warn};

use civicdesk_ai::{CivicAnalyst, HttpAnalyst, HttpAnalystConfig, UnconfiguredAnalyst};
use civicdesk_infra::aggregator::{Aggregator, SourceSet};
use civicdesk_infra::cache::TieredCache;
use civicdesk_infra::config::AppConfig;
use civicdesk_infra::external::{FecConfig, FecFinanceSource, OpenStatesConfig, OpenStatesSource};
use civicdesk_infra::jobs::routines::{civic_chat, representative_profile};
use civicdesk_infra::jobs::{
    InMemoryJobStore, JobManagerConfig, JobStore, RunnerConfig, TaskRunner, spawn_sweeper,
};
use civicdesk_infra::maintenance::PeriodicTask;

/// Request limits enforced before a chat job is created.
#[derive(Debug, Clone, Copy)]
pub struct ChatLimits {
    pub max_message_chars: usize,
}

impl Default for ChatLimits {
    fn default() -> Self {
        Self {
            max_message_chars: 4000,
        }
    }
}

pub struct AppServices {
    pub jobs: Arc<dyn JobStore>,
    pub runner: TaskRunner,
    pub aggregator: Aggregator,
    pub cache: Arc<TieredCache>,
    pub chat_limits: ChatLimits,
}

impl AppServices {
    /// Wire the runner and its routines around an existing cache, source set
    /// and analyst. Jobs live in a fresh in-memory store.
    pub fn new(
        cache: Arc<TieredCache>,
        sources: SourceSet,
        analyst: Arc<dyn CivicAnalyst>,
        runner_config: RunnerConfig,
        chat_limits: ChatLimits,
    ) -> Self {
        let jobs: Arc<dyn JobStore> = InMemoryJobStore::arc();
        let aggregator = Aggregator::new(Arc::clone(&cache), sources);

        let runner = TaskRunner::new(Arc::clone(&jobs), runner_config)
            .with_routine(civic_chat::JOB_TYPE, civic_chat::CivicChatRoutine::new(analyst))
            .with_routine(
                representative_profile::JOB_TYPE,
                representative_profile::RepresentativeProfileRoutine::new(aggregator.clone()),
            );

        Self {
            jobs,
            runner,
            aggregator,
            cache,
            chat_limits,
        }
    }

    /// Production wiring from environment configuration.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let cache = Arc::new(TieredCache::new(config.cache.clone()));
        let analyst = build_analyst(config)?;
        let sources = build_sources(config)?;
        info!(sources = ?sources.names(), cache_dir = %config.cache.dir.display(), "services wired");

        Ok(Self::new(
            cache,
            sources,
            analyst,
            config.runner.clone(),
            ChatLimits {
                max_message_chars: config.chat_max_message_chars,
            },
        ))
    }

    /// Start the job sweeper and cache cleanup. Dropping the returned tasks
    /// stops them.
    pub fn spawn_maintenance(&self, jobs_config: JobManagerConfig) -> Vec<PeriodicTask> {
        vec![
            spawn_sweeper(Arc::clone(&self.jobs), jobs_config),
            self.cache.spawn_cleanup(),
        ]
    }
}

fn build_analyst(config: &AppConfig) -> anyhow::Result<Arc<dyn CivicAnalyst>> {
    let Some(llm) = &config.llm else {
        warn!("LLM_API_URL not set; chat jobs will fail until an analyst is configured");
        return Ok(Arc::new(UnconfiguredAnalyst));
    };

    let mut analyst_config = HttpAnalystConfig::new(&llm.api_url, &llm.model);
    if let Some(key) = &llm.api_key {
        analyst_config = analyst_config.with_api_key(key);
    }
    let analyst = HttpAnalyst::new(analyst_config).context("failed to build LLM client")?;
    Ok(Arc::new(analyst))
}

fn build_sources(config: &AppConfig) -> anyhow::Result<SourceSet> {
    let finance = FecFinanceSource::new(
        FecConfig::new(&config.fec_api_key).with_timeout(config.source_timeout),
    )
    .context("failed to build FEC client")?;
    let mut sources = SourceSet::unconfigured().with_finance(Arc::new(finance));

    match &config.openstates_api_key {
        Some(key) => {
            let state = OpenStatesSource::new(
                OpenStatesConfig::new(key).with_timeout(config.source_timeout),
            )
            .context("failed to build OpenStates client")?;
            sources = sources.with_state_info(Arc::new(state));
        }
        None => warn!("OPENSTATES_API_KEY not set; state data will be reported unavailable"),
    }

    Ok(sources)
}
