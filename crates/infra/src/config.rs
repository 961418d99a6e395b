//! Runtime configuration from environment variables (and an optional `.env`).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context as _, bail};

use crate::cache::CacheConfig;
use crate::jobs::{JobManagerConfig, RunnerConfig};

pub const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";

/// Language-model endpoint; absent when `LLM_API_URL` is unset.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// `json` or `pretty`
    pub log_format: String,
    pub cache: CacheConfig,
    pub jobs: JobManagerConfig,
    pub runner: RunnerConfig,
    pub chat_max_message_chars: usize,
    pub llm: Option<LlmConfig>,
    pub fec_api_key: String,
    pub openstates_api_key: Option<String>,
    pub source_timeout: Duration,
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = parse_or(&get, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?;

        let log_format = get("LOG_FORMAT")
            .map(|v| v.to_lowercase())
            .unwrap_or_else(|| "json".to_string());
        if !matches!(log_format.as_str(), "json" | "pretty") {
            bail!("LOG_FORMAT must be `json` or `pretty`, got `{log_format}`");
        }

        let cache = CacheConfig::default()
            .with_dir(get("CACHE_DIR").map_or_else(|| CacheConfig::default().dir, PathBuf::from))
            .with_max_memory_mb(parse_or(&get, "CACHE_MAX_MEMORY_MB", 100)?)
            .with_default_ttl(secs_or(&get, "CACHE_DEFAULT_TTL_SECS", 7 * 24 * 60 * 60)?)
            .with_cleanup_interval(secs_or(&get, "CACHE_CLEANUP_INTERVAL_SECS", 60 * 60)?);

        let jobs = JobManagerConfig::default()
            .with_retention(secs_or(&get, "JOB_RETENTION_SECS", 600)?)
            .with_sweep_interval(secs_or(&get, "JOB_SWEEP_INTERVAL_SECS", 60)?);

        let runner = RunnerConfig::default().with_max_active(parse_or(&get, "JOB_MAX_ACTIVE", 64)?);

        let llm = get("LLM_API_URL").map(|api_url| LlmConfig {
            api_url,
            api_key: get("LLM_API_KEY"),
            model: get("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
        });

        Ok(Self {
            bind_addr,
            log_format,
            cache,
            jobs,
            runner,
            chat_max_message_chars: parse_or(&get, "CHAT_MAX_MESSAGE_CHARS", 4000)?,
            llm,
            fec_api_key: get("FEC_API_KEY").unwrap_or_else(|| "DEMO_KEY".to_string()),
            openstates_api_key: get("OPENSTATES_API_KEY"),
            source_timeout: secs_or(&get, "SOURCE_TIMEOUT_SECS", 10)?,
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid value for {key}: `{raw}`")),
        None => Ok(default),
    }
}

fn secs_or(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> anyhow::Result<Duration> {
    parse_or(get, key, default).map(Duration::from_secs)
}
