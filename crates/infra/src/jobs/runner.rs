//! Async task runner: create a job, detach its routine, report the outcome.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::task::JoinError;
use tracing::{Instrument, error, info_span, warn};

use civicdesk_core::JobId;

use super::store::JobStore;
use super::types::JobFailure;

/// Type-specific work executed in the background for one job.
///
/// Return `Ok(result)` to complete the job or `Err` to fail it. Panics are
/// caught by the runner and also end the job in `failed`.
#[async_trait]
pub trait JobRoutine: Send + Sync + 'static {
    async fn run(&self, ctx: JobContext) -> anyhow::Result<JsonValue>;
}

/// What a routine sees of its job.
#[derive(Clone)]
pub struct JobContext {
    id: JobId,
    job_type: String,
    input: JsonValue,
    store: Arc<dyn JobStore>,
}

impl JobContext {
    /// Deserialize the submission payload.
    pub fn input_as<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        serde_json::from_value(self.input.clone())
            .with_context(|| format!("invalid input for {} job", self.job_type))
    }

    /// Report a progress milestone.
    pub fn progress(&self, progress: u8, message: &str) {
        self.store.update_progress(self.id, progress, message);
    }
}

impl std::fmt::Debug for JobContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobContext")
            .field("id", &self.id)
            .field("job_type", &self.job_type)
            .finish_non_exhaustive()
    }
}

/// Reasons `submit` refuses work. Nothing is created when these are returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("job input must not be empty")]
    EmptyInput,
    #[error("unknown job type: {0}")]
    UnknownJobType(String),
    #[error("too many active jobs (limit {limit}); retry later")]
    Saturated { limit: usize },
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Max pending + processing jobs before `submit` rejects
    pub max_active: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self { max_active: 64 }
    }
}

impl RunnerConfig {
    pub fn with_max_active(mut self, max_active: usize) -> Self {
        self.max_active = max_active;
        self
    }
}

/// Decouples request latency from work latency.
///
/// `submit` creates the job and spawns its routine without awaiting it.
pub struct TaskRunner {
    store: Arc<dyn JobStore>,
    routines: HashMap<String, Arc<dyn JobRoutine>>,
    config: RunnerConfig,
}

impl TaskRunner {
    pub fn new(store: Arc<dyn JobStore>, config: RunnerConfig) -> Self {
        Self {
            store,
            routines: HashMap::new(),
            config,
        }
    }

    /// Register the routine for a job type, replacing any previous one.
    pub fn register(&mut self, job_type: impl Into<String>, routine: impl JobRoutine) {
        self.routines.insert(job_type.into(), Arc::new(routine));
    }

    pub fn with_routine(mut self, job_type: impl Into<String>, routine: impl JobRoutine) -> Self {
        self.register(job_type, routine);
        self
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Create a job and start its routine in the background.
    ///
    /// Must be called from within a tokio runtime. Returns as soon as the job
    /// exists; the routine's own outcome only ever reaches the job store.
    pub fn submit(&self, job_type: &str, input: JsonValue) -> Result<JobId, SubmitError> {
        if is_empty_input(&input) {
            return Err(SubmitError::EmptyInput);
        }

        let routine = self
            .routines
            .get(job_type)
            .cloned()
            .ok_or_else(|| SubmitError::UnknownJobType(job_type.to_string()))?;

        let id = self
            .store
            .try_create(job_type, input.clone(), self.config.max_active)
            .map_err(|full| {
                warn!(job_type, active = full.active, limit = full.limit, "rejecting submission");
                SubmitError::Saturated { limit: full.limit }
            })?;
        let ctx = JobContext {
            id,
            job_type: job_type.to_string(),
            input,
            store: self.store.clone(),
        };

        let span = info_span!("job", job_id = %id, job_type);
        // Detached; the outcome is recorded by `supervise`.
        tokio::spawn(supervise(self.store.clone(), routine, ctx).instrument(span));

        Ok(id)
    }
}

/// Run the routine in its own task so a panic surfaces as a `JoinError`
/// here instead of tearing down anything else.
async fn supervise(store: Arc<dyn JobStore>, routine: Arc<dyn JobRoutine>, ctx: JobContext) {
    let id = ctx.id;
    let work = tokio::spawn(async move { routine.run(ctx).await }.in_current_span());

    match work.await {
        Ok(Ok(result)) => store.complete(id, result),
        Ok(Err(err)) => store.fail(id, JobFailure::from_error(&err)),
        Err(join_err) => {
            let detail = describe_join_error(join_err);
            error!(job_id = %id, detail = %detail, "job routine aborted");
            store.fail(
                id,
                JobFailure::new("Job failed unexpectedly").with_detail(detail),
            );
        }
    }
}

fn describe_join_error(err: JoinError) -> String {
    if err.is_panic() {
        panic_message(err.into_panic())
    } else {
        "routine task was cancelled".to_string()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panic: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panic: {msg}")
    } else {
        "panic with non-string payload".to_string()
    }
}

fn is_empty_input(input: &JsonValue) -> bool {
    match input {
        JsonValue::Null => true,
        JsonValue::Object(map) => map.is_empty(),
        JsonValue::String(s) => s.trim().is_empty(),
        JsonValue::Array(items) => items.is_empty(),
        _ => false,
    }
}
