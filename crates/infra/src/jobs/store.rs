//! Job storage: the single source of truth for job state.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::{debug, error, info, warn};

use civicdesk_core::JobId;

use super::types::{Job, JobFailure, JobStats, JobStatus, JobStatusView};
use crate::maintenance::PeriodicTask;

/// Job store abstraction.
///
/// Write methods (`update_progress`, `complete`, `fail`) never fail: they are
/// called from detached background routines, so an unknown id (e.g. swept
/// concurrently) is logged and ignored.
pub trait JobStore: Send + Sync {
    /// Insert a new pending job and return its id.
    fn create(&self, job_type: &str, input: JsonValue) -> JobId;

    /// Insert a new pending job unless `max_active` jobs are already pending
    /// or processing. Counting and inserting happen as one step.
    fn try_create(
        &self,
        job_type: &str,
        input: JsonValue,
        max_active: usize,
    ) -> Result<JobId, AtCapacity>;

    /// Record progress; the first call moves `Pending -> Processing`.
    fn update_progress(&self, job_id: JobId, progress: u8, message: &str);

    /// Move the job to `Completed` with its result.
    fn complete(&self, job_id: JobId, result: JsonValue);

    /// Move the job to `Failed`.
    fn fail(&self, job_id: JobId, failure: JobFailure);

    /// Snapshot for pollers; never errors.
    fn status(&self, job_id: JobId) -> JobStatusView;

    /// Result of a completed job.
    fn result(&self, job_id: JobId) -> Result<JsonValue, JobStoreError>;

    /// Counts by status.
    fn stats(&self) -> JobStats;

    /// Remove finished jobs whose `completed_at` is before `cutoff`.
    fn sweep_finished_before(&self, cutoff: DateTime<Utc>) -> usize;
}

/// Caller-recoverable read errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job {id} is {status}, not completed")]
    NotReady {
        id: JobId,
        status: JobStatus,
        message: String,
    },
}

/// `try_create` refused: the active-job ceiling is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{active} active jobs (limit {limit})")]
pub struct AtCapacity {
    pub active: usize,
    pub limit: usize,
}

/// Retention settings for finished jobs.
#[derive(Debug, Clone)]
pub struct JobManagerConfig {
    /// How long a finished job stays readable
    pub retention: Duration,
    /// How often the sweep runs
    pub sweep_interval: Duration,
}

impl Default for JobManagerConfig {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(10 * 60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl JobManagerConfig {
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

/// In-memory job table.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    // A panic while holding the lock cannot leave a job half-written (every
    // mutation is a single assignment sequence), so poisoned guards are reused.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<JobId, Job>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<JobId, Job>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` to a live job, warning on unknown or finished ones.
    fn mutate(&self, job_id: JobId, op: &'static str, f: impl FnOnce(&mut Job)) {
        let mut jobs = self.write();
        match jobs.get_mut(&job_id) {
            Some(job) if job.status.is_terminal() => {
                warn!(job_id = %job_id, op, status = %job.status, "job already finished; ignoring");
            }
            Some(job) => f(job),
            None => warn!(job_id = %job_id, op, "job not found; ignoring"),
        }
    }
}

impl JobStore for InMemoryJobStore {
    fn create(&self, job_type: &str, input: JsonValue) -> JobId {
        let job = Job::new(job_type, input);
        let id = job.id;
        self.write().insert(id, job);
        info!(job_id = %id, job_type, "job created");
        id
    }

    fn try_create(
        &self,
        job_type: &str,
        input: JsonValue,
        max_active: usize,
    ) -> Result<JobId, AtCapacity> {
        let mut jobs = self.write();
        let active = jobs.values().filter(|job| !job.status.is_terminal()).count();
        if active >= max_active {
            return Err(AtCapacity {
                active,
                limit: max_active,
            });
        }

        let job = Job::new(job_type, input);
        let id = job.id;
        jobs.insert(id, job);
        drop(jobs);

        info!(job_id = %id, job_type, "job created");
        Ok(id)
    }

    fn update_progress(&self, job_id: JobId, progress: u8, message: &str) {
        self.mutate(job_id, "update_progress", |job| {
            job.mark_progress(progress, message.to_string());
            debug!(job_id = %job_id, progress = job.progress, message, "job progress");
        });
    }

    fn complete(&self, job_id: JobId, result: JsonValue) {
        self.mutate(job_id, "complete", |job| {
            job.mark_completed(result);
            let secs = (Utc::now() - job.created_at).num_milliseconds() as f64 / 1000.0;
            info!(job_id = %job_id, job_type = %job.job_type, duration_secs = secs, "job completed");
        });
    }

    fn fail(&self, job_id: JobId, failure: JobFailure) {
        self.mutate(job_id, "fail", |job| {
            error!(
                job_id = %job_id,
                job_type = %job.job_type,
                message = %failure.message,
                detail = failure.detail.as_deref().unwrap_or(""),
                "job failed"
            );
            job.mark_failed(failure);
        });
    }

    fn status(&self, job_id: JobId) -> JobStatusView {
        self.read()
            .get(&job_id)
            .map(|job| job.view(Utc::now()))
            .unwrap_or_else(JobStatusView::not_found)
    }

    fn result(&self, job_id: JobId) -> Result<JsonValue, JobStoreError> {
        let jobs = self.read();
        let job = jobs.get(&job_id).ok_or(JobStoreError::NotFound(job_id))?;
        match (&job.status, &job.result) {
            (JobStatus::Completed, Some(result)) => Ok(result.clone()),
            _ => Err(JobStoreError::NotReady {
                id: job_id,
                status: job.status,
                message: job.message.clone(),
            }),
        }
    }

    fn stats(&self) -> JobStats {
        let jobs = self.read();
        let mut stats = JobStats {
            total: jobs.len(),
            ..JobStats::default()
        };

        for job in jobs.values() {
            match job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Processing => stats.processing += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
            }
        }

        stats
    }

    fn sweep_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut jobs = self.write();
        let before = jobs.len();
        jobs.retain(|_, job| job.completed_at.is_none_or(|done| done >= cutoff));
        let removed = before - jobs.len();
        if removed > 0 {
            info!(removed, "swept finished jobs");
        }
        removed
    }
}

/// Remove jobs finished longer than `retention` ago.
pub fn sweep_expired(store: &dyn JobStore, retention: Duration) -> usize {
    let retention = chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::MAX);
    let cutoff = Utc::now()
        .checked_sub_signed(retention)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    store.sweep_finished_before(cutoff)
}

/// Run [`sweep_expired`] every `config.sweep_interval`.
pub fn spawn_sweeper(store: Arc<dyn JobStore>, config: JobManagerConfig) -> PeriodicTask {
    let retention = config.retention;
    PeriodicTask::spawn("job-sweeper", config.sweep_interval, move || {
        let store = store.clone();
        async move {
            sweep_expired(store.as_ref(), retention);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_starts_pending_with_zero_progress() {
        let store = InMemoryJobStore::new();
        let id = store.create("llm-chat", json!({"message": "What does HB 2147 do?"}));

        let view = store.status(id);
        assert!(view.exists);
        assert_eq!(view.status, Some(JobStatus::Pending));
        assert_eq!(view.progress, 0);
        assert!(view.started_at.is_none());
    }

    #[test]
    fn first_progress_moves_to_processing() {
        let store = InMemoryJobStore::new();
        let id = store.create("llm-chat", json!({}));

        store.update_progress(id, 20, "Analyzing query and searching sources...");
        let view = store.status(id);
        assert_eq!(view.status, Some(JobStatus::Processing));
        assert_eq!(view.progress, 20);
        assert_eq!(view.message, "Analyzing query and searching sources...");
        assert!(view.started_at.is_some());
    }

    #[test]
    fn result_before_completion_is_not_ready() {
        let store = InMemoryJobStore::new();
        let id = store.create("llm-chat", json!({}));

        assert!(matches!(
            store.result(id),
            Err(JobStoreError::NotReady { status: JobStatus::Pending, .. })
        ));

        store.update_progress(id, 50, "halfway");
        assert!(matches!(
            store.result(id),
            Err(JobStoreError::NotReady { status: JobStatus::Processing, .. })
        ));
    }

    #[test]
    fn result_for_unknown_id_is_not_found() {
        let store = InMemoryJobStore::new();
        let id = JobId::new();
        assert_eq!(store.result(id), Err(JobStoreError::NotFound(id)));
        assert!(!store.status(id).exists);
    }

    #[test]
    fn complete_exposes_result() {
        let store = InMemoryJobStore::new();
        let id = store.create("llm-chat", json!({}));
        store.update_progress(id, 80, "Formatting response...");
        store.complete(id, json!({"response": "done", "sources": []}));

        let view = store.status(id);
        assert_eq!(view.status, Some(JobStatus::Completed));
        assert_eq!(view.progress, 100);
        assert!(view.completed_at.is_some());
        assert_eq!(store.result(id).unwrap()["response"], "done");
    }

    #[test]
    fn terminal_status_is_final() {
        let store = InMemoryJobStore::new();
        let id = store.create("llm-chat", json!({}));
        store.complete(id, json!({"response": "first"}));

        store.fail(id, JobFailure::new("late failure"));
        store.update_progress(id, 10, "late progress");
        store.complete(id, json!({"response": "second"}));

        let view = store.status(id);
        assert_eq!(view.status, Some(JobStatus::Completed));
        assert_eq!(view.progress, 100);
        assert_eq!(store.result(id).unwrap()["response"], "first");
    }

    #[test]
    fn failed_job_reports_message_and_is_not_ready() {
        let store = InMemoryJobStore::new();
        let id = store.create("llm-chat", json!({}));
        store.fail(
            id,
            JobFailure::new("AI analysis failed").with_detail("status 502 from upstream"),
        );

        let view = store.status(id);
        assert_eq!(view.status, Some(JobStatus::Failed));
        assert_eq!(view.message, "AI analysis failed");
        assert!(matches!(
            store.result(id),
            Err(JobStoreError::NotReady { status: JobStatus::Failed, .. })
        ));
    }

    #[test]
    fn writes_to_unknown_jobs_are_ignored() {
        let store = InMemoryJobStore::new();
        let ghost = JobId::new();

        store.update_progress(ghost, 10, "nobody home");
        store.complete(ghost, json!({}));
        store.fail(ghost, JobFailure::new("nope"));

        assert_eq!(store.stats(), JobStats::default());
    }

    #[test]
    fn stats_tracking() {
        let store = InMemoryJobStore::new();
        let ids: Vec<_> = (0..5).map(|i| store.create("llm-chat", json!({"i": i}))).collect();

        store.update_progress(ids[0], 20, "working");
        store.update_progress(ids[1], 20, "working");
        store.complete(ids[2], json!({}));
        store.fail(ids[3], JobFailure::new("boom"));

        let stats = store.stats();
        assert_eq!(
            stats,
            JobStats {
                total: 5,
                pending: 1,
                processing: 2,
                completed: 1,
                failed: 1,
            }
        );
        assert_eq!(stats.active(), 3);
    }

    #[test]
    fn try_create_counts_only_unfinished_jobs() {
        let store = InMemoryJobStore::new();
        let a = store.try_create("llm-chat", json!({"n": 1}), 2).unwrap();
        store.try_create("llm-chat", json!({"n": 2}), 2).unwrap();

        assert_eq!(
            store.try_create("llm-chat", json!({"n": 3}), 2),
            Err(AtCapacity { active: 2, limit: 2 })
        );
        assert_eq!(store.stats().total, 2);

        store.complete(a, json!({"ok": true}));
        assert!(store.try_create("llm-chat", json!({"n": 4}), 2).is_ok());
    }

    #[test]
    fn sweep_removes_only_finished_jobs_past_cutoff() {
        let store = InMemoryJobStore::new();
        let done = store.create("llm-chat", json!({}));
        let failed = store.create("llm-chat", json!({}));
        let running = store.create("llm-chat", json!({}));
        store.complete(done, json!({}));
        store.fail(failed, JobFailure::new("boom"));
        store.update_progress(running, 50, "still going");

        // Nothing has been finished for the full retention window yet.
        assert_eq!(sweep_expired(&store, Duration::from_secs(600)), 0);

        let removed = store.sweep_finished_before(Utc::now() + chrono::Duration::seconds(1));
        assert_eq!(removed, 2);
        assert!(!store.status(done).exists);
        assert!(matches!(store.result(failed), Err(JobStoreError::NotFound(_))));
        assert!(store.status(running).exists);
    }

    #[tokio::test]
    async fn sweeper_evicts_after_retention() {
        let store: Arc<dyn JobStore> = InMemoryJobStore::arc();
        let id = store.create("llm-chat", json!({}));
        store.complete(id, json!({}));

        let task = spawn_sweeper(
            store.clone(),
            JobManagerConfig::default()
                .with_retention(Duration::ZERO)
                .with_sweep_interval(Duration::from_millis(20)),
        );

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!store.status(id).exists);
        task.shutdown();
    }
}
