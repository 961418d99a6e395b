//! Core job types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use civicdesk_core::JobId;

/// Job lifecycle status.
///
/// `Pending -> Processing -> {Completed | Failed}`. Terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, routine has not reported progress yet
    Pending,
    /// Routine is running
    Processing,
    /// Finished with a result
    Completed,
    /// Finished with an error
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a job failed.
///
/// `message` is user-facing. `detail` carries the full error chain and is
/// kept server-side (logs, diagnostics); it is never serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub message: String,
    pub detail: Option<String>,
}

impl JobFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Top-level message for users, `{:#}` chain for diagnostics.
    pub fn from_error(err: &anyhow::Error) -> Self {
        Self {
            message: err.to_string(),
            detail: Some(format!("{err:#}")),
        }
    }
}

/// One unit of asynchronous work.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    /// Kind of work, used to pick the routine (e.g. `llm-chat`)
    pub job_type: String,
    /// Submission payload; read-only after creation
    pub input: JsonValue,
    pub status: JobStatus,
    /// 0-100
    pub progress: u8,
    /// Latest progress note
    pub message: String,
    /// Present only when `status == Completed`
    pub result: Option<JsonValue>,
    /// Present only when `status == Failed`
    pub error: Option<JobFailure>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a new pending job.
    pub fn new(job_type: impl Into<String>, input: JsonValue) -> Self {
        Self {
            id: JobId::new(),
            job_type: job_type.into(),
            input,
            status: JobStatus::Pending,
            progress: 0,
            message: "Job created, waiting to start...".to_string(),
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Record progress; the first call moves the job to `Processing`.
    pub fn mark_progress(&mut self, progress: u8, message: String) {
        self.progress = progress.min(100);
        self.message = message;
        if self.status == JobStatus::Pending {
            self.mark_started();
        }
    }

    /// Mark job as completed.
    pub fn mark_completed(&mut self, result: JsonValue) {
        if self.started_at.is_none() {
            self.mark_started();
        }
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.message = "Job completed successfully".to_string();
        self.result = Some(result);
        self.completed_at = Some(Utc::now());
    }

    /// Mark job as failed.
    pub fn mark_failed(&mut self, failure: JobFailure) {
        if self.started_at.is_none() {
            self.mark_started();
        }
        self.status = JobStatus::Failed;
        self.message = if failure.message.is_empty() {
            "Job failed".to_string()
        } else {
            failure.message.clone()
        };
        self.error = Some(failure);
        self.completed_at = Some(Utc::now());
    }

    fn mark_started(&mut self) {
        self.status = JobStatus::Processing;
        self.started_at = Some(Utc::now());
    }

    /// Seconds since start; frozen at completion for finished jobs.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> Option<f64> {
        let started = self.started_at?;
        let end = self.completed_at.unwrap_or(now);
        let millis = (end - started).num_milliseconds().max(0);
        Some((millis as f64 / 100.0).round() / 10.0)
    }

    pub fn view(&self, now: DateTime<Utc>) -> JobStatusView {
        JobStatusView {
            exists: true,
            id: Some(self.id),
            job_type: Some(self.job_type.clone()),
            status: Some(self.status),
            progress: self.progress,
            message: self.message.clone(),
            created_at: Some(self.created_at),
            started_at: self.started_at,
            completed_at: self.completed_at,
            elapsed_seconds: self.elapsed_seconds(now),
        }
    }
}

/// Read-only snapshot returned to pollers.
///
/// Unknown (or swept) ids produce `exists == false` rather than an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatusView {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<JobId>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    /// `None` only when the job does not exist (serialized as `"not_found"`)
    #[serde(serialize_with = "serialize_status")]
    pub status: Option<JobStatus>,
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: Option<f64>,
}

impl JobStatusView {
    pub fn not_found() -> Self {
        Self {
            exists: false,
            id: None,
            job_type: None,
            status: None,
            progress: 0,
            message: "Job not found".to_string(),
            created_at: None,
            started_at: None,
            completed_at: None,
            elapsed_seconds: None,
        }
    }
}

fn serialize_status<S>(status: &Option<JobStatus>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(status.map_or("not_found", |s| s.as_str()))
}

/// Job counts by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobStats {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl JobStats {
    /// Jobs not yet in a terminal state.
    pub fn active(&self) -> usize {
        self.pending + self.processing
    }
}
