//! `llm-chat`: answer a civic question with the configured analyst.

use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;

use civicdesk_ai::{AnalysisRequest, AnalysisResult, CivicAnalyst, SourceCitation};

use crate::jobs::runner::{JobContext, JobRoutine};

pub const JOB_TYPE: &str = "llm-chat";

pub struct CivicChatRoutine {
    analyst: Arc<dyn CivicAnalyst>,
}

impl CivicChatRoutine {
    pub fn new(analyst: Arc<dyn CivicAnalyst>) -> Self {
        Self { analyst }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatAnswer {
    pub response: String,
    pub sources: Vec<SourceCitation>,
    pub metadata: ChatMetadata,
}

#[derive(Debug, Serialize)]
pub struct ChatMetadata {
    pub source_count: usize,
    pub average_relevance: f64,
    pub model: Option<String>,
    pub tokens: Option<u64>,
}

impl From<AnalysisResult> for ChatAnswer {
    fn from(result: AnalysisResult) -> Self {
        let metadata = ChatMetadata {
            source_count: result.sources.len(),
            average_relevance: average_relevance(&result.sources),
            model: result.model,
            tokens: result.tokens,
        };
        Self {
            response: result.response,
            sources: result.sources,
            metadata,
        }
    }
}

/// Mean relevance to one decimal; unscored sources count as 0.
pub fn average_relevance(sources: &[SourceCitation]) -> f64 {
    if sources.is_empty() {
        return 0.0;
    }
    let total: f64 = sources.iter().map(|s| s.relevance_score.unwrap_or(0.0)).sum();
    (total / sources.len() as f64 * 10.0).round() / 10.0
}

#[async_trait]
impl JobRoutine for CivicChatRoutine {
    async fn run(&self, ctx: JobContext) -> anyhow::Result<JsonValue> {
        let request: AnalysisRequest = ctx.input_as()?;

        ctx.progress(20, "Analyzing query and searching sources...");
        let result = self
            .analyst
            .analyze(request)
            .await
            .context("AI analysis failed")?;

        if result.response.trim().is_empty() {
            anyhow::bail!("AI analysis returned an empty response");
        }

        ctx.progress(80, "Formatting response...");
        let answer = ChatAnswer::from(result);
        serde_json::to_value(answer).context("failed to encode chat answer")
    }
}
