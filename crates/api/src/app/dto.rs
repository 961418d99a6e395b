use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use civicdesk_ai::ConversationTurn;
use civicdesk_core::JobId;

/// Body of `POST /api/civic/llm-chat/submit`.
///
/// Forwarded to the `llm-chat` routine as its job input.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatSubmitRequest {
    pub message: String,
    #[serde(default)]
    pub context: JsonValue,
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,
}

/// 202 body for every job submission.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: JobId,
    pub status: &'static str,
    pub message: String,
    pub status_url: String,
    pub result_url: String,
}

impl SubmitResponse {
    pub fn accepted(
        job_id: JobId,
        message: impl Into<String>,
        status_url: String,
        result_url: String,
    ) -> Self {
        Self {
            job_id,
            status: "pending",
            message: message.into(),
            status_url,
            result_url,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshQuery {
    pub refresh: Option<bool>,
}
