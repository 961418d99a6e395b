use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// A question for the analyst, plus whatever the caller already knows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub message: String,

    /// Free-form caller context (location, topic, pre-fetched sources...).
    #[serde(default)]
    pub context: JsonValue,

    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,
}

impl AnalysisRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: JsonValue::Null,
            conversation_history: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: JsonValue) -> Self {
        self.context = context;
        self
    }

    pub fn with_history(mut self, history: Vec<ConversationTurn>) -> Self {
        self.conversation_history = history;
        self
    }

    /// Sources handed in by the caller under `context.sources`.
    ///
    /// Entries that do not parse as citations are skipped.
    pub fn context_sources(&self) -> Vec<SourceCitation> {
        self.context
            .get("sources")
            .and_then(JsonValue::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// One prior turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    pub content: String,
}

/// A source the analyst relied on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCitation {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: Option<String>,
    /// Relevance in \[0, 100\] (provider convention; not enforced).
    #[serde(default)]
    pub relevance_score: Option<f64>,
}

/// Output of a civic analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub response: String,
    pub sources: Vec<SourceCitation>,
    pub model: Option<String>,
    pub tokens: Option<u64>,
}

#[derive(Debug, Error)]
pub enum AiError {
    #[error("invalid analysis input: {0}")]
    InvalidInput(String),

    #[error("analyst not configured: {0}")]
    NotConfigured(String),

    #[error("analyst request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("analyst returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("analyst returned an empty response")]
    EmptyResponse,

    #[error("could not decode analyst response: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn context_sources_skip_malformed_entries() {
        let req = AnalysisRequest::new("What does HB 2147 do?").with_context(json!({
            "sources": [
                {"title": "Bill text", "url": "https://legislature.example/hb2147", "relevance_score": 91.0},
                {"title": "missing url"},
                "not an object"
            ]
        }));

        let sources = req.context_sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].title, "Bill text");
        assert_eq!(sources[0].relevance_score, Some(91.0));
    }

    #[test]
    fn request_defaults_when_fields_missing() {
        let req: AnalysisRequest = serde_json::from_value(json!({"message": "hi"})).unwrap();
        assert_eq!(req.context, JsonValue::Null);
        assert!(req.conversation_history.is_empty());
        assert!(req.context_sources().is_empty());
    }
}
