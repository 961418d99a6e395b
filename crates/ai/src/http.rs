//! Analyst backed by an OpenAI-compatible chat-completions endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

use crate::analyst::CivicAnalyst;
use crate::result::{AiError, AnalysisRequest, AnalysisResult};

const SYSTEM_PROMPT: &str = "You are a nonpartisan civic information assistant. \
Explain legislation, representatives and government processes in plain language. \
Stick to verifiable facts, say when you are unsure, and cite the provided sources by title when you use them.";

#[derive(Debug, Clone)]
pub struct HttpAnalystConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl HttpAnalystConfig {
    pub fn new(api_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: None,
            model: model.into(),
            timeout: Duration::from_secs(60),
            temperature: 0.3,
            max_tokens: 1500,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct HttpAnalyst {
    client: reqwest::Client,
    config: HttpAnalystConfig,
}

impl HttpAnalyst {
    pub fn new(config: HttpAnalystConfig) -> Result<Self, AiError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn build_body(&self, request: &AnalysisRequest) -> JsonValue {
        let mut messages = vec![json!({ "role": "system", "content": SYSTEM_PROMPT })];
        for turn in &request.conversation_history {
            messages.push(json!({ "role": turn.role, "content": turn.content }));
        }
        messages.push(json!({ "role": "user", "content": build_user_prompt(request) }));

        json!({
            "model": self.config.model,
            "messages": messages,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        })
    }
}

#[async_trait]
impl CivicAnalyst for HttpAnalyst {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult, AiError> {
        if request.message.trim().is_empty() {
            return Err(AiError::InvalidInput("message is empty".to_string()));
        }

        let body = self.build_body(&request);
        let mut call = self
            .client
            .post(&self.config.api_url)
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(key) = &self.config.api_key {
            call = call.bearer_auth(key);
        }

        let response = call.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "analyst endpoint rejected request");
            return Err(AiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: JsonValue = response.json().await?;
        let mut result = parse_completion(&payload)?;
        result.sources = request.context_sources();
        debug!(
            model = ?result.model,
            tokens = ?result.tokens,
            chars = result.response.len(),
            "analyst responded"
        );
        Ok(result)
    }
}

fn build_user_prompt(request: &AnalysisRequest) -> String {
    let mut prompt = request.message.trim().to_string();

    let sources = request.context_sources();
    if !sources.is_empty() {
        prompt.push_str("\n\nSources:\n");
        for (i, source) in sources.iter().enumerate() {
            prompt.push_str(&format!("{}. {} ({})\n", i + 1, source.title, source.url));
            if let Some(snippet) = &source.snippet {
                prompt.push_str(&format!("   {snippet}\n"));
            }
        }
    }

    let extra = match &request.context {
        JsonValue::Object(map) => map
            .iter()
            .filter(|(k, _)| k.as_str() != "sources")
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>(),
        _ => Vec::new(),
    };
    if !extra.is_empty() {
        prompt.push_str("\n\nContext:\n");
        prompt.push_str(&extra.join("\n"));
    }

    prompt
}

/// Extract the first choice, model and token usage from a completion payload.
fn parse_completion(payload: &JsonValue) -> Result<AnalysisResult, AiError> {
    let content = payload["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| AiError::Decode("missing choices[0].message.content".to_string()))?
        .trim()
        .to_string();

    if content.is_empty() {
        return Err(AiError::EmptyResponse);
    }

    Ok(AnalysisResult {
        response: content,
        sources: Vec::new(),
        model: payload["model"].as_str().map(ToString::to_string),
        tokens: payload["usage"]["total_tokens"].as_u64(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ConversationTurn;

    #[test]
    fn parses_first_choice_and_usage() {
        let payload = json!({
            "model": "llama-3.3-70b-versatile",
            "choices": [{"message": {"role": "assistant", "content": "  HB 2147 funds rural broadband. "}}],
            "usage": {"total_tokens": 412}
        });

        let result = parse_completion(&payload).unwrap();
        assert_eq!(result.response, "HB 2147 funds rural broadband.");
        assert_eq!(result.model.as_deref(), Some("llama-3.3-70b-versatile"));
        assert_eq!(result.tokens, Some(412));
    }

    #[test]
    fn blank_content_is_empty_response() {
        let payload = json!({"choices": [{"message": {"content": "   "}}]});
        assert!(matches!(parse_completion(&payload), Err(AiError::EmptyResponse)));
    }

    #[test]
    fn missing_choices_is_decode_error() {
        assert!(matches!(parse_completion(&json!({})), Err(AiError::Decode(_))));
    }

    #[test]
    fn body_includes_history_then_user_prompt() {
        let analyst =
            HttpAnalyst::new(HttpAnalystConfig::new("http://localhost:9/v1/chat", "m")).unwrap();
        let request = AnalysisRequest::new("What does HB 2147 do?")
            .with_context(json!({"state": "WA"}))
            .with_history(vec![ConversationTurn {
                role: "user".to_string(),
                content: "Hi".to_string(),
            }]);

        let body = analyst.build_body(&request);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["content"], "Hi");
        let user = messages[2]["content"].as_str().unwrap();
        assert!(user.starts_with("What does HB 2147 do?"));
        assert!(user.contains("state: \"WA\""));
    }

    #[tokio::test]
    async fn empty_message_is_rejected_before_any_request() {
        let analyst =
            HttpAnalyst::new(HttpAnalystConfig::new("http://localhost:9/v1/chat", "m")).unwrap();
        let err = analyst.analyze(AnalysisRequest::new("  ")).await.unwrap_err();
        assert!(matches!(err, AiError::InvalidInput(_)));
    }
}
