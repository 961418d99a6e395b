use async_trait::async_trait;

use crate::result::{AiError, AnalysisRequest, AnalysisResult};

/// Answers civic questions (bills, representatives, processes).
///
/// Implementations own their own timeouts; a call must eventually resolve.
#[async_trait]
pub trait CivicAnalyst: Send + Sync + 'static {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisResult, AiError>;
}

/// Analyst used when no model endpoint is configured.
///
/// Every call fails with [`AiError::NotConfigured`], so jobs end in `failed`
/// with a readable message instead of hanging.
#[derive(Debug, Clone, Default)]
pub struct UnconfiguredAnalyst;

#[async_trait]
impl CivicAnalyst for UnconfiguredAnalyst {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn analyze(&self, _request: AnalysisRequest) -> Result<AnalysisResult, AiError> {
        Err(AiError::NotConfigured(
            "set LLM_API_URL to enable civic analysis".to_string(),
        ))
    }
}
