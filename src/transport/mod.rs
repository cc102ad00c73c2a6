//! LLM transport boundary.
//!
//! The orchestrator builds prompts and interprets responses; the actual
//! network call belongs to a collaborator behind [`LlmTransport`]. That
//! keeps the pipeline testable with a scripted transport and lets an
//! external limiter wrap the single suspension point of a request.

pub mod http;

pub use http::{HttpTransport, HttpTransportConfig};

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Per-attempt failures reported by the transport collaborator.
/// All of them are retryable from the orchestrator's point of view.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Provider call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Provider rate limited the request")]
    RateLimited,

    #[error("Provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider returned an empty response")]
    EmptyResponse,
}

/// One fully-built model invocation
#[derive(Debug, Clone)]
pub struct InvokeRequest {
    /// Provider-prefixed model identifier, e.g. "openai/gpt-4o-mini"
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
}

/// Token counts reported by the provider, when available
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Raw provider response: text plus usage for cost accounting
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

/// The sole suspension point of the pipeline.
///
/// Implementations perform exactly one provider call per `invoke`; retry
/// policy is the orchestrator's, admission control (rate limiting,
/// concurrency caps) is the implementation's.
#[async_trait]
pub trait LlmTransport: Send + Sync {
    async fn invoke(
        &self,
        request: &InvokeRequest,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError>;
}
