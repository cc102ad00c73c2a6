//! OpenAI-compatible HTTP transport.
//!
//! Talks to a chat-completions endpoint that accepts provider-prefixed
//! model identifiers, in practice a LiteLLM-style gateway, which is how
//! the registry can mix models from several vendors behind one wire
//! protocol. Admission control lives here: a semaphore bounds concurrent
//! calls and a minimum inter-request interval smooths the request rate.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Semaphore};

use super::{InvokeRequest, LlmTransport, RawResponse, TokenUsage, TransportError};

#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Base URL of the chat-completions gateway
    pub base_url: String,

    /// Bearer token for the gateway
    pub api_key: String,

    /// Sampling temperature; these tasks want near-deterministic output
    pub temperature: f32,

    /// Rate limit: max concurrent requests
    pub max_concurrent_requests: usize,

    /// Rate limit: requests per second
    pub requests_per_second: f32,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000".to_string(),
            api_key: String::new(),
            temperature: 0.1,
            max_concurrent_requests: 10,
            requests_per_second: 5.0,
        }
    }
}

impl HttpTransportConfig {
    /// Build from the environment: `SEARCHMARK_LLM_BASE_URL` and an API
    /// key from `SEARCHMARK_LLM_API_KEY`, `OPENAI_API_KEY`, or `LLM_API_KEY`.
    pub fn from_env() -> Result<Self, TransportError> {
        let api_key = std::env::var("SEARCHMARK_LLM_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .or_else(|_| std::env::var("LLM_API_KEY"))
            .map_err(|_| TransportError::Network(
                "No API key found (SEARCHMARK_LLM_API_KEY, OPENAI_API_KEY, or LLM_API_KEY)".to_string(),
            ))?;

        let mut config = Self {
            api_key,
            ..Default::default()
        };
        if let Ok(base_url) = std::env::var("SEARCHMARK_LLM_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(config)
    }
}

/// Reqwest-backed transport with rate limiting
pub struct HttpTransport {
    client: Client,
    config: HttpTransportConfig,
    rate_limiter: Arc<RateLimiter>,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .build()
            .map_err(|e| TransportError::Network(format!("Failed to create HTTP client: {}", e)))?;

        let rate_limiter = Arc::new(RateLimiter::new(
            config.max_concurrent_requests,
            config.requests_per_second,
        ));

        Ok(Self {
            client,
            config,
            rate_limiter,
        })
    }
}

#[async_trait]
impl LlmTransport for HttpTransport {
    async fn invoke(
        &self,
        request: &InvokeRequest,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        self.rate_limiter.acquire().await;

        let body = ChatRequest {
            model: request.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.user_prompt.clone(),
                },
            ],
            max_tokens: request.max_tokens,
            temperature: self.config.temperature,
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
        };

        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(timeout)
                } else {
                    TransportError::Network(e.to_string())
                }
            })?;

        let status = resp.status();
        if status.as_u16() == 429 {
            tracing::warn!("[Transport] rate limited by provider for {}", request.model);
            return Err(TransportError::RateLimited);
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(TransportError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| TransportError::Network(format!("Failed to parse response: {}", e)))?;

        let text = parsed
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or(TransportError::EmptyResponse)?;

        let usage = parsed.usage.map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        Ok(RawResponse { text, usage })
    }
}

/// Rate limiter for API requests
struct RateLimiter {
    semaphore: Semaphore,
    min_interval: Duration,
    last_request: Mutex<Instant>,
}

impl RateLimiter {
    fn new(max_concurrent: usize, requests_per_second: f32) -> Self {
        Self {
            semaphore: Semaphore::new(max_concurrent.max(1)),
            min_interval: Duration::from_secs_f32(1.0 / requests_per_second.max(0.1)),
            last_request: Mutex::new(Instant::now() - Duration::from_secs(10)),
        }
    }

    async fn acquire(&self) {
        let _permit = self.semaphore.acquire().await.expect("Semaphore closed");

        let wait_time = {
            let mut last = self.last_request.lock().await;
            let elapsed = last.elapsed();
            let wait = self.min_interval.saturating_sub(elapsed);
            *last = Instant::now() + wait;
            wait
        };

        if !wait_time.is_zero() {
            tokio::time::sleep(wait_time).await;
        }
    }
}

// Wire types for the chat-completions protocol

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_wire_shape() {
        let body = ChatRequest {
            model: "openai/gpt-4o-mini".to_string(),
            messages: vec![ChatMessage {
                role: "system".to_string(),
                content: "You summarize pages.".to_string(),
            }],
            max_tokens: 500,
            temperature: 0.1,
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "openai/gpt-4o-mini");
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "system");
    }

    #[test]
    fn test_chat_response_parse() {
        let raw = r#"{
            "choices": [{"message": {"role": "assistant", "content": "{\"title\": \"x\"}"}}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 30, "total_tokens": 150}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "{\"title\": \"x\"}");
        let usage = parsed.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 120);
        assert_eq!(usage.completion_tokens, 30);
    }

    #[test]
    fn test_rate_limiter_interval() {
        let limiter = RateLimiter::new(4, 2.0);
        assert_eq!(limiter.min_interval, Duration::from_millis(500));
    }
}
