//! Chat-completion client.
//!
//! The pipeline depends only on the [`TextGenerator`] trait; the production
//! implementation is [`ChatCompletionClient`], which issues one bearer-token
//! authenticated, non-streamed request to an OpenAI-compatible endpoint per
//! call.
//!
//! There is no retry here. Callers decide what to do on failure: the
//! extractor and deep-dive stages fall back to cheaper paths, the synthesis
//! stage retries with backoff.

use crate::config::GenerationConfig;
use crate::error::GenerationError;
use crate::models::ChatMessage;
use crate::utils::truncate_for_log;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Something that turns a role-tagged conversation into generated text.
pub trait TextGenerator {
    /// Run one completion.
    ///
    /// # Arguments
    ///
    /// * `messages` - The conversation, in order
    /// * `max_tokens` - Token ceiling for the generated text
    /// * `timeout` - Upper bound for the whole request
    async fn generate(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<String, GenerationError>;
}

/// HTTP implementation of [`TextGenerator`].
pub struct ChatCompletionClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl fmt::Debug for ChatCompletionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCompletionClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

impl ChatCompletionClient {
    /// Build a client with its own connection pool.
    pub fn new(config: &GenerationConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("daily_brief/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self::with_http(config, http))
    }

    /// Build a client on top of an existing [`reqwest::Client`].
    pub fn with_http(config: &GenerationConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl TextGenerator for ChatCompletionClient {
    #[instrument(level = "info", skip_all, fields(model = %self.model, max_tokens = max_tokens))]
    async fn generate(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<String, GenerationError> {
        let t0 = Instant::now();
        let request = CompletionRequest {
            model: &self.model,
            messages,
            stream: false,
            max_tokens,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(elapsed_ms = t0.elapsed().as_millis(), error = %e, "Completion request failed");
                GenerationError::Transport(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                elapsed_ms = t0.elapsed().as_millis(),
                body = %truncate_for_log(&body, 300),
                "Completion endpoint rejected the request"
            );
            return Err(GenerationError::NonSuccessStatus {
                status: status.as_u16(),
                body,
            });
        }

        let content = parse_completion(&body)?;
        debug!(
            elapsed_ms = t0.elapsed().as_millis(),
            chars = content.chars().count(),
            "Completion succeeded"
        );
        Ok(content)
    }
}

/// Pull the first choice's message text out of a completion response body.
pub fn parse_completion(body: &str) -> Result<String, GenerationError> {
    let parsed: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| GenerationError::MalformedResponse("no choices in response".to_string()))?;
    if content.trim().is_empty() {
        return Err(GenerationError::MalformedResponse(
            "empty message content".to_string(),
        ));
    }
    Ok(content)
}
