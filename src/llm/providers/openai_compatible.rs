//! OpenAI-compatible chat completion provider (`/v1/chat/completions`).
//!
//! Exposes a single `complete(&CompletionRequest) -> String` interface
//! matching the rest of the `LlmProvider` abstraction. All OpenAI wire types
//! are private to this module — callers never see them. This provider is
//! stateless: history management belongs to the agent layer, which embeds
//! conversation context into the prompt text.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::llm::{CompletionRequest, ProviderError};

/// Adapter for any HTTP endpoint implementing `/v1/chat/completions`.
///
/// Covers OpenAI, OpenAI-compatible local servers (Ollama, LM Studio…), and
/// hosted alternatives. Constructed once at startup, then cheaply cloned
/// because `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    api_base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    /// Build a provider from config values and an optional API key.
    ///
    /// `api_key` is `None` for keyless local models. When present it is sent
    /// as `Authorization: Bearer <key>` on every request.
    pub fn new(
        api_base_url: String,
        model: String,
        timeout_seconds: u64,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, api_base_url, model, api_key })
    }

    /// One generation round-trip.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let mut messages = Vec::new();
        if let Some(sys) = &request.system {
            messages.push(Message { role: "system".to_string(), content: sys.clone() });
        }
        messages.push(Message { role: "user".to_string(), content: request.prompt.clone() });

        let payload = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_output_tokens,
        };

        debug!(
            model = %payload.model,
            temperature = payload.temperature,
            prompt_len = request.prompt.len(),
            "sending LLM request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full LLM request payload");
        }

        let mut req = self.client.post(&self.api_base_url).json(&payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            error!(url = %self.api_base_url, error = %e, "LLM HTTP request failed (transport)");
            ProviderError::Request(e.to_string())
        })?;

        let response = check_status(response).await?;

        let parsed = response.json::<ChatCompletionResponse>().await.map_err(|e| {
            error!(error = %e, "failed to deserialize LLM response");
            ProviderError::Request(format!("failed to parse response body: {e}"))
        })?;

        debug!(choices = parsed.choices.len(), "received LLM response");

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ProviderError::Request("empty or missing content in response".into()))
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// Error envelope used by OpenAI and compatible APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

/// Consume the response and return it if successful, or a structured error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(&body) {
        let code = env
            .error
            .code
            .map(|v| match v {
                serde_json::Value::String(s) => format!(" [code={s}]"),
                other => format!(" [code={other}]"),
            })
            .unwrap_or_default();
        format!("HTTP {status}{code}: {}", env.error.message)
    } else {
        format!("HTTP {status}: {body}")
    };

    error!(%status, %message, "LLM request returned HTTP error");
    Err(ProviderError::Request(message))
}
