//! LLM provider abstraction.
//!
//! `LlmProvider` is an enum over concrete provider implementations.
//! Add a new variant + module in `providers/` for each additional backend.
//!
//! Provider instances are shared immutable capabilities — clone them freely.
//! Enum dispatch avoids `dyn` trait objects and the `async-trait` dependency;
//! adding a backend = new module + new variant + new `complete` arm.

pub mod gateway;
pub mod providers;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("provider request failed: {0}")]
    Request(String),
}

/// One generation round-trip.
///
/// The provider owns endpoint/model details; callers control sampling and
/// the output token limit per request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system: Option<String>,
    /// Sampling temperature in `[0.0, 1.0]`.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_output_tokens: u32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            temperature: 0.7,
            max_output_tokens: 1024,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// All available provider backends.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    OpenAiCompatible(providers::openai_compatible::OpenAiCompatibleProvider),
    Dummy(providers::dummy::DummyProvider),
}

impl LlmProvider {
    /// Send the request to the provider and return its text reply.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        match self {
            LlmProvider::OpenAiCompatible(p) => p.complete(request).await,
            LlmProvider::Dummy(p) => p.complete(request).await,
        }
    }
}
