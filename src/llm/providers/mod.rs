//! Provider construction from config.

pub mod dummy;
pub mod openai_compatible;

use crate::config::LlmConfig;

use super::{LlmProvider, ProviderError};

/// Build the provider selected by `config.provider`.
///
/// `api_key` comes from the `LLM_API_KEY` env var — never TOML. It is
/// optional so keyless local endpoints keep working.
pub fn build(config: &LlmConfig, api_key: Option<String>) -> Result<LlmProvider, ProviderError> {
    match config.provider.as_str() {
        "openai" => Ok(LlmProvider::OpenAiCompatible(
            openai_compatible::OpenAiCompatibleProvider::new(
                config.openai.api_base_url.clone(),
                config.openai.model.clone(),
                config.openai.timeout_seconds,
                api_key,
            )?,
        )),
        "dummy" => Ok(LlmProvider::Dummy(dummy::DummyProvider::default())),
        other => Err(ProviderError::UnknownProvider(other.to_string())),
    }
}
