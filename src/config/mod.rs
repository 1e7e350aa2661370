//! Configuration.
//!
//! Resolved, ready-to-use structs that the rest of the crate consumes.
//! Raw TOML deserialization shapes live in `raw.rs`, loading and env-var
//! overrides in `load.rs`.

mod load;
mod raw;

pub use load::load;

use std::path::PathBuf;

/// OpenAI-compatible provider configuration, from `[llm.openai]`.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    /// Model name passed in the request body.
    pub model: String,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

/// LLM provider selection, from `[llm]`.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Active provider id: `"openai"` or `"dummy"`.
    pub provider: String,
    pub openai: OpenAiConfig,
}

/// HTTP server configuration, from `[server]`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to bind the API listener to.
    pub bind: String,
}

/// Conversation store configuration, from `[store]`.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Write conversations through to disk under `work_dir` when true;
    /// purely in-memory otherwise.
    pub persist: bool,
}

/// Fully resolved application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    /// Root directory for persisted state (`~` expanded).
    pub work_dir: PathBuf,
    /// Physics constants table location.
    pub constants_path: PathBuf,
    /// Prompt template directory.
    pub prompts_dir: PathBuf,
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub llm: LlmConfig,
}
