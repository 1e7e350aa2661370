//! Raw TOML deserialization shapes.
//!
//! Every field is optional so partial config files stay valid; `load.rs`
//! fills in defaults when resolving into the public [`Config`](super::Config).

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub(super) struct RawConfig {
    pub log_level: Option<String>,
    pub work_dir: Option<String>,
    pub constants_path: Option<String>,
    pub prompts_dir: Option<String>,
    #[serde(default)]
    pub server: RawServer,
    #[serde(default)]
    pub store: RawStore,
    #[serde(default)]
    pub llm: RawLlm,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct RawServer {
    pub bind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct RawStore {
    pub persist: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct RawLlm {
    pub provider: Option<String>,
    #[serde(default)]
    pub openai: RawOpenAi,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct RawOpenAi {
    pub api_base_url: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
}
