//! Configuration loading with env-var overrides.
//!
//! Reads a TOML file and applies `TUTOR_WORK_DIR` and `TUTOR_LOG_LEVEL`
//! overrides. A missing default file resolves to hardcoded defaults rather
//! than an error; an explicitly requested file must exist.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AppError;

use super::raw::RawConfig;
use super::{Config, LlmConfig, OpenAiConfig, ServerConfig, StoreConfig};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Load config from the given path, or `config/default.toml`, then apply
/// env-var overrides. If no path is given and the default file does not
/// exist, returns hardcoded defaults.
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let raw = match config_path {
        Some(path) => read_raw(Path::new(path))?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                read_raw(default_path)?
            } else {
                RawConfig::default()
            }
        }
    };
    resolve(raw)
}

fn read_raw(path: &Path) -> Result<RawConfig, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
    toml::from_str(&text)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))
}

fn resolve(raw: RawConfig) -> Result<Config, AppError> {
    let work_dir_str = env::var("TUTOR_WORK_DIR")
        .ok()
        .or(raw.work_dir)
        .unwrap_or_else(|| "~/.tutor-bot".to_string());
    let log_level = env::var("TUTOR_LOG_LEVEL")
        .ok()
        .or(raw.log_level)
        .unwrap_or_else(|| "info".to_string());

    crate::logger::parse_level(&log_level)
        .map_err(|e| AppError::Config(format!("invalid log_level: {e}")))?;

    Ok(Config {
        log_level,
        work_dir: expand_home(&work_dir_str),
        constants_path: PathBuf::from(
            raw.constants_path
                .unwrap_or_else(|| "data/physics_constants.json".to_string()),
        ),
        prompts_dir: PathBuf::from(
            raw.prompts_dir.unwrap_or_else(|| "config/prompts".to_string()),
        ),
        server: ServerConfig {
            bind: raw.server.bind.unwrap_or_else(|| "127.0.0.1:8080".to_string()),
        },
        store: StoreConfig {
            persist: raw.store.persist.unwrap_or(true),
        },
        llm: LlmConfig {
            provider: raw.llm.provider.unwrap_or_else(|| "openai".to_string()),
            openai: OpenAiConfig {
                api_base_url: raw.llm.openai.api_base_url.unwrap_or_else(|| {
                    "https://api.openai.com/v1/chat/completions".to_string()
                }),
                model: raw.llm.openai.model.unwrap_or_else(|| "gpt-4o-mini".to_string()),
                timeout_seconds: raw.llm.openai.timeout_seconds.unwrap_or(60),
            },
        },
    })
}

/// Expand a leading `~/` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_without_file() {
        let config = resolve(RawConfig::default()).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.llm.provider, "openai");
        assert!(config.store.persist);
        assert_eq!(config.prompts_dir, PathBuf::from("config/prompts"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let raw: RawConfig =
            toml::from_str("log_level = \"debug\"\n[llm]\nprovider = \"dummy\"\n").unwrap();
        let config = resolve(raw).unwrap();
        assert_eq!(config.llm.provider, "dummy");
        assert_eq!(config.llm.openai.model, "gpt-4o-mini");
    }

    #[test]
    fn invalid_log_level_rejected() {
        let raw: RawConfig = toml::from_str("log_level = \"loud\"\n").unwrap();
        assert!(resolve(raw).is_err());
    }

    #[test]
    fn home_expansion() {
        let p = expand_home("~/state");
        assert!(!p.starts_with("~"));
        assert!(p.ends_with("state"));
    }

    #[test]
    fn missing_explicit_file_errors() {
        assert!(load(Some("/nonexistent/tutor.toml")).is_err());
    }
}
