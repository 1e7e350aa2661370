//! Layered prompt builder.
//!
//! Prompt bodies are plain-text template files under `config/prompts/` with
//! `{{key}}` variable substitution, applied once at [`build`](PromptBuilder::build)
//! time. Every layer carries an inline fallback so a missing file degrades to
//! the built-in template instead of failing the request.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

const SEPARATOR: &str = "\n\n";

pub struct PromptBuilder {
    prompts_dir: PathBuf,
    parts: Vec<String>,
    vars: HashMap<String, String>,
}

impl PromptBuilder {
    /// Create a builder rooted at `prompts_dir` (e.g. `"config/prompts"`).
    pub fn new(prompts_dir: impl Into<PathBuf>) -> Self {
        Self {
            prompts_dir: prompts_dir.into(),
            parts: Vec::new(),
            vars: HashMap::new(),
        }
    }

    /// Append a layer from `filename`, falling back to `default` when the
    /// file is missing or empty.
    pub fn layer(mut self, filename: &str, default: &str) -> Self {
        let path = self.prompts_dir.join(filename);
        let text = match fs::read_to_string(&path) {
            Ok(text) if !text.trim().is_empty() => text,
            _ => {
                tracing::debug!("prompt: layer '{}' not found — using built-in", path.display());
                default.to_string()
            }
        };
        self.parts.push(text.trim().to_string());
        self
    }

    /// Directly append a text fragment.
    pub fn append(mut self, text: impl Into<String>) -> Self {
        let s = text.into();
        let trimmed = s.trim().to_string();
        if !trimmed.is_empty() {
            self.parts.push(trimmed);
        }
        self
    }

    /// Register a `{{key}}` → `value` substitution applied at build time.
    pub fn var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }

    /// Join all layers and apply variable substitution.
    pub fn build(self) -> String {
        let mut text = self.parts.join(SEPARATOR);
        for (key, value) in &self.vars {
            text = text.replace(&format!("{{{{{key}}}}}"), value);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_used_when_file_missing() {
        let prompt = PromptBuilder::new("/nonexistent")
            .layer("absent.txt", "Question: {{question}}")
            .var("question", "why?")
            .build();
        assert_eq!(prompt, "Question: why?");
    }

    #[test]
    fn layers_join_in_order() {
        let prompt = PromptBuilder::new("/nonexistent")
            .layer("a.txt", "first")
            .append("second")
            .build();
        assert_eq!(prompt, "first\n\nsecond");
    }

    #[test]
    fn unknown_vars_left_verbatim() {
        let prompt = PromptBuilder::new("/nonexistent")
            .layer("a.txt", "{{kept}}")
            .build();
        assert_eq!(prompt, "{{kept}}");
    }

    #[test]
    fn file_layer_read_when_present() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("body.txt"), "from file: {{x}}\n").unwrap();
        let prompt = PromptBuilder::new(dir.path())
            .layer("body.txt", "fallback")
            .var("x", "1")
            .build();
        assert_eq!(prompt, "from file: 1");
    }
}
