//! Generation gateway — the one place the rest of the crate talks to a
//! provider, plus the shared structured-output extraction routine.
//!
//! `generate` maps every provider failure to
//! [`AppError::ServiceUnavailable`]; callers treat that as fatal for the
//! current pipeline invocation. `decode_structured` is pure — it never
//! touches the provider and is unit-tested without one.

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::AppError;
use crate::llm::{CompletionRequest, LlmProvider};

#[derive(Debug, Clone)]
pub struct Gateway {
    provider: LlmProvider,
}

impl Gateway {
    pub fn new(provider: LlmProvider) -> Self {
        Self { provider }
    }

    /// One blocking round-trip to the generation service.
    ///
    /// The only error this surfaces is `ServiceUnavailable` — callers must
    /// not catch and swallow it except at the transport boundary.
    pub async fn generate(
        &self,
        prompt: &str,
        system_instruction: Option<&str>,
        temperature: f32,
        max_output_tokens: u32,
    ) -> Result<String, AppError> {
        let mut request = CompletionRequest::new(prompt)
            .with_temperature(temperature);
        request.max_output_tokens = max_output_tokens;
        if let Some(system) = system_instruction {
            request = request.with_system(system);
        }

        self.provider
            .complete(&request)
            .await
            .map_err(|e| AppError::ServiceUnavailable(e.to_string()))
    }

    /// Recover a structured record from free-form model text.
    ///
    /// Locates the first balanced, outermost brace-delimited block (tolerant
    /// of surrounding prose and markdown code fences), parses it as JSON,
    /// verifies every name in `required_fields` is present, then
    /// deserializes into `T`.
    pub fn decode_structured<T: DeserializeOwned>(
        raw: &str,
        required_fields: &[&str],
    ) -> Result<T, AppError> {
        let block = extract_json_object(raw)
            .ok_or_else(|| AppError::Parse("no JSON object found in response".into()))?;

        let value: serde_json::Value = serde_json::from_str(&block)
            .map_err(|e| AppError::Parse(format!("invalid JSON object: {e}")))?;

        let object = value
            .as_object()
            .ok_or_else(|| AppError::Parse("extracted block is not an object".into()))?;

        let missing: Vec<&str> = required_fields
            .iter()
            .copied()
            .filter(|f| !object.contains_key(*f))
            .collect();
        if !missing.is_empty() {
            return Err(AppError::Parse(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        debug!(fields = object.len(), "decoded structured block");
        serde_json::from_value(value)
            .map_err(|e| AppError::Parse(format!("field type mismatch: {e}")))
    }
}

/// Extract the first top-level JSON object from raw text.
///
/// Depth-counts braces, skipping brace characters inside string literals so
/// values like `{"a": "}"}` extract intact. Returns `None` when no balanced
/// block exists.
fn extract_json_object(raw: &str) -> Option<String> {
    let mut start = None;
    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in raw.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' if start.is_some() => in_string = true,
            '{' => {
                if start.is_none() {
                    start = Some(idx);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start {
                        return Some(raw[s..=idx].to_string());
                    }
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Record {
        a: i64,
    }

    #[test]
    fn decodes_bare_object() {
        let r: Record = Gateway::decode_structured("{\"a\":1}", &["a"]).unwrap();
        assert_eq!(r, Record { a: 1 });
    }

    #[test]
    fn decodes_fenced_object() {
        let r: Record = Gateway::decode_structured("```json\n{\"a\":1}\n```", &["a"]).unwrap();
        assert_eq!(r, Record { a: 1 });
    }

    #[test]
    fn decodes_object_amid_prose() {
        let r: Record =
            Gateway::decode_structured("sure, here: {\"a\":1} thanks", &["a"]).unwrap();
        assert_eq!(r, Record { a: 1 });
    }

    #[test]
    fn nested_braces_balance() {
        #[derive(Deserialize)]
        struct Outer {
            inner: serde_json::Value,
        }
        let o: Outer =
            Gateway::decode_structured("x {\"inner\": {\"b\": 2}} y", &["inner"]).unwrap();
        assert_eq!(o.inner["b"], 2);
    }

    #[test]
    fn brace_inside_string_value() {
        #[derive(Deserialize)]
        struct S {
            a: String,
        }
        let s: S = Gateway::decode_structured("{\"a\": \"}\"}", &["a"]).unwrap();
        assert_eq!(s.a, "}");
    }

    #[test]
    fn missing_fields_listed() {
        let err = Gateway::decode_structured::<serde_json::Value>("{\"a\":1}", &["a", "b", "c"])
            .unwrap_err();
        match err {
            AppError::Parse(msg) => {
                assert!(msg.contains("b"));
                assert!(msg.contains("c"));
                assert!(!msg.contains("a,"));
            }
            other => panic!("expected Parse, got {other}"),
        }
    }

    #[test]
    fn no_object_is_parse_error() {
        let err = Gateway::decode_structured::<Record>("no json here", &["a"]).unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }

    #[test]
    fn unbalanced_object_is_parse_error() {
        let err = Gateway::decode_structured::<Record>("{\"a\": 1", &["a"]).unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }

    #[test]
    fn extraction_is_idempotent() {
        let inputs = [
            "{\"a\":1}",
            "```json\n{\"a\":1}\n```",
            "sure, here: {\"a\":1} thanks",
        ];
        for input in inputs {
            let r: Record = Gateway::decode_structured(input, &["a"]).unwrap();
            assert_eq!(r, Record { a: 1 });
        }
    }
}
