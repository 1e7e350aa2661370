//! Dummy LLM provider — scripted replies for tests, echo otherwise.
//!
//! With an empty script it echoes input back prefixed with `[echo]`, which
//! exercises the full pipeline without a real API key. Tests push a FIFO
//! script of replies so classification/analysis/synthesis turns can be
//! enacted deterministically.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::llm::{CompletionRequest, ProviderError};

/// Scripted reply that makes the provider fail that turn instead.
pub const FAIL_MARKER: &str = "[fail]";

#[derive(Debug, Clone, Default)]
pub struct DummyProvider {
    script: Arc<Mutex<VecDeque<String>>>,
}

impl DummyProvider {
    /// Provider that answers with `replies` in order, then falls back to
    /// echo. A [`FAIL_MARKER`] reply turns into a request error, which the
    /// gateway surfaces as `ServiceUnavailable`.
    pub fn scripted<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Arc::new(Mutex::new(replies.into_iter().map(Into::into).collect())),
        }
    }

    pub async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let scripted = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match scripted {
            Some(reply) if reply == FAIL_MARKER => {
                Err(ProviderError::Request("scripted failure".into()))
            }
            Some(reply) => Ok(reply),
            None => Ok(format!("[echo] {}", request.prompt)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn complete_prefixes_echo() {
        let p = DummyProvider::default();
        let req = CompletionRequest::new("hello");
        assert_eq!(p.complete(&req).await.unwrap(), "[echo] hello");
    }

    #[tokio::test]
    async fn scripted_replies_in_order_then_echo() {
        let p = DummyProvider::scripted(["first", "second"]);
        let req = CompletionRequest::new("q");
        assert_eq!(p.complete(&req).await.unwrap(), "first");
        assert_eq!(p.complete(&req).await.unwrap(), "second");
        assert_eq!(p.complete(&req).await.unwrap(), "[echo] q");
    }

    #[tokio::test]
    async fn fail_marker_errors_that_turn() {
        let p = DummyProvider::scripted([FAIL_MARKER, "recovered"]);
        let req = CompletionRequest::new("q");
        assert!(p.complete(&req).await.is_err());
        assert_eq!(p.complete(&req).await.unwrap(), "recovered");
    }
}
