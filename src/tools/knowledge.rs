//! Knowledge base tool — subject-scoped Q&A backed by the generation gateway.
//!
//! Not deterministic: every execution is a live generation call, so black-box
//! tests stub the gateway with the scripted dummy provider. The one error
//! this tool propagates is `ServiceUnavailable` — when the upstream service
//! is down, continuing the specialist's tier chain is pointless. Everything
//! else degrades to `success: false`.

use serde::Serialize;
use tracing::debug;

use crate::error::AppError;
use crate::llm::gateway::Gateway;

/// Factual lookups run cold.
const KNOWLEDGE_TEMPERATURE: f32 = 0.2;

#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub information: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub query: String,
    pub subject: String,
}

#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    subject: String,
    gateway: Gateway,
}

impl KnowledgeBase {
    pub fn new(subject: impl Into<String>, gateway: Gateway) -> Self {
        Self { subject: subject.into(), gateway }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Answer `query` within this tool's subject scope.
    pub async fn execute(&self, query: &str) -> Result<KnowledgeOutcome, AppError> {
        let system = format!(
            "You are a specialized knowledge base for {subject} topics, \
             though follow-up questions may drift into neighbouring subjects. \
             Provide accurate, concise, educational information with relevant \
             formulas, definitions and examples where appropriate. If the \
             query needs a different subject's expertise, clearly say so. \
             Format the response in a clear, structured way suitable for \
             students, and do not answer off-topic questions.",
            subject = self.subject
        );

        match self
            .gateway
            .generate(query, Some(&system), KNOWLEDGE_TEMPERATURE, 1024)
            .await
        {
            Ok(information) => {
                debug!(subject = %self.subject, len = information.len(), "knowledge base answered");
                Ok(KnowledgeOutcome {
                    success: true,
                    information: Some(information),
                    error: None,
                    query: query.to_string(),
                    subject: self.subject.clone(),
                })
            }
            Err(e) if e.is_service_unavailable() => Err(e),
            Err(e) => Ok(KnowledgeOutcome {
                success: false,
                information: None,
                error: Some(e.to_string()),
                query: query.to_string(),
                subject: self.subject.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmProvider;
    use crate::llm::providers::dummy::DummyProvider;

    #[tokio::test]
    async fn scripted_gateway_produces_information() {
        let gateway = Gateway::new(LlmProvider::Dummy(DummyProvider::scripted([
            "A derivative measures instantaneous rate of change.",
        ])));
        let kb = KnowledgeBase::new("mathematics", gateway);
        let outcome = kb.execute("what is a derivative?").await.unwrap();
        assert!(outcome.success);
        assert!(outcome.information.unwrap().contains("rate of change"));
        assert_eq!(outcome.subject, "mathematics");
        assert_eq!(outcome.query, "what is a derivative?");
    }
}
