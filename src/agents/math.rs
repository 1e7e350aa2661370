//! Math specialist — calculator dispatch with knowledge-base fallback.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::llm::gateway::Gateway;
use crate::prompt::PromptBuilder;
use crate::tools::{Calculation, Calculator, KnowledgeBase, ToolId};

use super::{AgentResponse, ConversationContext};

const ANALYSIS_SYSTEM: &str = "You are a mathematical question analyzer. \
    Determine whether the question requires calculation or just explanation. \
    If it requires calculation, extract the mathematical expression to evaluate. \
    IMPORTANT: your entire response MUST be a single valid JSON object and \
    nothing else — no markdown fences, no surrounding text. Fields: \
    \"use_calculator\" (true/false), \"expression\" (the expression to \
    calculate, or null if not needed), \"reasoning\" (brief explanation of \
    your decision).";

const CALCULATION_SYSTEM: &str = "You are a mathematics tutor. Explain the \
    calculation result clearly, showing the steps if relevant. Use proper \
    mathematical notation and be educational in your response.";

const TUTOR_SYSTEM: &str = "You are a helpful math tutor. Provide clear \
    explanations. When there is conversation history, keep your response \
    consistent with previous exchanges.";

const DEFAULT_ANALYSIS_BODY: &str = "Analyze this mathematical question: {{question}}";

const DEFAULT_EXPLAIN_CALCULATION: &str = "\
Question: {{question}}
Calculation performed: {{expression}}
Result: {{result}}
{{history}}

Please provide a clear, educational explanation of this result in the context of the question.";

const DEFAULT_FALLBACK_BODY: &str = "\
Answer this math question with a step-by-step explanation: {{question}}
{{history}}";

/// Math variant of the tool-need analysis.
#[derive(Debug, Clone, Deserialize)]
pub struct MathToolAnalysis {
    #[serde(default)]
    pub use_calculator: bool,
    #[serde(default)]
    pub expression: Option<String>,
    #[serde(default)]
    pub reasoning: String,
}

impl MathToolAnalysis {
    /// Enforce the invariant that the expression is absent when its flag is
    /// false (or when the model emitted an empty placeholder).
    fn normalized(mut self) -> Self {
        if !self.use_calculator
            || self.expression.as_deref().is_some_and(|e| e.trim().is_empty())
        {
            self.expression = None;
        }
        self
    }

    /// Conservative default used when extraction fails: no tools, with a
    /// diagnostic reasoning string.
    fn fallback(error: &AppError) -> Self {
        Self {
            use_calculator: false,
            expression: None,
            reasoning: format!("could not analyze the question: {error}"),
        }
    }
}

pub struct MathAgent {
    gateway: Gateway,
    prompts_dir: PathBuf,
    calculator: Calculator,
    knowledge: KnowledgeBase,
}

impl MathAgent {
    pub const NAME: &'static str = "Math Agent";

    pub fn new(gateway: Gateway, prompts_dir: PathBuf) -> Self {
        let knowledge = KnowledgeBase::new("mathematics", gateway.clone());
        Self {
            gateway,
            prompts_dir,
            calculator: Calculator,
            knowledge,
        }
    }

    /// Analyze → calculation tier → knowledge tier → direct fallback.
    pub async fn answer(
        &self,
        question: &str,
        context: &ConversationContext,
    ) -> Result<AgentResponse, AppError> {
        let analysis = match self.analyze(question).await {
            Ok(a) => a.normalized(),
            Err(e) if e.is_service_unavailable() => return Err(e),
            Err(e) => {
                warn!(error = %e, "math: tool-need analysis failed, defaulting to no tools");
                MathToolAnalysis::fallback(&e)
            }
        };
        debug!(
            use_calculator = analysis.use_calculator,
            reasoning = %analysis.reasoning,
            "math: analysis complete"
        );

        if analysis.use_calculator {
            if let Some(expression) = &analysis.expression {
                let calculation = self.calculator.execute(expression);
                if calculation.success {
                    match self.explain_calculation(question, &calculation, context).await {
                        Ok(response) => return Ok(response),
                        Err(e) if e.is_service_unavailable() => return Err(e),
                        Err(e) => warn!(error = %e, "math: calculation synthesis failed"),
                    }
                } else {
                    warn!(
                        expression = %calculation.expression,
                        error = ?calculation.error,
                        "math: calculator failed, falling through"
                    );
                }
            }
        }

        let query = knowledge_query(question, context);
        match self.knowledge.execute(&query).await {
            Ok(outcome) if outcome.success => {
                return Ok(AgentResponse::new(
                    Self::NAME,
                    outcome.information.unwrap_or_default(),
                    vec![ToolId::KnowledgeBase],
                    0.9,
                ));
            }
            Ok(outcome) => {
                warn!(error = ?outcome.error, "math: knowledge base failed, falling through");
            }
            Err(e) => return Err(e),
        }

        match self.direct_answer(question, context).await {
            Ok(response) => Ok(response),
            Err(e) if e.is_service_unavailable() => Err(e),
            Err(e) => {
                warn!(error = %e, "math: every tier failed");
                Ok(AgentResponse::apology(Self::NAME, "mathematical", &e))
            }
        }
    }

    async fn analyze(&self, question: &str) -> Result<MathToolAnalysis, AppError> {
        let prompt = PromptBuilder::new(&self.prompts_dir)
            .layer("math_analysis.txt", DEFAULT_ANALYSIS_BODY)
            .var("question", question)
            .build();
        let raw = self.gateway.generate(&prompt, Some(ANALYSIS_SYSTEM), 0.2, 512).await?;
        Gateway::decode_structured(&raw, &["use_calculator", "reasoning"])
    }

    async fn explain_calculation(
        &self,
        question: &str,
        calculation: &Calculation,
        context: &ConversationContext,
    ) -> Result<AgentResponse, AppError> {
        let result_text = calculation
            .result
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_default();
        let prompt = PromptBuilder::new(&self.prompts_dir)
            .layer("explain_calculation.txt", DEFAULT_EXPLAIN_CALCULATION)
            .var("question", question)
            .var("expression", calculation.expression.as_str())
            .var("result", result_text)
            .var("history", context.formatted_history())
            .build();
        let response = self
            .gateway
            .generate(&prompt, Some(CALCULATION_SYSTEM), 0.7, 1024)
            .await?;

        let mut agent_response =
            AgentResponse::new(Self::NAME, response, vec![ToolId::Calculator], 0.95);
        agent_response.calculation = Some(calculation.clone());
        Ok(agent_response)
    }

    async fn direct_answer(
        &self,
        question: &str,
        context: &ConversationContext,
    ) -> Result<AgentResponse, AppError> {
        let prompt = PromptBuilder::new(&self.prompts_dir)
            .layer("tutor_fallback.txt", DEFAULT_FALLBACK_BODY)
            .var("question", question)
            .var("history", context.formatted_history())
            .build();
        let response = self.gateway.generate(&prompt, Some(TUTOR_SYSTEM), 0.7, 1024).await?;
        Ok(AgentResponse::new(Self::NAME, response, Vec::new(), 0.8))
    }
}

/// Question plus formatted history, as handed to the knowledge base.
pub(super) fn knowledge_query(question: &str, context: &ConversationContext) -> String {
    let history = context.formatted_history();
    if history.is_empty() {
        question.to_string()
    } else {
        format!("{question}\n{history}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmProvider;
    use crate::llm::providers::dummy::DummyProvider;
    use crate::tools::CalcValue;

    fn agent_with_script<const N: usize>(replies: [&str; N]) -> MathAgent {
        let gateway = Gateway::new(LlmProvider::Dummy(DummyProvider::scripted(replies)));
        MathAgent::new(gateway, PathBuf::from("/nonexistent"))
    }

    fn empty_context() -> ConversationContext {
        ConversationContext::new("c1", Vec::new())
    }

    #[tokio::test]
    async fn calculator_tier_produces_calculation_payload() {
        let agent = agent_with_script([
            r#"{"use_calculator": true, "expression": "5*9+3", "reasoning": "arithmetic"}"#,
            "Multiplying first, 5*9 is 45, plus 3 gives 48.",
        ]);
        let response = agent.answer("What is 5*9+3?", &empty_context()).await.unwrap();
        assert_eq!(response.tools_used, vec![ToolId::Calculator]);
        assert_eq!(response.confidence, 0.95);
        let calculation = response.calculation.unwrap();
        assert_eq!(calculation.result, Some(CalcValue::Integer(48)));
        assert!(response.response.contains("48"));
    }

    #[tokio::test]
    async fn unparseable_analysis_falls_to_knowledge_tier() {
        let agent = agent_with_script([
            "I think you should use a calculator for this one.",
            "A prime number has exactly two divisors.",
        ]);
        let response = agent.answer("What is a prime?", &empty_context()).await.unwrap();
        assert_eq!(response.tools_used, vec![ToolId::KnowledgeBase]);
        assert_eq!(response.confidence, 0.9);
    }

    #[tokio::test]
    async fn failed_calculator_falls_through() {
        let agent = agent_with_script([
            r#"{"use_calculator": true, "expression": "x+", "reasoning": "looks numeric"}"#,
            "That expression is incomplete, but here is the idea.",
        ]);
        let response = agent.answer("What is x+?", &empty_context()).await.unwrap();
        assert_eq!(response.tools_used, vec![ToolId::KnowledgeBase]);
    }

    #[tokio::test]
    async fn service_unavailable_aborts_remaining_tiers() {
        use crate::llm::providers::dummy::FAIL_MARKER;
        // Analysis turn fails hard — no knowledge or fallback tier may run.
        let agent = agent_with_script([FAIL_MARKER]);
        let err = agent.answer("What is 2+2?", &empty_context()).await.unwrap_err();
        assert!(err.is_service_unavailable());
    }

    #[test]
    fn normalization_clears_expression_when_flag_false() {
        let analysis = MathToolAnalysis {
            use_calculator: false,
            expression: Some("2+2".to_string()),
            reasoning: String::new(),
        }
        .normalized();
        assert!(analysis.expression.is_none());
    }

    #[test]
    fn knowledge_query_embeds_history() {
        use crate::store::{Role, StoredMessage};
        let context = ConversationContext::new(
            "c1",
            vec![StoredMessage::new(Role::User, "earlier question", "alice")],
        );
        let query = knowledge_query("next question", &context);
        assert!(query.starts_with("next question\n"));
        assert!(query.contains("earlier question"));
    }
}
