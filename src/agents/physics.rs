//! Physics specialist — constants lookup first, then calculator, then the
//! knowledge-base and direct-generation fallbacks.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::llm::gateway::Gateway;
use crate::prompt::PromptBuilder;
use crate::tools::{Calculation, Calculator, KnowledgeBase, PhysicsConstants, ToolId};

use super::math::knowledge_query;
use super::{AgentResponse, ConversationContext};

const ANALYSIS_SYSTEM: &str = "You are a physics question analyzer. Determine \
    whether the question requires (1) calculation, (2) a physics constants \
    lookup, or (3) just explanation. IMPORTANT: your entire response MUST be \
    a single valid JSON object and nothing else — no markdown fences, no \
    surrounding text. Fields: \"use_calculator\" (true/false), \"expression\" \
    (the expression to calculate, or null if not needed), \"use_constants\" \
    (true/false), \"constant_name\" (the constant's key, or null if not \
    needed), \"reasoning\" (brief explanation of your decision).";

const CONSTANT_SYSTEM: &str = "You are a physics tutor. Explain the physics \
    constant clearly: its significance, common applications, related \
    equations or principles, and historical context if relevant. Be \
    educational in your response.";

const CALCULATION_SYSTEM: &str = "You are a physics tutor. Explain the \
    calculation result clearly, showing the steps if relevant, and relate it \
    to physics principles and laws. Use proper scientific notation and be \
    educational in your response.";

const TUTOR_SYSTEM: &str = "You are a helpful physics tutor. Provide clear \
    explanations with relevant physics principles. When there is conversation \
    history, keep your response consistent with previous exchanges.";

const DEFAULT_ANALYSIS_BODY: &str = "Analyze this physics question: {{question}}";

const DEFAULT_EXPLAIN_CONSTANT: &str = "\
Question: {{question}}
Constant information:
- Name: {{description}}
- Symbol: {{symbol}}
- Value: {{value}}
- Unit: {{unit}}
{{history}}

Please provide a clear explanation of this constant in the context of the question,
including its significance in physics and how it's typically used.";

const DEFAULT_EXPLAIN_CALCULATION: &str = "\
Question: {{question}}
Calculation performed: {{expression}}
Result: {{result}}
{{history}}

Please provide a clear, educational explanation of this result in the context of the
question and any previous conversation, including relevant physics principles.";

const DEFAULT_FALLBACK_BODY: &str = "\
Answer this physics question with a step-by-step explanation: {{question}}
{{history}}";

/// Physics variant of the tool-need analysis — adds the constants lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct PhysicsToolAnalysis {
    #[serde(default)]
    pub use_calculator: bool,
    #[serde(default)]
    pub expression: Option<String>,
    #[serde(default)]
    pub use_constants: bool,
    #[serde(default)]
    pub constant_name: Option<String>,
    #[serde(default)]
    pub reasoning: String,
}

impl PhysicsToolAnalysis {
    fn normalized(mut self) -> Self {
        if !self.use_calculator
            || self.expression.as_deref().is_some_and(|e| e.trim().is_empty())
        {
            self.expression = None;
        }
        if !self.use_constants
            || self.constant_name.as_deref().is_some_and(|n| n.trim().is_empty())
        {
            self.constant_name = None;
        }
        self
    }

    fn fallback(error: &AppError) -> Self {
        Self {
            use_calculator: false,
            expression: None,
            use_constants: false,
            constant_name: None,
            reasoning: format!("could not analyze the question: {error}"),
        }
    }
}

pub struct PhysicsAgent {
    gateway: Gateway,
    prompts_dir: PathBuf,
    calculator: Calculator,
    constants: Arc<PhysicsConstants>,
    knowledge: KnowledgeBase,
}

impl PhysicsAgent {
    pub const NAME: &'static str = "Physics Agent";

    pub fn new(gateway: Gateway, prompts_dir: PathBuf, constants: Arc<PhysicsConstants>) -> Self {
        let knowledge = KnowledgeBase::new("physics", gateway.clone());
        Self {
            gateway,
            prompts_dir,
            calculator: Calculator,
            constants,
            knowledge,
        }
    }

    /// Analyze → constants tier → calculation tier → knowledge tier →
    /// direct fallback.
    pub async fn answer(
        &self,
        question: &str,
        context: &ConversationContext,
    ) -> Result<AgentResponse, AppError> {
        let analysis = match self.analyze(question).await {
            Ok(a) => a.normalized(),
            Err(e) if e.is_service_unavailable() => return Err(e),
            Err(e) => {
                warn!(error = %e, "physics: tool-need analysis failed, defaulting to no tools");
                PhysicsToolAnalysis::fallback(&e)
            }
        };
        debug!(
            use_calculator = analysis.use_calculator,
            use_constants = analysis.use_constants,
            reasoning = %analysis.reasoning,
            "physics: analysis complete"
        );

        if analysis.use_constants {
            if let Some(name) = &analysis.constant_name {
                let lookup = self.constants.execute(Some(name));
                match lookup.constant {
                    Some(constant) => {
                        match self.explain_constant(question, constant, context).await {
                            Ok(response) => return Ok(response),
                            Err(e) if e.is_service_unavailable() => return Err(e),
                            Err(e) => warn!(error = %e, "physics: constant synthesis failed"),
                        }
                    }
                    None => warn!(
                        constant = %name,
                        error = ?lookup.error,
                        "physics: constants lookup failed, falling through"
                    ),
                }
            }
        }

        if analysis.use_calculator {
            if let Some(expression) = &analysis.expression {
                let calculation = self.calculator.execute(expression);
                if calculation.success {
                    match self.explain_calculation(question, &calculation, context).await {
                        Ok(response) => return Ok(response),
                        Err(e) if e.is_service_unavailable() => return Err(e),
                        Err(e) => warn!(error = %e, "physics: calculation synthesis failed"),
                    }
                } else {
                    warn!(
                        expression = %calculation.expression,
                        error = ?calculation.error,
                        "physics: calculator failed, falling through"
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
                warn!(error = ?outcome.error, "physics: knowledge base failed, falling through");
            }
            Err(e) => return Err(e),
        }

        match self.direct_answer(question, context).await {
            Ok(response) => Ok(response),
            Err(e) if e.is_service_unavailable() => Err(e),
            Err(e) => {
                warn!(error = %e, "physics: every tier failed");
                Ok(AgentResponse::apology(Self::NAME, "physics", &e))
            }
        }
    }

    async fn analyze(&self, question: &str) -> Result<PhysicsToolAnalysis, AppError> {
        let prompt = PromptBuilder::new(&self.prompts_dir)
            .layer("physics_analysis.txt", DEFAULT_ANALYSIS_BODY)
            .var("question", question)
            .build();
        let raw = self.gateway.generate(&prompt, Some(ANALYSIS_SYSTEM), 0.1, 512).await?;
        Gateway::decode_structured(
            &raw,
            &["use_calculator", "expression", "use_constants", "constant_name", "reasoning"],
        )
    }

    async fn explain_constant(
        &self,
        question: &str,
        constant: crate::tools::ConstantEntry,
        context: &ConversationContext,
    ) -> Result<AgentResponse, AppError> {
        let prompt = PromptBuilder::new(&self.prompts_dir)
            .layer("explain_constant.txt", DEFAULT_EXPLAIN_CONSTANT)
            .var("question", question)
            .var("description", constant.description.as_str())
            .var("symbol", constant.symbol.as_str())
            .var("value", format!("{}", constant.value))
            .var("unit", constant.unit.as_str())
            .var("history", context.formatted_history())
            .build();
        let response = self
            .gateway
            .generate(&prompt, Some(CONSTANT_SYSTEM), 0.7, 1024)
            .await?;

        let mut agent_response =
            AgentResponse::new(Self::NAME, response, vec![ToolId::PhysicsConstants], 0.95);
        agent_response.constant = Some(constant);
        Ok(agent_response)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmProvider;
    use crate::llm::providers::dummy::DummyProvider;
    use crate::tools::ConstantEntry;

    fn constants() -> Arc<PhysicsConstants> {
        Arc::new(PhysicsConstants::from_entries([(
            "c".to_string(),
            ConstantEntry {
                description: "Speed of light in vacuum".to_string(),
                symbol: "c".to_string(),
                value: 299_792_458.0,
                unit: "m/s".to_string(),
            },
        )]))
    }

    fn agent_with_script<const N: usize>(replies: [&str; N]) -> PhysicsAgent {
        let gateway = Gateway::new(LlmProvider::Dummy(DummyProvider::scripted(replies)));
        PhysicsAgent::new(gateway, PathBuf::from("/nonexistent"), constants())
    }

    fn empty_context() -> ConversationContext {
        ConversationContext::new("c1", Vec::new())
    }

    #[tokio::test]
    async fn constants_tier_attaches_entry() {
        let agent = agent_with_script([
            r#"{"use_calculator": false, "expression": null, "use_constants": true, "constant_name": "c", "reasoning": "asks for a constant"}"#,
            "The speed of light c is 299792458 m/s, an upper bound on signal speed.",
        ]);
        let response = agent
            .answer("What is the speed of light?", &empty_context())
            .await
            .unwrap();
        assert_eq!(response.tools_used, vec![ToolId::PhysicsConstants]);
        assert_eq!(response.confidence, 0.95);
        assert_eq!(response.constant.unwrap().symbol, "c");
    }

    #[tokio::test]
    async fn unknown_constant_falls_to_knowledge_tier() {
        let agent = agent_with_script([
            r#"{"use_calculator": false, "expression": null, "use_constants": true, "constant_name": "warp_factor", "reasoning": "constant-like"}"#,
            "No such constant exists; here is some context instead.",
        ]);
        let response = agent.answer("What is warp factor?", &empty_context()).await.unwrap();
        assert_eq!(response.tools_used, vec![ToolId::KnowledgeBase]);
        assert_eq!(response.confidence, 0.9);
    }

    #[tokio::test]
    async fn calculation_tier_runs_after_constants() {
        let agent = agent_with_script([
            r#"{"use_calculator": true, "expression": "9.8 * 2", "use_constants": false, "constant_name": null, "reasoning": "kinematics"}"#,
            "The object gains 19.6 m/s of speed after two seconds.",
        ]);
        let response = agent
            .answer("How fast after 2s of free fall?", &empty_context())
            .await
            .unwrap();
        assert_eq!(response.tools_used, vec![ToolId::Calculator]);
        assert!(response.calculation.is_some());
    }

    #[test]
    fn normalization_clears_constant_when_flag_false() {
        let analysis = PhysicsToolAnalysis {
            use_calculator: false,
            expression: None,
            use_constants: false,
            constant_name: Some("c".to_string()),
            reasoning: String::new(),
        }
        .normalized();
        assert!(analysis.constant_name.is_none());
    }
}
