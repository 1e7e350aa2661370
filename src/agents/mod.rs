//! Subject specialists.
//!
//! [`Specialist`] is a closed enum over the subject agents, mirroring the
//! provider abstraction: no `dyn` dispatch, no runtime name matching. Each
//! agent runs the same strictly sequential pipeline per request — tool-need
//! analysis, tool tiers, knowledge tier, terminal fallback — with
//! conversation context threaded through as a parameter, never stored on the
//! agent.

pub mod math;
pub mod physics;

pub use math::MathAgent;
pub use physics::PhysicsAgent;

use serde::Serialize;

use crate::error::AppError;
use crate::store::{Role, StoredMessage};
use crate::tools::{Calculation, ConstantEntry, ToolId};

/// Most recent messages handed to a specialist (3 exchanges).
pub const HISTORY_WINDOW: usize = 6;

/// Per-request context assembled by the router.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    pub conversation_id: String,
    /// Windowed history, oldest first.
    pub history: Vec<StoredMessage>,
}

impl ConversationContext {
    /// Build a context from prior messages, keeping only the most recent
    /// [`HISTORY_WINDOW`] entries in their original order.
    pub fn new(conversation_id: impl Into<String>, mut messages: Vec<StoredMessage>) -> Self {
        if messages.len() > HISTORY_WINDOW {
            messages.drain(..messages.len() - HISTORY_WINDOW);
        }
        Self {
            conversation_id: conversation_id.into(),
            history: messages,
        }
    }

    /// Render the window as alternating `User:`/`Assistant:` lines under a
    /// header. Empty history renders as the empty string so prompts carry no
    /// stray scaffolding.
    pub fn formatted_history(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        for message in &self.history {
            let speaker = match message.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
                Role::System => continue,
            };
            lines.push(format!("{speaker}: {}", message.content));
        }
        if lines.is_empty() {
            String::new()
        } else {
            format!("Previous conversation:\n{}", lines.join("\n"))
        }
    }
}

/// A specialist's final product for one question.
#[derive(Debug, Clone, Serialize)]
pub struct AgentResponse {
    pub agent: String,
    pub response: String,
    pub tools_used: Vec<ToolId>,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculation: Option<Calculation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constant: Option<ConstantEntry>,
    /// Diagnostic detail attached to the tier-exhaustion apology.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentResponse {
    pub fn new(agent: &str, response: String, tools_used: Vec<ToolId>, confidence: f64) -> Self {
        Self {
            agent: agent.to_string(),
            response,
            tools_used,
            confidence,
            calculation: None,
            constant: None,
            error: None,
        }
    }

    /// Fixed low-confidence response produced when every tier failed.
    pub fn apology(agent: &str, subject: &str, error: &AppError) -> Self {
        Self {
            agent: agent.to_string(),
            response: format!(
                "I'm sorry, I couldn't process your {subject} question properly."
            ),
            tools_used: Vec::new(),
            confidence: 0.5,
            calculation: None,
            constant: None,
            error: Some(error.to_string()),
        }
    }
}

/// Closed set of subject specialists.
pub enum Specialist {
    Math(MathAgent),
    Physics(PhysicsAgent),
}

impl Specialist {
    pub fn name(&self) -> &'static str {
        match self {
            Specialist::Math(_) => MathAgent::NAME,
            Specialist::Physics(_) => PhysicsAgent::NAME,
        }
    }

    /// Run the analyze→dispatch→fallback pipeline for one question.
    pub async fn answer(
        &self,
        question: &str,
        context: &ConversationContext,
    ) -> Result<AgentResponse, AppError> {
        match self {
            Specialist::Math(agent) => agent.answer(question, context).await,
            Specialist::Physics(agent) => agent.answer(question, context).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(role: Role, content: &str) -> StoredMessage {
        StoredMessage {
            role,
            content: content.to_string(),
            user_id: "alice".to_string(),
            agent: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn window_keeps_last_six_in_order() {
        let messages: Vec<StoredMessage> = (0..10)
            .map(|i| message(Role::User, &format!("m{i}")))
            .collect();
        let context = ConversationContext::new("c1", messages);
        assert_eq!(context.history.len(), 6);
        let contents: Vec<&str> = context.history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m4", "m5", "m6", "m7", "m8", "m9"]);
    }

    #[test]
    fn short_history_is_untouched() {
        let messages = vec![message(Role::User, "hi"), message(Role::Assistant, "hello")];
        let context = ConversationContext::new("c1", messages);
        assert_eq!(context.history.len(), 2);
    }

    #[test]
    fn empty_history_formats_to_empty_string() {
        let context = ConversationContext::new("c1", Vec::new());
        assert_eq!(context.formatted_history(), "");
    }

    #[test]
    fn history_renders_alternating_speakers() {
        let context = ConversationContext::new(
            "c1",
            vec![
                message(Role::User, "what is 2+2?"),
                message(Role::Assistant, "4"),
                message(Role::System, "diagnostic noise"),
            ],
        );
        let formatted = context.formatted_history();
        assert_eq!(
            formatted,
            "Previous conversation:\nUser: what is 2+2?\nAssistant: 4"
        );
    }

    #[test]
    fn apology_attaches_error() {
        let response = AgentResponse::apology(
            "Math Agent",
            "mathematical",
            &AppError::Store("disk gone".into()),
        );
        assert_eq!(response.confidence, 0.5);
        assert!(response.tools_used.is_empty());
        assert!(response.error.unwrap().contains("disk gone"));
    }
}
