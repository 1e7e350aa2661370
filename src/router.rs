//! Tutor router — classifies a question's subject, selects a specialist,
//! assembles conversation context, delegates, and attaches metadata.
//!
//! Construction takes the gateway and the store handle explicitly; the
//! router owns its specialists. Per request the flow is strictly
//! sequential: ensure conversation → persist the user turn → classify →
//! delegate → persist the assistant turn → attach metadata.
//!
//! Only `ServiceUnavailable` escapes [`TutorRouter::answer`] as a hard
//! error. Everything else becomes a [`RouteOutcome::Failed`] envelope
//! carrying the conversation id so the caller can retry within the same
//! thread, with a system-role diagnostic message recorded when an id is
//! known.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::agents::{AgentResponse, ConversationContext, MathAgent, PhysicsAgent, Specialist};
use crate::error::AppError;
use crate::llm::gateway::Gateway;
use crate::prompt::PromptBuilder;
use crate::store::{ConversationStore, Role, StoredMessage};
use crate::tools::{PhysicsConstants, ToolId};

const CLASSIFY_SYSTEM: &str = "You are an expert at analyzing academic \
    questions. Given a question, strictly identify the subject it belongs \
    to; avoid \"general\" and link the question to the nearest subject. \
    Respond with a JSON object containing: \"subject\" (the primary subject \
    area: math, physics, chemistry, biology, history, literature, etc.), \
    \"confidence\" (your confidence level, 0.0-1.0), and \"reasoning\" \
    (brief explanation of why you chose this subject).";

const DEFAULT_CLASSIFY_BODY: &str = "Analyze this question: {{question}}";

/// Auto-derived conversation titles keep at most this many characters.
const MAX_TITLE_LENGTH: usize = 50;

/// Below this classification confidence the router defaults to math.
const PHYSICS_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Normalized subject tags the specialist table is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Math,
    Physics,
}

impl Subject {
    /// Exact alias match: `math`/`mathematics` and `physics`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "math" | "mathematics" => Some(Subject::Math),
            "physics" => Some(Subject::Physics),
            _ => None,
        }
    }

    /// Alias match when possible, confidence tie-break otherwise.
    /// The boundary is half-open: confidence < 0.7 → math, ≥ 0.7 → physics.
    pub fn resolve(tag: &str, confidence: f64) -> Self {
        Self::from_tag(tag).unwrap_or(if confidence < PHYSICS_CONFIDENCE_THRESHOLD {
            Subject::Math
        } else {
            Subject::Physics
        })
    }
}

/// Subject classification decoded from a generation response.
#[derive(Debug, Clone, Deserialize)]
pub struct Classification {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

impl Classification {
    fn clamped(mut self) -> Self {
        self.confidence = self.confidence.clamp(0.0, 1.0);
        self
    }

    /// Sentinel produced when extraction fails.
    fn fallback(error: &AppError) -> Self {
        Self {
            subject: "general".to_string(),
            confidence: 0.5,
            reasoning: format!("could not classify the question: {error}"),
        }
    }
}

/// Successful answer with routing metadata attached.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerRecord {
    pub response: String,
    pub agent: String,
    pub subject: String,
    pub confidence: f64,
    pub conversation_id: String,
    pub tools_used: Vec<ToolId>,
}

/// Structured error result; the conversation id lets the caller retry
/// within the same thread.
#[derive(Debug, Clone, Serialize)]
pub struct RouteFailure {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub agent: String,
    pub tools_used: Vec<ToolId>,
}

#[derive(Debug, Clone)]
pub enum RouteOutcome {
    Answered(AnswerRecord),
    Failed(RouteFailure),
}

pub struct TutorRouter {
    gateway: Gateway,
    store: ConversationStore,
    prompts_dir: PathBuf,
    math: Specialist,
    physics: Specialist,
}

impl TutorRouter {
    pub const NAME: &'static str = "Tutor Agent";

    pub fn new(
        gateway: Gateway,
        store: ConversationStore,
        prompts_dir: PathBuf,
        constants: Arc<PhysicsConstants>,
    ) -> Self {
        let math = Specialist::Math(MathAgent::new(gateway.clone(), prompts_dir.clone()));
        let physics = Specialist::Physics(PhysicsAgent::new(
            gateway.clone(),
            prompts_dir.clone(),
            constants,
        ));
        Self { gateway, store, prompts_dir, math, physics }
    }

    fn specialist(&self, subject: Subject) -> &Specialist {
        match subject {
            Subject::Math => &self.math,
            Subject::Physics => &self.physics,
        }
    }

    /// The core exposed operation: route one question and return either the
    /// answer with metadata or a structured failure envelope. The only hard
    /// error is `ServiceUnavailable`.
    pub async fn answer(
        &self,
        question: &str,
        user_id: &str,
        conversation_id: Option<&str>,
    ) -> Result<RouteOutcome, AppError> {
        if let Err(e) = self.store.get_or_create_user(user_id) {
            return Ok(self.fail(user_id, conversation_id.map(String::from), e.to_string()));
        }

        let conversation_id = match conversation_id {
            Some(id) => id.to_string(),
            None => {
                match self
                    .store
                    .create_conversation(user_id, &derive_title(question))
                {
                    Ok(conversation) => conversation.conversation_id,
                    Err(e) => return Ok(self.fail(user_id, None, e.to_string())),
                }
            }
        };

        // User turn is persisted immediately; a later failure may leave a
        // user-only turn behind, paired with a diagnostic message.
        let conversation = match self.store.append_message(
            &conversation_id,
            StoredMessage::new(Role::User, question, user_id),
        ) {
            Ok(conversation) => conversation,
            Err(e) => return Ok(self.fail(user_id, Some(conversation_id), e.to_string())),
        };

        let classification = match self.classify(question).await {
            Ok(c) => c.clamped(),
            Err(e) if e.is_service_unavailable() => return Err(e),
            Err(e) => {
                warn!(error = %e, "classification failed, using sentinel");
                Classification::fallback(&e)
            }
        };
        let subject = Subject::resolve(&classification.subject, classification.confidence);
        debug!(
            subject = %classification.subject,
            confidence = classification.confidence,
            specialist = self.specialist(subject).name(),
            "question classified"
        );

        // Window prior history, excluding the user turn appended above.
        let mut history = conversation.messages;
        history.pop();
        let context = ConversationContext::new(conversation_id.clone(), history);

        let response = match self.specialist(subject).answer(question, &context).await {
            Ok(response) => response,
            Err(e) if e.is_service_unavailable() => return Err(e),
            Err(e) => return Ok(self.fail(user_id, Some(conversation_id), e.to_string())),
        };
        if response.response.trim().is_empty() {
            return Ok(self.fail(
                user_id,
                Some(conversation_id),
                "empty response from specialist".to_string(),
            ));
        }

        let assistant_message = StoredMessage::new(Role::Assistant, response.response.as_str(), user_id)
            .with_agent(response.agent.as_str());
        if let Err(e) = self.store.append_message(&conversation_id, assistant_message) {
            return Ok(self.fail(user_id, Some(conversation_id), e.to_string()));
        }

        info!(
            conversation_id = %conversation_id,
            agent = %response.agent,
            tools = ?response.tools_used,
            "question answered"
        );
        Ok(RouteOutcome::Answered(attach_metadata(
            response,
            &classification,
            conversation_id,
        )))
    }

    /// Per-user conversation metadata, newest first.
    pub fn conversations(
        &self,
        user_id: &str,
    ) -> Result<Vec<crate::store::ConversationSummary>, AppError> {
        self.store.list_conversations(user_id)
    }

    /// One conversation with messages, scoped to its owner.
    pub fn conversation(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<crate::store::Conversation, AppError> {
        self.store.get_conversation(conversation_id, user_id)
    }

    async fn classify(&self, question: &str) -> Result<Classification, AppError> {
        let prompt = PromptBuilder::new(&self.prompts_dir)
            .layer("classify.txt", DEFAULT_CLASSIFY_BODY)
            .var("question", question)
            .build();
        let raw = self.gateway.generate(&prompt, Some(CLASSIFY_SYSTEM), 0.2, 512).await?;
        Gateway::decode_structured(&raw, &["subject", "confidence"])
    }

    /// Build the failure envelope, recording a diagnostic system message
    /// when a conversation id is known. The recording itself is best-effort.
    fn fail(
        &self,
        user_id: &str,
        conversation_id: Option<String>,
        error: String,
    ) -> RouteOutcome {
        warn!(error = %error, conversation_id = ?conversation_id, "routing failed");
        if let Some(id) = &conversation_id {
            let diagnostic =
                StoredMessage::new(Role::System, format!("Error: {error}"), user_id);
            if let Err(e) = self.store.append_message(id, diagnostic) {
                warn!(error = %e, "failed to record diagnostic message");
            }
        }
        RouteOutcome::Failed(RouteFailure {
            error,
            conversation_id,
            agent: Self::NAME.to_string(),
            tools_used: Vec::new(),
        })
    }
}

fn attach_metadata(
    response: AgentResponse,
    classification: &Classification,
    conversation_id: String,
) -> AnswerRecord {
    AnswerRecord {
        response: response.response,
        agent: response.agent,
        subject: classification.subject.clone(),
        confidence: classification.confidence,
        conversation_id,
        tools_used: response.tools_used,
    }
}

/// First characters of the question, word-boundary truncated.
fn derive_title(question: &str) -> String {
    if question.chars().count() <= MAX_TITLE_LENGTH {
        return question.to_string();
    }
    let truncated: String = question.chars().take(MAX_TITLE_LENGTH).collect();
    let stem = match truncated.rsplit_once(' ') {
        Some((head, _)) => head.to_string(),
        None => truncated,
    };
    format!("{stem}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmProvider;
    use crate::llm::providers::dummy::DummyProvider;

    fn router_with_script<const N: usize>(replies: [&str; N]) -> TutorRouter {
        let gateway = Gateway::new(LlmProvider::Dummy(DummyProvider::scripted(replies)));
        TutorRouter::new(
            gateway,
            ConversationStore::in_memory(),
            PathBuf::from("/nonexistent"),
            Arc::new(PhysicsConstants::default()),
        )
    }

    #[test]
    fn subject_aliases_resolve_exactly() {
        assert_eq!(Subject::from_tag("math"), Some(Subject::Math));
        assert_eq!(Subject::from_tag("Mathematics"), Some(Subject::Math));
        assert_eq!(Subject::from_tag("physics"), Some(Subject::Physics));
        assert_eq!(Subject::from_tag("chemistry"), None);
    }

    #[test]
    fn tie_break_boundary_is_half_open() {
        assert_eq!(Subject::resolve("chemistry", 0.7), Subject::Physics);
        assert_eq!(Subject::resolve("chemistry", 0.6999), Subject::Math);
        assert_eq!(Subject::resolve("chemistry", 0.0), Subject::Math);
        // Exact alias wins regardless of confidence.
        assert_eq!(Subject::resolve("math", 0.99), Subject::Math);
    }

    #[test]
    fn confidence_is_clamped() {
        let c = Classification {
            subject: "math".to_string(),
            confidence: 1.7,
            reasoning: String::new(),
        }
        .clamped();
        assert_eq!(c.confidence, 1.0);
        let c = Classification {
            subject: "math".to_string(),
            confidence: -0.3,
            reasoning: String::new(),
        }
        .clamped();
        assert_eq!(c.confidence, 0.0);
    }

    #[test]
    fn title_short_question_kept_whole() {
        assert_eq!(derive_title("What is 2+2?"), "What is 2+2?");
    }

    #[test]
    fn title_long_question_breaks_at_word_boundary() {
        let question =
            "Please explain the full derivation of the quadratic formula starting from scratch";
        let title = derive_title(question);
        assert!(title.ends_with("..."));
        assert!(title.chars().count() <= MAX_TITLE_LENGTH + 3);
        assert!(!title.trim_end_matches("...").ends_with(' '));
        assert!(question.starts_with(title.trim_end_matches("...")));
    }

    #[tokio::test]
    async fn boundary_confidence_routes_to_physics() {
        let router = router_with_script([
            r#"{"subject": "chemistry", "confidence": 0.7, "reasoning": "closest match"}"#,
            r#"{"use_calculator": false, "expression": null, "use_constants": false, "constant_name": null, "reasoning": "explanation only"}"#,
            "Covalent bonds share electron pairs.",
        ]);
        match router.answer("What is a covalent bond?", "alice", None).await.unwrap() {
            RouteOutcome::Answered(record) => {
                assert_eq!(record.agent, "Physics Agent");
                assert_eq!(record.subject, "chemistry");
            }
            RouteOutcome::Failed(f) => panic!("unexpected failure: {}", f.error),
        }
    }

    #[tokio::test]
    async fn below_boundary_routes_to_math() {
        let router = router_with_script([
            r#"{"subject": "chemistry", "confidence": 0.6999, "reasoning": "unsure"}"#,
            r#"{"use_calculator": false, "expression": null, "reasoning": "explanation only"}"#,
            "Here is an explanation.",
        ]);
        match router.answer("What is entropy?", "alice", None).await.unwrap() {
            RouteOutcome::Answered(record) => assert_eq!(record.agent, "Math Agent"),
            RouteOutcome::Failed(f) => panic!("unexpected failure: {}", f.error),
        }
    }

    #[tokio::test]
    async fn unparseable_classification_defaults_to_math() {
        let router = router_with_script([
            "subject: math, probably",
            r#"{"use_calculator": false, "expression": null, "reasoning": "explanation only"}"#,
            "An explanation.",
        ]);
        match router.answer("Explain limits", "alice", None).await.unwrap() {
            RouteOutcome::Answered(record) => {
                assert_eq!(record.agent, "Math Agent");
                assert_eq!(record.subject, "general");
                assert_eq!(record.confidence, 0.5);
            }
            RouteOutcome::Failed(f) => panic!("unexpected failure: {}", f.error),
        }
    }

    #[tokio::test]
    async fn service_unavailable_escapes_as_hard_error() {
        use crate::llm::providers::dummy::FAIL_MARKER;
        let router = router_with_script([FAIL_MARKER]);
        let err = router.answer("What is 2+2?", "alice", None).await.unwrap_err();
        assert!(err.is_service_unavailable());
    }

    #[tokio::test]
    async fn unknown_conversation_fails_with_envelope() {
        let router = router_with_script([]);
        match router
            .answer("What is 2+2?", "alice", Some("missing-conversation"))
            .await
            .unwrap()
        {
            RouteOutcome::Failed(failure) => {
                assert_eq!(failure.conversation_id.as_deref(), Some("missing-conversation"));
                assert!(failure.error.contains("missing-conversation"));
                assert!(failure.tools_used.is_empty());
            }
            RouteOutcome::Answered(_) => panic!("expected failure"),
        }
    }
}
