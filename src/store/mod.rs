//! Conversation persistence.
//!
//! A single [`ConversationStore`] handle is constructed in `main` and passed
//! into the router — no process-wide singleton. State lives in memory behind
//! one lock (which gives each conversation atomic read-then-append) and is
//! optionally written through to JSON files under a work directory so
//! conversations survive restarts.
//!
//! Access is scoped by the `(conversation_id, user_id)` pair: a conversation
//! fetched or appended with the wrong user resolves to `NotFound`, never to
//! another user's data.

mod file;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One conversation turn as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: Role,
    pub content: String,
    pub user_id: String,
    /// Name of the agent that produced an assistant message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl StoredMessage {
    pub fn new(role: Role, content: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            user_id: user_id.into(),
            agent: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }
}

/// Denormalized tail-of-conversation preview kept on the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastMessage {
    pub content: String,
    pub role: Role,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub conversation_id: String,
    pub user_id: String,
    pub title: String,
    pub messages: Vec<StoredMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<LastMessage>,
}

/// Metadata-only listing form.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub conversation_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<LastMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub conversation_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

#[derive(Default)]
struct StoreState {
    users: HashMap<String, User>,
    conversations: HashMap<String, Conversation>,
}

#[derive(Clone)]
pub struct ConversationStore {
    state: Arc<RwLock<StoreState>>,
    /// Write-through root; `None` keeps the store purely in memory.
    root: Option<PathBuf>,
}

impl ConversationStore {
    /// Purely in-memory store — used by tests and `store.persist = false`.
    pub fn in_memory() -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            root: None,
        }
    }

    /// File-backed store rooted at `root`, loading any prior state.
    pub fn open(root: PathBuf) -> Result<Self, AppError> {
        let state = file::load(&root)?;
        info!(
            root = %root.display(),
            users = state.users.len(),
            conversations = state.conversations.len(),
            "conversation store opened"
        );
        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            root: Some(root),
        })
    }

    pub fn get_or_create_user(&self, user_id: &str) -> Result<User, AppError> {
        let mut state = self.write_lock()?;
        let now = Utc::now();
        let user = state
            .users
            .entry(user_id.to_string())
            .or_insert_with(|| User {
                user_id: user_id.to_string(),
                conversation_ids: Vec::new(),
                created_at: now,
                last_active: now,
            });
        user.last_active = now;
        let user = user.clone();
        if let Some(root) = &self.root {
            file::save_users(root, &state.users)?;
        }
        Ok(user)
    }

    pub fn create_conversation(
        &self,
        user_id: &str,
        title: &str,
    ) -> Result<Conversation, AppError> {
        let mut state = self.write_lock()?;
        let now = Utc::now();
        let conversation = Conversation {
            conversation_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            last_message: None,
        };

        let user = state
            .users
            .entry(user_id.to_string())
            .or_insert_with(|| User {
                user_id: user_id.to_string(),
                conversation_ids: Vec::new(),
                created_at: now,
                last_active: now,
            });
        user.conversation_ids.push(conversation.conversation_id.clone());
        user.last_active = now;
        state
            .conversations
            .insert(conversation.conversation_id.clone(), conversation.clone());

        if let Some(root) = &self.root {
            file::save_users(root, &state.users)?;
            file::save_conversation(root, &conversation)?;
        }
        debug!(conversation_id = %conversation.conversation_id, user_id, "conversation created");
        Ok(conversation)
    }

    /// Fetch a conversation, scoped to its owner.
    pub fn get_conversation(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<Conversation, AppError> {
        let state = self.read_lock()?;
        match state.conversations.get(conversation_id) {
            Some(c) if c.user_id == user_id => Ok(c.clone()),
            _ => Err(AppError::NotFound(format!(
                "conversation '{conversation_id}' for user '{user_id}'"
            ))),
        }
    }

    /// Append a message, verifying the message's user matches the owner.
    pub fn append_message(
        &self,
        conversation_id: &str,
        message: StoredMessage,
    ) -> Result<Conversation, AppError> {
        let mut state = self.write_lock()?;
        let conversation = state
            .conversations
            .get_mut(conversation_id)
            .filter(|c| c.user_id == message.user_id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "conversation '{conversation_id}' for user '{}'",
                    message.user_id
                ))
            })?;

        conversation.last_message = Some(LastMessage {
            content: message.content.clone(),
            role: message.role,
            timestamp: message.timestamp,
        });
        conversation.updated_at = Utc::now();
        conversation.messages.push(message);
        let conversation = conversation.clone();

        if let Some(root) = &self.root {
            file::save_conversation(root, &conversation)?;
        }
        Ok(conversation)
    }

    /// Metadata for every conversation of `user_id`, newest first.
    pub fn list_conversations(&self, user_id: &str) -> Result<Vec<ConversationSummary>, AppError> {
        let state = self.read_lock()?;
        let mut summaries: Vec<ConversationSummary> = state
            .conversations
            .values()
            .filter(|c| c.user_id == user_id)
            .map(|c| ConversationSummary {
                conversation_id: c.conversation_id.clone(),
                title: c.title.clone(),
                last_message: c.last_message.clone(),
                created_at: c.created_at,
                updated_at: c.updated_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    /// Remove a conversation and the owner's reference to it.
    pub fn delete_conversation(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<(), AppError> {
        let mut state = self.write_lock()?;
        let owned = state
            .conversations
            .get(conversation_id)
            .is_some_and(|c| c.user_id == user_id);
        if !owned {
            return Err(AppError::NotFound(format!(
                "conversation '{conversation_id}' for user '{user_id}'"
            )));
        }
        state.conversations.remove(conversation_id);
        if let Some(user) = state.users.get_mut(user_id) {
            user.conversation_ids.retain(|id| id != conversation_id);
        }
        if let Some(root) = &self.root {
            file::remove_conversation(root, conversation_id)?;
            file::save_users(root, &state.users)?;
        }
        Ok(())
    }

    fn read_lock(&self) -> Result<std::sync::RwLockReadGuard<'_, StoreState>, AppError> {
        self.state
            .read()
            .map_err(|_| AppError::Store("store lock poisoned".into()))
    }

    fn write_lock(&self) -> Result<std::sync::RwLockWriteGuard<'_, StoreState>, AppError> {
        self.state
            .write()
            .map_err(|_| AppError::Store("store lock poisoned".into()))
    }
}
