//! On-disk layout for the conversation store.
//!
//! ```text
//! <root>/users.json               — user_id → User
//! <root>/conversations/<id>.json  — one file per conversation
//! ```
//!
//! Files are written whole on every mutation; records are small and the
//! store holds the lock across the write, so partial states are not
//! observable through the handle.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::error::AppError;

use super::{Conversation, StoreState, User};

const USERS_FILENAME: &str = "users.json";
const CONVERSATIONS_DIRNAME: &str = "conversations";

pub(super) fn load(root: &Path) -> Result<StoreState, AppError> {
    fs::create_dir_all(root.join(CONVERSATIONS_DIRNAME))
        .map_err(|e| AppError::Store(format!("cannot create store root: {e}")))?;

    let users_path = root.join(USERS_FILENAME);
    let users: HashMap<String, User> = if users_path.exists() {
        let text = fs::read_to_string(&users_path)
            .map_err(|e| AppError::Store(format!("cannot read users file: {e}")))?;
        serde_json::from_str(&text)
            .map_err(|e| AppError::Store(format!("users file unparseable: {e}")))?
    } else {
        HashMap::new()
    };

    let mut conversations = HashMap::new();
    let dir = root.join(CONVERSATIONS_DIRNAME);
    let entries = fs::read_dir(&dir)
        .map_err(|e| AppError::Store(format!("cannot read conversations dir: {e}")))?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "json") {
            continue;
        }
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable conversation file");
                continue;
            }
        };
        match serde_json::from_str::<Conversation>(&text) {
            Ok(conversation) => {
                conversations.insert(conversation.conversation_id.clone(), conversation);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unparseable conversation file");
            }
        }
    }

    Ok(StoreState { users, conversations })
}

pub(super) fn save_users(root: &Path, users: &HashMap<String, User>) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(users)
        .map_err(|e| AppError::Store(format!("cannot serialize users: {e}")))?;
    fs::write(root.join(USERS_FILENAME), text)
        .map_err(|e| AppError::Store(format!("cannot write users file: {e}")))
}

pub(super) fn save_conversation(root: &Path, conversation: &Conversation) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(conversation)
        .map_err(|e| AppError::Store(format!("cannot serialize conversation: {e}")))?;
    let path = root
        .join(CONVERSATIONS_DIRNAME)
        .join(format!("{}.json", conversation.conversation_id));
    fs::write(path, text)
        .map_err(|e| AppError::Store(format!("cannot write conversation file: {e}")))
}

pub(super) fn remove_conversation(root: &Path, conversation_id: &str) -> Result<(), AppError> {
    let path = root
        .join(CONVERSATIONS_DIRNAME)
        .join(format!("{conversation_id}.json"));
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::Store(format!("cannot remove conversation file: {e}"))),
    }
}
