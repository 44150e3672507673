//! Conversation domain model.
//!
//! This module contains the assistant chat conversation in its canonical
//! client shape, independent of how the server names its fields.

use crate::entity::{Entity, EntityId, EntityKind};
use serde::{Deserialize, Serialize};

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// Message from the user.
    User,
    /// Message from the AI assistant.
    Assistant,
}

/// A single message in a conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message sender.
    pub role: MessageRole,
    /// The content of the message.
    pub content: String,
    /// Timestamp when the message was created (ISO 8601 format).
    pub timestamp: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// An assistant chat conversation as shown in the sidebar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: EntityId,
    pub title: String,
    /// Messages in chronological order
    pub messages: Vec<ChatMessage>,
    /// Starred in the sidebar
    pub favorite: bool,
}

/// Fields for a conversation started locally.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationDraft {
    pub title: String,
    /// Opening messages, usually the user's first prompt
    pub messages: Vec<ChatMessage>,
}

impl ConversationDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            messages: Vec::new(),
        }
    }

    pub fn with_message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }
}

/// Partial update of a conversation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationPatch {
    pub title: Option<String>,
    pub favorite: Option<bool>,
    /// Appended after the existing messages
    pub append_messages: Vec<ChatMessage>,
}

impl ConversationPatch {
    pub fn favorite(favorite: bool) -> Self {
        Self {
            favorite: Some(favorite),
            ..Self::default()
        }
    }

    pub fn rename(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn append(message: ChatMessage) -> Self {
        Self {
            append_messages: vec![message],
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.favorite.is_none() && self.append_messages.is_empty()
    }
}

impl Entity for Conversation {
    type Draft = ConversationDraft;
    type Patch = ConversationPatch;

    const KIND: EntityKind = EntityKind::Conversation;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn from_draft(id: EntityId, draft: &ConversationDraft) -> Self {
        Self {
            id,
            title: draft.title.clone(),
            messages: draft.messages.clone(),
            favorite: false,
        }
    }

    fn apply_patch(&mut self, patch: &ConversationPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(favorite) = patch.favorite {
            self.favorite = favorite;
        }
        self.messages.extend(patch.append_messages.iter().cloned());
    }
}
