use super::ServerShape;
use crate::conversation::{ChatMessage, Conversation, ConversationDraft, ConversationPatch, MessageRole};
use crate::entity::EntityId;
use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};

/// A conversation as the server sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub messages: Vec<MessageRecord>,
    #[serde(default)]
    pub favorite: bool,
}

/// Server message shape: `sender` / `message` rather than `role` / `content`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub sender: String,
    pub message: String,
    #[serde(default)]
    pub timestamp: String,
}

fn role_from_sender(sender: &str) -> Result<MessageRole> {
    match sender.trim().to_ascii_lowercase().as_str() {
        "user" => Ok(MessageRole::User),
        "assistant" => Ok(MessageRole::Assistant),
        other => Err(SyncError::serialization(
            "conversation",
            format!("unknown message sender '{other}'"),
        )),
    }
}

fn sender_from_role(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    }
}

impl From<&ChatMessage> for MessageRecord {
    fn from(message: &ChatMessage) -> Self {
        Self {
            sender: sender_from_role(message.role).to_string(),
            message: message.content.clone(),
            timestamp: message.timestamp.clone(),
        }
    }
}

impl TryFrom<MessageRecord> for ChatMessage {
    type Error = SyncError;

    fn try_from(record: MessageRecord) -> Result<Self> {
        Ok(Self {
            role: role_from_sender(&record.sender)?,
            content: record.message,
            timestamp: record.timestamp,
        })
    }
}

fn messages_payload(messages: &[ChatMessage]) -> Result<JsonValue> {
    let records: Vec<MessageRecord> = messages.iter().map(MessageRecord::from).collect();
    Ok(serde_json::to_value(records)?)
}

impl ServerShape for Conversation {
    type Record = ConversationRecord;

    fn from_record(record: ConversationRecord) -> Result<Self> {
        let messages = record
            .messages
            .into_iter()
            .map(ChatMessage::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            id: EntityId::new(record.id),
            title: record.title,
            messages,
            favorite: record.favorite,
        })
    }

    fn draft_payload(draft: &ConversationDraft) -> Result<JsonValue> {
        Ok(json!({
            "title": draft.title,
            "messages": messages_payload(&draft.messages)?,
            "favorite": false,
        }))
    }

    /// Only the fields present in the patch are sent. `messages` carries the
    /// messages to append, not the full history.
    fn patch_payload(patch: &ConversationPatch) -> Result<JsonValue> {
        let mut payload = Map::new();
        if let Some(title) = &patch.title {
            payload.insert("title".to_string(), json!(title));
        }
        if let Some(favorite) = patch.favorite {
            payload.insert("favorite".to_string(), json!(favorite));
        }
        if !patch.append_messages.is_empty() {
            payload.insert("messages".to_string(), messages_payload(&patch.append_messages)?);
        }
        Ok(JsonValue::Object(payload))
    }
}
