//! Conversation domain module.
//!
//! Assistant chat conversations backing the AI sidebar: chat list, per-chat
//! message arrays and the favorite/star flag. The server record shape lives in
//! [`crate::reconcile`].

mod model;

pub use model::{ChatMessage, Conversation, ConversationDraft, ConversationPatch, MessageRole};
