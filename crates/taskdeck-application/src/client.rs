use crate::engine::{MutationHandle, OptimisticEngine, RefreshOutcome};
use crate::refresh::RefreshScheduler;
use std::sync::Arc;
use taskdeck_core::conversation::{ChatMessage, Conversation, ConversationPatch};
use taskdeck_core::task::{Task, TaskPatch, TaskStatus};
use taskdeck_core::{EntityId, IdentityAllocator, NotificationSink, Result, SyncConfig, Transport};

/// Entry point for UI callers: one engine per entity kind, sharing the id
/// allocator and the notification sink.
#[derive(Clone)]
pub struct SyncClient {
    conversations: OptimisticEngine<Conversation>,
    tasks: OptimisticEngine<Task>,
    config: SyncConfig,
}

impl SyncClient {
    pub fn new(
        conversation_transport: Arc<dyn Transport<Conversation>>,
        task_transport: Arc<dyn Transport<Task>>,
        notifier: Arc<dyn NotificationSink>,
        config: SyncConfig,
    ) -> Self {
        let allocator = Arc::new(IdentityAllocator::new());
        let buffer = config.store.change_buffer;
        Self {
            conversations: OptimisticEngine::with_allocator(
                conversation_transport,
                Arc::clone(&notifier),
                Arc::clone(&allocator),
                buffer,
            ),
            tasks: OptimisticEngine::with_allocator(task_transport, notifier, allocator, buffer),
            config,
        }
    }

    pub fn conversations(&self) -> &OptimisticEngine<Conversation> {
        &self.conversations
    }

    pub fn tasks(&self) -> &OptimisticEngine<Task> {
        &self.tasks
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Flips the star on a conversation.
    ///
    /// The new value is computed from the current store state. A missing id
    /// fails in the engine with `NotFound`.
    pub fn toggle_favorite(&self, id: &EntityId) -> Result<MutationHandle> {
        let favorite = self
            .conversations
            .get_by_id(id)
            .is_some_and(|conversation| conversation.favorite);
        self.conversations
            .update_optimistic(id, ConversationPatch::favorite(!favorite))
    }

    /// Appends a user message to a persisted conversation.
    pub fn send_message(&self, id: &EntityId, content: impl Into<String>) -> Result<MutationHandle> {
        self.conversations
            .update_optimistic(id, ConversationPatch::append(ChatMessage::user(content)))
    }

    pub fn set_task_status(&self, id: &EntityId, status: TaskStatus) -> Result<MutationHandle> {
        self.tasks.update_optimistic(id, TaskPatch::status(status))
    }

    /// Refetches both collections. Either may come back `Deferred`.
    pub async fn refresh_all(&self) -> Result<(RefreshOutcome, RefreshOutcome)> {
        let (conversations, tasks) =
            tokio::join!(self.conversations.refresh(), self.tasks.refresh());
        Ok((conversations?, tasks?))
    }

    /// Starts periodic refresh for both kinds, or nothing if refresh is
    /// disabled in the configuration.
    pub fn start_refresh(&self) -> Vec<RefreshScheduler> {
        if !self.config.refresh.enabled {
            tracing::info!(target: "refresh", "Periodic refresh disabled");
            return Vec::new();
        }
        let period = self.config.refresh_interval();
        vec![
            RefreshScheduler::start(self.conversations.clone(), period),
            RefreshScheduler::start(self.tasks.clone(), period),
        ]
    }
}
