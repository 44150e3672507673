use anyhow::{Result, bail};
use std::sync::Arc;
use taskdeck_application::{MutationHandle, MutationOutcome, SyncClient};
use taskdeck_core::conversation::Conversation;
use taskdeck_core::notify::{
    ChannelSink, FanOut, NotificationThrottle, ThrottledSink, TracingSink,
};
use taskdeck_core::task::Task;
use taskdeck_core::{EntityId, MutationEvent, SyncConfig, Transport};
use taskdeck_infrastructure::{HttpTransport, InMemoryTransport};
use tokio::sync::mpsc;

/// A connected client plus the receiving end of its notifications.
pub struct Session {
    pub client: SyncClient,
    events: mpsc::UnboundedReceiver<MutationEvent>,
}

impl Session {
    /// Connects to the REST API named in `config`.
    pub fn connect(config: SyncConfig) -> Result<Self> {
        let http = HttpTransport::new(config.api.base_url.clone(), config.request_timeout())?;
        tracing::debug!("Using API at {}", http.base_url());
        let http = Arc::new(http);
        Ok(Self::with_transports(http.clone(), http, config))
    }

    /// Runs against an in-process backend.
    pub fn in_memory(
        conversations: Arc<InMemoryTransport>,
        tasks: Arc<InMemoryTransport>,
        config: SyncConfig,
    ) -> Self {
        Self::with_transports(conversations, tasks, config)
    }

    fn with_transports(
        conversations: Arc<dyn Transport<Conversation>>,
        tasks: Arc<dyn Transport<Task>>,
        config: SyncConfig,
    ) -> Self {
        let (channel, events) = ChannelSink::channel();
        let throttled = ThrottledSink::new(channel, NotificationThrottle::new(config.debounce_window()));
        let notifier = FanOut::new()
            .with(Arc::new(TracingSink))
            .with(Arc::new(throttled));
        let client = SyncClient::new(conversations, tasks, Arc::new(notifier), config);
        Self { client, events }
    }

    /// Loads both collections so that ids given on the command line resolve.
    pub async fn load(&self) -> Result<()> {
        self.client.refresh_all().await?;
        Ok(())
    }

    /// Waits for `handle`, prints its notification and fails on rollback.
    pub async fn settle(&mut self, handle: MutationHandle) -> Result<EntityId> {
        let operation = handle.operation();
        let outcome = handle.outcome().await;
        self.print_events();
        match outcome {
            MutationOutcome::Confirmed { entity_id } => Ok(entity_id),
            MutationOutcome::RolledBack { entity_id, reason } => {
                bail!("{operation} of {entity_id} was rolled back: {reason}")
            }
        }
    }

    /// Prints the notifications that got past the throttle.
    pub fn print_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            println!("{}", describe(&event));
        }
    }
}

pub fn describe(event: &MutationEvent) -> String {
    if event.is_success() {
        format!(
            "ok: {} {} {}",
            event.entity_kind, event.entity_id, past_tense(event)
        )
    } else {
        let hint = if event.retryable { " (retry later)" } else { "" };
        format!(
            "failed: {} {} {}: {}{}",
            event.operation,
            event.entity_kind,
            event.entity_id,
            event.reason.as_deref().unwrap_or("unknown error"),
            hint
        )
    }
}

fn past_tense(event: &MutationEvent) -> &'static str {
    use taskdeck_core::Operation;
    match event.operation {
        Operation::Create => "created",
        Operation::Update => "updated",
        Operation::Delete => "deleted",
    }
}
