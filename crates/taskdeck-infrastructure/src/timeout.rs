use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::future::Future;
use std::time::Duration;
use taskdeck_core::{EntityId, Result, ServerShape, SyncError, Transport, UpdateAck};

/// Bounds every call of the wrapped transport.
///
/// An elapsed deadline surfaces as `SyncError::Transport`, which rolls the
/// mutation back instead of leaving its id pending forever. The inner call is
/// dropped at the deadline; the server may still have applied it.
pub struct TimeoutTransport<T> {
    inner: T,
    limit: Duration,
}

impl<T> TimeoutTransport<T> {
    pub fn new(inner: T, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<R>(&self, call: &str, fut: impl Future<Output = Result<R>>) -> Result<R> {
        match tokio::time::timeout(self.limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(target: "sync", call, limit = ?self.limit, "transport call timed out");
                Err(SyncError::transport(format!(
                    "{call} timed out after {}s",
                    self.limit.as_secs_f32()
                )))
            }
        }
    }
}

#[async_trait]
impl<E, T> Transport<E> for TimeoutTransport<T>
where
    E: ServerShape,
    T: Transport<E>,
{
    async fn create_entity(&self, fields: JsonValue) -> Result<E::Record> {
        self.bounded("create", self.inner.create_entity(fields)).await
    }

    async fn update_entity(&self, id: &EntityId, patch: JsonValue) -> Result<UpdateAck> {
        self.bounded("update", self.inner.update_entity(id, patch)).await
    }

    async fn delete_entity(&self, id: &EntityId) -> Result<()> {
        self.bounded("delete", self.inner.delete_entity(id)).await
    }

    async fn list_entities(&self) -> Result<Vec<E::Record>> {
        self.bounded("list", self.inner.list_entities()).await
    }
}
