//! REST binding of the transport contract.
//!
//! Each entity kind maps to one collection resource:
//!
//! | call            | request                           |
//! |-----------------|-----------------------------------|
//! | create_entity   | `POST   {base}/{collection}`      |
//! | update_entity   | `PATCH  {base}/{collection}/{id}` |
//! | delete_entity   | `DELETE {base}/{collection}/{id}` |
//! | list_entities   | `GET    {base}/{collection}`      |
//!
//! where `collection` is `conversations` or `tasks`.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value as JsonValue;
use std::time::Duration;
use taskdeck_core::{EntityId, EntityKind, Result, ServerShape, SyncError, Transport, UpdateAck};

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

fn transport_error(call: &str, e: reqwest::Error) -> SyncError {
    SyncError::transport(format!("{call} request failed: {e}"))
}

impl HttpTransport {
    /// Creates a transport rooted at `base_url` (e.g. `http://localhost:3000/api`).
    ///
    /// `timeout` bounds each request end to end.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, kind: EntityKind) -> String {
        format!("{}/{}", self.base_url, kind.collection())
    }

    fn entity_url(&self, kind: EntityKind, id: &EntityId) -> String {
        format!("{}/{}/{}", self.base_url, kind.collection(), id)
    }

    /// Maps non-2xx statuses to `SyncError::Transport`, keeping the body for
    /// the failure reason.
    async fn check(call: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(target: "sync", call, %status, "server returned error status");
        Err(SyncError::transport(if body.trim().is_empty() {
            format!("{call} failed: {status}")
        } else {
            format!("{call} failed: {status}: {}", body.trim())
        }))
    }
}

#[async_trait]
impl<E: ServerShape> Transport<E> for HttpTransport {
    async fn create_entity(&self, fields: JsonValue) -> Result<E::Record> {
        let response = self
            .client
            .post(self.collection_url(E::KIND))
            .json(&fields)
            .send()
            .await
            .map_err(|e| transport_error("create", e))?;
        let response = Self::check("create", response).await?;
        let body = response
            .text()
            .await
            .map_err(|e| transport_error("create", e))?;
        Ok(serde_json::from_str(&body)?)
    }

    /// A 2xx answer without a readable `{success}` body counts as not
    /// acknowledged.
    async fn update_entity(&self, id: &EntityId, patch: JsonValue) -> Result<UpdateAck> {
        let response = self
            .client
            .patch(self.entity_url(E::KIND, id))
            .json(&patch)
            .send()
            .await
            .map_err(|e| transport_error("update", e))?;
        let response = Self::check("update", response).await?;
        let body = response
            .text()
            .await
            .map_err(|e| transport_error("update", e))?;
        match serde_json::from_str::<UpdateAck>(&body) {
            Ok(ack) => Ok(ack),
            Err(e) => {
                tracing::warn!(target: "sync", kind = %E::KIND, %id, "unreadable update acknowledgment: {}", e);
                Ok(UpdateAck::rejected())
            }
        }
    }

    async fn delete_entity(&self, id: &EntityId) -> Result<()> {
        let response = self
            .client
            .delete(self.entity_url(E::KIND, id))
            .send()
            .await
            .map_err(|e| transport_error("delete", e))?;
        Self::check("delete", response).await?;
        Ok(())
    }

    async fn list_entities(&self) -> Result<Vec<E::Record>> {
        let response = self
            .client
            .get(self.collection_url(E::KIND))
            .send()
            .await
            .map_err(|e| transport_error("list", e))?;
        let response = Self::check("list", response).await?;
        let body = response
            .text()
            .await
            .map_err(|e| transport_error("list", e))?;
        Ok(serde_json::from_str(&body)?)
    }
}
