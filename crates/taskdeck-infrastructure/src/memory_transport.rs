//! In-process stand-in for the REST backend.
//!
//! Stores server records as JSON and mimics the server's behavior closely
//! enough for offline runs of the CLI and for integration tests: ids are
//! assigned as `conv-N` / `task-N`, updates are shallow merges where array
//! fields are appended, and the whole backend can be switched offline.
//!
//! One instance may back both kinds: each kind only sees records whose id
//! carries its prefix.

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use taskdeck_core::{EntityId, EntityKind, Result, ServerShape, SyncError, Transport, UpdateAck};

#[derive(Default)]
pub struct InMemoryTransport {
    records: Mutex<Vec<Map<String, JsonValue>>>,
    next_id: AtomicU64,
    offline: AtomicBool,
}

fn id_prefix(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Conversation => "conv",
        EntityKind::Task => "task",
    }
}

fn record_id(record: &Map<String, JsonValue>) -> Option<&str> {
    record.get("id").and_then(JsonValue::as_str)
}

fn belongs_to(record: &Map<String, JsonValue>, kind: EntityKind) -> bool {
    record_id(record)
        .and_then(|id| id.strip_prefix(id_prefix(kind)))
        .is_some_and(|rest| rest.starts_with('-'))
}

fn as_object(value: JsonValue, call: &str) -> Result<Map<String, JsonValue>> {
    match value {
        JsonValue::Object(map) => Ok(map),
        other => Err(SyncError::transport(format!(
            "{call} failed: 400 Bad Request: expected a JSON object, got {other}"
        ))),
    }
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with `records` already stored. Records without an `id` are
    /// skipped.
    pub fn with_records(records: Vec<JsonValue>) -> Self {
        let stored: Vec<_> = records
            .into_iter()
            .filter_map(|record| match record {
                JsonValue::Object(map) if record_id(&map).is_some() => Some(map),
                _ => None,
            })
            .collect();
        Self {
            next_id: AtomicU64::new(stored.len() as u64),
            records: Mutex::new(stored),
            offline: AtomicBool::new(false),
        }
    }

    /// While offline every call fails with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Map<String, JsonValue>>>> {
        self.records
            .lock()
            .map_err(|_| SyncError::internal("in-memory backend lock poisoned"))
    }

    fn ensure_online(&self, call: &str) -> Result<()> {
        if self.is_offline() {
            return Err(SyncError::transport(format!(
                "{call} failed: backend unreachable"
            )));
        }
        Ok(())
    }

    fn not_found(call: &str, id: &EntityId) -> SyncError {
        SyncError::transport(format!("{call} failed: 404 Not Found: {id}"))
    }
}

fn merge(record: &mut Map<String, JsonValue>, patch: Map<String, JsonValue>) {
    for (key, value) in patch {
        if key == "id" {
            continue;
        }
        if let (Some(JsonValue::Array(existing)), JsonValue::Array(appended)) =
            (record.get_mut(&key), &value)
        {
            existing.extend(appended.iter().cloned());
            continue;
        }
        record.insert(key, value);
    }
}

#[async_trait]
impl<E: ServerShape> Transport<E> for InMemoryTransport {
    async fn create_entity(&self, fields: JsonValue) -> Result<E::Record> {
        self.ensure_online("create")?;
        let mut record = as_object(fields, "create")?;
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        record.insert(
            "id".to_string(),
            JsonValue::String(format!("{}-{n}", id_prefix(E::KIND))),
        );
        let parsed = serde_json::from_value(JsonValue::Object(record.clone()))?;
        self.lock()?.push(record);
        Ok(parsed)
    }

    async fn update_entity(&self, id: &EntityId, patch: JsonValue) -> Result<UpdateAck> {
        self.ensure_online("update")?;
        let patch = as_object(patch, "update")?;
        let mut records = self.lock()?;
        let record = records
            .iter_mut()
            .find(|record| belongs_to(record, E::KIND) && record_id(record) == Some(id.as_str()))
            .ok_or_else(|| Self::not_found("update", id))?;
        merge(record, patch);
        Ok(UpdateAck::ok())
    }

    async fn delete_entity(&self, id: &EntityId) -> Result<()> {
        self.ensure_online("delete")?;
        let mut records = self.lock()?;
        let position = records
            .iter()
            .position(|record| belongs_to(record, E::KIND) && record_id(record) == Some(id.as_str()))
            .ok_or_else(|| Self::not_found("delete", id))?;
        records.remove(position);
        Ok(())
    }

    async fn list_entities(&self) -> Result<Vec<E::Record>> {
        self.ensure_online("list")?;
        let records: Vec<_> = self
            .lock()?
            .iter()
            .filter(|record| belongs_to(record, E::KIND))
            .cloned()
            .collect();
        records
            .into_iter()
            .map(|record| serde_json::from_value(JsonValue::Object(record)).map_err(SyncError::from))
            .collect()
    }
}
