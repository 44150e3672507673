#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use taskdeck_application::OptimisticEngine;
use taskdeck_core::conversation::Conversation;
use taskdeck_core::notify::ChannelSink;
use taskdeck_core::reconcile::{ConversationRecord, TaskRecord};
use taskdeck_core::{
    Entity, EntityId, MutationEvent, Result, ServerShape, SyncError, Transport, UpdateAck,
};
use tokio::sync::{Semaphore, mpsc};

/// A transport call as observed by the scripted transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create(JsonValue),
    Update(EntityId, JsonValue),
    Delete(EntityId),
    List,
}

/// Transport double with scripted results.
///
/// - Creates pop from a queue; an empty queue fails the call.
/// - Updates and deletes pop from a per-id queue; an empty queue succeeds.
/// - While held, create/update/delete calls are recorded immediately but do
///   not return until released, one call per permit.
/// - List calls have a gate of their own (`hold_list`/`release_list`).
pub struct ScriptedTransport<E: ServerShape> {
    creates: Mutex<VecDeque<Result<E::Record>>>,
    updates: Mutex<HashMap<EntityId, VecDeque<Result<UpdateAck>>>>,
    deletes: Mutex<HashMap<EntityId, VecDeque<Result<()>>>>,
    list: Mutex<Vec<E::Record>>,
    calls: Mutex<Vec<Call>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    list_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl<E: ServerShape> ScriptedTransport<E> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            creates: Mutex::new(VecDeque::new()),
            updates: Mutex::new(HashMap::new()),
            deletes: Mutex::new(HashMap::new()),
            list: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
            list_gate: Mutex::new(None),
        })
    }

    pub fn script_create(&self, result: Result<E::Record>) {
        self.creates.lock().unwrap().push_back(result);
    }

    pub fn script_update(&self, id: &str, result: Result<UpdateAck>) {
        self.updates
            .lock()
            .unwrap()
            .entry(EntityId::new(id))
            .or_default()
            .push_back(result);
    }

    pub fn script_delete(&self, id: &str, result: Result<()>) {
        self.deletes
            .lock()
            .unwrap()
            .entry(EntityId::new(id))
            .or_default()
            .push_back(result);
    }

    pub fn set_list(&self, records: Vec<E::Record>) {
        *self.list.lock().unwrap() = records;
    }

    /// Holds every subsequent mutating call until released.
    pub fn hold(&self) {
        *self.gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Lets `n` held calls return, in the order they arrived.
    pub fn release(&self, n: usize) {
        if let Some(gate) = self.gate.lock().unwrap().as_ref() {
            gate.add_permits(n);
        }
    }

    /// Holds every subsequent list call until released.
    pub fn hold_list(&self) {
        *self.list_gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_list(&self, n: usize) {
        if let Some(gate) = self.list_gate.lock().unwrap().as_ref() {
            gate.add_permits(n);
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.calls().iter().filter(|call| **call == Call::List).count()
    }

    /// Yields until at least `n` calls have been recorded.
    pub async fn wait_for_calls(&self, n: usize) {
        for _ in 0..10_000 {
            if self.calls.lock().unwrap().len() >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("expected {n} transport calls, saw {:?}", self.calls());
    }

    async fn pass_gate(&self) {
        let gate = self.gate.lock().unwrap().clone();
        Self::wait_on(gate).await;
    }

    async fn wait_on(gate: Option<Arc<Semaphore>>) {
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
    }
}

#[async_trait]
impl<E: ServerShape> Transport<E> for ScriptedTransport<E> {
    async fn create_entity(&self, fields: JsonValue) -> Result<E::Record> {
        self.calls.lock().unwrap().push(Call::Create(fields));
        let result = self
            .creates
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SyncError::transport("no scripted create")));
        self.pass_gate().await;
        result
    }

    async fn update_entity(&self, id: &EntityId, patch: JsonValue) -> Result<UpdateAck> {
        self.calls.lock().unwrap().push(Call::Update(id.clone(), patch));
        let result = self
            .updates
            .lock()
            .unwrap()
            .get_mut(id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(UpdateAck::ok()));
        self.pass_gate().await;
        result
    }

    async fn delete_entity(&self, id: &EntityId) -> Result<()> {
        self.calls.lock().unwrap().push(Call::Delete(id.clone()));
        let result = self
            .deletes
            .lock()
            .unwrap()
            .get_mut(id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Ok(()));
        self.pass_gate().await;
        result
    }

    async fn list_entities(&self) -> Result<Vec<E::Record>> {
        self.calls.lock().unwrap().push(Call::List);
        let gate = self.list_gate.lock().unwrap().clone();
        Self::wait_on(gate).await;
        Ok(self.list.lock().unwrap().clone())
    }
}

pub fn conversation_record(id: &str, title: &str) -> ConversationRecord {
    ConversationRecord {
        id: id.to_string(),
        title: title.to_string(),
        messages: Vec::new(),
        favorite: false,
    }
}

pub fn task_record(id: &str, title: &str, status: &str) -> TaskRecord {
    TaskRecord {
        id: id.to_string(),
        title: title.to_string(),
        description: String::new(),
        status: status.to_string(),
        priority: "medium".to_string(),
        category: None,
        due_date: None,
    }
}

/// An engine over `transport` whose notifications land in the returned
/// receiver.
pub fn conversation_engine(
    transport: &Arc<ScriptedTransport<Conversation>>,
) -> (
    OptimisticEngine<Conversation>,
    mpsc::UnboundedReceiver<MutationEvent>,
) {
    let (sink, events) = ChannelSink::channel();
    let engine = OptimisticEngine::new(transport.clone(), Arc::new(sink));
    (engine, events)
}

/// Seeds the engine's store with persisted conversations `ids`, titled by id.
pub fn seed_conversations(engine: &OptimisticEngine<Conversation>, ids: &[&str]) {
    let records = ids.iter().map(|id| conversation_record(id, id)).collect();
    engine.reconcile_list(records).unwrap();
}

pub fn ids<E: ServerShape>(engine: &OptimisticEngine<E>) -> Vec<String> {
    engine
        .get_all()
        .iter()
        .map(|entity| entity.id().as_str().to_string())
        .collect()
}

pub fn drain(events: &mut mpsc::UnboundedReceiver<MutationEvent>) -> Vec<MutationEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}
