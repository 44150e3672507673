mod common;

use common::*;
use serde_json::json;
use std::sync::Arc;
use taskdeck_application::{MutationOutcome, RefreshOutcome, StoreChange, SyncClient};
use taskdeck_core::conversation::{Conversation, ConversationDraft, ConversationPatch};
use taskdeck_core::notify::{ChannelSink, EventKind};
use taskdeck_core::task::{Task, TaskDraft, TaskStatus};
use taskdeck_core::{EntityId, Operation, SyncConfig, SyncError, UpdateAck};

#[tokio::test]
async fn test_create_at_front_is_swapped_in_place() {
    let transport = ScriptedTransport::<Conversation>::new();
    let (engine, mut events) = conversation_engine(&transport);
    seed_conversations(&engine, &["conv-1", "conv-2"]);
    transport.script_create(Ok(conversation_record("conv-55", "New Chat")));

    let handle = engine
        .create_optimistic(ConversationDraft::titled("New Chat"), true)
        .unwrap();
    let temp_id = handle.entity_id().clone();

    // Visible immediately, ahead of the existing entries
    assert!(temp_id.is_temporary());
    assert_eq!(ids(&engine), vec![temp_id.to_string(), "conv-1".into(), "conv-2".into()]);

    let outcome = handle.outcome().await;
    assert_eq!(
        outcome,
        MutationOutcome::Confirmed {
            entity_id: EntityId::new("conv-55")
        }
    );
    assert_eq!(ids(&engine), vec!["conv-55", "conv-1", "conv-2"]);
    assert!(engine.get_by_id(&temp_id).is_none());

    let events = drain(&mut events);
    assert_eq!(events.len(), 1);
    assert!(events[0].is_success());
    assert_eq!(events[0].operation, Operation::Create);
    assert_eq!(events[0].entity_id.as_str(), "conv-55");
}

#[tokio::test]
async fn test_create_sends_persistable_fields() {
    let transport = ScriptedTransport::<Conversation>::new();
    let (engine, _events) = conversation_engine(&transport);
    transport.script_create(Ok(conversation_record("conv-1", "Trip")));

    let handle = engine
        .create_optimistic(ConversationDraft::titled("Trip"), false)
        .unwrap();
    handle.outcome().await;

    let calls = transport.calls();
    assert_eq!(
        calls,
        vec![Call::Create(json!({"title": "Trip", "messages": [], "favorite": false}))]
    );
}

#[tokio::test]
async fn test_failed_create_leaves_no_ghost() {
    let transport = ScriptedTransport::<Conversation>::new();
    let (engine, mut events) = conversation_engine(&transport);
    seed_conversations(&engine, &["conv-1"]);
    let before = engine.get_all();
    transport.script_create(Err(SyncError::transport("connection refused")));

    let handle = engine
        .create_optimistic(ConversationDraft::titled("New Chat"), true)
        .unwrap();
    let temp_id = handle.entity_id().clone();
    let outcome = handle.outcome().await;

    assert!(!outcome.is_confirmed());
    assert_eq!(outcome.entity_id(), &temp_id);
    assert_eq!(engine.get_all(), before);
    assert!(!engine.is_pending(&temp_id));

    let events = drain(&mut events);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Failure);
    assert_eq!(events[0].entity_id, temp_id);
    assert!(events[0].retryable);
}

#[tokio::test]
async fn test_update_on_temporary_id_is_rejected() {
    let transport = ScriptedTransport::<Conversation>::new();
    let (engine, mut events) = conversation_engine(&transport);
    transport.hold();
    transport.script_create(Ok(conversation_record("conv-1", "New Chat")));

    let handle = engine
        .create_optimistic(ConversationDraft::titled("New Chat"), true)
        .unwrap();
    let temp_id = handle.entity_id().clone();
    transport.wait_for_calls(1).await;
    let before = engine.get_all();

    let err = engine
        .update_optimistic(&temp_id, ConversationPatch::favorite(true))
        .unwrap_err();

    assert!(err.is_invalid_target());
    assert_eq!(engine.get_all(), before);
    assert!(engine.is_pending(&temp_id));
    // Only the create reached the transport
    assert_eq!(transport.calls().len(), 1);

    let events = drain(&mut events);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].operation, Operation::Update);
    assert_eq!(events[0].kind, EventKind::Failure);
    assert!(!events[0].retryable);

    transport.release(1);
    assert!(handle.outcome().await.is_confirmed());
}

#[tokio::test]
async fn test_delete_on_temporary_id_is_rejected() {
    let transport = ScriptedTransport::<Conversation>::new();
    let (engine, _events) = conversation_engine(&transport);
    transport.hold();

    let handle = engine
        .create_optimistic(ConversationDraft::titled("Draft"), false)
        .unwrap();
    let err = engine.delete_optimistic(handle.entity_id()).unwrap_err();

    assert!(matches!(err, SyncError::InvalidTarget { .. }));
    assert_eq!(engine.get_all().len(), 1);
}

#[tokio::test]
async fn test_update_on_missing_id_is_not_found() {
    let transport = ScriptedTransport::<Conversation>::new();
    let (engine, mut events) = conversation_engine(&transport);
    seed_conversations(&engine, &["conv-1"]);

    let err = engine
        .update_optimistic(&EntityId::new("conv-404"), ConversationPatch::favorite(true))
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(transport.calls().is_empty());
    let events = drain(&mut events);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].entity_id.as_str(), "conv-404");
}

#[tokio::test]
async fn test_rejected_favorite_ack_rolls_back() {
    let transport = ScriptedTransport::<Conversation>::new();
    let (engine, mut events) = conversation_engine(&transport);
    seed_conversations(&engine, &["conv-1"]);
    transport.script_update("conv-1", Ok(UpdateAck::rejected()));
    let id = EntityId::new("conv-1");

    let handle = engine
        .update_optimistic(&id, ConversationPatch::favorite(true))
        .unwrap();
    // Optimistic value is visible before the server answers
    assert!(engine.get_by_id(&id).unwrap().favorite);

    let outcome = handle.outcome().await;
    match outcome {
        MutationOutcome::RolledBack { reason, .. } => {
            assert!(matches!(reason, SyncError::Rejected { operation: Operation::Update, .. }));
        }
        other => panic!("expected rollback, got {other:?}"),
    }
    assert!(!engine.get_by_id(&id).unwrap().favorite);

    let events = drain(&mut events);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Failure);
    assert_eq!(
        transport.calls(),
        vec![Call::Update(id, json!({"favorite": true}))]
    );
}

#[tokio::test]
async fn test_double_toggle_returns_to_original() {
    let conversations = ScriptedTransport::<Conversation>::new();
    let tasks = ScriptedTransport::<Task>::new();
    let (sink, mut events) = ChannelSink::channel();
    let client = SyncClient::new(
        conversations.clone(),
        tasks.clone(),
        Arc::new(sink),
        SyncConfig::default(),
    );
    seed_conversations(client.conversations(), &["conv-1"]);
    let id = EntityId::new("conv-1");

    let first = client.toggle_favorite(&id).unwrap();
    let second = client.toggle_favorite(&id).unwrap();

    assert!(first.outcome().await.is_confirmed());
    assert!(second.outcome().await.is_confirmed());
    assert!(!client.conversations().get_by_id(&id).unwrap().favorite);
    assert_eq!(
        conversations.calls(),
        vec![
            Call::Update(id.clone(), json!({"favorite": true})),
            Call::Update(id.clone(), json!({"favorite": false})),
        ]
    );
    assert_eq!(drain(&mut events).len(), 2);
}

#[tokio::test]
async fn test_failed_delete_reinserts_at_original_position() {
    let transport = ScriptedTransport::<Conversation>::new();
    let (engine, mut events) = conversation_engine(&transport);
    seed_conversations(&engine, &["conv-1", "conv-2", "conv-3"]);
    transport.script_delete("conv-2", Err(SyncError::transport("500 Internal Server Error")));

    let handle = engine.delete_optimistic(&EntityId::new("conv-2")).unwrap();
    assert_eq!(ids(&engine), vec!["conv-1", "conv-3"]);

    let outcome = handle.outcome().await;
    assert!(!outcome.is_confirmed());
    assert_eq!(ids(&engine), vec!["conv-1", "conv-2", "conv-3"]);

    let events = drain(&mut events);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].operation, Operation::Delete);
    assert!(events[0].reason.as_deref().unwrap().contains("500"));
}

#[tokio::test]
async fn test_rollback_restores_exact_prior_state() {
    let transport = ScriptedTransport::<Conversation>::new();
    let (engine, _events) = conversation_engine(&transport);
    seed_conversations(&engine, &["conv-1", "conv-2"]);
    engine.select(Some(&EntityId::new("conv-2"))).unwrap();
    let before = engine.snapshot().unwrap();
    transport.script_update("conv-2", Err(SyncError::transport("timeout")));

    let patch = ConversationPatch {
        title: Some("Renamed".to_string()),
        favorite: Some(true),
        append_messages: vec![taskdeck_core::conversation::ChatMessage::user("hello")],
    };
    let handle = engine.update_optimistic(&EntityId::new("conv-2"), patch).unwrap();
    assert_ne!(engine.snapshot().unwrap(), before);

    handle.outcome().await;
    assert_eq!(engine.snapshot().unwrap(), before);
}

#[tokio::test]
async fn test_same_id_mutations_resolve_in_issue_order() {
    let transport = ScriptedTransport::<Conversation>::new();
    let (engine, mut events) = conversation_engine(&transport);
    seed_conversations(&engine, &["conv-1"]);
    let id = EntityId::new("conv-1");
    transport.script_update("conv-1", Err(SyncError::transport("offline")));
    transport.script_update("conv-1", Ok(UpdateAck::ok()));
    transport.hold();

    let first = engine
        .update_optimistic(&id, ConversationPatch::favorite(true))
        .unwrap();
    let second = engine
        .update_optimistic(&id, ConversationPatch::rename("Renamed"))
        .unwrap();

    // The second mutation is queued and not applied yet
    let current = engine.get_by_id(&id).unwrap();
    assert!(current.favorite);
    assert_eq!(current.title, "conv-1");
    assert!(engine.is_pending(&id));
    assert_eq!(engine.in_flight(), 2);

    transport.wait_for_calls(1).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(transport.calls().len(), 1);

    // First fails and rolls back before the second takes its snapshot
    transport.release(1);
    transport.wait_for_calls(2).await;
    transport.release(1);

    assert!(!first.outcome().await.is_confirmed());
    assert!(second.outcome().await.is_confirmed());

    let current = engine.get_by_id(&id).unwrap();
    assert!(!current.favorite);
    assert_eq!(current.title, "Renamed");
    assert!(!engine.is_pending(&id));
    assert_eq!(engine.in_flight(), 0);

    let kinds: Vec<_> = drain(&mut events).into_iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::Failure, EventKind::Success]);
}

#[tokio::test]
async fn test_rollback_keeps_concurrent_change_on_other_id() {
    let transport = ScriptedTransport::<Conversation>::new();
    let (engine, _events) = conversation_engine(&transport);
    seed_conversations(&engine, &["conv-1", "conv-2"]);
    transport.script_update("conv-1", Err(SyncError::transport("offline")));
    transport.hold();

    let failing = engine
        .update_optimistic(&EntityId::new("conv-1"), ConversationPatch::favorite(true))
        .unwrap();
    let succeeding = engine
        .update_optimistic(&EntityId::new("conv-2"), ConversationPatch::rename("Kept"))
        .unwrap();
    transport.wait_for_calls(2).await;
    transport.release(2);

    assert!(!failing.outcome().await.is_confirmed());
    assert!(succeeding.outcome().await.is_confirmed());

    let all = engine.get_all();
    assert!(!all[0].favorite);
    assert_eq!(all[1].title, "Kept");
    assert_eq!(ids(&engine), vec!["conv-1", "conv-2"]);
}

#[tokio::test]
async fn test_update_after_pending_delete_is_not_found() {
    let transport = ScriptedTransport::<Conversation>::new();
    let (engine, mut events) = conversation_engine(&transport);
    seed_conversations(&engine, &["conv-1"]);
    let id = EntityId::new("conv-1");
    transport.hold();

    let _delete = engine.delete_optimistic(&id).unwrap();
    // Already gone from the store, so rejected up front
    let err = engine
        .update_optimistic(&id, ConversationPatch::favorite(true))
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(drain(&mut events).len(), 1);
}

#[tokio::test]
async fn test_queued_update_after_delete_rolls_back_not_found() {
    let transport = ScriptedTransport::<Conversation>::new();
    let (engine, mut events) = conversation_engine(&transport);
    seed_conversations(&engine, &["conv-1"]);
    let id = EntityId::new("conv-1");
    transport.hold();

    let favorite = engine
        .update_optimistic(&id, ConversationPatch::favorite(true))
        .unwrap();
    let delete = engine.delete_optimistic(&id).unwrap();
    let rename = engine
        .update_optimistic(&id, ConversationPatch::rename("Late"))
        .unwrap();

    transport.wait_for_calls(1).await;
    transport.release(1);
    transport.wait_for_calls(2).await;
    transport.release(1);

    assert!(favorite.outcome().await.is_confirmed());
    assert!(delete.outcome().await.is_confirmed());
    let outcome = rename.outcome().await;
    assert!(matches!(
        outcome,
        MutationOutcome::RolledBack { reason: SyncError::NotFound { .. }, .. }
    ));
    assert!(engine.get_all().is_empty());
    assert_eq!(
        transport.calls(),
        vec![
            Call::Update(id.clone(), json!({"favorite": true})),
            Call::Delete(id),
        ]
    );

    let kinds: Vec<_> = drain(&mut events).into_iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::Success, EventKind::Success, EventKind::Failure]);
}

#[tokio::test]
async fn test_refresh_is_deferred_while_mutation_pending() {
    let transport = ScriptedTransport::<Conversation>::new();
    let (engine, _events) = conversation_engine(&transport);
    seed_conversations(&engine, &["conv-1"]);
    transport.set_list(vec![conversation_record("conv-1", "conv-1"), conversation_record("conv-2", "Other")]);
    transport.hold();

    let handle = engine
        .update_optimistic(&EntityId::new("conv-1"), ConversationPatch::favorite(true))
        .unwrap();

    assert_eq!(engine.refresh().await.unwrap(), RefreshOutcome::Deferred);
    // The optimistic change survives the refetch
    assert!(engine.get_all()[0].favorite);
    assert_eq!(engine.get_all().len(), 1);

    transport.release(1);
    handle.outcome().await;

    assert_eq!(engine.refresh().await.unwrap(), RefreshOutcome::Applied { count: 2 });
    assert_eq!(ids(&engine), vec!["conv-1", "conv-2"]);
}

#[tokio::test]
async fn test_refresh_deferred_when_mutation_settles_during_fetch() {
    let transport = ScriptedTransport::<Conversation>::new();
    let (engine, _events) = conversation_engine(&transport);
    seed_conversations(&engine, &["conv-1"]);
    // The server list predates the favorite below
    transport.set_list(vec![conversation_record("conv-1", "conv-1")]);
    transport.hold_list();

    let refresher = engine.clone();
    let refresh = tokio::spawn(async move { refresher.refresh().await });
    transport.wait_for_calls(1).await;

    let outcome = engine
        .update_optimistic(&EntityId::new("conv-1"), ConversationPatch::favorite(true))
        .unwrap()
        .outcome()
        .await;
    assert!(outcome.is_confirmed());
    assert_eq!(engine.in_flight(), 0);

    transport.release_list(1);

    assert_eq!(refresh.await.unwrap().unwrap(), RefreshOutcome::Deferred);
    assert!(engine.get_by_id(&EntityId::new("conv-1")).unwrap().favorite);

    // Nothing starts during this fetch, so it applies
    transport.release_list(1);
    assert_eq!(engine.refresh().await.unwrap(), RefreshOutcome::Applied { count: 1 });
}

#[tokio::test]
async fn test_store_changes_are_broadcast() {
    let transport = ScriptedTransport::<Conversation>::new();
    let (engine, _events) = conversation_engine(&transport);
    let mut changes = engine.subscribe();
    transport.script_create(Ok(conversation_record("conv-9", "Notes")));

    let handle = engine
        .create_optimistic(ConversationDraft::titled("Notes"), false)
        .unwrap();
    let temp_id = handle.entity_id().clone();
    handle.outcome().await;

    assert_eq!(
        changes.try_recv().unwrap(),
        StoreChange::Inserted { id: temp_id.clone() }
    );
    assert_eq!(
        changes.try_recv().unwrap(),
        StoreChange::Replaced {
            old: temp_id,
            new: EntityId::new("conv-9")
        }
    );
    assert!(changes.try_recv().is_err());
}

#[tokio::test]
async fn test_selection_follows_id_swap() {
    let transport = ScriptedTransport::<Conversation>::new();
    let (engine, _events) = conversation_engine(&transport);
    transport.script_create(Ok(conversation_record("conv-55", "New Chat")));
    transport.hold();

    let handle = engine
        .create_optimistic(ConversationDraft::titled("New Chat"), true)
        .unwrap();
    engine.select(Some(handle.entity_id())).unwrap();
    transport.release(1);
    handle.outcome().await;

    assert_eq!(engine.selected(), Some(EntityId::new("conv-55")));
}

#[tokio::test]
async fn test_exactly_one_event_per_attempt() {
    let transport = ScriptedTransport::<Conversation>::new();
    let (engine, mut events) = conversation_engine(&transport);
    seed_conversations(&engine, &["conv-1", "conv-2"]);
    transport.script_create(Ok(conversation_record("conv-3", "C")));
    transport.script_update("conv-1", Err(SyncError::transport("offline")));

    let create = engine
        .create_optimistic(ConversationDraft::titled("C"), false)
        .unwrap();
    let temp_id = create.entity_id().clone();
    let update = engine
        .update_optimistic(&EntityId::new("conv-1"), ConversationPatch::favorite(true))
        .unwrap();
    let delete = engine.delete_optimistic(&EntityId::new("conv-2")).unwrap();
    let invalid = engine.update_optimistic(&temp_id, ConversationPatch::rename("x"));

    create.outcome().await;
    update.outcome().await;
    delete.outcome().await;
    assert!(invalid.is_err());

    let events = drain(&mut events);
    assert_eq!(events.len(), 4);
    assert_eq!(events.iter().filter(|e| e.is_success()).count(), 2);
}

#[tokio::test]
async fn test_task_status_change_rolls_back() {
    let conversations = ScriptedTransport::<Conversation>::new();
    let tasks = ScriptedTransport::<Task>::new();
    let (sink, _events) = ChannelSink::channel();
    let client = SyncClient::new(conversations, tasks.clone(), Arc::new(sink), SyncConfig::default());
    client
        .tasks()
        .reconcile_list(vec![task_record("task-1", "Write report", "todo")])
        .unwrap();
    tasks.script_update("task-1", Err(SyncError::transport("503 Service Unavailable")));
    let id = EntityId::new("task-1");

    let handle = client.set_task_status(&id, TaskStatus::Done).unwrap();
    assert_eq!(client.tasks().get_by_id(&id).unwrap().status, TaskStatus::Done);

    handle.outcome().await;
    assert_eq!(client.tasks().get_by_id(&id).unwrap().status, TaskStatus::Todo);
    assert_eq!(tasks.calls(), vec![Call::Update(id, json!({"status": "done"}))]);
}

#[tokio::test]
async fn test_engines_share_temporary_id_space() {
    let conversations = ScriptedTransport::<Conversation>::new();
    let tasks = ScriptedTransport::<Task>::new();
    conversations.hold();
    tasks.hold();
    let (sink, _events) = ChannelSink::channel();
    let client = SyncClient::new(conversations, tasks, Arc::new(sink), SyncConfig::default());

    let conversation = client
        .conversations()
        .create_optimistic(ConversationDraft::titled("A"), false)
        .unwrap();
    let task = client
        .tasks()
        .create_optimistic(TaskDraft::titled("B"), false)
        .unwrap();

    assert_ne!(conversation.entity_id(), task.entity_id());
}

#[tokio::test]
async fn test_concurrent_creates_keep_issue_order() {
    let transport = ScriptedTransport::<Conversation>::new();
    let (engine, mut events) = conversation_engine(&transport);
    for n in 0..20 {
        transport.script_create(Ok(conversation_record(&format!("conv-{}", 100 + n), "bulk")));
    }

    let handles: Vec<_> = (0..20)
        .map(|n| {
            engine
                .create_optimistic(ConversationDraft::titled(format!("draft {n}")), false)
                .unwrap()
        })
        .collect();
    let temp_ids: Vec<_> = handles.iter().map(|h| h.entity_id().clone()).collect();
    let unique: std::collections::HashSet<_> = temp_ids.iter().collect();
    assert_eq!(unique.len(), 20);

    let outcomes = futures::future::join_all(handles.into_iter().map(|h| h.outcome())).await;

    assert!(outcomes.iter().all(MutationOutcome::is_confirmed));
    let persisted: Vec<String> = outcomes
        .iter()
        .map(|outcome| outcome.entity_id().to_string())
        .collect();
    // Each confirmed entity took its placeholder's slot
    assert_eq!(ids(&engine), persisted);
    assert!(engine.get_all().iter().all(|c| !c.id.is_temporary()));
    assert_eq!(drain(&mut events).len(), 20);
}
