//! Walkthrough against the in-memory backend: optimistic create and id swap,
//! a favorite toggle, clearing a due date, and rollbacks while the backend
//! is offline.

use super::{conversations, tasks};
use crate::session::Session;
use anyhow::Result;
use serde_json::json;
use std::sync::Arc;
use taskdeck_core::SyncConfig;
use taskdeck_core::conversation::{ChatMessage, ConversationDraft};
use taskdeck_core::task::{TaskPatch, TaskStatus};
use taskdeck_infrastructure::InMemoryTransport;

pub async fn run(config: SyncConfig) -> Result<()> {
    let conversation_backend = Arc::new(InMemoryTransport::new());
    let task_backend = Arc::new(InMemoryTransport::with_records(vec![
        json!({"id": "task-1", "title": "Draft release notes", "status": "in-progress", "priority": "high", "dueDate": "2026-11-01"}),
        json!({"id": "task-2", "title": "Review pull requests", "status": "todo", "priority": "medium"}),
    ]));
    let mut session = Session::in_memory(conversation_backend, task_backend.clone(), config);
    session.load().await?;

    println!("== Create a conversation at the top of the list");
    let draft = ConversationDraft::titled("Trip planning").with_message(ChatMessage::user("Find flights to Lisbon"));
    let handle = session.client.conversations().create_optimistic(draft, true)?;
    println!("shown immediately as {}", handle.entity_id());
    let id = session.settle(handle).await?;
    conversations::print_list(&session.client.conversations().get_all(), false)?;

    println!("\n== Star it");
    let handle = session.client.toggle_favorite(&id)?;
    session.settle(handle).await?;
    conversations::print_list(&session.client.conversations().get_all(), false)?;

    println!("\n== Drop a due date");
    let handle = session
        .client
        .tasks()
        .update_optimistic(&"task-1".into(), TaskPatch::due_date(None))?;
    session.settle(handle).await?;
    tasks::print_list(&session.client.tasks().get_all(), false)?;

    println!("\n== Backend goes offline; changes roll back");
    task_backend.set_offline(true);
    tasks::print_list(&session.client.tasks().get_all(), false)?;
    let finish = session
        .client
        .set_task_status(&"task-2".into(), TaskStatus::Done)?;
    let remove = session.client.tasks().delete_optimistic(&"task-1".into())?;
    println!("optimistic view:");
    tasks::print_list(&session.client.tasks().get_all(), false)?;
    for handle in [finish, remove] {
        match session.settle(handle).await {
            Ok(id) => println!("unexpectedly confirmed {id}"),
            Err(reason) => println!("{reason}"),
        }
    }
    println!("after rollback:");
    tasks::print_list(&session.client.tasks().get_all(), false)?;

    task_backend.set_offline(false);
    Ok(())
}
