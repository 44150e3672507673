use crate::session::Session;
use anyhow::Result;
use taskdeck_core::EntityId;
use taskdeck_core::conversation::{ChatMessage, Conversation, ConversationDraft, ConversationPatch};

pub fn print_list(conversations: &[Conversation], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(conversations)?);
        return Ok(());
    }
    if conversations.is_empty() {
        println!("No conversations.");
        return Ok(());
    }
    for conversation in conversations {
        println!(
            "{:<16} {} {} ({} messages)",
            conversation.id.as_str(),
            if conversation.favorite { "*" } else { " " },
            conversation.title,
            conversation.messages.len()
        );
    }
    Ok(())
}

pub async fn list(session: &Session, json: bool) -> Result<()> {
    session.load().await?;
    print_list(&session.client.conversations().get_all(), json)
}

pub async fn create(
    session: &mut Session,
    title: String,
    message: Option<String>,
    at_back: bool,
) -> Result<()> {
    let mut draft = ConversationDraft::titled(title);
    if let Some(message) = message {
        draft = draft.with_message(ChatMessage::user(message));
    }
    let handle = session
        .client
        .conversations()
        .create_optimistic(draft, !at_back)?;
    let id = session.settle(handle).await?;
    println!("{id}");
    Ok(())
}

pub async fn favorite(session: &mut Session, id: String) -> Result<()> {
    session.load().await?;
    let id = EntityId::new(id);
    let handle = session.client.toggle_favorite(&id)?;
    session.settle(handle).await?;
    if let Some(conversation) = session.client.conversations().get_by_id(&id) {
        println!(
            "{} is {}",
            id,
            if conversation.favorite { "starred" } else { "not starred" }
        );
    }
    Ok(())
}

pub async fn send(session: &mut Session, id: String, message: String) -> Result<()> {
    session.load().await?;
    let handle = session.client.send_message(&EntityId::new(id), message)?;
    session.settle(handle).await?;
    Ok(())
}

pub async fn rename(session: &mut Session, id: String, title: String) -> Result<()> {
    session.load().await?;
    let handle = session
        .client
        .conversations()
        .update_optimistic(&EntityId::new(id), ConversationPatch::rename(title))?;
    session.settle(handle).await?;
    Ok(())
}

pub async fn delete(session: &mut Session, id: String) -> Result<()> {
    session.load().await?;
    let handle = session
        .client
        .conversations()
        .delete_optimistic(&EntityId::new(id))?;
    session.settle(handle).await?;
    Ok(())
}
