use crate::session::Session;
use anyhow::Result;
use std::time::Duration;
use taskdeck_application::{RefreshScheduler, StoreChange};
use tokio::sync::broadcast::error::RecvError;

/// Keeps both collections in sync and prints every reload until Ctrl-C.
pub async fn run(session: &Session, interval: Option<u64>) -> Result<()> {
    session.load().await?;
    println!(
        "{} conversations, {} tasks. Watching, press Ctrl-C to stop.",
        session.client.conversations().get_all().len(),
        session.client.tasks().get_all().len()
    );

    let schedulers = match interval {
        Some(secs) => {
            let period = Duration::from_secs(secs.max(1));
            vec![
                RefreshScheduler::start(session.client.conversations().clone(), period),
                RefreshScheduler::start(session.client.tasks().clone(), period),
            ]
        }
        None => session.client.start_refresh(),
    };
    if schedulers.is_empty() {
        println!("Periodic refresh is disabled in the configuration; pass --interval to override.");
        return Ok(());
    }

    let mut conversations = session.client.conversations().subscribe();
    let mut tasks = session.client.tasks().subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            change = conversations.recv() => report("conversations", change),
            change = tasks.recv() => report("tasks", change),
        }
    }

    for scheduler in schedulers {
        scheduler.stop().await;
    }
    Ok(())
}

fn report(collection: &str, change: Result<StoreChange, RecvError>) {
    match change {
        Ok(StoreChange::Reloaded { count }) => println!("{collection}: {count} from server"),
        Ok(_) => {}
        Err(RecvError::Lagged(skipped)) => {
            tracing::debug!("{} watcher skipped {} changes", collection, skipped);
        }
        Err(RecvError::Closed) => {}
    }
}
