//! Print the conversation once.

use anyhow::Result;
use pollchat_client::FeedEvent;
use tokio::sync::broadcast::error::RecvError;

use super::format_message;
use crate::config::AppContext;

/// Run the history command.
///
/// Starts the feed, waits for the first poll to finish and prints the view.
pub async fn run(ctx: &AppContext) -> Result<()> {
    let chat = ctx.logged_in_chat()?;
    let mut events = chat.subscribe();
    chat.restore();

    loop {
        match events.recv().await {
            Ok(FeedEvent::Updated { .. }) => break,
            Ok(FeedEvent::TransientFailure { error, .. }) => {
                chat.feed().stop();
                anyhow::bail!("Could not load messages: {}", error);
            }
            Ok(FeedEvent::SessionRejected { .. }) => {
                anyhow::bail!("Session expired. Run 'pollchat login <username>' again.");
            }
            Ok(_) | Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => anyhow::bail!("Feed closed unexpectedly"),
        }
    }

    let me = chat.identity();
    let messages = chat.messages();
    chat.feed().stop();

    if messages.is_empty() {
        println!("No messages yet.");
    }
    for message in &messages {
        println!("{}", format_message(message, me.as_ref()));
    }
    Ok(())
}
