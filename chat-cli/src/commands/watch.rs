//! Follow the conversation until Ctrl-C.

use anyhow::{Context, Result};
use pollchat_client::{FeedEvent, MessageId};
use tokio::sync::broadcast::error::RecvError;

use super::format_message;
use crate::config::AppContext;

/// Run the watch command.
pub async fn run(ctx: &AppContext) -> Result<()> {
    let chat = ctx.logged_in_chat()?;
    let me = chat.identity();
    let mut events = chat.subscribe();
    chat.restore();

    eprintln!("Watching {} (Ctrl-C to stop)...", ctx.config.api_base());

    let mut last_printed: Option<MessageId> = None;
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                break;
            }
            event = events.recv() => match event {
                Ok(FeedEvent::Updated { .. }) => {
                    for message in chat.messages_after(last_printed) {
                        println!("{}", format_message(&message, me.as_ref()));
                        last_printed = Some(message.id);
                    }
                }
                Ok(FeedEvent::SessionRejected { .. }) => {
                    anyhow::bail!("Session expired. Run 'pollchat login <username>' again.");
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    }

    chat.feed().stop();
    Ok(())
}
