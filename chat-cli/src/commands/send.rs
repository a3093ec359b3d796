//! Post a message.

use anyhow::Result;

use crate::config::AppContext;

/// Run the send command.
pub async fn run(ctx: &AppContext, message: &str) -> Result<()> {
    let chat = ctx.logged_in_chat()?;
    let sent = chat.append(message).await?;

    println!("Sent message #{}", sent.id);
    Ok(())
}
