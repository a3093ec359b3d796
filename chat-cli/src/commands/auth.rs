//! Log in, register and log out.

use anyhow::Result;

use crate::config::AppContext;

/// Run the login command.
pub async fn login(ctx: &AppContext, username: &str, password: &str) -> Result<()> {
    let chat = ctx.chat()?;
    let me = chat.login(username, password).await?;

    println!("Logged in as {} (id {})", me.username, me.id);
    Ok(())
}

/// Run the register command.
pub async fn register(
    ctx: &AppContext,
    username: &str,
    password: &str,
    picture: &str,
) -> Result<()> {
    let chat = ctx.chat()?;
    let me = chat.register(username, password, picture).await?;

    println!("Registered and logged in as {} (id {})", me.username, me.id);
    println!("  Picture: {}", me.profile_picture);
    Ok(())
}

/// Run the logout command.
pub fn logout(ctx: &AppContext) -> Result<()> {
    if ctx.chat()?.logout() {
        println!("Logged out.");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}
