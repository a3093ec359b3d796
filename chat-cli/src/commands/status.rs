//! Show server and session status.

use anyhow::Result;

use crate::config::AppContext;

/// Run the status command.
pub fn run(ctx: &AppContext) -> Result<()> {
    println!("=== pollchat status ===");
    println!();
    println!("Server:");
    println!("  API:      {}", ctx.config.api_base());
    println!("  Interval: {} ms", ctx.config.poll_interval_ms);
    println!();

    match ctx.session().identity() {
        Some(me) => {
            println!("Session:");
            println!("  User:    {} (id {})", me.username, me.id);
            println!("  Picture: {}", me.profile_picture);
        }
        None => {
            println!("Session: Not logged in");
            println!();
            println!("Run 'pollchat login <username>' or 'pollchat register <username>'.");
        }
    }
    println!();
    println!("Data dir: {}", ctx.data_dir.display());

    Ok(())
}
