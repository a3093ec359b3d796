//! CLI command implementations.

pub mod auth;
pub mod history;
pub mod send;
pub mod status;
pub mod watch;

use chrono::Local;
use pollchat_client::{Identity, Message};

/// One line per message: `[HH:MM:SS] name: text`, marking the user's own.
pub fn format_message(message: &Message, me: Option<&Identity>) -> String {
    let time = message.created_at.with_timezone(&Local).format("%H:%M:%S");
    let own = me.is_some_and(|me| message.is_from(me));
    let marker = if own { " (you)" } else { "" };
    format!("[{}] {}{}: {}", time, message.author_username, marker, message.content)
}
