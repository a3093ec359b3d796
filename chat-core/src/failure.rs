//! User-facing text for failed user actions.
//!
//! Background poll failures are silent. Explicit actions (login, register,
//! send) surface one short line and leave the user's input alone.

use pollchat_types::ErrorKind;

/// Shown for every transient failure, whatever the action.
pub const TRANSIENT_FAILURE: &str = "Service unavailable, please try again";

/// A user-initiated operation that can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    /// Submitting username and password.
    Login,
    /// Creating an account.
    Register,
    /// Posting a message.
    Send,
}

impl UserAction {
    fn fallback(self) -> &'static str {
        match self {
            Self::Login => "Login failed",
            Self::Register => "Registration failed",
            Self::Send => "Failed to send message",
        }
    }
}

/// Describe a failed action in one line.
///
/// Validation and auth failures show the server's own explanation when it
/// gave one ("Username already exists"), transient ones a generic retry hint.
pub fn describe_failure(action: UserAction, kind: ErrorKind, detail: &str) -> String {
    if kind.is_transient() {
        return TRANSIENT_FAILURE.to_string();
    }
    match detail.trim() {
        "" => action.fallback().to_string(),
        detail => detail.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_failures_are_generic() {
        for action in [UserAction::Login, UserAction::Register, UserAction::Send] {
            assert_eq!(
                describe_failure(action, ErrorKind::Network, "connection refused"),
                TRANSIENT_FAILURE
            );
            assert_eq!(
                describe_failure(action, ErrorKind::Server, "panic in handler"),
                TRANSIENT_FAILURE
            );
        }
    }

    #[test]
    fn server_explanation_is_shown() {
        assert_eq!(
            describe_failure(UserAction::Login, ErrorKind::Auth, "Invalid credentials\n"),
            "Invalid credentials"
        );
        assert_eq!(
            describe_failure(
                UserAction::Register,
                ErrorKind::Validation,
                "Username already exists"
            ),
            "Username already exists"
        );
    }

    #[test]
    fn empty_detail_falls_back_per_action() {
        assert_eq!(
            describe_failure(UserAction::Register, ErrorKind::Validation, " "),
            "Registration failed"
        );
        assert_eq!(
            describe_failure(UserAction::Send, ErrorKind::Auth, ""),
            "Failed to send message"
        );
    }
}
