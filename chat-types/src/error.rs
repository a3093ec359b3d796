//! Error taxonomy for pollchat.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The four failure kinds every remote call is normalized into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Malformed input; the caller must correct it.
    Validation,
    /// Credential invalid or expired; forces logout.
    Auth,
    /// Transport unreachable or timed out.
    Network,
    /// The remote side failed.
    Server,
}

impl ErrorKind {
    /// Whether retrying the same request later may succeed.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Network | Self::Server)
    }

    /// Whether this failure must tear down the session.
    pub fn forces_logout(self) -> bool {
        matches!(self, Self::Auth)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::Auth => "auth",
            Self::Network => "network",
            Self::Server => "server",
        };
        f.write_str(s)
    }
}

/// Input rejected locally, before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Message content is empty after trimming whitespace.
    #[error("message content must not be empty")]
    EmptyContent,

    /// Username is empty after trimming whitespace.
    #[error("username is required")]
    EmptyUsername,

    /// Password is empty.
    #[error("password is required")]
    EmptyPassword,
}

impl ValidationError {
    /// Validation failures are always [`ErrorKind::Validation`].
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}
