//! Gateway abstraction for the messaging service.
//!
//! This module provides the typed request/response boundary between the
//! client and the remote service (HTTP, mock for testing).
//!
//! # Design
//!
//! Every call either returns a typed payload or a [`GatewayError`] already
//! normalized into one of four kinds:
//! - `Validation`: input rejected, locally or by the service
//! - `Auth`: credential rejected, the session must be torn down
//! - `Network`: transport unreachable or timed out
//! - `Server`: the service failed or answered with garbage
//!
//! Implementations attach the stored credential to every call when one is
//! present. They never decide authentication policy themselves.
//!
//! # Example
//!
//! ```ignore
//! let gateway = MockGateway::new();
//! gateway.queue_auth(Ok(auth_response));
//! let auth = gateway.login("alice", "hunter2").await?;
//! let messages = gateway.list_messages().await?;
//! ```

mod http;
mod mock;

pub use http::HttpGateway;
pub use mock::{Call, MockGateway, RecordedCall};

use async_trait::async_trait;
use pollchat_types::{AuthResponse, ErrorKind, Message, ValidationError};
use thiserror::Error;

/// Longest detail kept from an error response body.
const MAX_DETAIL_CHARS: usize = 200;

/// Gateway errors, one variant per [`ErrorKind`].
///
/// The payload is the detail text: the service's own explanation when it
/// gave one, otherwise a short description. It may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Input rejected.
    #[error("validation error: {}", or_unspecified(.0))]
    Validation(String),

    /// Credential missing, invalid or expired.
    #[error("authentication rejected: {}", or_unspecified(.0))]
    Auth(String),

    /// Transport failure.
    #[error("network error: {}", or_unspecified(.0))]
    Network(String),

    /// Remote-side failure.
    #[error("server error: {}", or_unspecified(.0))]
    Server(String),
}

fn or_unspecified(detail: &str) -> &str {
    if detail.is_empty() {
        "no details"
    } else {
        detail
    }
}

impl GatewayError {
    /// Build an error with the given kind.
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match kind {
            ErrorKind::Validation => Self::Validation(detail),
            ErrorKind::Auth => Self::Auth(detail),
            ErrorKind::Network => Self::Network(detail),
            ErrorKind::Server => Self::Server(detail),
        }
    }

    /// Normalize a non-success HTTP status and its body.
    ///
    /// 401 and 403 mean the credential was rejected, other 4xx the request,
    /// everything else is the server's fault.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = truncate_detail(body.trim());
        let kind = match status {
            401 | 403 => ErrorKind::Auth,
            400..=499 => ErrorKind::Validation,
            _ => ErrorKind::Server,
        };
        Self::new(kind, detail)
    }

    /// The normalized failure kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Auth(_) => ErrorKind::Auth,
            Self::Network(_) => ErrorKind::Network,
            Self::Server(_) => ErrorKind::Server,
        }
    }

    /// Detail text, possibly empty.
    pub fn detail(&self) -> &str {
        match self {
            Self::Validation(d) | Self::Auth(d) | Self::Network(d) | Self::Server(d) => d,
        }
    }

    /// Whether retrying later may succeed.
    pub fn is_transient(&self) -> bool {
        self.kind().is_transient()
    }
}

impl From<ValidationError> for GatewayError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return Self::from_status(status.as_u16(), "");
        }
        if e.is_decode() {
            return Self::Server(format!("invalid response: {}", e));
        }
        if e.is_timeout() {
            return Self::Network("request timed out".into());
        }
        if e.is_connect() {
            return Self::Network("could not connect to server".into());
        }
        Self::Network(e.to_string())
    }
}

fn truncate_detail(detail: &str) -> String {
    match detail.char_indices().nth(MAX_DETAIL_CHARS) {
        Some((cut, _)) => format!("{}...", &detail[..cut]),
        None => detail.to_string(),
    }
}

/// Typed boundary to the messaging service.
///
/// Implementations handle the underlying mechanism (HTTP, mock, etc).
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Exchange username and password for a credential.
    async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, GatewayError>;

    /// Create an account and receive a credential for it.
    ///
    /// An empty `profile_picture` is replaced with the configured default.
    async fn register(
        &self,
        username: &str,
        password: &str,
        profile_picture: &str,
    ) -> Result<AuthResponse, GatewayError>;

    /// Fetch the full message history, ascending by id.
    async fn list_messages(&self) -> Result<Vec<Message>, GatewayError>;

    /// Post a message and return it as stored by the service.
    ///
    /// Content that is blank after trimming fails with
    /// [`GatewayError::Validation`] without any request being made.
    async fn post_message(&self, content: &str) -> Result<Message, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(GatewayError::from_status(401, "").kind(), ErrorKind::Auth);
        assert_eq!(GatewayError::from_status(403, "").kind(), ErrorKind::Auth);
        assert_eq!(
            GatewayError::from_status(409, "").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            GatewayError::from_status(400, "").kind(),
            ErrorKind::Validation
        );
        assert_eq!(GatewayError::from_status(500, "").kind(), ErrorKind::Server);
        assert_eq!(GatewayError::from_status(503, "").kind(), ErrorKind::Server);
        // Redirects the client did not follow are not the caller's fault.
        assert_eq!(GatewayError::from_status(302, "").kind(), ErrorKind::Server);
    }

    #[test]
    fn body_becomes_trimmed_detail() {
        let err = GatewayError::from_status(409, "Username already exists\n");
        assert_eq!(err.detail(), "Username already exists");
        assert_eq!(
            err.to_string(),
            "validation error: Username already exists"
        );
    }

    #[test]
    fn empty_detail_display() {
        let err = GatewayError::from_status(500, "   ");
        assert_eq!(err.detail(), "");
        assert_eq!(err.to_string(), "server error: no details");
    }

    #[test]
    fn long_body_is_truncated() {
        let body = "x".repeat(MAX_DETAIL_CHARS + 50);
        let err = GatewayError::from_status(500, &body);
        assert_eq!(err.detail().len(), MAX_DETAIL_CHARS + 3);
        assert!(err.detail().ends_with("..."));
    }

    #[test]
    fn validation_error_converts() {
        let err: GatewayError = ValidationError::EmptyContent.into();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.detail(), "message content must not be empty");
        assert!(!err.is_transient());
    }

    #[test]
    fn new_roundtrips_kind() {
        for kind in [
            ErrorKind::Validation,
            ErrorKind::Auth,
            ErrorKind::Network,
            ErrorKind::Server,
        ] {
            assert_eq!(GatewayError::new(kind, "x").kind(), kind);
        }
    }
}
