//! Request and response bodies exchanged with the messaging service.
//!
//! Field names follow the service's JSON: messages carry `user_id`,
//! `username`, `profile_picture` and an RFC 3339 `timestamp`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Credential, MessageId, UserId, ValidationError};

/// Profile of the authenticated user, paired with a [`Credential`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Server-assigned user id
    pub id: UserId,
    /// Display name
    pub username: String,
    /// Profile picture URL
    #[serde(default)]
    pub profile_picture: String,
}

/// One entry of the shared message log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Server-assigned, unique, increasing by creation order
    pub id: MessageId,
    /// Author's user id
    #[serde(rename = "user_id")]
    pub author_id: UserId,
    /// Author's username at the time of posting
    #[serde(rename = "username")]
    pub author_username: String,
    /// Author's profile picture URL at the time of posting
    #[serde(rename = "profile_picture", default)]
    pub author_picture: String,
    /// Message text (never empty)
    pub content: String,
    /// Server-side creation time
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Check whether this message was written by the given user.
    pub fn is_from(&self, identity: &Identity) -> bool {
        self.author_id == identity.id
    }
}

/// Body of `POST /login`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account name
    pub username: String,
    /// Plaintext password (sent over TLS only)
    pub password: String,
}

impl LoginRequest {
    /// Build a login request, rejecting blank fields.
    pub fn new(username: &str, password: &str) -> Result<Self, ValidationError> {
        validate_credentials(username, password)?;
        Ok(Self {
            username: username.trim().to_string(),
            password: password.to_string(),
        })
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Body of `POST /register`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Requested account name
    pub username: String,
    /// Plaintext password (sent over TLS only)
    pub password: String,
    /// Profile picture URL
    pub profile_picture: String,
}

impl RegisterRequest {
    /// Build a registration request, rejecting blank fields.
    ///
    /// An empty `profile_picture` is replaced with `default_picture`.
    pub fn new(
        username: &str,
        password: &str,
        profile_picture: &str,
        default_picture: &str,
    ) -> Result<Self, ValidationError> {
        validate_credentials(username, password)?;
        let picture = match profile_picture.trim() {
            "" => default_picture,
            url => url,
        };
        Ok(Self {
            username: username.trim().to_string(),
            password: password.to_string(),
            profile_picture: picture.to_string(),
        })
    }
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("profile_picture", &self.profile_picture)
            .finish()
    }
}

/// Body of `POST /messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMessageRequest {
    /// Message text
    pub content: String,
}

impl PostMessageRequest {
    /// Build a post request.
    ///
    /// Content that is empty after trimming is rejected; otherwise it is
    /// sent exactly as typed.
    pub fn new(content: &str) -> Result<Self, ValidationError> {
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        Ok(Self {
            content: content.to_string(),
        })
    }
}

/// Successful response to login and registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Bearer token for subsequent calls
    pub token: Credential,
    /// The authenticated user
    pub user: Identity,
}

fn validate_credentials(username: &str, password: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::EmptyUsername);
    }
    if password.is_empty() {
        return Err(ValidationError::EmptyPassword);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(id: u64) -> Identity {
        Identity {
            id: UserId::new(id),
            username: "alice".into(),
            profile_picture: "https://example.com/a.png".into(),
        }
    }

    #[test]
    fn message_uses_service_field_names() {
        let json = r#"{
            "id": 5,
            "user_id": 2,
            "username": "bob",
            "profile_picture": "https://example.com/b.png",
            "content": "hello",
            "timestamp": "2024-05-01T12:30:00Z"
        }"#;

        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.id, MessageId::new(5));
        assert_eq!(msg.author_id, UserId::new(2));
        assert_eq!(msg.author_username, "bob");
        assert_eq!(msg.content, "hello");
        assert_eq!(msg.created_at.to_rfc3339(), "2024-05-01T12:30:00+00:00");

        let back = serde_json::to_value(&msg).unwrap();
        assert_eq!(back["user_id"], 2);
        assert_eq!(back["username"], "bob");
        assert!(back.get("author_id").is_none());
    }

    #[test]
    fn message_accepts_fractional_offsets() {
        // The service emits nanosecond timestamps with a local offset.
        let json = r#"{"id":1,"user_id":1,"username":"a","profile_picture":"",
            "content":"x","timestamp":"2024-05-01T14:30:00.123456789+02:00"}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.created_at.to_rfc3339(), "2024-05-01T12:30:00.123456789+00:00");
    }

    #[test]
    fn is_from_compares_author_id() {
        let msg = Message {
            id: MessageId::new(1),
            author_id: UserId::new(7),
            author_username: "alice".into(),
            author_picture: String::new(),
            content: "hi".into(),
            created_at: Utc::now(),
        };
        assert!(msg.is_from(&identity(7)));
        assert!(!msg.is_from(&identity(8)));
    }

    #[test]
    fn auth_response_parses() {
        let json = r#"{"token":"jwt-token","user":{"id":3,"username":"carol","profile_picture":"p"}}"#;
        let resp: AuthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.token.token(), "jwt-token");
        assert_eq!(resp.user.username, "carol");
    }

    // ===========================================
    // Validation Tests
    // ===========================================

    #[test]
    fn post_rejects_blank_content() {
        assert_eq!(
            PostMessageRequest::new(""),
            Err(ValidationError::EmptyContent)
        );
        assert_eq!(
            PostMessageRequest::new("  \t\n "),
            Err(ValidationError::EmptyContent)
        );
    }

    #[test]
    fn post_keeps_content_verbatim() {
        let req = PostMessageRequest::new("  hello  ").unwrap();
        assert_eq!(req.content, "  hello  ");
    }

    #[test]
    fn login_rejects_blank_fields() {
        assert_eq!(
            LoginRequest::new(" ", "pw"),
            Err(ValidationError::EmptyUsername)
        );
        assert_eq!(
            LoginRequest::new("bob", ""),
            Err(ValidationError::EmptyPassword)
        );
    }

    #[test]
    fn register_substitutes_default_picture() {
        let req = RegisterRequest::new("bob", "pw", "", "https://via.placeholder.com/50").unwrap();
        assert_eq!(req.profile_picture, "https://via.placeholder.com/50");

        let req = RegisterRequest::new("bob", "pw", "https://x/y.png", "default").unwrap();
        assert_eq!(req.profile_picture, "https://x/y.png");
    }

    #[test]
    fn request_debug_redacts_password() {
        let req = LoginRequest::new("bob", "hunter2").unwrap();
        let debug = format!("{:?}", req);
        assert!(!debug.contains("hunter2"), "password leaked: {}", debug);
    }
}
