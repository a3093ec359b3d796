//! # chat-types
//!
//! Wire format types for the pollchat messaging client.
//!
//! This crate provides the foundational types used across all pollchat crates:
//! - [`UserId`], [`MessageId`] - Identity and ordering types
//! - [`Credential`], [`Identity`] - The authenticated session pair
//! - [`Message`] - One entry of the shared message log
//! - [`LoginRequest`], [`RegisterRequest`], [`PostMessageRequest`], [`AuthResponse`] - Request/response bodies
//! - [`ErrorKind`], [`ValidationError`] - Error taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

mod credential;
mod error;
mod ids;
mod messages;

pub use credential::Credential;
pub use error::{ErrorKind, ValidationError};
pub use ids::{MessageId, UserId};
pub use messages::{
    AuthResponse, Identity, LoginRequest, Message, PostMessageRequest, RegisterRequest,
};
