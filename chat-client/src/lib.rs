//! # chat-client
//!
//! Client library for the pollchat messaging service.
//!
//! This is the library a front end (the `pollchat` CLI, or any other
//! presentation layer) uses to talk to the service.
//!
//! ## Features
//!
//! - **Session Store**: credential and identity persisted across restarts
//! - **Gateway Abstraction**: pluggable service boundary (HTTP, mock)
//! - **Feed Synchronizer**: fixed-interval polling, at most one poll in flight
//! - **Pure State Machine**: uses chat-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use pollchat_client::{ChatSession, ClientConfig, FileBackend, SessionStore};
//!
//! let config = ClientConfig::from_env();
//! let session = SessionStore::open(FileBackend::open("/tmp/pollchat")?);
//! let chat = ChatSession::connect(&config, session)?;
//!
//! if !chat.restore() {
//!     chat.login("alice", "hunter2").await?;
//! }
//! chat.append("hello").await?;
//! let messages = chat.messages();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod feed;
pub mod gateway;
pub mod lifecycle;
pub mod session;

pub use config::{ClientConfig, ConfigError, SERVER_URL_ENV};
pub use feed::FeedSync;
pub use gateway::{Call, Gateway, GatewayError, HttpGateway, MockGateway, RecordedCall};
pub use lifecycle::{ActionError, ChatSession};
pub use session::{
    FileBackend, MemoryBackend, Session, SessionBackend, SessionStore, StoreError, TOKEN_KEY,
    USER_KEY,
};

// Re-exported so front ends need only this crate.
pub use pollchat_core::{FeedEvent, PollState, UserAction};
pub use pollchat_types::{Credential, ErrorKind, Identity, Message, MessageId, UserId};
