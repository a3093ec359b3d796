//! Mock gateway for testing.
//!
//! Allows queueing responses, injecting failures and inspecting every call
//! (including the credential attached to it) for verification.
//!
//! When nothing is queued the mock behaves like a tiny in-memory server:
//! posts are appended to its history and listed back.

use super::{Gateway, GatewayError};
use crate::session::SessionStore;
use async_trait::async_trait;
use chrono::Utc;
use pollchat_types::{
    AuthResponse, Identity, LoginRequest, Message, MessageId, PostMessageRequest,
    RegisterRequest, UserId,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const DEFAULT_PICTURE: &str = "https://via.placeholder.com/50";

/// A call that reached the mock (passed local validation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `login(username, ..)`
    Login {
        /// Trimmed username.
        username: String,
    },
    /// `register(username, .., picture)`
    Register {
        /// Trimmed username.
        username: String,
        /// Picture after default substitution.
        profile_picture: String,
    },
    /// `list_messages()`
    ListMessages,
    /// `post_message(content)`
    PostMessage {
        /// Content as sent.
        content: String,
    },
}

/// A call plus the bearer token attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// What was called.
    pub call: Call,
    /// Raw token attached, if any.
    pub bearer: Option<String>,
}

/// Mock gateway for testing.
///
/// Clones share state, so a test can keep one handle while the client
/// under test owns another.
#[derive(Debug, Default)]
pub struct MockGateway {
    inner: Arc<Mutex<MockGatewayInner>>,
    session: Option<SessionStore>,
}

#[derive(Debug, Default)]
struct MockGatewayInner {
    calls: Vec<RecordedCall>,
    history: Vec<Message>,
    list_queue: VecDeque<Result<Vec<Message>, GatewayError>>,
    post_queue: VecDeque<Result<Message, GatewayError>>,
    auth_queue: VecDeque<Result<AuthResponse, GatewayError>>,
    fail_lists: Option<GatewayError>,
    latency: Duration,
    in_flight: usize,
    max_in_flight: usize,
}

impl MockGateway {
    /// Create a new mock gateway with no session attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the session whose credential is recorded with each call.
    pub fn with_session(mut self, session: SessionStore) -> Self {
        self.session = Some(session);
        self
    }

    fn lock(&self) -> MutexGuard<'_, MockGatewayInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the server-side history returned when no list is queued.
    pub fn set_history(&self, messages: Vec<Message>) {
        self.lock().history = messages;
    }

    /// Server-side history (including posts the mock accepted).
    pub fn history(&self) -> Vec<Message> {
        self.lock().history.clone()
    }

    /// Queue the result of the next `list_messages()` call.
    pub fn queue_list(&self, result: Result<Vec<Message>, GatewayError>) {
        self.lock().list_queue.push_back(result);
    }

    /// Queue the result of the next `post_message()` call.
    pub fn queue_post(&self, result: Result<Message, GatewayError>) {
        self.lock().post_queue.push_back(result);
    }

    /// Queue the result of the next `login()` or `register()` call.
    pub fn queue_auth(&self, result: Result<AuthResponse, GatewayError>) {
        self.lock().auth_queue.push_back(result);
    }

    /// Fail every unqueued `list_messages()` with the given error until
    /// cleared with `None`.
    pub fn fail_lists(&self, error: Option<GatewayError>) {
        self.lock().fail_lists = error;
    }

    /// Delay every call by `latency` before it completes.
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// All calls that passed local validation, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Number of `list_messages()` calls so far.
    pub fn list_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.call == Call::ListMessages)
            .count()
    }

    /// Number of `post_message()` calls so far.
    pub fn post_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c.call, Call::PostMessage { .. }))
            .count()
    }

    /// Highest number of calls that were in progress at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    /// Clear all state (calls, queues, history, latency).
    pub fn reset(&self) {
        *self.lock() = MockGatewayInner::default();
    }

    fn bearer(&self) -> Option<String> {
        self.session
            .as_ref()
            .and_then(|s| s.credential())
            .map(|c| c.token().to_string())
    }

    /// Record the call, pick its response on arrival, then wait out the
    /// configured latency.
    async fn call<T, F>(&self, call: Call, respond: F) -> Result<T, GatewayError>
    where
        T: Send,
        F: FnOnce(&mut MockGatewayInner) -> Result<T, GatewayError> + Send,
    {
        let bearer = self.bearer();
        let (result, latency) = {
            let mut inner = self.lock();
            inner.calls.push(RecordedCall { call, bearer });
            inner.in_flight += 1;
            inner.max_in_flight = inner.max_in_flight.max(inner.in_flight);
            let result = respond(&mut inner);
            (result, inner.latency)
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        {
            let mut inner = self.lock();
            inner.in_flight = inner.in_flight.saturating_sub(1);
        }
        result
    }

    fn author(&self) -> Identity {
        self.session
            .as_ref()
            .and_then(|s| s.identity())
            .unwrap_or_else(|| Identity {
                id: UserId::new(1),
                username: "mock".into(),
                profile_picture: DEFAULT_PICTURE.into(),
            })
    }
}

impl Clone for MockGateway {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            session: self.session.clone(),
        }
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, GatewayError> {
        let request = LoginRequest::new(username, password)?;
        let call = Call::Login {
            username: request.username,
        };
        self.call(call, |inner| {
            inner
                .auth_queue
                .pop_front()
                .unwrap_or_else(|| Err(GatewayError::Auth("Invalid credentials".into())))
        })
        .await
    }

    async fn register(
        &self,
        username: &str,
        password: &str,
        profile_picture: &str,
    ) -> Result<AuthResponse, GatewayError> {
        let request = RegisterRequest::new(username, password, profile_picture, DEFAULT_PICTURE)?;
        let call = Call::Register {
            username: request.username,
            profile_picture: request.profile_picture,
        };
        self.call(call, |inner| {
            inner
                .auth_queue
                .pop_front()
                .unwrap_or_else(|| Err(GatewayError::Server("no auth response queued".into())))
        })
        .await
    }

    async fn list_messages(&self) -> Result<Vec<Message>, GatewayError> {
        self.call(Call::ListMessages, |inner| {
            if let Some(result) = inner.list_queue.pop_front() {
                return result;
            }
            if let Some(error) = inner.fail_lists.clone() {
                return Err(error);
            }
            Ok(inner.history.clone())
        })
        .await
    }

    async fn post_message(&self, content: &str) -> Result<Message, GatewayError> {
        let request = PostMessageRequest::new(content)?;
        let author = self.author();
        let call = Call::PostMessage {
            content: request.content.clone(),
        };
        self.call(call, move |inner| {
            if let Some(result) = inner.post_queue.pop_front() {
                return result;
            }

            let next_id = inner
                .history
                .iter()
                .map(|m| m.id.value())
                .max()
                .unwrap_or(0)
                + 1;
            let message = Message {
                id: MessageId::new(next_id),
                author_id: author.id,
                author_username: author.username,
                author_picture: author.profile_picture,
                content: request.content,
                created_at: Utc::now(),
            };
            inner.history.push(message.clone());
            Ok(message)
        })
        .await
    }
}
