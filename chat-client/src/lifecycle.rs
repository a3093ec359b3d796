//! ChatSession - the session lifecycle controller.
//!
//! [`ChatSession`] is what a presentation layer talks to. It signs users in
//! and out, starts the feed for an authenticated session, and turns every
//! failure of an explicit user action into one short [`ActionError`].
//!
//! ```text
//! login/register → Gateway → SessionStore::set_session → FeedSync::start
//! logout         → SessionStore::clear_session → FeedSync::stop → SignedOut
//! ```

use pollchat_core::{describe_failure, FeedEvent, UserAction};
use pollchat_types::{Credential, ErrorKind, Identity, Message, MessageId};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::feed::FeedSync;
use crate::gateway::{Gateway, GatewayError, HttpGateway};
use crate::session::SessionStore;

/// Failure of an explicit user action, ready to show.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ActionError {
    /// The action that failed.
    pub action: UserAction,
    /// Normalized failure kind.
    pub kind: ErrorKind,
    /// One-line message for the user.
    pub message: String,
}

impl ActionError {
    fn from_gateway(action: UserAction, error: &GatewayError) -> Self {
        Self {
            action,
            kind: error.kind(),
            message: describe_failure(action, error.kind(), error.detail()),
        }
    }

    /// Whether retrying the same action later may succeed.
    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

/// Session lifecycle controller.
pub struct ChatSession<G: Gateway + 'static> {
    gateway: Arc<G>,
    session: SessionStore,
    feed: FeedSync<G>,
}

impl ChatSession<HttpGateway> {
    /// Controller talking HTTP to the configured service.
    pub fn connect(config: &ClientConfig, session: SessionStore) -> Result<Self, GatewayError> {
        let gateway = HttpGateway::new(config, session.clone())?;
        Ok(Self::new(gateway, session, config))
    }
}

impl<G: Gateway + 'static> ChatSession<G> {
    /// Controller over an arbitrary gateway.
    pub fn new(gateway: G, session: SessionStore, config: &ClientConfig) -> Self {
        let gateway = Arc::new(gateway);
        let feed = FeedSync::new(Arc::clone(&gateway), session.clone(), config);
        Self {
            gateway,
            session,
            feed,
        }
    }

    /// Resume a session persisted by an earlier run.
    ///
    /// Starts the feed and returns `true` if the store holds a session.
    pub fn restore(&self) -> bool {
        match self.session.identity() {
            Some(identity) => {
                info!(user = %identity.username, "Resuming stored session");
                self.feed.start();
                true
            }
            None => false,
        }
    }

    /// Sign in with username and password.
    ///
    /// On failure the current session, if any, is left untouched.
    pub async fn login(&self, username: &str, password: &str) -> Result<Identity, ActionError> {
        let auth = self
            .gateway
            .login(username, password)
            .await
            .map_err(|e| self.failed(UserAction::Login, &e))?;
        Ok(self.establish(auth.token, auth.user))
    }

    /// Create an account and sign in as it.
    ///
    /// An empty `profile_picture` is replaced with the configured default.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        profile_picture: &str,
    ) -> Result<Identity, ActionError> {
        let auth = self
            .gateway
            .register(username, password, profile_picture)
            .await
            .map_err(|e| self.failed(UserAction::Register, &e))?;
        Ok(self.establish(auth.token, auth.user))
    }

    /// Sign out: clear the session, stop the feed, and tell presentation.
    ///
    /// Returns `false` (and does nothing) when already signed out.
    pub fn logout(&self) -> bool {
        let had_session = self.session.clear_session();
        self.feed.stop();
        if had_session {
            self.feed.emit(FeedEvent::SignedOut);
        }
        had_session
    }

    /// Send a message.
    pub async fn append(&self, content: &str) -> Result<Message, ActionError> {
        if !self.session.is_authenticated() {
            return Err(ActionError {
                action: UserAction::Send,
                kind: ErrorKind::Auth,
                message: "Not logged in".into(),
            });
        }
        self.feed
            .append(content)
            .await
            .map_err(|e| self.failed(UserAction::Send, &e))
    }

    /// Snapshot of the message log, ascending by id.
    pub fn messages(&self) -> Vec<Message> {
        self.feed.messages()
    }

    /// Messages newer than `after`, ascending by id.
    pub fn messages_after(&self, after: Option<MessageId>) -> Vec<Message> {
        self.feed.messages_after(after)
    }

    /// The signed-in user, if any.
    pub fn identity(&self) -> Option<Identity> {
        self.session.identity()
    }

    /// Whether a user is signed in.
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Receive feed and session events.
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.feed.subscribe()
    }

    /// The underlying synchronizer.
    pub fn feed(&self) -> &FeedSync<G> {
        &self.feed
    }

    /// The session store.
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    fn establish(&self, credential: Credential, identity: Identity) -> Identity {
        // A different user must never see the previous user's view.
        self.feed.stop();
        self.session.set_session(credential, identity.clone());
        self.feed.start();
        identity
    }

    fn failed(&self, action: UserAction, error: &GatewayError) -> ActionError {
        debug!(?action, kind = %error.kind(), "User action failed");
        ActionError::from_gateway(action, error)
    }
}
