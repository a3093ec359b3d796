//! HTTP gateway to the messaging service.
//!
//! Routes (relative to the configured API base):
//!
//! | Call | Route |
//! |---|---|
//! | login | `POST /login` |
//! | register | `POST /register` |
//! | list messages | `GET /messages` |
//! | post message | `POST /messages` |
//!
//! Non-success responses carry a plain-text explanation, which becomes the
//! error detail.

use async_trait::async_trait;
use pollchat_types::{AuthResponse, LoginRequest, Message, PostMessageRequest, RegisterRequest};
use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::{Gateway, GatewayError};
use crate::config::ClientConfig;
use crate::session::SessionStore;

/// Gateway speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    base_url: String,
    http: reqwest::Client,
    session: SessionStore,
    default_picture: String,
}

impl HttpGateway {
    /// Create a gateway for the configured service.
    ///
    /// The credential is read from `session` at the time of each call.
    pub fn new(config: &ClientConfig, session: SessionStore) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("pollchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.api_base(),
            http,
            session,
            default_picture: config.default_profile_picture.clone(),
        })
    }

    /// API base URL, e.g. `http://localhost:8080/api`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.credential() {
            Some(credential) => request.header(AUTHORIZATION, credential.bearer()),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, route: &str) -> Result<T, GatewayError> {
        let resp = self.authorize(self.http.get(self.url(route))).send().await?;
        handle_json_response(resp).await
    }

    async fn post_json<TReq: Serialize + Sync, TResp: DeserializeOwned>(
        &self,
        route: &str,
        payload: &TReq,
    ) -> Result<TResp, GatewayError> {
        let resp = self
            .authorize(self.http.post(self.url(route)))
            .json(payload)
            .send()
            .await?;
        handle_json_response(resp).await
    }
}

async fn handle_json_response<T: DeserializeOwned>(resp: Response) -> Result<T, GatewayError> {
    let status = resp.status();
    if !status.is_success() {
        // A body we cannot read still leaves the status to go on.
        let body = resp.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), "Service returned an error");
        return Err(GatewayError::from_status(status.as_u16(), &body));
    }
    let body = resp.bytes().await?;
    serde_json::from_slice(&body)
        .map_err(|e| GatewayError::Server(format!("invalid response: {}", e)))
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, GatewayError> {
        let request = LoginRequest::new(username, password)?;
        debug!(username = %request.username, "Logging in");
        self.post_json("/login", &request).await
    }

    async fn register(
        &self,
        username: &str,
        password: &str,
        profile_picture: &str,
    ) -> Result<AuthResponse, GatewayError> {
        let request =
            RegisterRequest::new(username, password, profile_picture, &self.default_picture)?;
        debug!(username = %request.username, "Registering");
        self.post_json("/register", &request).await
    }

    async fn list_messages(&self) -> Result<Vec<Message>, GatewayError> {
        // The service encodes an empty history as `null`.
        let messages: Option<Vec<Message>> = self.get_json("/messages").await?;
        Ok(messages.unwrap_or_default())
    }

    async fn post_message(&self, content: &str) -> Result<Message, GatewayError> {
        let request = PostMessageRequest::new(content)?;
        self.post_json("/messages", &request).await
    }
}
