//! REST backup-persistence client.
//!
//! The socket broadcast is the durability signal for UI purposes; every send
//! is additionally POSTed here so the server can persist it, and a failure
//! of that backup call is logged and swallowed — the optimistic message is
//! never rolled back. Reads (history, venue search) do surface their errors,
//! rendered as toasts by the caller.

use serde::Deserialize;
use thiserror::Error;

use flock_shared::protocol::{MessageEvent, OutgoingMessage, VenueSnapshot};
use flock_shared::types::ConversationId;

/// Errors from the REST layer, grouped the way the UI reports them.
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP 429.
    #[error("You're doing that too fast. Try again in a moment.")]
    RateLimited,

    /// Any other non-success status, with the server's message if it sent
    /// one.
    #[error("Request failed: {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure (DNS, refused connection, timeout).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ApiError {
    /// One-line text for the transient toast.
    pub fn toast_message(&self) -> String {
        self.to_string()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct MessagesBody {
    messages: Vec<MessageEvent>,
}

#[derive(Debug, Deserialize)]
struct VenuesBody {
    venues: Vec<VenueSnapshot>,
}

/// Typed client for the Flock REST API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: std::time::Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.into(),
            token: None,
        }
    }

    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .request(method, format!("{}{path}", self.base_url));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Check a response status, mapping 429 and error bodies to [`ApiError`].
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimited);
        }
        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.message)
            .unwrap_or_else(|_| status.to_string());
        Err(ApiError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Backup-persist a sent message. Callers treat this as fire-and-forget.
    pub async fn persist_message(&self, message: &OutgoingMessage) -> Result<(), ApiError> {
        let response = self
            .request(reqwest::Method::POST, "/api/messages")
            .json(message)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Fetch message history for a conversation, oldest first.
    pub async fn fetch_messages(
        &self,
        conversation: ConversationId,
    ) -> Result<Vec<MessageEvent>, ApiError> {
        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/api/conversations/{}/messages", conversation.to_room()),
            )
            .send()
            .await?;
        let body: MessagesBody = Self::check(response).await?.json().await?;
        Ok(body.messages)
    }

    /// Venue text search. The caller layers the 5-minute cache on top.
    pub async fn search_venues(&self, query: &str) -> Result<Vec<VenueSnapshot>, ApiError> {
        let response = self
            .request(reqwest::Method::GET, "/api/venues/search")
            .query(&[("q", query)])
            .send()
            .await?;
        let body: VenuesBody = Self::check(response).await?.json().await?;
        Ok(body.venues)
    }
}
