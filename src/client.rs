//! Core client traits, the HTTP chat client and error types.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use thiserror::Error;
use tracing::debug;

use crate::http::{add_extra_headers, build_http_client, default_headers, send};
use crate::model::{ChatRequest, ChatResponse, ContextFilter, Message};
use crate::options::{ChatProfile, TransportOptions};
use crate::sse::SSEResponseExt;

const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Errors that can occur during client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Malformed event line ({reason}): {line}")]
    MalformedEvent { line: String, reason: String },

    #[error("No content received")]
    EmptyResult,

    #[error("Unexpected response shape: {payload}")]
    UnexpectedShape { payload: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout(e.to_string())
        } else {
            ClientError::Http(e)
        }
    }
}

impl ClientError {
    /// True when the connection exceeded its time budget.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout(_))
    }

    /// True for network and HTTP level failures (timeouts included).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::Http(_) | ClientError::Timeout(_) | ClientError::Status { .. }
        )
    }

    /// Message shown to the user when a request fails at the session boundary.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Timeout(_) => {
                "The request took too long. Please try again.".to_string()
            }
            ClientError::EmptyResult => "No content received from the assistant.".to_string(),
            ClientError::UnexpectedShape { payload } => {
                format!("Unexpected response format. Received: {}", payload)
            }
            ClientError::Status { status, .. } => format!("Request failed with status {}", status),
            other => format!("Error: {}", other),
        }
    }
}

/// Boxed stream of raw lines produced by a streaming request.
pub type LineStream = Pin<Box<dyn Stream<Item = Result<Bytes, ClientError>> + Send>>;

/// Request/response chat backend.
///
/// Implement this trait to talk to a chat-completion endpoint without streaming.
#[async_trait]
pub trait Client: Send + Sync {
    /// Send the conversation and wait for the complete answer.
    async fn request(&self, messages: Vec<Message>) -> Result<ChatResponse, ClientError>;
}

/// Extension trait for streaming support.
///
/// The returned stream yields raw lines; turning them into events is the
/// accumulator's job.
#[async_trait]
pub trait StreamingClient: Client {
    async fn request_stream(&self, messages: Vec<Message>) -> Result<LineStream, ClientError>;
}

/// Chat client for a RAG server exposing `/v1/chat/completions`.
#[derive(Debug, Clone)]
pub struct RagClient {
    http: reqwest::Client,
    transport_options: TransportOptions,
    profile: ChatProfile,
}

impl RagClient {
    /// Create a client. The underlying HTTP client is built once here.
    ///
    /// `transport_options.timeout` is the longest wait for the next read, so a
    /// stream is only cut when the server goes quiet.
    pub fn new(transport_options: TransportOptions, profile: ChatProfile) -> Result<Self, ClientError> {
        let http = build_http_client(&transport_options, Some(transport_options.timeout))?;
        Ok(Self {
            http,
            transport_options,
            profile,
        })
    }

    pub fn transport_options(&self) -> &TransportOptions {
        &self.transport_options
    }

    /// Profile describing the collection and sources requested by this client.
    pub fn profile(&self) -> &ChatProfile {
        &self.profile
    }

    fn build_request(&self, messages: Vec<Message>, stream: bool) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.transport_options.base_url, COMPLETIONS_PATH);
        let body = ChatRequest {
            messages,
            use_context: true,
            context_filter: self.profile.collection.clone().map(|collection| ContextFilter { collection }),
            include_sources: self.profile.include_sources,
            stream,
        };

        debug!(url = %url, stream, messages = body.messages.len(), "sending chat request");

        let req = self.http.post(&url).headers(default_headers());
        add_extra_headers(req, &self.transport_options.extra_headers).json(&body)
    }
}

#[async_trait]
impl Client for RagClient {
    async fn request(&self, messages: Vec<Message>) -> Result<ChatResponse, ClientError> {
        let response = send(self.build_request(messages, false)).await?;
        let body = response.text().await?;
        ChatResponse::parse(&body)
    }
}

#[async_trait]
impl StreamingClient for RagClient {
    async fn request_stream(&self, messages: Vec<Message>) -> Result<LineStream, ClientError> {
        let response = send(self.build_request(messages, true)).await?;
        Ok(Box::pin(response.sse_lines()))
    }
}
