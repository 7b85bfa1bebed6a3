//! Transport configuration and chat profiles.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::client::ClientError;

/// Budget for ordinary request/response calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Budget for the first upload attempt.
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(1800);
/// Budget for the single upload retry after a timeout.
pub const DEFAULT_UPLOAD_RETRY_TIMEOUT: Duration = Duration::from_secs(3600);

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
const DEFAULT_COLLECTION: &str = "chat_documents";

/// HTTP transport options shared by the chat client and the document store.
///
/// # Example
/// ```rust
/// use ragchat::options::TransportOptions;
/// use std::time::Duration;
///
/// let options = TransportOptions::new("http://localhost:8001")
///     .with_timeout(Duration::from_secs(10))
///     .with_header("x-team".to_string(), "support".to_string());
/// assert_eq!(options.base_url, "http://localhost:8001");
/// ```
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Base URL of the server, without trailing slash
    pub base_url: String,

    /// Budget for chat and listing calls
    pub timeout: Duration,

    /// Budget for the first upload attempt
    pub upload_timeout: Duration,

    /// Budget for the upload retry triggered by a timeout
    pub upload_retry_timeout: Duration,

    /// HTTP proxy URL
    pub proxy: Option<String>,

    /// Additional HTTP headers to include in requests
    pub extra_headers: Option<HashMap<String, String>>,
}

impl TransportOptions {
    /// Create transport options for the given base URL with default budgets.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
            upload_retry_timeout: DEFAULT_UPLOAD_RETRY_TIMEOUT,
            proxy: None,
            extra_headers: None,
        }
    }

    /// Read options from the environment (and a `.env` file if present).
    ///
    /// `URL` is required; `RAGCHAT_PROXY` is optional.
    pub fn from_env() -> Result<Self, ClientError> {
        // A missing .env file is fine, the variables may come from the shell.
        let _ = dotenvy::dotenv();

        let base_url = std::env::var("URL")
            .map_err(|_| ClientError::Config("URL is not set in the environment".to_string()))?;
        if base_url.trim().is_empty() {
            return Err(ClientError::Config("URL is empty".to_string()));
        }

        let mut options = Self::new(base_url);
        if let Ok(proxy) = std::env::var("RAGCHAT_PROXY") {
            options = options.with_proxy(proxy);
        }
        Ok(options)
    }

    /// Set the timeout for ordinary calls.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the first-attempt and retry budgets for uploads.
    pub fn with_upload_timeouts(mut self, first: Duration, retry: Duration) -> Self {
        self.upload_timeout = first;
        self.upload_retry_timeout = retry;
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Add a single extra header.
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
        self
    }
}

/// One configuration variant of the chat front-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatProfile {
    /// System prompt prepended to every request
    pub system_prompt: Option<String>,

    /// Minimum source score shown to the user; `None` shows every source
    pub score_threshold: Option<f64>,

    /// Ask the server for sources and forward them to the sink
    pub include_sources: bool,

    /// Keep inline citation tags in the displayed text
    pub include_citations: bool,

    /// Collection used as retrieval scope
    pub collection: Option<String>,
}

impl Default for ChatProfile {
    fn default() -> Self {
        Self {
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            score_threshold: None,
            include_sources: false,
            include_citations: false,
            collection: Some(DEFAULT_COLLECTION.to_string()),
        }
    }
}

impl ChatProfile {
    /// Preset used by the web front-ends: sources on, filtered at 0.70.
    pub fn web() -> Self {
        Self {
            score_threshold: Some(0.70),
            include_sources: true,
            ..Self::default()
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_score_threshold(mut self, threshold: f64) -> Self {
        self.score_threshold = Some(threshold);
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }
}
