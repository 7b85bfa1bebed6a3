//! Stream events and the line-to-event parser.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::client::ClientError;
use crate::sse::{is_done_marker, parse_sse_line};

const NOT_AVAILABLE: &str = "N/A";

/// Token usage reported by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// A citation pointer attached to the answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub document_artifact: String,
    pub excerpt: String,
    /// `None` means the server did not score this source
    pub score: Option<f64>,
}

/// One parsed unit of the event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    TextDelta { text: String },
    SourceDelta { sources: Vec<SourceRef> },
    Usage(TokenUsage),
    /// A discriminator this client does not handle (yet)
    Unknown { kind: Option<String> },
}

/// Convert one raw line into zero or one event.
///
/// Lines without the `data: ` prefix and the `[DONE]` terminator give
/// `Ok(None)`. Content that cannot be decoded gives
/// `Err(ClientError::MalformedEvent)`, which callers treat as recoverable.
///
/// # Example
/// ```
/// use ragchat::event::{parse_line, StreamEvent};
///
/// let line = br#"data: {"type":"content_block_delta","delta":{"type":"text_delta","text":"Hi"}}"#;
/// assert_eq!(
///     parse_line(line).unwrap(),
///     Some(StreamEvent::TextDelta { text: "Hi".to_string() })
/// );
/// assert_eq!(parse_line(b"keepalive").unwrap(), None);
/// ```
pub fn parse_line(line: &[u8]) -> Result<Option<StreamEvent>, ClientError> {
    let line = std::str::from_utf8(line).map_err(|e| ClientError::MalformedEvent {
        line: String::from_utf8_lossy(line).into_owned(),
        reason: e.to_string(),
    })?;

    let Some(data) = parse_sse_line(line) else {
        trace!(line, "ignoring non-data line");
        return Ok(None);
    };

    if is_done_marker(data) {
        return Ok(None);
    }

    let wire: WireEvent = serde_json::from_str(data).map_err(|e| ClientError::MalformedEvent {
        line: line.to_string(),
        reason: e.to_string(),
    })?;

    Ok(Some(wire.into()))
}

// --- Wire Types ---

#[derive(Debug, Deserialize)]
struct WireEvent {
    #[serde(rename = "type")]
    event_type: Option<String>,
    usage: Option<TokenUsage>,
    delta: Option<WireDelta>,
}

#[derive(Debug, Deserialize)]
struct WireDelta {
    #[serde(rename = "type")]
    delta_type: Option<String>,
    text: Option<String>,
    #[serde(default)]
    sources: Vec<WireSource>,
}

#[derive(Debug, Deserialize)]
struct WireSource {
    document: Option<WireDocument>,
    text: Option<String>,
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WireDocument {
    artifact: Option<String>,
}

impl From<WireSource> for SourceRef {
    fn from(source: WireSource) -> Self {
        SourceRef {
            document_artifact: source
                .document
                .and_then(|d| d.artifact)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            excerpt: source.text.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            score: source.score,
        }
    }
}

impl From<WireEvent> for StreamEvent {
    fn from(event: WireEvent) -> Self {
        if let Some(usage) = event.usage {
            return StreamEvent::Usage(usage);
        }

        let is_block_delta = event.event_type.as_deref() == Some("content_block_delta");
        let Some(delta) = event.delta else {
            return StreamEvent::Unknown {
                kind: event.event_type,
            };
        };

        match delta.delta_type.as_deref() {
            Some("text_delta") if is_block_delta => StreamEvent::TextDelta {
                text: delta.text.unwrap_or_default(),
            },
            Some("source_delta") => StreamEvent::SourceDelta {
                sources: delta.sources.into_iter().map(SourceRef::from).collect(),
            },
            _ => StreamEvent::Unknown {
                kind: event.event_type,
            },
        }
    }
}
