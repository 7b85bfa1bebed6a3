//! Server-Sent Events (SSE) line splitting.
//!
//! SSE format as sent by the chat endpoint:
//! ```text
//! data: {"type": "content_block_delta", "delta": {"type": "text_delta", "text": "Hel"}}
//!
//! data: {"usage": {"input_tokens": 5, "output_tokens": 2}}
//! ```
//!
//! Lines are split on raw bytes and handed out undecoded, so one line with
//! invalid UTF-8 cannot damage its neighbours.

use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};

use crate::client::ClientError;

/// Extension trait for `reqwest::Response` to enable SSE streaming.
///
/// # Example
/// ```ignore
/// use ragchat::sse::SSEResponseExt;
///
/// let response = client.post(url).send().await?;
/// let mut lines = Box::pin(response.sse_lines());
/// while let Some(line) = lines.next().await {
///     println!("{:?}", line?);
/// }
/// ```
pub trait SSEResponseExt {
    /// Convert the response into a stream of raw, non-empty lines.
    fn sse_lines(self) -> impl Stream<Item = Result<Bytes, ClientError>> + Send;
}

impl SSEResponseExt for reqwest::Response {
    fn sse_lines(self) -> impl Stream<Item = Result<Bytes, ClientError>> + Send {
        lines(self.bytes_stream())
    }
}

/// Split any byte-chunk stream into lines.
///
/// Chunk boundaries are arbitrary; a trailing `\r` is dropped, empty lines are
/// skipped and a final line without newline is still emitted at end of stream.
/// After an upstream error the stream ends.
pub fn lines<S, E>(byte_stream: S) -> impl Stream<Item = Result<Bytes, ClientError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<ClientError>,
{
    stream::unfold(
        (Box::pin(byte_stream), BytesMut::new(), 0, false),
        |(mut byte_stream, mut buffer, mut scanned, mut stream_ended)| async move {
            loop {
                // Process complete lines from buffer; bytes before `scanned`
                // are already known to hold no newline.
                while let Some(offset) = buffer[scanned..].iter().position(|b| *b == b'\n') {
                    let pos = scanned + offset;
                    scanned = 0;
                    let mut line = buffer.split_to(pos + 1);
                    line.truncate(pos);
                    if line.last() == Some(&b'\r') {
                        line.truncate(pos - 1);
                    }

                    if line.iter().all(u8::is_ascii_whitespace) {
                        continue;
                    }

                    return Some((
                        Ok(line.freeze()),
                        (byte_stream, buffer, scanned, stream_ended),
                    ));
                }
                scanned = buffer.len();

                if stream_ended {
                    if buffer.iter().all(u8::is_ascii_whitespace) {
                        return None;
                    }
                    let line = buffer.split().freeze();
                    return Some((Ok(line), (byte_stream, buffer, 0, stream_ended)));
                }

                match byte_stream.next().await {
                    Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                    Some(Err(e)) => {
                        // Surface the error once, then stop.
                        buffer.clear();
                        stream_ended = true;
                        return Some((Err(e.into()), (byte_stream, buffer, 0, stream_ended)));
                    }
                    None => stream_ended = true,
                }
            }
        },
    )
}

/// Parse an SSE line to extract the data portion.
///
/// SSE lines are in the format: `data: <content>`
///
/// # Example
/// ```
/// use ragchat::sse::parse_sse_line;
///
/// let line = "data: {\"key\": \"value\"}";
/// assert_eq!(parse_sse_line(line), Some("{\"key\": \"value\"}"));
///
/// let line = "keepalive";
/// assert_eq!(parse_sse_line(line), None);
/// ```
pub fn parse_sse_line(line: &str) -> Option<&str> {
    line.strip_prefix("data: ").map(|s| s.trim())
}

/// Check if an SSE data line indicates the stream is done.
///
/// # Example
/// ```
/// use ragchat::sse::is_done_marker;
///
/// assert!(is_done_marker("[DONE]"));
/// assert!(!is_done_marker("{\"data\": \"value\"}"));
/// ```
pub fn is_done_marker(data: &str) -> bool {
    data == "[DONE]"
}
