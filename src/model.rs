//! Request and response models of the chat and ingestion endpoints.

use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::ClientError;

/// Role of the message sender.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Retrieval scope of a chat request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextFilter {
    pub collection: String,
}

/// Body of `POST /v1/chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    pub use_context: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_filter: Option<ContextFilter>,
    pub include_sources: bool,
    pub stream: bool,
}

/// One block of a non-streaming answer.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Non-streaming chat answer: `{"content": [{"type": "text", "text": "..."}]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub content: NonEmpty<ContentBlock>,

    #[serde(skip)]
    raw: String,
}

impl ChatResponse {
    /// Parse a response body, keeping the raw payload when the shape is wrong.
    pub fn parse(body: &str) -> Result<Self, ClientError> {
        let mut response: Self = serde_json::from_str(body).map_err(|_| ClientError::UnexpectedShape {
            payload: body.to_string(),
        })?;
        response.raw = body.to_string();
        Ok(response)
    }

    /// Body the response was parsed from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Text of the first `type == "text"` block.
    pub fn first_text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|block| block.block_type == "text")
            .and_then(|block| block.text.as_deref())
    }
}

/// A document stored in a collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub artifact: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_metadata: Option<Value>,
}

/// Body of `GET /v1/ingest/list`.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentList {
    #[serde(default)]
    pub data: Vec<Document>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_request_wire_shape() {
        let request = ChatRequest {
            messages: vec![Message::system("You are a helpful assistant."), Message::user("Bonjour")],
            use_context: true,
            context_filter: Some(ContextFilter {
                collection: "chat_documents".to_string(),
            }),
            include_sources: false,
            stream: true,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "messages": [
                    {"role": "system", "content": "You are a helpful assistant."},
                    {"role": "user", "content": "Bonjour"}
                ],
                "use_context": true,
                "context_filter": {"collection": "chat_documents"},
                "include_sources": false,
                "stream": true
            })
        );
    }

    #[test]
    fn test_first_text_skips_other_blocks() {
        let response = ChatResponse::parse(
            r#"{"content":[{"type":"tool_use"},{"type":"text","text":"hello"},{"type":"text","text":"later"}]}"#,
        )
        .unwrap();
        assert_eq!(response.first_text(), Some("hello"));
    }

    #[test]
    fn test_parse_keeps_raw_body() {
        let body = r#"{"content":[{"type":"image"}]}"#;
        assert_eq!(ChatResponse::parse(body).unwrap().raw(), body);
    }

    #[test]
    fn test_empty_content_is_unexpected_shape() {
        let err = ChatResponse::parse(r#"{"content":[]}"#).unwrap_err();
        match err {
            ClientError::UnexpectedShape { payload } => assert_eq!(payload, r#"{"content":[]}"#),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_missing_content_is_unexpected_shape() {
        let err = ChatResponse::parse(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, ClientError::UnexpectedShape { .. }));
    }

    #[test]
    fn test_document_list_with_and_without_metadata() {
        let list: DocumentList = serde_json::from_str(
            r#"{"data":[{"artifact":"a.pdf","doc_metadata":{"pages":3}},{"artifact":"b.txt"}]}"#,
        )
        .unwrap();
        assert_eq!(list.data.len(), 2);
        assert_eq!(list.data[0].doc_metadata, Some(json!({"pages": 3})));
        assert_eq!(list.data[1].doc_metadata, None);
    }
}
