//! Per-session conversation state.
//!
//! A [`Session`] is created when a user starts chatting and dropped when they
//! leave. It is passed explicitly into every exchange; nothing is global.

use bytes::Bytes;
use tracing::{debug, info};

use crate::accumulator::{consume, AccumulatedResponse, Accumulator, AccumulatorOptions};
use crate::citations::strip_citations;
use crate::client::{Client, ClientError, StreamingClient};
use crate::documents::DocumentStore;
use crate::model::{Message, Role};
use crate::options::ChatProfile;
use crate::render::RenderSink;

/// Conversation history and uploaded documents of one user session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    profile: ChatProfile,
    history: Vec<Message>,
    uploaded: Vec<String>,
}

impl Session {
    pub fn new(profile: ChatProfile) -> Self {
        Self {
            profile,
            history: Vec::new(),
            uploaded: Vec::new(),
        }
    }

    pub fn profile(&self) -> &ChatProfile {
        &self.profile
    }

    /// Committed messages, raw text included.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Artifacts uploaded during this session.
    pub fn uploaded(&self) -> &[String] {
        &self.uploaded
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Messages to send for a new `prompt`: system prompt, history, prompt.
    pub fn messages_for(&self, prompt: &str) -> Vec<Message> {
        self.profile
            .system_prompt
            .iter()
            .map(Message::system)
            .chain(self.history.iter().cloned())
            .chain(std::iter::once(Message::user(prompt)))
            .collect()
    }

    /// Text of a history entry as it should be displayed.
    pub fn display(&self, message: &Message) -> String {
        match message.role {
            Role::Assistant if !self.profile.include_citations => {
                strip_citations(&message.content).into_owned()
            }
            _ => message.content.clone(),
        }
    }

    fn commit(&mut self, prompt: &str, answer: &str) {
        self.history.push(Message::user(prompt));
        self.history.push(Message::assistant(answer));
    }

    /// Ask without streaming. Returns the displayed answer.
    ///
    /// The first text block of the response is the answer; a response
    /// without one fails with `ClientError::UnexpectedShape`.
    pub async fn ask<C: Client>(&mut self, client: &C, prompt: &str) -> Result<String, ClientError> {
        let response = client.request(self.messages_for(prompt)).await?;
        let answer = response
            .first_text()
            .ok_or_else(|| ClientError::UnexpectedShape {
                payload: response.raw().to_string(),
            })?
            .to_string();

        if answer.is_empty() {
            return Err(ClientError::EmptyResult);
        }

        self.commit(prompt, &answer);
        Ok(self.display(&Message::assistant(answer)))
    }

    /// Ask with streaming, driving `sink` while the answer arrives.
    ///
    /// Only a complete, non-empty answer is committed to the history; on any
    /// error the partial text is dropped.
    pub async fn ask_stream<C, S>(
        &mut self,
        client: &C,
        prompt: &str,
        sink: S,
    ) -> Result<AccumulatedResponse, ClientError>
    where
        C: StreamingClient,
        S: RenderSink,
    {
        let lines = client.request_stream(self.messages_for(prompt)).await?;
        let accumulator = Accumulator::new(AccumulatorOptions::from(&self.profile), sink);
        let response = consume(accumulator, lines).await?;

        debug!(
            chars = response.full_text.len(),
            sources = response.sources_seen.len(),
            total_tokens = response.total_tokens,
            "answer complete"
        );
        self.commit(prompt, &response.full_text);
        Ok(response)
    }

    /// Upload a document into the profile's collection and remember it.
    pub async fn upload(
        &mut self,
        store: &DocumentStore,
        file: Bytes,
        artifact: &str,
    ) -> Result<(), ClientError> {
        let collection = self.collection()?;
        store.upload(file, artifact, &collection).await?;
        info!(artifact, collection = %collection, "document uploaded");
        if !self.uploaded.iter().any(|a| a == artifact) {
            self.uploaded.push(artifact.to_string());
        }
        Ok(())
    }

    /// Delete a document from the profile's collection and forget it.
    pub async fn delete(&mut self, store: &DocumentStore, artifact: &str) -> Result<(), ClientError> {
        let collection = self.collection()?;
        store.delete(artifact, &collection).await?;
        info!(artifact, collection = %collection, "document deleted");
        self.uploaded.retain(|a| a != artifact);
        Ok(())
    }

    fn collection(&self) -> Result<String, ClientError> {
        self.profile
            .collection
            .clone()
            .ok_or_else(|| ClientError::Config("No collection configured for this session".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LineStream;
    use crate::model::ChatResponse;
    use crate::render::NullSink;
    use async_trait::async_trait;
    use futures::stream;

    struct ScriptedClient {
        body: &'static str,
        lines: Vec<&'static str>,
        fail_stream: bool,
    }

    impl ScriptedClient {
        fn new(body: &'static str, lines: Vec<&'static str>) -> Self {
            Self {
                body,
                lines,
                fail_stream: false,
            }
        }
    }

    #[async_trait]
    impl Client for ScriptedClient {
        async fn request(&self, _messages: Vec<Message>) -> Result<ChatResponse, ClientError> {
            ChatResponse::parse(self.body)
        }
    }

    #[async_trait]
    impl StreamingClient for ScriptedClient {
        async fn request_stream(&self, _messages: Vec<Message>) -> Result<LineStream, ClientError> {
            let mut items: Vec<Result<Bytes, ClientError>> =
                self.lines.iter().map(|l| Ok(Bytes::from(*l))).collect();
            if self.fail_stream {
                items.push(Err(ClientError::Timeout("deadline".to_string())));
            }
            Ok(Box::pin(stream::iter(items)))
        }
    }

    const CITED: &str =
        r#"data: {"type":"content_block_delta","delta":{"type":"text_delta","text":"A <citation>X</citation> B"}}"#;

    #[test]
    fn test_messages_for_prepends_system_prompt() {
        let mut session = Session::new(ChatProfile::default());
        session.commit("hi", "hello");
        let messages = session.messages_for("again");
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0], Message::system("You are a helpful assistant."));
        assert_eq!(messages[3], Message::user("again"));
    }

    #[test]
    fn test_messages_for_without_system_prompt() {
        let profile = ChatProfile {
            system_prompt: None,
            ..ChatProfile::default()
        };
        let session = Session::new(profile);
        assert_eq!(session.messages_for("q"), vec![Message::user("q")]);
    }

    #[tokio::test]
    async fn test_ask_stream_commits_raw_text() {
        let client = ScriptedClient::new("", vec![CITED]);
        let mut session = Session::new(ChatProfile::default());

        let response = session.ask_stream(&client, "question", NullSink).await.unwrap();

        assert_eq!(response.display_text(), "A  B");
        assert_eq!(session.history()[1].content, "A <citation>X</citation> B");
        assert_eq!(session.display(&session.history()[1]), "A  B");
    }

    #[tokio::test]
    async fn test_ask_stream_error_commits_nothing() {
        let mut client = ScriptedClient::new("", vec![CITED]);
        client.fail_stream = true;
        let mut session = Session::new(ChatProfile::default());

        let err = session.ask_stream(&client, "question", NullSink).await.unwrap_err();

        assert!(err.is_timeout());
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_ask_stream_empty_answer() {
        let client = ScriptedClient::new("", vec!["keepalive"]);
        let mut session = Session::new(ChatProfile::default());

        let err = session.ask_stream(&client, "question", NullSink).await.unwrap_err();

        assert!(matches!(err, ClientError::EmptyResult));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_ask_returns_first_text_block() {
        let client = ScriptedClient::new(
            r#"{"content":[{"type":"text","text":"Bonjour <citation>1</citation>!"}]}"#,
            vec![],
        );
        let mut session = Session::new(ChatProfile::default());

        let answer = session.ask(&client, "Salut").await.unwrap();

        assert_eq!(answer, "Bonjour !");
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[1].content, "Bonjour <citation>1</citation>!");
    }

    #[tokio::test]
    async fn test_ask_without_text_block_is_unexpected_shape() {
        let body = r#"{"content":[{"type":"image"}]}"#;
        let client = ScriptedClient::new(body, vec![]);
        let mut session = Session::new(ChatProfile::default());

        let err = session.ask(&client, "Salut").await.unwrap_err();

        match err {
            ClientError::UnexpectedShape { payload } => assert_eq!(payload, body),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(session.history().is_empty());
    }
}
