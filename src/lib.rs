//! # ragchat - streaming client for RAG chat servers
//!
//! A small client library for chat-completion servers with retrieval
//! (PrivateGPT/Zylon style): it streams answers, keeps the conversation of a
//! session and manages the documents of a collection.
//!
//! ## Features
//! - Async-first, tokio compatible
//! - Robust Server-Sent Events accumulation: keep-alive and malformed lines
//!   never abort a stream
//! - Source and token-usage tracking, citation-free display text
//! - Document listing, upload (with timeout retry) and deletion
//!
//! ## Architecture
//!
//! - **`event`**: one raw line to at most one [`StreamEvent`]
//! - **`accumulator`**: folds events into an [`AccumulatedResponse`] and
//!   drives a [`RenderSink`]
//! - **`client`** / **`documents`**: thin HTTP collaborators
//! - **`session`**: per-session history passed into every exchange
//!
//! ## Example
//! ```no_run
//! use ragchat::client::RagClient;
//! use ragchat::options::{ChatProfile, TransportOptions};
//! use ragchat::render::TerminalSink;
//! use ragchat::session::Session;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let profile = ChatProfile::web();
//!     let client = RagClient::new(TransportOptions::new("http://localhost:8001"), profile.clone())?;
//!     let mut session = Session::new(profile);
//!
//!     let sink = TerminalSink::new(std::io::stdout());
//!     match session.ask_stream(&client, "Bonjour, comment allez-vous?", sink).await {
//!         Ok(response) => println!("({} tokens)", response.total_tokens),
//!         Err(e) => eprintln!("{}", e.user_message()),
//!     }
//!     Ok(())
//! }
//! ```

pub mod accumulator;
pub mod citations;
pub mod client;
pub mod documents;
pub mod event;
pub mod http;
pub mod model;
pub mod options;
pub mod render;
pub mod session;
pub mod sources;
pub mod sse;

// Re-exports for convenience
pub use accumulator::{AccumulatedResponse, Accumulator};
pub use client::{Client, ClientError, RagClient, StreamingClient};
pub use documents::DocumentStore;
pub use event::{SourceRef, StreamEvent};
pub use render::RenderSink;
pub use session::Session;
