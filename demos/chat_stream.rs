//! Interactive streaming chat in the terminal.
//!
//! Run with:
//! ```bash
//! export URL="http://localhost:8001"
//! RUST_LOG=ragchat=debug cargo run --example chat_stream
//! ```
//!
//! Type a question and press enter. `/sync <question>` asks without
//! streaming, `/clear` forgets the conversation, `/quit` leaves.

use ragchat::options::{ChatProfile, TransportOptions};
use ragchat::render::TerminalSink;
use ragchat::{RagClient, Session};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let transport_options = TransportOptions::from_env()?;
    let profile = ChatProfile::web();
    let client = RagClient::new(transport_options, profile.clone())?;
    let mut session = Session::new(profile);

    println!("Connected to {}", client.transport_options().base_url);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let prompt = line.trim();
        match prompt {
            "" => continue,
            "/quit" => break,
            "/clear" => {
                session.clear();
                println!("(conversation cleared)");
                continue;
            }
            _ => {}
        }

        if let Some(question) = prompt.strip_prefix("/sync ") {
            match session.ask(&client, question).await {
                Ok(answer) => println!("Assistant: {}\n", answer),
                Err(e) => eprintln!("{}\n", e.user_message()),
            }
            continue;
        }

        print!("Assistant: ");
        let sink = TerminalSink::new(std::io::stdout())
            .keep_citations(session.profile().include_citations);
        match session.ask_stream(&client, prompt, sink).await {
            Ok(response) => {
                if response.total_tokens > 0 {
                    println!("({} tokens)\n", response.total_tokens);
                }
            }
            Err(e) => eprintln!("\n{}\n", e.user_message()),
        }
    }

    Ok(())
}
