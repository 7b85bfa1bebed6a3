//! Manage the documents of a collection.
//!
//! Run with:
//! ```bash
//! export URL="http://localhost:8001"
//! cargo run --example documents -- list [search]
//! cargo run --example documents -- upload ./report.pdf
//! cargo run --example documents -- delete report.pdf
//! ```

use bytes::Bytes;
use ragchat::options::{ChatProfile, TransportOptions};
use ragchat::DocumentStore;
use tracing_subscriber::EnvFilter;

const PER_PAGE: u32 = 20;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let store = DocumentStore::new(TransportOptions::from_env()?)?;
    let collection = ChatProfile::default()
        .collection
        .unwrap_or_else(|| "chat_documents".to_string());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        Some("list") => {
            let search = args.get(1).map(String::as_str);
            store.list(&collection, search, 1, PER_PAGE).await.map(|docs| {
                for doc in docs {
                    match doc.doc_metadata {
                        Some(meta) => println!("{}  {}", doc.artifact, meta),
                        None => println!("{}", doc.artifact),
                    }
                }
            })
        }
        Some("upload") => {
            let path = args.get(1).ok_or("upload needs a file path")?;
            let artifact = std::path::Path::new(path)
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or("file path has no usable name")?
                .to_string();
            let file = Bytes::from(tokio::fs::read(path).await?);

            println!("Uploading {} ({} bytes)...", artifact, file.len());
            store
                .upload_with_progress(file, &artifact, &collection, |received| {
                    println!("  server replied {} bytes", received);
                })
                .await
                .map(|_| println!("Uploaded {}", artifact))
        }
        Some("delete") => {
            let artifact = args.get(1).ok_or("delete needs an artifact name")?;
            store
                .delete(artifact, &collection)
                .await
                .map(|_| println!("Deleted {}", artifact))
        }
        _ => {
            eprintln!("usage: documents <list [search] | upload <path> | delete <artifact>>");
            return Ok(());
        }
    };

    if let Err(e) = result {
        eprintln!("{}", e.user_message());
    }
    Ok(())
}
