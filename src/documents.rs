//! Document-store facade over the ingestion endpoints.
//!
//! Plain request/response calls, no caching. Uploads get a long time budget
//! and exactly one retry with a longer one when, and only when, the first
//! attempt times out.

use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use tracing::{debug, warn};

use crate::client::ClientError;
use crate::http::{add_extra_headers, build_http_client, send};
use crate::model::{Document, DocumentList};
use crate::options::TransportOptions;

const LIST_PATH: &str = "/v1/ingest/list";
const UPLOAD_PATH: &str = "/v1/ingest/file";

/// Client for listing, uploading and deleting documents of a collection.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    http: reqwest::Client,
    transport_options: TransportOptions,
}

impl DocumentStore {
    /// Create a store. The HTTP client is built here, before any request.
    ///
    /// Every call carries its own total budget: `timeout` for listing and
    /// deleting, the upload budgets for uploads.
    pub fn new(transport_options: TransportOptions) -> Result<Self, ClientError> {
        let http = build_http_client(&transport_options, None)?;
        Ok(Self {
            http,
            transport_options,
        })
    }

    /// List the documents of `collection`, optionally filtered by `search`.
    pub async fn list(
        &self,
        collection: &str,
        search: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Document>, ClientError> {
        let url = format!("{}{}", self.transport_options.base_url, LIST_PATH);
        let mut query = vec![
            ("collection", collection.to_string()),
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        if let Some(search) = search {
            query.push(("search", search.to_string()));
        }

        let req = self
            .http
            .get(&url)
            .header(ACCEPT, "application/json")
            .timeout(self.transport_options.timeout)
            .query(&query);
        let response = send(add_extra_headers(req, &self.transport_options.extra_headers)).await?;

        let body = response.text().await?;
        let list: DocumentList =
            serde_json::from_str(&body).map_err(|_| ClientError::UnexpectedShape { payload: body })?;

        debug!(collection, count = list.data.len(), "listed documents");
        Ok(list.data)
    }

    /// Upload a file without progress reporting.
    pub async fn upload(
        &self,
        file: Bytes,
        artifact: &str,
        collection: &str,
    ) -> Result<(), ClientError> {
        self.upload_with_progress(file, artifact, collection, |_| {}).await
    }

    /// Upload a file, calling `progress` with the running byte count for every
    /// chunk of the response body.
    pub async fn upload_with_progress<P>(
        &self,
        file: Bytes,
        artifact: &str,
        collection: &str,
        mut progress: P,
    ) -> Result<(), ClientError>
    where
        P: FnMut(u64) + Send,
    {
        let first = self
            .upload_once(
                file.clone(),
                artifact,
                collection,
                self.transport_options.upload_timeout,
                &mut progress,
            )
            .await;

        match first {
            Err(e) if e.is_timeout() => {
                warn!(
                    artifact,
                    retry_timeout = ?self.transport_options.upload_retry_timeout,
                    "upload timed out, retrying once"
                );
                self.upload_once(
                    file,
                    artifact,
                    collection,
                    self.transport_options.upload_retry_timeout,
                    &mut progress,
                )
                .await
            }
            other => other,
        }
    }

    async fn upload_once<P>(
        &self,
        file: Bytes,
        artifact: &str,
        collection: &str,
        timeout: Duration,
        progress: &mut P,
    ) -> Result<(), ClientError>
    where
        P: FnMut(u64) + Send,
    {
        let url = format!("{}{}", self.transport_options.base_url, UPLOAD_PATH);
        let form = Form::new()
            .part("file", Part::bytes(file.to_vec()).file_name(artifact.to_string()))
            .text("artifact", artifact.to_string())
            .text("collection", collection.to_string());

        let req = self
            .http
            .post(&url)
            .header(ACCEPT, "application/json")
            .timeout(timeout)
            .multipart(form);
        let response = send(add_extra_headers(req, &self.transport_options.extra_headers)).await?;

        let mut body = response.bytes_stream();
        let mut received = 0u64;
        while let Some(chunk) = body.next().await {
            received += chunk?.len() as u64;
            progress(received);
        }

        debug!(artifact, collection, received, "upload complete");
        Ok(())
    }

    /// Delete `artifact` from `collection`.
    pub async fn delete(&self, artifact: &str, collection: &str) -> Result<(), ClientError> {
        let url = self.artifact_url(artifact)?;
        let req = self
            .http
            .delete(url)
            .header(ACCEPT, "application/json")
            .timeout(self.transport_options.timeout)
            .query(&[("collection", collection)]);
        send(add_extra_headers(req, &self.transport_options.extra_headers)).await?;

        debug!(artifact, collection, "deleted document");
        Ok(())
    }

    fn artifact_url(&self, artifact: &str) -> Result<Url, ClientError> {
        let base = &self.transport_options.base_url;
        let mut url = Url::parse(base)
            .map_err(|e| ClientError::Config(format!("Invalid base URL {}: {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Config(format!("Base URL {} cannot carry a path", base)))?
            .pop_if_empty()
            .extend(["v1", "ingest", artifact]);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_url_encodes_name() {
        let store = DocumentStore::new(TransportOptions::new("http://localhost:8001/gpt")).unwrap();
        let url = store.artifact_url("annual report/2024.pdf").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8001/gpt/v1/ingest/annual%20report%2F2024.pdf"
        );
    }

    #[test]
    fn test_artifact_url_rejects_bad_base() {
        let store = DocumentStore::new(TransportOptions::new("not a url")).unwrap();
        assert!(matches!(
            store.artifact_url("a.pdf"),
            Err(ClientError::Config(_))
        ));
    }
}
