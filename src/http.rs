//! HTTP client utilities shared by the chat client and the document store.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use std::collections::HashMap;
use std::time::Duration;

use crate::client::ClientError;
use crate::options::TransportOptions;

/// Build a configured HTTP client.
///
/// `transport_options.timeout` bounds connecting. When `read_timeout` is set
/// it bounds every single wait for data, not the whole exchange: a streamed
/// answer may run as long as it keeps producing bytes. Total budgets belong
/// on the individual request (`RequestBuilder::timeout`).
pub fn build_http_client(
    transport_options: &TransportOptions,
    read_timeout: Option<Duration>,
) -> Result<Client, ClientError> {
    let mut builder = Client::builder().connect_timeout(transport_options.timeout);

    if let Some(read_timeout) = read_timeout {
        builder = builder.read_timeout(read_timeout);
    }

    if let Some(proxy_url) = &transport_options.proxy {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|e| ClientError::Config(format!("Invalid proxy {}: {}", proxy_url, e)))?;
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(ClientError::from)
}

/// Headers every JSON call carries.
pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

/// Add extra headers to a request if specified in transport options.
pub fn add_extra_headers(
    mut request: RequestBuilder,
    extra_headers: &Option<HashMap<String, String>>,
) -> RequestBuilder {
    if let Some(headers) = extra_headers {
        for (key, value) in headers {
            request = request.header(key, value);
        }
    }
    request
}

/// Send a request, turning a non-success status into `ClientError::Status`.
pub async fn send(request: RequestBuilder) -> Result<Response, ClientError> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        let transport_options = TransportOptions::new("http://localhost:8001");
        let client = build_http_client(&transport_options, Some(Duration::from_secs(30)));
        assert!(client.is_ok());
    }

    #[test]
    fn test_build_http_client_without_read_timeout() {
        let transport_options = TransportOptions::new("http://localhost:8001");
        assert!(build_http_client(&transport_options, None).is_ok());
    }

    #[test]
    fn test_build_http_client_with_proxy() {
        let transport_options = TransportOptions::new("http://localhost:8001")
            .with_proxy("http://proxy.example.com:8080".to_string());
        let client = build_http_client(&transport_options, None);
        assert!(client.is_ok());
    }

    #[test]
    fn test_default_headers() {
        let headers = default_headers();
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }
}
