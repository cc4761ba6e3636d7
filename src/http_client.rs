//! HTTP client abstraction for the chat-completions endpoint.
//!
//! The transport sits behind a trait so tests can inject a mock and never
//! touch the network.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Response from a POST: status code plus raw body text.
///
/// The body is kept as text so callers can surface the server's error payload
/// verbatim when parsing fails.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for HTTP communication with the chat API.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a POST request with a JSON body and returns status plus body text.
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<HttpResponse>;
}

/// Production implementation backed by reqwest.
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Creates a client with the given request timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<HttpResponse> {
        let mut request = self.client.post(url);

        for (key, value) in headers {
            request = request.header(*key, *value);
        }

        let response = request.json(body).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Mock client that replays queued responses and records request bodies.
    pub struct MockHttpClient {
        responses: Mutex<Vec<HttpResponse>>,
        pub requests: Mutex<Vec<serde_json::Value>>,
    }

    impl MockHttpClient {
        /// Queues responses; they are served in the order given.
        pub fn new(bodies: &[&str]) -> Self {
            let responses = bodies
                .iter()
                .map(|b| HttpResponse {
                    status: 200,
                    body: b.to_string(),
                })
                .collect();
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn with_status(status: u16, body: &str) -> Self {
            Self {
                responses: Mutex::new(vec![HttpResponse {
                    status,
                    body: body.to_string(),
                }]),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn post_json(
            &self,
            _url: &str,
            _headers: &[(&str, &str)],
            body: &serde_json::Value,
        ) -> Result<HttpResponse> {
            self.requests.lock().unwrap().push(body.clone());
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                anyhow::bail!("mock client exhausted");
            }
            Ok(responses.remove(0))
        }
    }
}
