//! Shared HTTP client and response classification.
//!
//! One [`reqwest::Client`] is built per run and cloned into every adapter
//! (clones share the connection pool). The client carries the bot user agent
//! and the per-attempt timeout, so every network call made by an adapter is
//! bounded without further plumbing.

use crate::error::FetchError;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Build a client with the given user agent and per-request timeout.
    ///
    /// # Errors
    ///
    /// [`FetchError::Transport`] if the TLS backend cannot be initialized.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }

    /// GET `url` and return the body as text.
    ///
    /// Non-2xx responses become [`FetchError::Status`]; transport failures
    /// are classified by [`FetchError::from_reqwest`].
    #[instrument(level = "debug", skip(self))]
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        debug!(bytes = body.len(), "Fetched body");
        Ok(body)
    }
}
