//! Synchronous edit API adapter.
//!
//! Some backends run the edit inside the submit request and return the
//! final image URL in the response body. Such jobs never enter the poll
//! loop; `poll` on this adapter is a contract violation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{EditProvider, EditRequest, PollUpdate, ProviderError, Submission};

/// HTTP timeout for the blocking edit call. Generous because the edit
/// itself runs inside this request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for a synchronous edit endpoint.
#[derive(Debug, Clone)]
pub struct DirectProvider {
    client: Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct DirectRequest<'a> {
    image: &'a str,
    prompt: &'a str,
    aspect_ratio: &'a str,
}

#[derive(Debug, Deserialize)]
struct DirectResponse {
    image_url: String,
}

impl DirectProvider {
    /// Create a new adapter.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl EditProvider for DirectProvider {
    async fn submit(&self, request: &EditRequest) -> Result<Submission, ProviderError> {
        let body = DirectRequest {
            image: &request.input_image,
            prompt: &request.prompt,
            aspect_ratio: &request.aspect_ratio,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: DirectResponse = response.json().await?;
        Ok(Submission::Completed {
            output_url: parsed.image_url,
        })
    }

    async fn poll(&self, prediction_id: &str) -> Result<PollUpdate, ProviderError> {
        Err(ProviderError::Malformed(format!(
            "synchronous provider has nothing to poll (prediction {prediction_id})"
        )))
    }
}
