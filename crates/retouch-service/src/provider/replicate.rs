//! Replicate prediction API adapter (asynchronous provider).
//!
//! Submits a prediction against a configured model and polls it by ID.
//! A prediction that comes back already `succeeded` (the API supports
//! blocking waits) is treated as a completed submission, so this adapter
//! also covers the degenerate synchronous case.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{EditProvider, EditRequest, PollUpdate, ProviderError, Submission};

/// HTTP timeout for provider calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Replicate API client.
#[derive(Debug, Clone)]
pub struct ReplicateProvider {
    client: Client,
    base_url: String,
    token: String,
    model: String,
}

/// Prediction creation request body.
#[derive(Debug, Serialize)]
struct PredictionRequest<'a> {
    input: PredictionInput<'a>,
}

#[derive(Debug, Serialize)]
struct PredictionInput<'a> {
    input_image: &'a str,
    prompt: &'a str,
    aspect_ratio: &'a str,
}

/// Prediction resource as returned by the API (simplified).
#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: String,
    #[serde(default)]
    output: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl ReplicateProvider {
    /// Create a new adapter.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into(),
            token: token.into(),
            model: model.into(),
        }
    }

    async fn read_prediction(
        &self,
        response: reqwest::Response,
    ) -> Result<Prediction, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }

    fn interpret(prediction: &Prediction) -> Result<PollUpdate, ProviderError> {
        match prediction.status.as_str() {
            "starting" | "processing" => Ok(PollUpdate::Running),
            "succeeded" => {
                let output_url = extract_output(prediction.output.as_ref()).ok_or_else(|| {
                    ProviderError::Malformed(format!(
                        "prediction {} succeeded without output",
                        prediction.id
                    ))
                })?;
                Ok(PollUpdate::Succeeded { output_url })
            }
            "canceled" => Ok(PollUpdate::Canceled),
            "failed" => Ok(PollUpdate::Failed {
                reason: prediction.error.as_ref().map(ToString::to_string),
            }),
            other => Err(ProviderError::Malformed(format!(
                "unknown prediction status: {other}"
            ))),
        }
    }
}

/// Pull a URL out of the prediction `output` field, which is either a
/// plain string or an array of strings (last element wins).
fn extract_output(output: Option<&serde_json::Value>) -> Option<String> {
    match output? {
        serde_json::Value::String(url) => Some(url.clone()),
        serde_json::Value::Array(items) => items
            .iter()
            .rev()
            .find_map(|v| v.as_str().map(String::from)),
        _ => None,
    }
}

#[async_trait]
impl EditProvider for ReplicateProvider {
    async fn submit(&self, request: &EditRequest) -> Result<Submission, ProviderError> {
        let body = PredictionRequest {
            input: PredictionInput {
                input_image: &request.input_image,
                prompt: &request.prompt,
                aspect_ratio: &request.aspect_ratio,
            },
        };

        let response = self
            .client
            .post(format!(
                "{}/v1/models/{}/predictions",
                self.base_url, self.model
            ))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let prediction = self.read_prediction(response).await?;

        tracing::debug!(
            prediction_id = %prediction.id,
            status = %prediction.status,
            "Prediction submitted"
        );

        match Self::interpret(&prediction)? {
            PollUpdate::Succeeded { output_url } => Ok(Submission::Completed { output_url }),
            PollUpdate::Running => Ok(Submission::Accepted {
                prediction_id: prediction.id,
            }),
            PollUpdate::Failed { reason } => Err(ProviderError::Api {
                status: 422,
                message: reason.unwrap_or_else(|| "prediction failed on submit".into()),
            }),
            PollUpdate::Canceled => Err(ProviderError::Api {
                status: 422,
                message: "prediction canceled on submit".into(),
            }),
        }
    }

    async fn poll(&self, prediction_id: &str) -> Result<PollUpdate, ProviderError> {
        let response = self
            .client
            .get(format!("{}/v1/predictions/{prediction_id}", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let prediction = self.read_prediction(response).await?;
        Self::interpret(&prediction)
    }
}
