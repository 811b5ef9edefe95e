//! AI edit provider adapters.
//!
//! Both provider behaviors hide behind one `EditProvider` trait:
//! synchronous backends resolve the edit in the submit response, while
//! asynchronous backends hand back a prediction ID that is polled until a
//! terminal state. The backend is selected once at startup from
//! configuration.

pub mod direct;
pub mod replicate;

pub use direct::DirectProvider;
pub use replicate::ReplicateProvider;

use async_trait::async_trait;

/// Error type for provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider API returned an error response.
    #[error("provider API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the provider.
        message: String,
    },

    /// The provider response could not be interpreted.
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Whether a poll-loop retry may succeed.
    ///
    /// Transport errors and provider 5xx responses are transient; 4xx
    /// responses and malformed payloads are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Malformed(_) => false,
        }
    }
}

/// One edit request as the provider sees it.
#[derive(Debug, Clone)]
pub struct EditRequest {
    /// Public URL of the input image.
    pub input_image: String,

    /// The edit instruction (style already folded in by the caller).
    pub prompt: String,

    /// Requested output aspect ratio.
    pub aspect_ratio: String,
}

/// Result of submitting an edit.
#[derive(Debug, Clone)]
pub enum Submission {
    /// Synchronous backend: the edit is already done.
    Completed {
        /// URL of the finished image on the provider side.
        output_url: String,
    },

    /// Asynchronous backend: poll this prediction until terminal.
    Accepted {
        /// Provider-side job identifier.
        prediction_id: String,
    },
}

/// One poll observation of an asynchronous prediction.
#[derive(Debug, Clone)]
pub enum PollUpdate {
    /// Still starting or processing.
    Running,

    /// Finished with an output.
    Succeeded {
        /// URL of the finished image on the provider side.
        output_url: String,
    },

    /// The provider reported failure.
    Failed {
        /// Provider-reported reason, if any.
        reason: Option<String>,
    },

    /// The prediction was canceled on the provider side.
    Canceled,
}

/// Uniform interface over synchronous and asynchronous edit backends.
#[async_trait]
pub trait EditProvider: Send + Sync {
    /// Submit an edit request.
    async fn submit(&self, request: &EditRequest) -> Result<Submission, ProviderError>;

    /// Poll an accepted prediction.
    async fn poll(&self, prediction_id: &str) -> Result<PollUpdate, ProviderError>;
}
