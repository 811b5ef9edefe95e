//! Service configuration.
//!
//! All configuration is read once at process start into an immutable
//! `ServiceConfig` that is passed by reference into the application state;
//! no code reads the process environment after startup.

use std::time::Duration;

/// Which AI edit provider backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Asynchronous prediction API (submit, then poll).
    Replicate,

    /// Synchronous API returning the final image in the submit response.
    Direct,
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/retouch").
    pub data_dir: String,

    /// HS256 secret for validating user JWTs.
    pub auth_secret: String,

    /// Expected JWT audience (default: "retouch").
    pub auth_audience: String,

    /// Which edit provider backend to use.
    pub provider: ProviderKind,

    /// Provider API base URL.
    pub provider_api_url: String,

    /// Provider API token.
    pub provider_api_token: String,

    /// Model identifier for the asynchronous provider,
    /// e.g. "black-forest-labs/flux-kontext-pro".
    pub provider_model: String,

    /// Object-storage upload endpoint.
    pub storage_api_url: String,

    /// Object-storage API key.
    pub storage_api_key: String,

    /// Payment-gateway merchant ID (`pid`).
    pub epay_pid: String,

    /// Payment-gateway merchant secret (signing key).
    pub epay_key: String,

    /// Payment-gateway submit URL.
    pub epay_gateway_url: String,

    /// Public URL of our webhook endpoint, sent as `notify_url`.
    pub epay_notify_url: String,

    /// Browser redirect target after payment, sent as `return_url`.
    pub epay_return_url: String,

    /// Delay before the first provider poll.
    pub poll_initial_delay: Duration,

    /// Fixed interval between provider polls.
    pub poll_interval: Duration,

    /// Poll attempt ceiling; exhausting it resolves the job as timed out.
    pub poll_max_attempts: u32,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let provider = match std::env::var("EDIT_PROVIDER").as_deref() {
            Ok("direct") => ProviderKind::Direct,
            _ => ProviderKind::Replicate,
        };

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/retouch".into()),
            auth_secret: std::env::var("AUTH_SECRET")
                .unwrap_or_else(|_| "insecure-dev-secret".into()),
            auth_audience: std::env::var("AUTH_AUDIENCE").unwrap_or_else(|_| "retouch".into()),
            provider,
            provider_api_url: std::env::var("PROVIDER_API_URL")
                .unwrap_or_else(|_| "https://api.replicate.com".into()),
            provider_api_token: std::env::var("PROVIDER_API_TOKEN").unwrap_or_default(),
            provider_model: std::env::var("PROVIDER_MODEL")
                .unwrap_or_else(|_| "black-forest-labs/flux-kontext-pro".into()),
            storage_api_url: std::env::var("STORAGE_API_URL")
                .unwrap_or_else(|_| "http://localhost:9000/upload".into()),
            storage_api_key: std::env::var("STORAGE_API_KEY").unwrap_or_default(),
            epay_pid: std::env::var("EPAY_PID").unwrap_or_default(),
            epay_key: std::env::var("EPAY_KEY").unwrap_or_default(),
            epay_gateway_url: std::env::var("EPAY_GATEWAY_URL")
                .unwrap_or_else(|_| "https://pay.example.com/submit.php".into()),
            epay_notify_url: std::env::var("EPAY_NOTIFY_URL")
                .unwrap_or_else(|_| "http://localhost:8080/webhooks/epay".into()),
            epay_return_url: std::env::var("EPAY_RETURN_URL")
                .unwrap_or_else(|_| "http://localhost:3000/credits".into()),
            poll_initial_delay: Duration::from_millis(env_u64("POLL_INITIAL_DELAY_MS", 2000)),
            poll_interval: Duration::from_millis(env_u64("POLL_INTERVAL_MS", 5000)),
            poll_max_attempts: u32::try_from(env_u64("POLL_MAX_ATTEMPTS", 60)).unwrap_or(60),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: usize::try_from(env_u64("MAX_BODY_BYTES", 1024 * 1024))
                .unwrap_or(1024 * 1024),
            request_timeout_seconds: env_u64("REQUEST_TIMEOUT_SECONDS", 30),
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/retouch".into(),
            auth_secret: "insecure-dev-secret".into(),
            auth_audience: "retouch".into(),
            provider: ProviderKind::Replicate,
            provider_api_url: "https://api.replicate.com".into(),
            provider_api_token: String::new(),
            provider_model: "black-forest-labs/flux-kontext-pro".into(),
            storage_api_url: "http://localhost:9000/upload".into(),
            storage_api_key: String::new(),
            epay_pid: String::new(),
            epay_key: String::new(),
            epay_gateway_url: "https://pay.example.com/submit.php".into(),
            epay_notify_url: "http://localhost:8080/webhooks/epay".into(),
            epay_return_url: "http://localhost:3000/credits".into(),
            poll_initial_delay: Duration::from_millis(2000),
            poll_interval: Duration::from_millis(5000),
            poll_max_attempts: 60,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}
