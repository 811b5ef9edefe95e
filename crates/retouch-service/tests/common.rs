//! Common test utilities for retouch integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum_test::TestServer;
use tempfile::TempDir;

use retouch_core::{CreditEntry, UserId};
use retouch_service::auth::JwtClaims;
use retouch_service::config::ProviderKind;
use retouch_service::provider::{
    EditProvider, EditRequest, PollUpdate, ProviderError, Submission,
};
use retouch_service::sign::gateway_sign;
use retouch_service::storage::{ObjectStorage, StorageError};
use retouch_service::{create_router, AppState, ServiceConfig};
use retouch_store::{RocksStore, Store};

/// Secret and audience baked into the test configuration.
pub const TEST_AUTH_SECRET: &str = "test-secret";
pub const TEST_AUDIENCE: &str = "retouch";

/// Merchant credentials baked into the test configuration.
pub const TEST_EPAY_PID: &str = "1000";
pub const TEST_EPAY_KEY: &str = "SECRET";

/// A provider whose submit/poll responses are scripted per test.
///
/// An exhausted submit script accepts with a fixed prediction ID; an
/// exhausted poll script reports `Running`, so an undersized script times
/// the job out rather than panicking inside a spawned task.
#[derive(Default)]
pub struct ScriptedProvider {
    submits: Mutex<VecDeque<Result<Submission, ProviderError>>>,
    polls: Mutex<VecDeque<Result<PollUpdate, ProviderError>>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_submit(&self, result: Result<Submission, ProviderError>) {
        self.submits.lock().unwrap().push_back(result);
    }

    pub fn push_poll(&self, result: Result<PollUpdate, ProviderError>) {
        self.polls.lock().unwrap().push_back(result);
    }
}

#[async_trait::async_trait]
impl EditProvider for ScriptedProvider {
    async fn submit(&self, _request: &EditRequest) -> Result<Submission, ProviderError> {
        self.submits.lock().unwrap().pop_front().unwrap_or(Ok(
            Submission::Accepted {
                prediction_id: "pred-unscripted".into(),
            },
        ))
    }

    async fn poll(&self, _prediction_id: &str) -> Result<PollUpdate, ProviderError> {
        self.polls
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(PollUpdate::Running))
    }
}

/// Storage stub that "persists" by returning the source URL unchanged,
/// so tests can assert the provider output flows through verbatim.
pub struct EchoStorage;

#[async_trait::async_trait]
impl ObjectStorage for EchoStorage {
    async fn persist(&self, source_url: &str) -> Result<String, StorageError> {
        Ok(source_url.to_string())
    }
}

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Direct store access for seeding and assertions.
    pub store: Arc<RocksStore>,
    /// The scripted provider behind the running service.
    pub provider: Arc<ScriptedProvider>,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// A test user ID for authenticated requests.
    pub test_user_id: UserId,
}

impl TestHarness {
    /// Create a new test harness with a fresh database and fast polling.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(RocksStore::open(temp_dir.path()).expect("Failed to open store"));

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            auth_secret: TEST_AUTH_SECRET.into(),
            auth_audience: TEST_AUDIENCE.into(),
            provider: ProviderKind::Replicate,
            provider_api_url: "http://localhost".into(),
            provider_api_token: String::new(),
            provider_model: "owner/model".into(),
            storage_api_url: "http://localhost".into(),
            storage_api_key: String::new(),
            epay_pid: TEST_EPAY_PID.into(),
            epay_key: TEST_EPAY_KEY.into(),
            epay_gateway_url: "https://pay.example.com/submit.php".into(),
            epay_notify_url: "http://localhost:8080/webhooks/epay".into(),
            epay_return_url: "http://localhost:3000/credits".into(),
            poll_initial_delay: Duration::from_millis(5),
            poll_interval: Duration::from_millis(5),
            poll_max_attempts: 10,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        };

        let provider = Arc::new(ScriptedProvider::new());
        let state = AppState::new(
            Arc::clone(&store),
            config,
            Arc::clone(&provider) as Arc<dyn EditProvider>,
            Arc::new(EchoStorage),
        );
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");
        let test_user_id = UserId::generate();

        Self {
            server,
            store,
            provider,
            _temp_dir: temp_dir,
            test_user_id,
        }
    }

    /// Get the authorization header for the default test user.
    pub fn user_auth_header(&self) -> String {
        Self::auth_header_for(&self.test_user_id)
    }

    /// Get the authorization header for an arbitrary user.
    pub fn auth_header_for(user_id: &UserId) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = JwtClaims {
            sub: user_id.to_string(),
            aud: TEST_AUDIENCE.into(),
            exp: now + 3600,
            iat: now,
        };
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(TEST_AUTH_SECRET.as_bytes()),
        )
        .expect("Failed to encode test JWT");
        format!("Bearer {token}")
    }

    /// Get a different user's auth header (for testing isolation).
    pub fn other_user_auth_header() -> String {
        Self::auth_header_for(&UserId::generate())
    }

    /// Seed the default test user with credits.
    pub fn grant_credits(&self, amount: i64) {
        let entry = CreditEntry::purchase(self.test_user_id, amount, "test-seed");
        self.store
            .add_credits(&self.test_user_id, amount, entry)
            .expect("Failed to seed credits");
    }

    /// Read the default test user's balance straight from the store.
    pub fn balance(&self) -> i64 {
        self.store
            .balance(&self.test_user_id)
            .expect("Failed to read balance")
    }

    /// Create a project via the API and return its ID.
    pub async fn create_project(&self, image_ref: &str) -> String {
        let response = self
            .server
            .post("/v1/projects")
            .add_header("authorization", self.user_auth_header())
            .json(&serde_json::json!({ "image_ref": image_ref }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let body: serde_json::Value = response.json();
        body["id"].as_str().expect("project id").to_string()
    }

    /// Poll the job endpoint until the job reaches a terminal status.
    pub async fn wait_for_terminal(&self, job_id: &str) -> serde_json::Value {
        for _ in 0..200 {
            let response = self
                .server
                .get(&format!("/v1/jobs/{job_id}"))
                .add_header("authorization", self.user_auth_header())
                .await;
            response.assert_status_ok();
            let body: serde_json::Value = response.json();
            match body["status"].as_str() {
                Some("succeeded" | "failed" | "canceled" | "timed_out") => return body,
                _ => tokio::time::sleep(Duration::from_millis(10)).await,
            }
        }
        panic!("job {job_id} never reached a terminal state");
    }

    /// Build a signed gateway notification for an order.
    pub fn signed_notification(
        &self,
        out_trade_no: &str,
        money: &str,
        trade_status: &str,
    ) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("pid".to_string(), TEST_EPAY_PID.to_string());
        params.insert("trade_no".to_string(), "GW1234567890".to_string());
        params.insert("out_trade_no".to_string(), out_trade_no.to_string());
        params.insert("type".to_string(), "alipay".to_string());
        params.insert("money".to_string(), money.to_string());
        params.insert("trade_status".to_string(), trade_status.to_string());

        let sign = gateway_sign(&params, TEST_EPAY_KEY);
        params.insert("sign".to_string(), sign);
        params.insert("sign_type".to_string(), "MD5".to_string());
        params
    }

    /// Deliver a notification through the GET webhook endpoint.
    pub async fn deliver_notification(
        &self,
        params: &BTreeMap<String, String>,
    ) -> axum_test::TestResponse {
        let query = serde_urlencoded::to_string(params).expect("Failed to encode query");
        self.server.get(&format!("/webhooks/epay?{query}")).await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
