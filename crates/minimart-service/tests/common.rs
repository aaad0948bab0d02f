//! Common test utilities for minimart integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use tempfile::TempDir;

use minimart_core::AccountId;
use minimart_service::crypto::{hmac_sha256, hmac_sha256_hex};
use minimart_service::{create_router, AppState, MembershipVerifier, ServiceConfig};
use minimart_store::RocksStore;

/// Bot token shared by the harness and the init-data signer.
pub const BOT_TOKEN: &str = "12345:test-bot-token";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// A test user id for authenticated requests.
    pub user_id: i64,
    /// The service API key for service-to-service requests.
    pub service_api_key: String,
    /// The admin key for back-office requests.
    pub admin_key: String,
}

impl TestHarness {
    /// Create a new test harness with a fresh database.
    pub fn new() -> Self {
        Self::with_verifier(None)
    }

    /// Create a harness with a membership verifier installed.
    pub fn with_verifier(verifier: Option<Arc<dyn MembershipVerifier>>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = RocksStore::open(temp_dir.path()).expect("Failed to open store");

        let service_api_key = "test-service-key".to_string();
        let admin_key = "test-admin-key".to_string();

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            bot_token: BOT_TOKEN.into(),
            auth_max_age_seconds: 0, // Disable freshness checks in tests
            service_api_key: Some(service_api_key.clone()),
            admin_api_key: Some(admin_key.clone()),
            ..ServiceConfig::default()
        };

        let mut state = AppState::new(Arc::new(store), config);
        if let Some(verifier) = verifier {
            state = state.with_verifier(verifier);
        }
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            _temp_dir: temp_dir,
            user_id: 123_456_789,
            service_api_key,
            admin_key,
        }
    }

    /// Signed init data for the default test user.
    pub fn init_data(&self) -> String {
        sign_init_data(self.user_id, None)
    }

    /// Signed init data for an arbitrary user, optionally with a referral
    /// start parameter.
    pub fn init_data_for(&self, user_id: i64, start_param: Option<&str>) -> String {
        sign_init_data(user_id, start_param)
    }

    /// Provision an account for the default user and return the raw API key.
    pub async fn create_account(&self) -> String {
        let response = self
            .server
            .post("/v1/accounts")
            .add_header("x-telegram-init-data", self.init_data())
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        body["api_key"].as_str().unwrap().to_string()
    }

    /// Provision an account for an arbitrary user.
    pub async fn create_account_for(&self, user_id: i64, start_param: Option<&str>) {
        self.server
            .post("/v1/accounts")
            .add_header(
                "x-telegram-init-data",
                self.init_data_for(user_id, start_param),
            )
            .await
            .assert_status_ok();
    }

    /// The default user's referral code (uppercase base-36 of the id).
    pub fn referral_code(&self) -> String {
        minimart_core::referral_code(AccountId::from_telegram(self.user_id).unwrap())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Build init data signed the way Telegram signs it.
pub fn sign_init_data(user_id: i64, start_param: Option<&str>) -> String {
    let user_json = format!(r#"{{"id":{user_id},"first_name":"Test","username":"tester"}}"#);
    let mut fields: Vec<(&str, String)> = vec![
        ("auth_date", "1700000000".to_string()),
        ("user", user_json),
    ];
    if let Some(param) = start_param {
        fields.push(("start_param", param.to_string()));
    }

    let mut sorted: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let data_check_string = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n");

    let secret = hmac_sha256(b"WebAppData", BOT_TOKEN.as_bytes());
    let hash = hmac_sha256_hex(&secret, data_check_string.as_bytes());

    let mut encoded: Vec<String> = fields
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect();
    encoded.push(format!("hash={hash}"));
    encoded.join("&")
}

/// A stub membership verifier with a fixed answer.
pub struct StubVerifier(pub bool);

impl MembershipVerifier for StubVerifier {
    fn is_member<'a>(
        &'a self,
        _account_id: &'a AccountId,
        _channel_id: &'a str,
    ) -> std::pin::Pin<
        Box<
            dyn std::future::Future<Output = Result<bool, minimart_service::verify::VerifyError>>
                + Send
                + 'a,
        >,
    > {
        let answer = self.0;
        Box::pin(async move { Ok(answer) })
    }
}
