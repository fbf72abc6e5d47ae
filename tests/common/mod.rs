//! Common test utilities for E2E tests

pub mod schema_validator;

use conduit::{AppState, config};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const TEST_TOKEN_SECRET: &str = "test-secret-key-32-bytes-long!!!";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

/// A registered user and the token returned at registration
pub struct TestUser {
    pub email: String,
    pub username: String,
    pub password: String,
    pub token: String,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        // Create test configuration
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
            },
            database: config::DatabaseConfig { path: db_path },
            auth: config::AuthConfig {
                token_secret: TEST_TOKEN_SECRET.to_string(),
                token_ttl_seconds: 86400,
                // Lowest bcrypt cost keeps the suite fast
                password_hash_cost: 4,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        conduit::metrics::init_metrics();

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = conduit::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Register a user through the API
    pub async fn register(&self, username: &str) -> TestUser {
        let email = format!("{}@example.com", username);
        let password = format!("{}-password", username);

        let response = self
            .client
            .post(self.url("/api/users"))
            .json(&json!({
                "user": {"email": email, "username": username, "password": password}
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "registration of {} failed", username);

        let body: Value = response.json().await.unwrap();
        let token = body["user"]["token"].as_str().unwrap().to_string();

        TestUser {
            email,
            username: username.to_string(),
            password,
            token,
        }
    }

    /// Issue a token for an arbitrary subject with the server's secret
    pub fn token_for(&self, account_id: &str) -> String {
        self.state.tokens.issue(account_id).unwrap()
    }
}
