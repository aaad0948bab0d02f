//! Service configuration.

use std::path::Path;

use minimart_core::EconomyConfig;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/minimart").
    pub data_dir: String,

    /// Telegram bot token, used to verify WebApp init data.
    pub bot_token: String,

    /// Maximum accepted age of init data in seconds (default: 86400).
    /// Zero disables the freshness check.
    pub auth_max_age_seconds: i64,

    /// Service API key for service-to-service auth (metering).
    pub service_api_key: Option<String>,

    /// Admin API key for the back office.
    pub admin_api_key: Option<String>,

    /// URL of the membership verification function, if deployed.
    pub membership_verify_url: Option<String>,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Economy configuration.
    pub economy: EconomyConfig,
}

impl ServiceConfig {
    /// Load configuration from environment variables and the optional
    /// economy config file.
    #[must_use]
    pub fn from_env() -> Self {
        let economy = load_economy_config();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/minimart".into()),
            bot_token: std::env::var("BOT_TOKEN").unwrap_or_default(),
            auth_max_age_seconds: std::env::var("AUTH_MAX_AGE_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(86_400),
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
            admin_api_key: std::env::var("ADMIN_API_KEY").ok(),
            membership_verify_url: std::env::var("MEMBERSHIP_VERIFY_URL").ok(),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            economy,
        }
    }
}

/// Load the economy config from `ECONOMY_CONFIG` (a JSON file path) or fall
/// back to defaults.
fn load_economy_config() -> EconomyConfig {
    let Ok(path) = std::env::var("ECONOMY_CONFIG") else {
        tracing::debug!("ECONOMY_CONFIG not set, using default economy config");
        return EconomyConfig::default();
    };

    match load_config_file(&path) {
        Ok(config) => {
            tracing::info!(path = %path, "Loaded economy config from file");
            config
        }
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "Failed to load economy config, using defaults");
            EconomyConfig::default()
        }
    }
}

/// Load a JSON config file.
fn load_config_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Config file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/minimart".into(),
            bot_token: String::new(),
            auth_max_age_seconds: 86_400,
            service_api_key: None,
            admin_api_key: None,
            membership_verify_url: None,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            economy: EconomyConfig::default(),
        }
    }
}
