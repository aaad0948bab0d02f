//! Minimart HTTP client implementation.

use reqwest::Client;
use std::time::Duration;

use crate::error::ClientError;
use crate::types::{ApiErrorResponse, CheckRequest, CheckResponse, UseRequest, UseResponse};

/// Minimart API client.
///
/// Used by metered API gateways to consume quota and check availability on
/// behalf of end users.
#[derive(Debug, Clone)]
pub struct MinimartClient {
    client: Client,
    base_url: String,
    api_key: String,
    service_name: String,
}

impl MinimartClient {
    /// Create a new minimart client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the minimart service (e.g., `"http://minimart:8080"`)
    /// * `api_key` - Service API key for authentication
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_options(base_url, api_key, ClientOptions::default())
    }

    /// Create a new minimart client with custom options.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (should not happen with
    /// default settings).
    #[must_use]
    pub fn with_options(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        options: ClientOptions,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            service_name: options.service_name,
        }
    }

    /// Consume one metered request for an account.
    ///
    /// The end user's raw API key is verified server-side against the stored
    /// digest before any quota is consumed.
    ///
    /// # Errors
    ///
    /// Returns `NoActivePlan` when quota is exhausted, `InvalidApiKey` for a
    /// bad key, or a transport/API error otherwise.
    pub async fn use_request(
        &self,
        account_id: impl Into<String>,
        user_api_key: impl Into<String>,
    ) -> Result<UseResponse, ClientError> {
        let url = format!("{}/v1/usage", self.base_url);
        let request = UseRequest {
            account_id: account_id.into(),
            api_key: user_api_key.into(),
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("x-service-name", &self.service_name)
            .json(&request)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Check whether an account has metered quota available.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn check(
        &self,
        account_id: impl Into<String>,
    ) -> Result<CheckResponse, ClientError> {
        let url = format!("{}/v1/usage/check", self.base_url);
        let request = CheckRequest {
            account_id: account_id.into(),
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("x-service-name", &self.service_name)
            .json(&request)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let error_body: Result<ApiErrorResponse, _> = response.json().await;

        match error_body {
            Ok(api_error) => match api_error.error.code.as_str() {
                "no_active_plan" => Err(ClientError::NoActivePlan),
                "unauthorized" if status == reqwest::StatusCode::UNAUTHORIZED => {
                    Err(ClientError::InvalidApiKey)
                }
                "not_found" => Err(ClientError::AccountNotFound {
                    account_id: api_error.error.message.clone(),
                }),
                _ => Err(ClientError::Api {
                    code: api_error.error.code,
                    message: api_error.error.message,
                    status: status.as_u16(),
                }),
            },
            Err(_) => Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            }),
        }
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
    /// Service name to include in requests.
    pub service_name: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            service_name: "unknown".to_string(),
        }
    }
}

impl ClientOptions {
    /// Create options with a service name.
    #[must_use]
    pub fn with_service_name(name: impl Into<String>) -> Self {
        Self {
            service_name: name.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn client_trims_trailing_slash() {
        let client = MinimartClient::new("http://localhost:8080/", "test-api-key");
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn client_options() {
        let options = ClientOptions::with_service_name("api-gateway");
        let client = MinimartClient::with_options("http://localhost:8080", "key", options);
        assert_eq!(client.service_name, "api-gateway");
    }

    #[tokio::test]
    async fn use_request_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/usage"))
            .and(header("x-api-key", "service-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "purchase_id": "01HV0000000000000000000000",
                "remaining_requests": 41,
                "api_credits": 41
            })))
            .mount(&mock_server)
            .await;

        let client = MinimartClient::new(mock_server.uri(), "service-key");
        let response = client
            .use_request("123456789", "mk_ABCDEFGHIJKLMNOPQRSTUVWX")
            .await
            .unwrap();
        assert_eq!(response.remaining_requests, 41);
    }

    #[tokio::test]
    async fn exhausted_quota_maps_to_no_active_plan() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/usage"))
            .respond_with(ResponseTemplate::new(402).set_body_json(serde_json::json!({
                "error": {
                    "code": "no_active_plan",
                    "message": "no active plan with remaining requests"
                }
            })))
            .mount(&mock_server)
            .await;

        let client = MinimartClient::new(mock_server.uri(), "service-key");
        let err = client
            .use_request("123456789", "mk_ABCDEFGHIJKLMNOPQRSTUVWX")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NoActivePlan));
    }

    #[tokio::test]
    async fn check_reports_availability() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/usage/check"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "available": true,
                "api_credits": 10,
                "active_plan": "Starter"
            })))
            .mount(&mock_server)
            .await;

        let client = MinimartClient::new(mock_server.uri(), "service-key");
        let response = client.check("123456789").await.unwrap();
        assert!(response.available);
        assert_eq!(response.active_plan.as_deref(), Some("Starter"));
    }
}
