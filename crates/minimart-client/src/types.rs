//! Request and response types for the minimart client.

use serde::{Deserialize, Serialize};

/// Metered request body.
#[derive(Debug, Clone, Serialize)]
pub struct UseRequest {
    /// The account being metered.
    pub account_id: String,
    /// The caller's raw API key.
    pub api_key: String,
}

/// Metered request response.
#[derive(Debug, Clone, Deserialize)]
pub struct UseResponse {
    /// The plan purchase that served the request.
    pub purchase_id: String,
    /// Requests remaining on that purchase.
    pub remaining_requests: u64,
    /// Account API credits after the decrement.
    pub api_credits: i64,
}

/// Credit check request body.
#[derive(Debug, Clone, Serialize)]
pub struct CheckRequest {
    /// The account to check.
    pub account_id: String,
}

/// Credit check response.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckResponse {
    /// Whether a metered request would currently succeed.
    pub available: bool,
    /// Account API credits.
    pub api_credits: i64,
    /// Active plan name, if any.
    pub active_plan: Option<String>,
}

/// Error body returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// The error envelope.
    pub error: ApiErrorBody,
}

/// Error details returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}
