//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use minimart_core::EconomyError;
use minimart_store::StoreError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden - valid credentials but insufficient permissions.
    #[error("forbidden")]
    Forbidden,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict - resource already exists or invalid state transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Insufficient funds, with machine-readable details.
    #[error("insufficient {currency}: available={available}, required={required}")]
    InsufficientFunds {
        /// "balance" or "coins".
        currency: &'static str,
        /// Current amount.
        available: i64,
        /// Required amount.
        required: i64,
    },

    /// A daily throttle cap was hit.
    #[error("cap reached: {0}")]
    CapReached(String),

    /// No active plan with remaining quota.
    #[error("no active plan with remaining requests")]
    NoActivePlan,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                self.to_string(),
                None,
            ),
            Self::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string(), None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::InsufficientFunds {
                currency,
                available,
                required,
            } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_funds",
                self.to_string(),
                Some(serde_json::json!({
                    "currency": currency,
                    "available": available,
                    "required": required
                })),
            ),
            Self::CapReached(msg) => (
                StatusCode::TOO_MANY_REQUESTS,
                "cap_reached",
                msg.clone(),
                None,
            ),
            Self::NoActivePlan => (
                StatusCode::PAYMENT_REQUIRED,
                "no_active_plan",
                self.to_string(),
                None,
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg.clone(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<EconomyError> for ApiError {
    fn from(err: EconomyError) -> Self {
        match err {
            EconomyError::InsufficientBalance { balance, required } => Self::InsufficientFunds {
                currency: "balance",
                available: balance,
                required,
            },
            EconomyError::InsufficientCoins { coins, required } => Self::InsufficientFunds {
                currency: "coins",
                available: coins,
                required,
            },
            EconomyError::AccountNotFound { account_id } => {
                Self::NotFound(format!("Account not found: {account_id}"))
            }
            EconomyError::CatalogNotFound { entity, id } => {
                Self::NotFound(format!("{entity} not found: {id}"))
            }
            EconomyError::AccountAlreadyExists { .. } => {
                Self::Conflict("Account already exists".into())
            }
            EconomyError::AlreadyOwned { product_id } => {
                Self::Conflict(format!("Product already owned: {product_id}"))
            }
            EconomyError::AdCapReached { network, cap } => {
                Self::CapReached(format!("Daily ad cap reached on {network} ({cap})"))
            }
            EconomyError::BonusUnavailable => Self::Conflict("Bonus not available".into()),
            EconomyError::CodeAlreadyUsed => Self::Conflict("Code already used".into()),
            EconomyError::CodeLimitReached => Self::Conflict("Code limit reached".into()),
            EconomyError::CodeExpired => Self::Conflict("Code expired".into()),
            EconomyError::InvalidCode => Self::BadRequest("Invalid code".into()),
            EconomyError::NoActivePlan => Self::NoActivePlan,
            EconomyError::InvalidAmount(msg) => Self::BadRequest(msg),
            EconomyError::UnknownAdNetwork(id) => {
                Self::BadRequest(format!("Unknown ad network: {id}"))
            }
            EconomyError::InvalidId(e) => Self::BadRequest(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Economy(e) => e.into(),
            StoreError::NotFound => Self::NotFound("Not found".into()),
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}
