//! Client error types.

/// Errors that can occur when using the minimart client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// No active plan with remaining quota.
    #[error("no active plan with remaining requests")]
    NoActivePlan,

    /// The presented API key did not verify.
    #[error("invalid API key")]
    InvalidApiKey,

    /// Account not found.
    #[error("account not found: {account_id}")]
    AccountNotFound {
        /// The account id.
        account_id: String,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
