//! Bot purchase delivery webhooks.
//!
//! After a bot purchase commits, the service POSTs the purchase payload to
//! the bot's delivery URL. Delivery is best-effort and fire-and-forget: no
//! retry, no signature; a failure files an admin notification for manual
//! fulfilment and the debit stands.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;

/// Error type for delivery attempts.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint rejected the payload.
    #[error("delivery endpoint returned status {0}")]
    Status(u16),
}

/// The payload POSTed to the bot's delivery endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryPayload {
    /// Purchase record id.
    pub purchase_id: String,

    /// The purchased bot.
    pub bot_id: String,

    /// The buying account.
    pub buyer_id: String,

    /// Amount paid.
    pub amount: i64,

    /// When the purchase happened.
    pub timestamp: DateTime<Utc>,
}

/// Client for delivery webhooks.
#[derive(Debug, Clone)]
pub struct DeliveryClient {
    client: Client,
}

impl DeliveryClient {
    /// Create a delivery client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (should not happen with
    /// default settings).
    #[must_use]
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }

    /// POST the purchase payload to `url`. One attempt, 2xx counts as
    /// delivered.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the endpoint returns a
    /// non-success status.
    pub async fn deliver(&self, url: &str, payload: &DeliveryPayload) -> Result<(), DeliveryError> {
        let response = self.client.post(url).json(payload).send().await?;

        if !response.status().is_success() {
            return Err(DeliveryError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

impl Default for DeliveryClient {
    fn default() -> Self {
        Self::new()
    }
}
