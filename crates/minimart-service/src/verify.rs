//! Channel membership verification.
//!
//! The referral channel-join bonus requires confirming that the referred
//! user actually joined the designated channel. That check lives in an
//! external function (it needs the bot's Telegram-side view); this module
//! defines the seam and its HTTP implementation.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use minimart_core::AccountId;

/// Error type for membership verification.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The verifier returned an unexpected response.
    #[error("verifier error: status {0}")]
    Status(u16),
}

/// The membership verification seam.
///
/// Implementations answer one question: is this account a member of the
/// given channel right now?
pub trait MembershipVerifier: Send + Sync {
    /// Check membership of `account_id` in `channel_id`.
    fn is_member<'a>(
        &'a self,
        account_id: &'a AccountId,
        channel_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, VerifyError>> + Send + 'a>>;
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    user_id: String,
    channel_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    is_member: bool,
}

/// HTTP implementation calling the deployed verification function.
#[derive(Debug, Clone)]
pub struct HttpMembershipVerifier {
    client: Client,
    url: String,
}

impl HttpMembershipVerifier {
    /// Create a verifier for the function at `url`.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (should not happen with
    /// default settings).
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            url: url.into(),
        }
    }
}

impl MembershipVerifier for HttpMembershipVerifier {
    fn is_member<'a>(
        &'a self,
        account_id: &'a AccountId,
        channel_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, VerifyError>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .client
                .post(&self.url)
                .json(&VerifyRequest {
                    user_id: account_id.to_string(),
                    channel_id,
                })
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(VerifyError::Status(response.status().as_u16()));
            }

            let body: VerifyResponse = response.json().await?;
            Ok(body.is_member)
        })
    }
}
