//! Application state.

use std::sync::Arc;

use minimart_store::RocksStore;

use crate::config::ServiceConfig;
use crate::delivery::DeliveryClient;
use crate::verify::{HttpMembershipVerifier, MembershipVerifier};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<RocksStore>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Delivery webhook client for bot purchases.
    pub delivery: DeliveryClient,

    /// Membership verifier for the referral channel bonus (optional).
    pub verifier: Option<Arc<dyn MembershipVerifier>>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<RocksStore>, config: ServiceConfig) -> Self {
        let verifier: Option<Arc<dyn MembershipVerifier>> =
            config.membership_verify_url.as_ref().map(|url| {
                tracing::info!(verify_url = %url, "Membership verification enabled");
                Arc::new(HttpMembershipVerifier::new(url)) as Arc<dyn MembershipVerifier>
            });

        if verifier.is_none() {
            tracing::warn!("Membership verifier not configured - channel bonus disabled");
        }

        Self {
            store,
            config,
            delivery: DeliveryClient::new(),
            verifier,
        }
    }

    /// Replace the membership verifier (used by tests).
    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn MembershipVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }
}
