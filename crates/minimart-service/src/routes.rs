//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    accounts, admin, ads, catalog, health, purchases, redeem, referrals, usage, wallet,
};
use crate::state::AppState;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `GET /v1/catalog/*` - Catalog reads
///
/// ## User (Telegram init-data auth)
/// - `POST /v1/accounts` - Provision account (start param attributes referral)
/// - `GET /v1/accounts/me` - Get current account (rolled to today)
/// - `POST /v1/api-key/rotate` - Rotate the API key
/// - `GET /v1/wallet` / `GET /v1/wallet/transactions` / `POST /v1/wallet/convert`
/// - `POST /v1/ads/watch` / `POST /v1/ads/bonus`
/// - `POST /v1/redeem`
/// - `GET /v1/referrals` / `POST /v1/referrals/verify-channel`
/// - `POST /v1/purchases/{product,plan,bot}` / `GET /v1/purchases`
///
/// ## Service (X-API-Key auth)
/// - `POST /v1/usage` - Consume one metered request
/// - `POST /v1/usage/check` - Check quota availability
///
/// ## Admin (X-Admin-Key auth)
/// - Catalog CRUD, redeem codes, notifications, credit grants
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // Catalog (public)
        .route("/v1/catalog/products", get(catalog::list_products))
        .route("/v1/catalog/bots", get(catalog::list_bots))
        .route("/v1/catalog/plans", get(catalog::list_plans))
        // Accounts
        .route("/v1/accounts", post(accounts::create_account))
        .route("/v1/accounts/me", get(accounts::get_account))
        .route("/v1/api-key/rotate", post(accounts::rotate_api_key))
        // Wallet
        .route("/v1/wallet", get(wallet::get_wallet))
        .route("/v1/wallet/transactions", get(wallet::list_transactions))
        .route("/v1/wallet/convert", post(wallet::convert))
        // Ads
        .route("/v1/ads/watch", post(ads::watch))
        .route("/v1/ads/bonus", post(ads::claim_bonus))
        // Redeem codes
        .route("/v1/redeem", post(redeem::redeem))
        // Referrals
        .route("/v1/referrals", get(referrals::get_referrals))
        .route(
            "/v1/referrals/verify-channel",
            post(referrals::verify_channel),
        )
        // Purchases
        .route("/v1/purchases/product", post(purchases::purchase_product))
        .route("/v1/purchases/plan", post(purchases::purchase_plan))
        .route("/v1/purchases/bot", post(purchases::purchase_bot))
        .route("/v1/purchases", get(purchases::list_purchases))
        // Usage (service auth)
        .route("/v1/usage", post(usage::use_request))
        .route("/v1/usage/check", post(usage::check))
        // Admin
        .route("/v1/admin/products", post(admin::upsert_product))
        .route("/v1/admin/products/:id", delete(admin::delete_product))
        .route("/v1/admin/bots", post(admin::upsert_bot))
        .route("/v1/admin/bots/:id", delete(admin::delete_bot))
        .route("/v1/admin/plans", post(admin::upsert_plan))
        .route("/v1/admin/plans/:id", delete(admin::delete_plan))
        .route("/v1/admin/redeem-codes", post(admin::create_code))
        .route("/v1/admin/redeem-codes", get(admin::list_codes))
        .route(
            "/v1/admin/redeem-codes/:code/deactivate",
            post(admin::deactivate_code),
        )
        .route("/v1/admin/notifications", get(admin::list_notifications))
        .route(
            "/v1/admin/notifications/:id/ack",
            post(admin::acknowledge_notification),
        )
        .route("/v1/admin/credits", post(admin::grant_credits))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
