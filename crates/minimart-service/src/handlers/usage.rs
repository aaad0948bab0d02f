//! Metered API usage handlers (service auth).

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use minimart_core::AccountId;
use minimart_store::Store;

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Metered request: consume one unit of quota.
#[derive(Debug, Deserialize)]
pub struct UseRequest {
    /// The account being metered.
    pub account_id: String,
    /// The caller's raw API key, verified against the stored digest.
    pub api_key: String,
}

/// Metered request response.
#[derive(Debug, Serialize)]
pub struct UseResponse {
    /// The plan purchase that served the request.
    pub purchase_id: String,
    /// Requests remaining on that purchase.
    pub remaining_requests: u64,
    /// Account API credits after the decrement.
    pub api_credits: i64,
}

/// Consume one metered request from the account's earliest-expiring active
/// plan purchase.
pub async fn use_request(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<UseRequest>,
) -> Result<Json<UseResponse>, ApiError> {
    let account_id: AccountId = body
        .account_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid account ID".into()))?;

    let account = state
        .store
        .get_account(&account_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    let key_ok = account
        .api_key
        .as_ref()
        .is_some_and(|k| k.verify(&body.api_key));
    if !key_ok {
        return Err(ApiError::Unauthorized);
    }

    let outcome = state.store.use_api_request(&account_id, chrono::Utc::now())?;

    tracing::info!(
        service = %auth.service_name,
        account_id = %account_id,
        purchase_id = %outcome.purchase_id,
        remaining = %outcome.remaining_requests,
        "Metered request consumed"
    );

    Ok(Json(UseResponse {
        purchase_id: outcome.purchase_id.to_string(),
        remaining_requests: outcome.remaining_requests,
        api_credits: outcome.api_credits,
    }))
}

/// Credit check request.
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    /// The account to check.
    pub account_id: String,
}

/// Credit check response.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    /// Whether a metered request would currently succeed.
    pub available: bool,
    /// Account API credits.
    pub api_credits: i64,
    /// Active plan name, if any.
    pub active_plan: Option<String>,
}

/// Check whether an account has metered quota available.
pub async fn check(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(body): Json<CheckRequest>,
) -> Result<Json<CheckResponse>, ApiError> {
    let account_id: AccountId = body
        .account_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid account ID".into()))?;

    let account = state
        .store
        .get_account(&account_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    let now = chrono::Utc::now();
    let available = state
        .store
        .list_plan_purchases(&account_id)?
        .iter()
        .any(|p| p.is_usable(now));

    Ok(Json(CheckResponse {
        available,
        api_credits: account.api_credits,
        active_plan: account.active_plan.map(|p| p.name),
    }))
}
