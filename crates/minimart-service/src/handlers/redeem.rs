//! Redeem code handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use minimart_core::RedeemReward;
use minimart_store::Store;

use crate::auth::TelegramUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Redeem request.
#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    /// The code as entered by the user (case-insensitive).
    pub code: String,
}

/// Redeem response.
#[derive(Debug, Serialize)]
pub struct RedeemResponse {
    /// "coins" or "balance".
    pub reward_type: String,
    /// Amount credited.
    pub reward_amount: i64,
    /// Balance after the reward.
    pub balance: i64,
    /// Coin total after the reward.
    pub coins: i64,
}

/// Redeem a promo code for the caller.
pub async fn redeem(
    State(state): State<Arc<AppState>>,
    auth: TelegramUser,
    Json(body): Json<RedeemRequest>,
) -> Result<Json<RedeemResponse>, ApiError> {
    let outcome = state
        .store
        .redeem(&auth.account_id, &body.code, chrono::Utc::now())?;

    let (reward_type, reward_amount) = match outcome.reward {
        RedeemReward::Coins(n) => ("coins", n),
        RedeemReward::Balance(n) => ("balance", n),
    };

    tracing::info!(
        account_id = %auth.account_id,
        reward_type = %reward_type,
        reward_amount = %reward_amount,
        "Code redeemed"
    );

    Ok(Json(RedeemResponse {
        reward_type: reward_type.to_string(),
        reward_amount,
        balance: outcome.balance,
        coins: outcome.coins,
    }))
}
