//! Ad reward handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use minimart_store::Store;

use crate::auth::TelegramUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Ad watch request.
#[derive(Debug, Deserialize)]
pub struct WatchRequest {
    /// The ad network that served the ad.
    pub network: String,
}

/// Ad watch response.
#[derive(Debug, Serialize)]
pub struct WatchResponse {
    /// Coins credited for this watch.
    pub coins_earned: i64,
    /// Coin total after the credit.
    pub coins: i64,
    /// Watches today across all networks.
    pub watched_today: u32,
    /// The global daily cap.
    pub daily_cap: u32,
    /// Whether the daily bonus is now claimable.
    pub can_claim_bonus: bool,
    /// Lifetime watch count.
    pub lifetime_watched: u64,
}

/// Record a completed ad watch and credit the network's reward.
pub async fn watch(
    State(state): State<Arc<AppState>>,
    auth: TelegramUser,
    Json(body): Json<WatchRequest>,
) -> Result<Json<WatchResponse>, ApiError> {
    let today = chrono::Utc::now().date_naive();
    let outcome = state.store.record_ad_watch(
        &auth.account_id,
        &body.network,
        today,
        &state.config.economy,
    )?;

    tracing::info!(
        account_id = %auth.account_id,
        network = %body.network,
        coins_earned = %outcome.coins_earned,
        watched_today = %outcome.watched_today,
        "Ad watch recorded"
    );

    let daily_cap = state.config.economy.daily_ad_cap;
    Ok(Json(WatchResponse {
        coins_earned: outcome.coins_earned,
        coins: outcome.coins,
        watched_today: outcome.watched_today,
        daily_cap,
        can_claim_bonus: outcome.watched_today >= daily_cap,
        lifetime_watched: outcome.lifetime_watched,
    }))
}

/// Daily bonus response.
#[derive(Debug, Serialize)]
pub struct BonusResponse {
    /// Coins credited by the bonus.
    pub coins_earned: i64,
    /// Coin total after the credit.
    pub coins: i64,
}

/// Claim the daily cap-completion bonus.
pub async fn claim_bonus(
    State(state): State<Arc<AppState>>,
    auth: TelegramUser,
) -> Result<Json<BonusResponse>, ApiError> {
    let today = chrono::Utc::now().date_naive();
    let outcome =
        state
            .store
            .claim_daily_bonus(&auth.account_id, today, &state.config.economy)?;

    tracing::info!(
        account_id = %auth.account_id,
        coins_earned = %outcome.coins_earned,
        "Daily bonus claimed"
    );

    Ok(Json(BonusResponse {
        coins_earned: outcome.coins_earned,
        coins: outcome.coins,
    }))
}
