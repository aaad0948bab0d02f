//! Account management handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use minimart_core::Account;
use minimart_store::Store;

use crate::auth::TelegramUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Account response.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// Account id.
    pub account_id: String,
    /// Wallet balance.
    pub balance: i64,
    /// Coin total.
    pub coins: i64,
    /// Metered API credits remaining.
    pub api_credits: i64,
    /// API key display prefix (the full key is never returned here).
    pub api_key_prefix: Option<String>,
    /// Active plan name, if any.
    pub active_plan: Option<String>,
    /// Owned product ids.
    pub purchased_products: Vec<String>,
    /// This account's referral code.
    pub referral_code: String,
    /// Number of accounts referred.
    pub referral_count: u64,
    /// Whether this account was referred by someone.
    pub referred: bool,
    /// Ads watched today (after the daily roll).
    pub ads_watched_today: u32,
    /// Whether today's bonus has been claimed.
    pub bonus_claimed: bool,
    /// Whether the daily bonus is claimable right now.
    pub can_claim_bonus: bool,
    /// Created timestamp.
    pub created_at: String,
}

impl AccountResponse {
    fn from_account(account: &Account, daily_ad_cap: u32) -> Self {
        Self {
            account_id: account.id.to_string(),
            balance: account.balance,
            coins: account.coins,
            api_credits: account.api_credits,
            api_key_prefix: account.api_key.as_ref().map(|k| k.display_prefix.clone()),
            active_plan: account.active_plan.as_ref().map(|p| p.name.clone()),
            purchased_products: account
                .purchased_products
                .iter()
                .map(ToString::to_string)
                .collect(),
            referral_code: account.referral.code.clone(),
            referral_count: account.referral.referral_count,
            referred: account.referral.referred_by.is_some(),
            ads_watched_today: account.ad_rewards.total_today(),
            bonus_claimed: account.ad_rewards.bonus_claimed,
            can_claim_bonus: account.ad_rewards.can_claim_bonus(daily_ad_cap),
            created_at: account.created_at.to_rfc3339(),
        }
    }
}

/// Create account response: the account plus the one-time raw API key.
#[derive(Debug, Serialize)]
pub struct CreateAccountResponse {
    /// The provisioned account.
    #[serde(flatten)]
    pub account: AccountResponse,
    /// The raw API key. Shown exactly once, never retrievable again.
    pub api_key: String,
    /// The referrer credited by this signup, if any.
    pub referred_by: Option<String>,
}

/// Create (provision) the caller's account.
///
/// The referral start parameter, if present in the init data, attributes the
/// signup; attribution failures are logged and swallowed.
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    auth: TelegramUser,
) -> Result<Json<CreateAccountResponse>, ApiError> {
    let outcome = state.store.provision_account(
        auth.account_id,
        auth.start_param.as_deref(),
        &state.config.economy,
    )?;

    tracing::info!(
        account_id = %auth.account_id,
        referred_by = ?outcome.referred_by,
        "Account provisioned"
    );

    Ok(Json(CreateAccountResponse {
        account: AccountResponse::from_account(&outcome.account, state.config.economy.daily_ad_cap),
        api_key: outcome.raw_api_key,
        referred_by: outcome.referred_by.map(|id| id.to_string()),
    }))
}

/// Get the current user's account, with ad counters rolled to today.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    auth: TelegramUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let today = chrono::Utc::now().date_naive();
    let account = state
        .store
        .get_account_rolled(&auth.account_id, today)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    Ok(Json(AccountResponse::from_account(
        &account,
        state.config.economy.daily_ad_cap,
    )))
}

/// Rotate API key response.
#[derive(Debug, Serialize)]
pub struct RotateKeyResponse {
    /// The new raw API key. Shown exactly once.
    pub api_key: String,
    /// Display prefix of the new key.
    pub api_key_prefix: String,
}

/// Replace the caller's API key. The previous key stops verifying.
pub async fn rotate_api_key(
    State(state): State<Arc<AppState>>,
    auth: TelegramUser,
) -> Result<Json<RotateKeyResponse>, ApiError> {
    let (raw_key, account) = state.store.rotate_api_key(&auth.account_id)?;

    tracing::info!(account_id = %auth.account_id, "API key rotated");

    let prefix = account
        .api_key
        .map(|k| k.display_prefix)
        .unwrap_or_default();

    Ok(Json(RotateKeyResponse {
        api_key: raw_key,
        api_key_prefix: prefix,
    }))
}
