//! Referral handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use minimart_store::Store;

use crate::auth::TelegramUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Referral summary response.
#[derive(Debug, Serialize)]
pub struct ReferralResponse {
    /// This account's referral code.
    pub code: String,
    /// Number of accounts referred.
    pub referral_count: u64,
    /// Coins earned from referral purchase bonuses.
    pub earned_coins: i64,
    /// Balance earned from referral channel bonuses.
    pub earned_balance: i64,
    /// Whether this account has an upstream referrer.
    pub referred: bool,
    /// Whether the channel bonus for this account's edge is still claimable.
    pub channel_bonus_available: bool,
}

/// Get the caller's referral summary.
pub async fn get_referrals(
    State(state): State<Arc<AppState>>,
    auth: TelegramUser,
) -> Result<Json<ReferralResponse>, ApiError> {
    let account = state
        .store
        .get_account(&auth.account_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    let referral = &account.referral;
    Ok(Json(ReferralResponse {
        code: referral.code.clone(),
        referral_count: referral.referral_count,
        earned_coins: referral.earned_coins,
        earned_balance: referral.earned_balance,
        referred: referral.referred_by.is_some(),
        channel_bonus_available: referral.referred_by.is_some()
            && !referral.channel_reward_claimed,
    }))
}

/// Channel verification response.
#[derive(Debug, Serialize)]
pub struct VerifyChannelResponse {
    /// Whether the caller is a member of the referral channel.
    pub is_member: bool,
    /// Whether the referrer was credited by this call.
    pub bonus_granted: bool,
}

/// Verify the caller's membership in the referral channel and, on success,
/// grant the one-time balance bonus to their referrer.
pub async fn verify_channel(
    State(state): State<Arc<AppState>>,
    auth: TelegramUser,
) -> Result<Json<VerifyChannelResponse>, ApiError> {
    let verifier = state
        .verifier
        .as_ref()
        .ok_or_else(|| ApiError::ExternalService("Membership verification not configured".into()))?;

    let channel_id = &state.config.economy.referral_channel_id;
    let is_member = verifier
        .is_member(&auth.account_id, channel_id)
        .await
        .map_err(|e| {
            tracing::error!(account_id = %auth.account_id, error = %e, "Membership check failed");
            ApiError::ExternalService("Membership check failed".into())
        })?;

    if !is_member {
        return Ok(Json(VerifyChannelResponse {
            is_member: false,
            bonus_granted: false,
        }));
    }

    let outcome = state
        .store
        .claim_channel_reward(&auth.account_id, &state.config.economy)?;

    tracing::info!(
        account_id = %auth.account_id,
        referrer = %outcome.referrer,
        bonus = %outcome.bonus,
        "Channel join bonus granted"
    );

    Ok(Json(VerifyChannelResponse {
        is_member: true,
        bonus_granted: true,
    }))
}
