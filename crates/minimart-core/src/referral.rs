//! Referral codes and per-account referral state.
//!
//! A referral code is the uppercase base-36 rendering of the Telegram numeric
//! id, so it is derivable from identity alone and unique without a collision
//! check. The two crediting triggers (plan purchase, channel join) are each
//! guarded by a claimed flag on the referred account, making every referral
//! edge worth at most one credit per trigger.

use serde::{Deserialize, Serialize};

use crate::ids::AccountId;

/// Per-account referral state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralState {
    /// This account's own referral code.
    pub code: String,

    /// The account that referred this one, if any. Set once at provisioning.
    pub referred_by: Option<AccountId>,

    /// Number of accounts this account has referred.
    pub referral_count: u64,

    /// Cumulative coins earned from referral purchase bonuses.
    pub earned_coins: i64,

    /// Cumulative balance earned from referral channel bonuses.
    pub earned_balance: i64,

    /// Whether the plan-purchase bonus has been granted for this account's
    /// referral edge.
    pub purchase_reward_granted: bool,

    /// Whether the channel-join bonus has been claimed for this account's
    /// referral edge.
    pub channel_reward_claimed: bool,
}

impl ReferralState {
    /// Create fresh referral state for a new account.
    #[must_use]
    pub fn new(account_id: AccountId) -> Self {
        Self {
            code: referral_code(account_id),
            referred_by: None,
            referral_count: 0,
            earned_coins: 0,
            earned_balance: 0,
            purchase_reward_granted: false,
            channel_reward_claimed: false,
        }
    }
}

/// Derive the referral code for an account: uppercase base-36 of the id.
#[must_use]
pub fn referral_code(account_id: AccountId) -> String {
    const DIGITS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    let mut n = account_id.as_i64();
    debug_assert!(n > 0);
    let mut out = Vec::new();
    while n > 0 {
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base-36 digits are ASCII")
}
