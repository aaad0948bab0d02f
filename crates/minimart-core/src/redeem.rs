//! Redeem codes: single-use-per-account promo codes for coins or balance.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EconomyError, Result};
use crate::ids::AccountId;

/// What a redeem code pays out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "amount", rename_all = "snake_case")]
pub enum RedeemReward {
    /// Coins credited on redemption.
    Coins(i64),

    /// Balance credited on redemption.
    Balance(i64),
}

/// An admin-created promo code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemCode {
    /// The code, normalized to uppercase. Unique.
    pub code: String,

    /// The reward applied per redemption.
    pub reward: RedeemReward,

    /// Maximum total redemptions.
    pub max_uses: u32,

    /// Redemptions so far.
    pub current_uses: u32,

    /// Accounts that have redeemed this code.
    pub used_by: BTreeSet<AccountId>,

    /// Manual on/off switch, independent of uses and expiry.
    pub is_active: bool,

    /// Optional expiry timestamp.
    pub expires_at: Option<DateTime<Utc>>,

    /// When the code was created.
    pub created_at: DateTime<Utc>,
}

impl RedeemCode {
    /// Create a new active code.
    #[must_use]
    pub fn new(
        code: &str,
        reward: RedeemReward,
        max_uses: u32,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            code: normalize(code),
            reward,
            max_uses,
            current_uses: 0,
            used_by: BTreeSet::new(),
            is_active: true,
            expires_at,
            created_at: Utc::now(),
        }
    }

    /// Validate a redemption attempt without mutating anything.
    ///
    /// Check order matches the user-facing failure messages: inactive code,
    /// already used by this account, usage limit, expiry.
    ///
    /// # Errors
    ///
    /// Returns the matching `EconomyError` variant for the first failed check.
    pub fn validate_for(&self, account_id: AccountId, now: DateTime<Utc>) -> Result<()> {
        if !self.is_active {
            return Err(EconomyError::InvalidCode);
        }
        if self.used_by.contains(&account_id) {
            return Err(EconomyError::CodeAlreadyUsed);
        }
        if self.current_uses >= self.max_uses {
            return Err(EconomyError::CodeLimitReached);
        }
        if let Some(expires_at) = self.expires_at {
            if expires_at < now {
                return Err(EconomyError::CodeExpired);
            }
        }
        Ok(())
    }

    /// Record a successful redemption by `account_id`.
    ///
    /// # Errors
    ///
    /// Re-runs `validate_for` so a stale caller cannot bypass the checks.
    pub fn mark_redeemed(&mut self, account_id: AccountId, now: DateTime<Utc>) -> Result<()> {
        self.validate_for(account_id, now)?;
        self.current_uses += 1;
        self.used_by.insert(account_id);
        Ok(())
    }
}

/// Normalize a user-entered code: trim and uppercase.
#[must_use]
pub fn normalize(code: &str) -> String {
    code.trim().to_uppercase()
}
