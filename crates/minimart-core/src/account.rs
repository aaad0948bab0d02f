//! Account record: the per-user economy state.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::apikey::ApiKeyRecord;
use crate::config::EconomyConfig;
use crate::ids::{AccountId, PlanId, ProductId};
use crate::referral::ReferralState;
use crate::rewards::AdRewardState;

/// The account's currently active API plan, denormalized for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivePlan {
    /// The plan that was bought.
    pub plan_id: PlanId,

    /// Plan name at purchase time.
    pub name: String,

    /// When it was bought.
    pub purchased_at: DateTime<Utc>,

    /// When it expires.
    pub expires_at: DateTime<Utc>,

    /// Credits granted by this plan.
    pub granted_credits: i64,
}

/// One account per Telegram identity.
///
/// Balances here are authoritative; the transaction log is display-only.
/// Intended invariants `balance >= 0` and `coins >= 0` are enforced by the
/// store's compound operations, which gate every debit on the current value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// The account id (Telegram numeric id).
    pub id: AccountId,

    /// Wallet balance in minor units.
    pub balance: i64,

    /// Virtual coin total.
    pub coins: i64,

    /// Metered API credits remaining.
    pub api_credits: i64,

    /// The account's API key, digest-only. At most one active key.
    pub api_key: Option<ApiKeyRecord>,

    /// The currently active plan, if any.
    pub active_plan: Option<ActivePlan>,

    /// Products this account has unlocked. Append-only.
    pub purchased_products: BTreeSet<ProductId>,

    /// Ad watch counters and daily bonus state.
    pub ad_rewards: AdRewardState,

    /// Referral code, upstream referrer, and credit guards.
    pub referral: ReferralState,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Provision a new account with starter grants and a fresh API key.
    ///
    /// Returns the account and the raw API key. The raw key is not stored;
    /// this is the only time it exists outside the caller's response.
    #[must_use]
    pub fn provision(id: AccountId, config: &EconomyConfig) -> (Self, String) {
        let (raw_key, key_record) = ApiKeyRecord::generate();
        let now = Utc::now();
        let account = Self {
            id,
            balance: config.starter_balance,
            coins: config.starter_coins,
            api_credits: 0,
            api_key: Some(key_record),
            active_plan: None,
            purchased_products: BTreeSet::new(),
            ad_rewards: AdRewardState::default(),
            referral: ReferralState::new(id),
            created_at: now,
            updated_at: now,
        };
        (account, raw_key)
    }

    /// Check if the balance covers `amount`.
    #[must_use]
    pub fn has_sufficient_balance(&self, amount: i64) -> bool {
        self.balance >= amount
    }

    /// Check if the coin total covers `amount`.
    #[must_use]
    pub fn has_sufficient_coins(&self, amount: i64) -> bool {
        self.coins >= amount
    }

    /// Whether the account owns a product.
    #[must_use]
    pub fn owns(&self, product_id: ProductId) -> bool {
        self.purchased_products.contains(&product_id)
    }

    /// Stamp the record as modified now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> AccountId {
        AccountId::from_telegram(123_456_789).unwrap()
    }

    #[test]
    fn provision_seeds_starter_grants() {
        let config = EconomyConfig::default();
        let (account, raw_key) = Account::provision(id(), &config);

        assert_eq!(account.balance, 500);
        assert_eq!(account.coins, 100);
        assert_eq!(account.api_credits, 0);
        assert!(account.purchased_products.is_empty());
        assert!(account.active_plan.is_none());
        assert_eq!(account.referral.code, "21I3V9");

        let key = account.api_key.unwrap();
        assert!(key.verify(&raw_key));
    }

    #[test]
    fn raw_key_is_not_in_the_record() {
        let config = EconomyConfig::default();
        let (account, raw_key) = Account::provision(id(), &config);

        let serialized = serde_json::to_string(&account).unwrap();
        assert!(!serialized.contains(&raw_key));
    }

    #[test]
    fn sufficiency_checks() {
        let config = EconomyConfig::default();
        let (account, _) = Account::provision(id(), &config);

        assert!(account.has_sufficient_balance(500));
        assert!(!account.has_sufficient_balance(501));
        assert!(account.has_sufficient_coins(100));
        assert!(!account.has_sufficient_coins(101));
    }
}
