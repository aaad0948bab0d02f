//! Economy configuration for minimart.
//!
//! This module defines the tunable numbers of the virtual economy: starter
//! grants, ad-network caps and rewards, the coin conversion rate, and referral
//! bonuses. The service loads this from a JSON file or falls back to defaults.

use serde::{Deserialize, Serialize};

use crate::error::{EconomyError, Result};

/// Configuration for a single ad network partition.
///
/// Each network has its own daily watch cap and per-watch coin reward; the
/// global daily cap bounds the sum across networks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdNetwork {
    /// Network identifier (e.g. "adsgram", "monetag").
    pub id: String,

    /// Maximum watches per account per calendar day on this network.
    pub daily_cap: u32,

    /// Coins credited per successful watch.
    pub reward_coins: i64,
}

/// Economy configuration for all balance/coin rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Balance (minor units) seeded into every new account.
    pub starter_balance: i64,

    /// Coins seeded into every new account.
    pub starter_coins: i64,

    /// Coins required per unit of balance in conversion. Conversion amounts
    /// must be positive multiples of this rate.
    pub coins_per_balance_unit: i64,

    /// Global daily ad watch cap across all networks.
    pub daily_ad_cap: u32,

    /// Configured ad networks.
    pub ad_networks: Vec<AdNetwork>,

    /// Coins granted when the daily bonus is claimed (cap reached).
    pub daily_bonus_coins: i64,

    /// Coins granted to the referrer when a referred account buys its first
    /// API plan.
    pub referral_purchase_bonus_coins: i64,

    /// Balance granted to the referrer when a referred account verifies
    /// membership in the referral channel.
    pub referral_channel_bonus_balance: i64,

    /// Channel id checked by the membership verifier.
    pub referral_channel_id: String,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starter_balance: 500,
            starter_coins: 100,
            coins_per_balance_unit: 10,
            daily_ad_cap: 10,
            ad_networks: vec![
                AdNetwork {
                    id: "adsgram".into(),
                    daily_cap: 5,
                    reward_coins: 5,
                },
                AdNetwork {
                    id: "monetag".into(),
                    daily_cap: 5,
                    reward_coins: 5,
                },
            ],
            daily_bonus_coins: 20,
            referral_purchase_bonus_coins: 50,
            referral_channel_bonus_balance: 25,
            referral_channel_id: "@minimart_channel".into(),
        }
    }
}

impl EconomyConfig {
    /// Look up an ad network by id.
    #[must_use]
    pub fn ad_network(&self, id: &str) -> Option<&AdNetwork> {
        self.ad_networks.iter().find(|n| n.id == id)
    }

    /// Validate a coin conversion amount and return the balance credit.
    ///
    /// The amount must be a positive multiple of `coins_per_balance_unit` and
    /// must not exceed `available_coins`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` for non-positive or misaligned amounts, and
    /// `InsufficientCoins` when the account cannot cover the amount.
    pub fn conversion_credit(&self, amount: i64, available_coins: i64) -> Result<i64> {
        if amount <= 0 {
            return Err(EconomyError::InvalidAmount(
                "conversion amount must be positive".into(),
            ));
        }
        if amount % self.coins_per_balance_unit != 0 {
            return Err(EconomyError::InvalidAmount(format!(
                "conversion amount must be a multiple of {}",
                self.coins_per_balance_unit
            )));
        }
        if amount > available_coins {
            return Err(EconomyError::InsufficientCoins {
                coins: available_coins,
                required: amount,
            });
        }
        Ok(amount / self.coins_per_balance_unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_credit_happy_path() {
        let config = EconomyConfig::default();
        assert_eq!(config.conversion_credit(100, 105).unwrap(), 10);
        assert_eq!(config.conversion_credit(10, 10).unwrap(), 1);
    }

    #[test]
    fn conversion_rejects_misaligned_amount() {
        let config = EconomyConfig::default();
        assert!(matches!(
            config.conversion_credit(15, 100),
            Err(EconomyError::InvalidAmount(_))
        ));
    }

    #[test]
    fn conversion_rejects_non_positive() {
        let config = EconomyConfig::default();
        assert!(matches!(
            config.conversion_credit(0, 100),
            Err(EconomyError::InvalidAmount(_))
        ));
        assert!(matches!(
            config.conversion_credit(-10, 100),
            Err(EconomyError::InvalidAmount(_))
        ));
    }

    #[test]
    fn conversion_rejects_overdraw() {
        let config = EconomyConfig::default();
        assert!(matches!(
            config.conversion_credit(110, 100),
            Err(EconomyError::InsufficientCoins {
                coins: 100,
                required: 110
            })
        ));
    }

    #[test]
    fn ad_network_lookup() {
        let config = EconomyConfig::default();
        assert_eq!(config.ad_network("adsgram").unwrap().reward_coins, 5);
        assert!(config.ad_network("nope").is_none());
    }
}
