//! Ledger transaction types.
//!
//! Every balance- or coin-affecting event appends a transaction. The ledger
//! is display-only: balances are authoritative on the account record and are
//! never recomputed from this log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, TransactionId};

/// A ledger entry for a balance or coin change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction ID (ULID for time-ordering).
    pub id: TransactionId,

    /// The account whose wallet was affected.
    pub account_id: AccountId,

    /// Which currency the amount is denominated in.
    pub currency: Currency,

    /// Signed amount. Positive = credit, negative = debit.
    pub amount: i64,

    /// Type of event.
    pub kind: TransactionKind,

    /// Balance of `currency` after this transaction.
    pub balance_after: i64,

    /// Human-readable description.
    pub description: String,

    /// When the transaction was created.
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a balance deposit entry (admin grants, conversions, referral
    /// channel bonuses).
    #[must_use]
    pub fn deposit(
        account_id: AccountId,
        amount: i64,
        balance_after: i64,
        description: String,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            account_id,
            currency: Currency::Balance,
            amount,
            kind: TransactionKind::Deposit,
            balance_after,
            description,
            created_at: Utc::now(),
        }
    }

    /// Create a purchase debit entry. The amount is stored negative.
    #[must_use]
    pub fn purchase(
        account_id: AccountId,
        currency: Currency,
        amount: i64,
        balance_after: i64,
        description: String,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            account_id,
            currency,
            amount: -amount.abs(),
            kind: TransactionKind::Purchase,
            balance_after,
            description,
            created_at: Utc::now(),
        }
    }

    /// Create a coin earning entry (streaks, redeem codes, referral bonuses,
    /// conversion debits).
    #[must_use]
    pub fn coin_earning(
        account_id: AccountId,
        amount: i64,
        coins_after: i64,
        description: String,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            account_id,
            currency: Currency::Coins,
            amount,
            kind: TransactionKind::CoinEarning,
            balance_after: coins_after,
            description,
            created_at: Utc::now(),
        }
    }

    /// Create an ad reward entry.
    #[must_use]
    pub fn ad_reward(
        account_id: AccountId,
        amount: i64,
        coins_after: i64,
        network_id: &str,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            account_id,
            currency: Currency::Coins,
            amount,
            kind: TransactionKind::AdReward,
            balance_after: coins_after,
            description: format!("Ad reward ({network_id})"),
            created_at: Utc::now(),
        }
    }
}

/// The currency a transaction is denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    /// Wallet balance (minor units).
    Balance,

    /// Virtual coins.
    Coins,
}

impl Currency {
    /// The wire name of this currency.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Balance => "balance",
            Self::Coins => "coins",
        }
    }
}

/// Type of ledger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Balance credited (admin grant, conversion, referral bonus).
    Deposit,

    /// Balance or coins spent on a product, bot, or plan.
    Purchase,

    /// Coins earned (redeem code, streak, referral, conversion debit).
    CoinEarning,

    /// Coins earned by watching an ad.
    AdReward,
}

impl TransactionKind {
    /// The wire name of this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Purchase => "purchase",
            Self::CoinEarning => "coin_earning",
            Self::AdReward => "ad_reward",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> AccountId {
        AccountId::from_telegram(1001).unwrap()
    }

    #[test]
    fn purchase_amount_is_negative() {
        let tx = Transaction::purchase(account(), Currency::Balance, 250, 250, "Game".into());
        assert_eq!(tx.amount, -250);
        assert_eq!(tx.kind, TransactionKind::Purchase);
        assert_eq!(tx.currency, Currency::Balance);
    }

    #[test]
    fn deposit_keeps_sign() {
        let tx = Transaction::deposit(account(), 100, 600, "Converted 1000 coins".into());
        assert_eq!(tx.amount, 100);
        assert_eq!(tx.balance_after, 600);
        assert_eq!(tx.kind, TransactionKind::Deposit);
    }

    #[test]
    fn ad_reward_describes_network() {
        let tx = Transaction::ad_reward(account(), 5, 105, "adsgram");
        assert_eq!(tx.currency, Currency::Coins);
        assert_eq!(tx.kind, TransactionKind::AdReward);
        assert!(tx.description.contains("adsgram"));
    }

    #[test]
    fn wire_names_are_snake_case() {
        assert_eq!(TransactionKind::CoinEarning.as_str(), "coin_earning");
        assert_eq!(TransactionKind::AdReward.as_str(), "ad_reward");
        assert_eq!(Currency::Balance.as_str(), "balance");
    }

    #[test]
    fn ids_are_time_ordered_strings() {
        let a = Transaction::deposit(account(), 1, 1, "a".into());
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = Transaction::deposit(account(), 1, 2, "b".into());
        assert!(a.id.to_string() < b.id.to_string());
    }
}
