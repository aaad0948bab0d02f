//! Core types and rules for the minimart storefront economy.
//!
//! This crate provides the foundational types used throughout the platform:
//!
//! - **Identifiers**: `AccountId`, `TransactionId`, `PurchaseId`, catalog ids
//! - **Accounts**: `Account`, `ActivePlan`, `ApiKeyRecord`
//! - **Rewards**: `AdRewardState` with lazy daily reset
//! - **Referrals**: `ReferralState`, base-36 code derivation
//! - **Ledger**: `Transaction`, `TransactionKind`, `Currency`
//! - **Redeem codes**: `RedeemCode`, `RedeemReward`
//! - **Catalog**: `Product`, `Bot`, `ApiPlan`, purchase records
//! - **Configuration**: `EconomyConfig`
//!
//! # Units
//!
//! Wallet balance is an `i64` in minor units and coins are an `i64` count;
//! both avoid floating point. Conversion between them uses the configured
//! `coins_per_balance_unit` rate.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod apikey;
pub mod catalog;
pub mod config;
pub mod error;
pub mod ids;
pub mod redeem;
pub mod referral;
pub mod rewards;
pub mod transactions;

pub use account::{Account, ActivePlan};
pub use apikey::{ApiKeyRecord, API_KEY_DISPLAY_LEN, API_KEY_PREFIX, API_KEY_SUFFIX_LEN};
pub use catalog::{
    AdminNotification, ApiPlan, Bot, BotDeliveryStatus, BotPurchase, NotificationKind,
    PlanPurchase, Product, ProductPrice, PurchaseStatus,
};
pub use config::{AdNetwork, EconomyConfig};
pub use error::{EconomyError, Result};
pub use ids::{
    AccountId, BotId, IdError, NotificationId, PlanId, ProductId, PurchaseId, TransactionId,
};
pub use redeem::{RedeemCode, RedeemReward};
pub use referral::{referral_code, ReferralState};
pub use rewards::AdRewardState;
pub use transactions::{Currency, Transaction, TransactionKind};
