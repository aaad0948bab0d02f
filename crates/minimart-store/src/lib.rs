//! `RocksDB` storage layer for the minimart economy.
//!
//! This crate persists accounts, ledger transactions, purchases, redeem codes,
//! and the catalog using `RocksDB` with column families for indexing.
//!
//! # Atomicity
//!
//! Every logical economy operation (ad watch, conversion, redemption, each
//! purchase kind, metering) validates against the current record and then
//! commits all of its writes in a single `WriteBatch`: the debit, the ledger
//! entry, and the entitlement land together or not at all. This replaces the
//! read-modify-write sequences the storefront once ran client-side.
//!
//! # Example
//!
//! ```no_run
//! use minimart_store::{RocksStore, Store};
//! use minimart_core::{AccountId, EconomyConfig};
//!
//! let store = RocksStore::open("/tmp/minimart-db").unwrap();
//! let config = EconomyConfig::default();
//!
//! let id = AccountId::from_telegram(123_456_789).unwrap();
//! let outcome = store.provision_account(id, None, &config).unwrap();
//! println!("api key (shown once): {}", outcome.raw_api_key);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use chrono::{DateTime, NaiveDate, Utc};

use minimart_core::{
    Account, AccountId, AdminNotification, ApiPlan, Bot, BotDeliveryStatus, BotId, BotPurchase,
    Currency, EconomyConfig, NotificationId, PlanId, PlanPurchase, Product, ProductId, PurchaseId,
    RedeemCode, RedeemReward, Transaction,
};

/// Result of provisioning a new account.
#[derive(Debug)]
pub struct ProvisionOutcome {
    /// The freshly created account.
    pub account: Account,

    /// The raw API key. Surfaced exactly once; only its digest is stored.
    pub raw_api_key: String,

    /// The referrer credited with this account, if attribution succeeded.
    pub referred_by: Option<AccountId>,
}

/// Result of a successful ad watch.
#[derive(Debug, Clone, Copy)]
pub struct AdWatchOutcome {
    /// Coins credited for this watch.
    pub coins_earned: i64,

    /// Coin total after the credit.
    pub coins: i64,

    /// Watches today across all networks, including this one.
    pub watched_today: u32,

    /// Lifetime watch count.
    pub lifetime_watched: u64,
}

/// Result of claiming the daily bonus.
#[derive(Debug, Clone, Copy)]
pub struct BonusOutcome {
    /// Coins credited by the bonus.
    pub coins_earned: i64,

    /// Coin total after the credit.
    pub coins: i64,
}

/// Result of a coin conversion.
#[derive(Debug, Clone, Copy)]
pub struct ConversionOutcome {
    /// Balance credited.
    pub credited: i64,

    /// Coin total after the conversion.
    pub coins: i64,

    /// Balance after the conversion.
    pub balance: i64,
}

/// Result of a successful redemption.
#[derive(Debug, Clone, Copy)]
pub struct RedeemOutcome {
    /// The reward that was applied.
    pub reward: RedeemReward,

    /// Balance after the reward.
    pub balance: i64,

    /// Coin total after the reward.
    pub coins: i64,
}

/// Result of a product purchase.
#[derive(Debug, Clone, Copy)]
pub struct ProductPurchaseOutcome {
    /// Balance after the purchase.
    pub balance: i64,

    /// Coin total after the purchase.
    pub coins: i64,
}

/// Result of an API plan purchase.
#[derive(Debug)]
pub struct PlanPurchaseOutcome {
    /// The created purchase record.
    pub purchase: PlanPurchase,

    /// Balance after the purchase.
    pub balance: i64,

    /// API credits after the grant.
    pub api_credits: i64,

    /// The referrer credited by this purchase, if the one-time referral
    /// bonus fired.
    pub referrer_credited: Option<AccountId>,
}

/// Result of a bot purchase. Delivery happens after commit.
#[derive(Debug)]
pub struct BotPurchaseOutcome {
    /// The created purchase record, status `Pending`.
    pub purchase: BotPurchase,

    /// Balance after the purchase.
    pub balance: i64,

    /// The bot's delivery webhook, if configured.
    pub webhook_url: Option<String>,
}

/// Result of claiming the channel-join referral reward.
#[derive(Debug, Clone, Copy)]
pub struct ChannelRewardOutcome {
    /// The referrer who received the balance bonus.
    pub referrer: AccountId,

    /// The bonus amount credited to the referrer.
    pub bonus: i64,
}

/// Result of consuming one metered API request.
#[derive(Debug, Clone, Copy)]
pub struct MeterOutcome {
    /// The plan purchase that served the request.
    pub purchase_id: PurchaseId,

    /// Requests remaining on that purchase.
    pub remaining_requests: u64,

    /// Account API credits after the decrement.
    pub api_credits: i64,
}

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different
/// implementations (e.g. `RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Provision a new account atomically: record, referral-code index, and
    /// optional referral attribution in one batch.
    ///
    /// Attribution is best-effort: an unknown or self-referencing code is
    /// skipped, never an error.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::AccountAlreadyExists` if the id is taken.
    fn provision_account(
        &self,
        id: AccountId,
        referrer_code: Option<&str>,
        config: &EconomyConfig,
    ) -> Result<ProvisionOutcome>;

    /// Get an account without applying the daily roll.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_account(&self, id: &AccountId) -> Result<Option<Account>>;

    /// Get an account with ad counters rolled to `today`.
    ///
    /// If the roll changed anything, the rolled record is persisted before it
    /// is returned, so repeated reads are idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_account_rolled(&self, id: &AccountId, today: NaiveDate) -> Result<Option<Account>>;

    /// Insert or update an account record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_account(&self, account: &Account) -> Result<()>;

    /// Look up an account by its referral code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_account_by_referral_code(&self, code: &str) -> Result<Option<AccountId>>;

    /// Replace the account's API key. Returns the new raw key (shown once)
    /// and the updated account.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::AccountNotFound` if the account doesn't exist.
    fn rotate_api_key(&self, id: &AccountId) -> Result<(String, Account)>;

    // =========================================================================
    // Wallet Operations
    // =========================================================================

    /// Convert coins to balance at the configured rate, atomically.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` / `InsufficientCoins` on validation failure.
    fn convert_coins(
        &self,
        id: &AccountId,
        amount: i64,
        config: &EconomyConfig,
    ) -> Result<ConversionOutcome>;

    /// Credit an account from the back office, with a ledger entry.
    /// Returns the new total of the credited currency.
    ///
    /// # Errors
    ///
    /// Returns `EconomyError::AccountNotFound` if the account doesn't exist.
    fn admin_grant(
        &self,
        id: &AccountId,
        currency: Currency,
        amount: i64,
        reason: String,
    ) -> Result<i64>;

    /// List transactions for an account, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_transactions(
        &self,
        id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>>;

    // =========================================================================
    // Ad Rewards
    // =========================================================================

    /// Record one ad watch and credit the network's reward, atomically.
    ///
    /// # Errors
    ///
    /// Returns `AdCapReached` when a daily cap is met (no mutation), and
    /// `UnknownAdNetwork` for an unconfigured network id.
    fn record_ad_watch(
        &self,
        id: &AccountId,
        network_id: &str,
        today: NaiveDate,
        config: &EconomyConfig,
    ) -> Result<AdWatchOutcome>;

    /// Claim the cap-completion bonus for today, atomically.
    ///
    /// # Errors
    ///
    /// Returns `BonusUnavailable` if the cap is unmet or already claimed.
    fn claim_daily_bonus(
        &self,
        id: &AccountId,
        today: NaiveDate,
        config: &EconomyConfig,
    ) -> Result<BonusOutcome>;

    // =========================================================================
    // Redeem Codes
    // =========================================================================

    /// Insert or update a redeem code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_redeem_code(&self, code: &RedeemCode) -> Result<()>;

    /// Get a redeem code by its (normalized) code string.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_redeem_code(&self, code: &str) -> Result<Option<RedeemCode>>;

    /// List all redeem codes (back office).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_redeem_codes(&self) -> Result<Vec<RedeemCode>>;

    /// Redeem a code for an account: reward credit, usage count, used-by set,
    /// and ledger entry in one batch.
    ///
    /// # Errors
    ///
    /// Returns the matching `EconomyError` for invalid / already used /
    /// exhausted / expired codes. Nothing is written on failure.
    fn redeem(&self, id: &AccountId, code: &str, now: DateTime<Utc>) -> Result<RedeemOutcome>;

    // =========================================================================
    // Purchases & Entitlements
    // =========================================================================

    /// Buy a digital product with balance or coins, granting the entitlement
    /// atomically.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyOwned`, `InsufficientBalance`, or `InsufficientCoins`
    /// on validation failure; nothing is written.
    fn purchase_product(&self, id: &AccountId, product_id: ProductId)
        -> Result<ProductPurchaseOutcome>;

    /// Buy an API plan: debit, purchase record, credit grant, active-plan
    /// update, and the one-time referral bonus in one batch.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientBalance` or `CatalogNotFound` on validation
    /// failure; nothing is written.
    fn purchase_plan(
        &self,
        id: &AccountId,
        plan_id: PlanId,
        now: DateTime<Utc>,
        config: &EconomyConfig,
    ) -> Result<PlanPurchaseOutcome>;

    /// Buy a bot: debit and a `Pending` purchase record in one batch.
    /// Webhook delivery is the caller's post-commit concern.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientBalance` or `CatalogNotFound` on validation
    /// failure; nothing is written.
    fn purchase_bot(&self, id: &AccountId, bot_id: BotId) -> Result<BotPurchaseOutcome>;

    /// Record the outcome of a bot delivery attempt.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the purchase doesn't exist.
    fn complete_bot_delivery(
        &self,
        purchase_id: &PurchaseId,
        status: BotDeliveryStatus,
    ) -> Result<()>;

    /// Get a bot purchase record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_bot_purchase(&self, purchase_id: &PurchaseId) -> Result<Option<BotPurchase>>;

    /// List plan purchases for an account, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_plan_purchases(&self, id: &AccountId) -> Result<Vec<PlanPurchase>>;

    /// Grant the channel-join referral reward for a referred account,
    /// crediting its referrer and marking the edge claimed, atomically.
    ///
    /// # Errors
    ///
    /// Returns `BonusUnavailable` if the account has no referrer or the
    /// reward was already claimed.
    fn claim_channel_reward(
        &self,
        referred: &AccountId,
        config: &EconomyConfig,
    ) -> Result<ChannelRewardOutcome>;

    /// Consume one metered API request from the earliest-expiring usable plan
    /// purchase, atomically.
    ///
    /// # Errors
    ///
    /// Returns `NoActivePlan` when no usable purchase remains.
    fn use_api_request(&self, id: &AccountId, now: DateTime<Utc>) -> Result<MeterOutcome>;

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Insert or update a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_product(&self, product: &Product) -> Result<()>;

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_product(&self, id: &ProductId) -> Result<Option<Product>>;

    /// List all products.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_products(&self) -> Result<Vec<Product>>;

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the product doesn't exist.
    fn delete_product(&self, id: &ProductId) -> Result<()>;

    /// Insert or update a bot.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_bot(&self, bot: &Bot) -> Result<()>;

    /// Get a bot by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_bot(&self, id: &BotId) -> Result<Option<Bot>>;

    /// List all bots.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_bots(&self) -> Result<Vec<Bot>>;

    /// Delete a bot.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the bot doesn't exist.
    fn delete_bot(&self, id: &BotId) -> Result<()>;

    /// Insert or update an API plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_plan(&self, plan: &ApiPlan) -> Result<()>;

    /// Get an API plan by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_plan(&self, id: &PlanId) -> Result<Option<ApiPlan>>;

    /// List all API plans.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_plans(&self) -> Result<Vec<ApiPlan>>;

    /// Delete an API plan.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the plan doesn't exist.
    fn delete_plan(&self, id: &PlanId) -> Result<()>;

    // =========================================================================
    // Admin Notifications
    // =========================================================================

    /// File a back-office notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn file_notification(&self, notification: &AdminNotification) -> Result<()>;

    /// List notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_notifications(&self, include_acknowledged: bool) -> Result<Vec<AdminNotification>>;

    /// Mark a notification acknowledged.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the notification doesn't exist.
    fn acknowledge_notification(&self, id: &NotificationId) -> Result<()>;
}
