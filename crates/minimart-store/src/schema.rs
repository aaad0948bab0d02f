//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Primary account records, keyed by account id (decimal string).
    pub const ACCOUNTS: &str = "accounts";

    /// Index: referral code -> account id. Written once at provisioning.
    pub const REFERRAL_CODES: &str = "referral_codes";

    /// Ledger transactions, keyed by `transaction_id` (ULID).
    pub const TRANSACTIONS: &str = "transactions";

    /// Index: transactions by account, keyed by `account_id || '/' || transaction_id`.
    /// Value is empty (index only).
    pub const TRANSACTIONS_BY_ACCOUNT: &str = "transactions_by_account";

    /// Plan purchase records, keyed by `purchase_id` (ULID).
    pub const PLAN_PURCHASES: &str = "plan_purchases";

    /// Index: plan purchases by account, keyed by
    /// `account_id || '/' || purchase_id`. Value is empty (index only).
    pub const PLAN_PURCHASES_BY_ACCOUNT: &str = "plan_purchases_by_account";

    /// Bot purchase records, keyed by `purchase_id` (ULID).
    pub const BOT_PURCHASES: &str = "bot_purchases";

    /// Redeem codes, keyed by the normalized code string.
    pub const REDEEM_CODES: &str = "redeem_codes";

    /// Product catalog, keyed by `product_id` (UUID).
    pub const PRODUCTS: &str = "products";

    /// Bot catalog, keyed by `bot_id` (UUID).
    pub const BOTS: &str = "bots";

    /// API plan catalog, keyed by `plan_id` (UUID).
    pub const API_PLANS: &str = "api_plans";

    /// Admin notifications, keyed by `notification_id` (ULID).
    pub const NOTIFICATIONS: &str = "notifications";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ACCOUNTS,
        cf::REFERRAL_CODES,
        cf::TRANSACTIONS,
        cf::TRANSACTIONS_BY_ACCOUNT,
        cf::PLAN_PURCHASES,
        cf::PLAN_PURCHASES_BY_ACCOUNT,
        cf::BOT_PURCHASES,
        cf::REDEEM_CODES,
        cf::PRODUCTS,
        cf::BOTS,
        cf::API_PLANS,
        cf::NOTIFICATIONS,
    ]
}
