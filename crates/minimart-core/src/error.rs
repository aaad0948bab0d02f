//! Error types for minimart economy operations.

use crate::ids::IdError;

/// Result type for economy operations.
pub type Result<T> = std::result::Result<T, EconomyError>;

/// Errors that can occur in economy operations.
///
/// Every variant here is a validation failure the caller can surface to the
/// user; storage and transport failures live in their own layers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EconomyError {
    /// Insufficient wallet balance for the operation.
    #[error("insufficient balance: balance={balance}, required={required}")]
    InsufficientBalance {
        /// Current balance in minor units.
        balance: i64,
        /// Required amount in minor units.
        required: i64,
    },

    /// Insufficient coins for the operation.
    #[error("insufficient coins: coins={coins}, required={required}")]
    InsufficientCoins {
        /// Current coin total.
        coins: i64,
        /// Required amount.
        required: i64,
    },

    /// Account not found.
    #[error("account not found: {account_id}")]
    AccountNotFound {
        /// The account id that was not found.
        account_id: String,
    },

    /// Account already exists.
    #[error("account already exists: {account_id}")]
    AccountAlreadyExists {
        /// The account id that already exists.
        account_id: String,
    },

    /// Invalid amount (non-positive, or not a multiple of the required step).
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The per-network daily ad cap has been reached.
    #[error("ad cap reached for network {network}: {cap} per day")]
    AdCapReached {
        /// The ad network id.
        network: String,
        /// The daily cap that was hit.
        cap: u32,
    },

    /// Unknown ad network id.
    #[error("unknown ad network: {0}")]
    UnknownAdNetwork(String),

    /// The daily bonus is not claimable (cap not reached, or already claimed).
    #[error("daily bonus not available")]
    BonusUnavailable,

    /// The product is already owned by the account.
    #[error("product already owned: {product_id}")]
    AlreadyOwned {
        /// The product that is already in the entitlement set.
        product_id: String,
    },

    /// No redeem code matches, or the code is inactive.
    #[error("invalid code")]
    InvalidCode,

    /// The account has already redeemed this code.
    #[error("code already used")]
    CodeAlreadyUsed,

    /// The code has reached its usage limit.
    #[error("code limit reached")]
    CodeLimitReached,

    /// The code has expired.
    #[error("code expired")]
    CodeExpired,

    /// No active plan purchase with remaining quota.
    #[error("no active plan with remaining requests")]
    NoActivePlan,

    /// Catalog entity not found.
    #[error("{entity} not found: {id}")]
    CatalogNotFound {
        /// The entity kind (product, bot, plan).
        entity: &'static str,
        /// The id that was not found.
        id: String,
    },

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}
