//! Wallet handlers: balance, transactions, conversion.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use minimart_core::Transaction;
use minimart_store::Store;

use crate::auth::TelegramUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Wallet response.
#[derive(Debug, Serialize)]
pub struct WalletResponse {
    /// Wallet balance.
    pub balance: i64,
    /// Coin total.
    pub coins: i64,
    /// Metered API credits remaining.
    pub api_credits: i64,
    /// Coins required per unit of balance in conversion.
    pub convert_rate: i64,
}

/// Get the current wallet state.
pub async fn get_wallet(
    State(state): State<Arc<AppState>>,
    auth: TelegramUser,
) -> Result<Json<WalletResponse>, ApiError> {
    let today = chrono::Utc::now().date_naive();
    let account = state
        .store
        .get_account_rolled(&auth.account_id, today)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    Ok(Json(WalletResponse {
        balance: account.balance,
        coins: account.coins,
        api_credits: account.api_credits,
        convert_rate: state.config.economy.coins_per_balance_unit,
    }))
}

/// Transaction list query parameters.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// Maximum number of transactions to return (default: 50).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// Transaction response.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Transaction ID.
    pub id: String,
    /// Signed amount (positive = credit, negative = debit).
    pub amount: i64,
    /// Currency ("balance" or "coins").
    pub currency: String,
    /// Transaction kind.
    pub kind: String,
    /// Balance of the currency after this transaction.
    pub balance_after: i64,
    /// Description.
    pub description: String,
    /// Timestamp.
    pub created_at: String,
}

impl From<&Transaction> for TransactionResponse {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id.to_string(),
            amount: tx.amount,
            currency: tx.currency.as_str().to_string(),
            kind: tx.kind.as_str().to_string(),
            balance_after: tx.balance_after,
            description: tx.description.clone(),
            created_at: tx.created_at.to_rfc3339(),
        }
    }
}

/// List transactions response.
#[derive(Debug, Serialize)]
pub struct ListTransactionsResponse {
    /// Transactions (newest first).
    pub transactions: Vec<TransactionResponse>,
    /// Whether there are more transactions.
    pub has_more: bool,
}

/// List the caller's transaction history.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    auth: TelegramUser,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<ListTransactionsResponse>, ApiError> {
    // Verify account exists
    state
        .store
        .get_account(&auth.account_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    // Fetch one more than requested to determine has_more
    let limit = query.limit.min(100);
    let transactions = state
        .store
        .list_transactions(&auth.account_id, limit + 1, query.offset)?;

    let has_more = transactions.len() > limit;
    let transactions: Vec<_> = transactions
        .iter()
        .take(limit)
        .map(TransactionResponse::from)
        .collect();

    Ok(Json(ListTransactionsResponse {
        transactions,
        has_more,
    }))
}

/// Conversion request.
#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    /// Coins to convert. Must be a positive multiple of the rate.
    pub amount: i64,
}

/// Conversion response.
#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    /// Balance credited by the conversion.
    pub credited: i64,
    /// Coin total after the conversion.
    pub coins: i64,
    /// Balance after the conversion.
    pub balance: i64,
}

/// Convert coins to balance at the configured rate.
pub async fn convert(
    State(state): State<Arc<AppState>>,
    auth: TelegramUser,
    Json(body): Json<ConvertRequest>,
) -> Result<Json<ConvertResponse>, ApiError> {
    let outcome = state
        .store
        .convert_coins(&auth.account_id, body.amount, &state.config.economy)?;

    tracing::info!(
        account_id = %auth.account_id,
        amount = %body.amount,
        credited = %outcome.credited,
        new_balance = %outcome.balance,
        "Coins converted"
    );

    Ok(Json(ConvertResponse {
        credited: outcome.credited,
        coins: outcome.coins,
        balance: outcome.balance,
    }))
}
