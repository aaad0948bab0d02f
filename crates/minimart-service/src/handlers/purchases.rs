//! Purchase handlers: products, API plans, and bots.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use minimart_core::{
    AdminNotification, BotDeliveryStatus, BotId, NotificationKind, PlanId, PlanPurchase, ProductId,
};
use minimart_store::Store;

use crate::auth::TelegramUser;
use crate::delivery::DeliveryPayload;
use crate::error::ApiError;
use crate::state::AppState;

/// Product purchase request.
#[derive(Debug, Deserialize)]
pub struct ProductPurchaseRequest {
    /// The product to buy.
    pub product_id: ProductId,
}

/// Product purchase response.
#[derive(Debug, Serialize)]
pub struct ProductPurchaseResponse {
    /// Balance after the purchase.
    pub balance: i64,
    /// Coin total after the purchase.
    pub coins: i64,
}

/// Buy a digital product. The debit and the entitlement land atomically.
pub async fn purchase_product(
    State(state): State<Arc<AppState>>,
    auth: TelegramUser,
    Json(body): Json<ProductPurchaseRequest>,
) -> Result<Json<ProductPurchaseResponse>, ApiError> {
    let outcome = state
        .store
        .purchase_product(&auth.account_id, body.product_id)?;

    tracing::info!(
        account_id = %auth.account_id,
        product_id = %body.product_id,
        new_balance = %outcome.balance,
        "Product purchased"
    );

    Ok(Json(ProductPurchaseResponse {
        balance: outcome.balance,
        coins: outcome.coins,
    }))
}

/// Plan purchase request.
#[derive(Debug, Deserialize)]
pub struct PlanPurchaseRequest {
    /// The plan to buy.
    pub plan_id: PlanId,
}

/// Plan purchase response.
#[derive(Debug, Serialize)]
pub struct PlanPurchaseResponse {
    /// The purchase record id.
    pub purchase_id: String,
    /// When the plan expires.
    pub expires_at: String,
    /// Requests granted.
    pub total_requests: u64,
    /// Balance after the purchase.
    pub balance: i64,
    /// API credits after the grant.
    pub api_credits: i64,
}

/// Buy an API plan. Grants credits and may credit the referrer (once per
/// referral edge).
pub async fn purchase_plan(
    State(state): State<Arc<AppState>>,
    auth: TelegramUser,
    Json(body): Json<PlanPurchaseRequest>,
) -> Result<Json<PlanPurchaseResponse>, ApiError> {
    let outcome = state.store.purchase_plan(
        &auth.account_id,
        body.plan_id,
        chrono::Utc::now(),
        &state.config.economy,
    )?;

    tracing::info!(
        account_id = %auth.account_id,
        plan_id = %body.plan_id,
        purchase_id = %outcome.purchase.id,
        referrer_credited = ?outcome.referrer_credited,
        "Plan purchased"
    );

    Ok(Json(PlanPurchaseResponse {
        purchase_id: outcome.purchase.id.to_string(),
        expires_at: outcome.purchase.expires_at.to_rfc3339(),
        total_requests: outcome.purchase.total_requests,
        balance: outcome.balance,
        api_credits: outcome.api_credits,
    }))
}

/// Bot purchase request.
#[derive(Debug, Deserialize)]
pub struct BotPurchaseRequest {
    /// The bot to buy.
    pub bot_id: BotId,
}

/// Bot purchase response.
#[derive(Debug, Serialize)]
pub struct BotPurchaseResponse {
    /// The purchase record id.
    pub purchase_id: String,
    /// Delivery status after the single delivery attempt.
    pub delivery_status: String,
    /// Balance after the purchase.
    pub balance: i64,
}

/// Buy a bot. The debit commits first; webhook delivery is a single
/// best-effort attempt afterwards, and a failure files an admin
/// notification for manual fulfilment (the debit stands).
pub async fn purchase_bot(
    State(state): State<Arc<AppState>>,
    auth: TelegramUser,
    Json(body): Json<BotPurchaseRequest>,
) -> Result<Json<BotPurchaseResponse>, ApiError> {
    let outcome = state.store.purchase_bot(&auth.account_id, body.bot_id)?;
    let purchase = &outcome.purchase;

    let status = match &outcome.webhook_url {
        Some(url) => {
            let payload = DeliveryPayload {
                purchase_id: purchase.id.to_string(),
                bot_id: purchase.bot_id.to_string(),
                buyer_id: purchase.account_id.to_string(),
                amount: purchase.amount,
                timestamp: purchase.created_at,
            };

            match state.delivery.deliver(url, &payload).await {
                Ok(()) => {
                    tracing::info!(purchase_id = %purchase.id, "Bot purchase delivered");
                    BotDeliveryStatus::Delivered
                }
                Err(e) => {
                    tracing::warn!(
                        purchase_id = %purchase.id,
                        error = %e,
                        "Bot delivery failed, filing admin notification"
                    );
                    state.store.file_notification(&AdminNotification::new(
                        NotificationKind::DeliveryFailed,
                        format!("Delivery failed for bot purchase {}: {e}", purchase.id),
                        Some(purchase.id),
                    ))?;
                    BotDeliveryStatus::Failed
                }
            }
        }
        None => {
            tracing::info!(
                purchase_id = %purchase.id,
                "Bot has no delivery webhook, filing manual fulfilment notification"
            );
            state.store.file_notification(&AdminNotification::new(
                NotificationKind::ManualFulfilment,
                format!("Bot purchase {} needs manual fulfilment", purchase.id),
                Some(purchase.id),
            ))?;
            BotDeliveryStatus::Pending
        }
    };

    if status != BotDeliveryStatus::Pending {
        state.store.complete_bot_delivery(&purchase.id, status)?;
    }

    Ok(Json(BotPurchaseResponse {
        purchase_id: purchase.id.to_string(),
        delivery_status: format!("{status:?}").to_lowercase(),
        balance: outcome.balance,
    }))
}

/// Plan purchase record response.
#[derive(Debug, Serialize)]
pub struct PurchaseRecordResponse {
    /// Purchase record id.
    pub purchase_id: String,
    /// Plan name at purchase time.
    pub plan_name: String,
    /// When the plan was bought.
    pub purchased_at: String,
    /// When the plan expires.
    pub expires_at: String,
    /// Requests granted.
    pub total_requests: u64,
    /// Requests consumed.
    pub used_requests: u64,
    /// Status ("active", "expired", "exhausted").
    pub status: String,
}

impl From<&PlanPurchase> for PurchaseRecordResponse {
    fn from(purchase: &PlanPurchase) -> Self {
        Self {
            purchase_id: purchase.id.to_string(),
            plan_name: purchase.plan_name.clone(),
            purchased_at: purchase.purchased_at.to_rfc3339(),
            expires_at: purchase.expires_at.to_rfc3339(),
            total_requests: purchase.total_requests,
            used_requests: purchase.used_requests,
            status: format!("{:?}", purchase.status).to_lowercase(),
        }
    }
}

/// List purchases response.
#[derive(Debug, Serialize)]
pub struct ListPurchasesResponse {
    /// Plan purchases, oldest first.
    pub purchases: Vec<PurchaseRecordResponse>,
}

/// List the caller's plan purchases.
pub async fn list_purchases(
    State(state): State<Arc<AppState>>,
    auth: TelegramUser,
) -> Result<Json<ListPurchasesResponse>, ApiError> {
    let purchases = state.store.list_plan_purchases(&auth.account_id)?;

    Ok(Json(ListPurchasesResponse {
        purchases: purchases.iter().map(PurchaseRecordResponse::from).collect(),
    }))
}
