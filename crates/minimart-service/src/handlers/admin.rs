//! Back-office handlers (admin auth): catalog CRUD, redeem codes,
//! notifications, and credit grants.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use minimart_core::{
    AccountId, AdminNotification, ApiPlan, Bot, BotId, Currency, NotificationId, PlanId, Product,
    ProductId, ProductPrice, RedeemCode, RedeemReward,
};
use minimart_store::Store;

use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::state::AppState;

fn parse_price(currency: &str, amount: i64) -> Result<ProductPrice, ApiError> {
    if amount <= 0 {
        return Err(ApiError::BadRequest("Price must be positive".into()));
    }
    match currency {
        "balance" => Ok(ProductPrice::Balance(amount)),
        "coins" => Ok(ProductPrice::Coins(amount)),
        other => Err(ApiError::BadRequest(format!("Unknown currency: {other}"))),
    }
}

// ============================================================================
// Products
// ============================================================================

/// Create/update product request.
#[derive(Debug, Deserialize)]
pub struct UpsertProductRequest {
    /// Existing product id, or absent to create.
    pub id: Option<ProductId>,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Price currency ("balance" or "coins").
    pub price_currency: String,
    /// Price amount.
    pub price_amount: i64,
    /// Object-storage reference to the unlockable file.
    pub file_ref: String,
    /// Whether the product is listed.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Upsert response carrying the entity id.
#[derive(Debug, Serialize)]
pub struct UpsertResponse {
    /// The created or updated entity id.
    pub id: String,
}

/// Create or update a product.
pub async fn upsert_product(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Json(body): Json<UpsertProductRequest>,
) -> Result<Json<UpsertResponse>, ApiError> {
    let price = parse_price(&body.price_currency, body.price_amount)?;

    let product = match body.id {
        Some(id) => {
            let existing = state
                .store
                .get_product(&id)?
                .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;
            Product {
                name: body.name,
                description: body.description,
                price,
                file_ref: body.file_ref,
                is_active: body.is_active,
                ..existing
            }
        }
        None => Product {
            id: ProductId::generate(),
            name: body.name,
            description: body.description,
            price,
            file_ref: body.file_ref,
            is_active: body.is_active,
            created_at: Utc::now(),
        },
    };

    state.store.put_product(&product)?;
    tracing::info!(product_id = %product.id, name = %product.name, "Product upserted");

    Ok(Json(UpsertResponse {
        id: product.id.to_string(),
    }))
}

/// Delete a product.
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Path(id): Path<ProductId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.delete_product(&id)?;
    tracing::info!(product_id = %id, "Product deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

// ============================================================================
// Bots
// ============================================================================

/// Create/update bot request.
#[derive(Debug, Deserialize)]
pub struct UpsertBotRequest {
    /// Existing bot id, or absent to create.
    pub id: Option<BotId>,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Price in balance.
    pub price: i64,
    /// Delivery webhook URL, if the seller automated fulfilment.
    pub webhook_url: Option<String>,
    /// Whether the bot is listed.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Create or update a bot.
pub async fn upsert_bot(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Json(body): Json<UpsertBotRequest>,
) -> Result<Json<UpsertResponse>, ApiError> {
    if body.price <= 0 {
        return Err(ApiError::BadRequest("Price must be positive".into()));
    }

    let bot = match body.id {
        Some(id) => {
            let existing = state
                .store
                .get_bot(&id)?
                .ok_or_else(|| ApiError::NotFound("Bot not found".into()))?;
            Bot {
                name: body.name,
                description: body.description,
                price: body.price,
                webhook_url: body.webhook_url,
                is_active: body.is_active,
                ..existing
            }
        }
        None => Bot {
            id: BotId::generate(),
            name: body.name,
            description: body.description,
            price: body.price,
            webhook_url: body.webhook_url,
            is_active: body.is_active,
            created_at: Utc::now(),
        },
    };

    state.store.put_bot(&bot)?;
    tracing::info!(bot_id = %bot.id, name = %bot.name, "Bot upserted");

    Ok(Json(UpsertResponse {
        id: bot.id.to_string(),
    }))
}

/// Delete a bot.
pub async fn delete_bot(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Path(id): Path<BotId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.delete_bot(&id)?;
    tracing::info!(bot_id = %id, "Bot deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

// ============================================================================
// API Plans
// ============================================================================

/// Create/update API plan request.
#[derive(Debug, Deserialize)]
pub struct UpsertPlanRequest {
    /// Existing plan id, or absent to create.
    pub id: Option<PlanId>,
    /// Display name.
    pub name: String,
    /// Price in balance.
    pub price: i64,
    /// Validity window in days.
    pub validity_days: u32,
    /// Request quota granted per purchase.
    pub request_quota: u64,
    /// Whether the plan is offered.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Create or update an API plan.
pub async fn upsert_plan(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Json(body): Json<UpsertPlanRequest>,
) -> Result<Json<UpsertResponse>, ApiError> {
    if body.price <= 0 {
        return Err(ApiError::BadRequest("Price must be positive".into()));
    }
    if body.request_quota == 0 {
        return Err(ApiError::BadRequest("Request quota must be positive".into()));
    }

    let plan = match body.id {
        Some(id) => {
            let existing = state
                .store
                .get_plan(&id)?
                .ok_or_else(|| ApiError::NotFound("Plan not found".into()))?;
            ApiPlan {
                name: body.name,
                price: body.price,
                validity_days: body.validity_days,
                request_quota: body.request_quota,
                is_active: body.is_active,
                ..existing
            }
        }
        None => ApiPlan {
            id: PlanId::generate(),
            name: body.name,
            price: body.price,
            validity_days: body.validity_days,
            request_quota: body.request_quota,
            is_active: body.is_active,
            created_at: Utc::now(),
        },
    };

    state.store.put_plan(&plan)?;
    tracing::info!(plan_id = %plan.id, name = %plan.name, "Plan upserted");

    Ok(Json(UpsertResponse {
        id: plan.id.to_string(),
    }))
}

/// Delete an API plan.
pub async fn delete_plan(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Path(id): Path<PlanId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.delete_plan(&id)?;
    tracing::info!(plan_id = %id, "Plan deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

// ============================================================================
// Redeem Codes
// ============================================================================

/// Create redeem code request.
#[derive(Debug, Deserialize)]
pub struct CreateCodeRequest {
    /// The code string (normalized to uppercase).
    pub code: String,
    /// Reward type ("coins" or "balance").
    pub reward_type: String,
    /// Reward amount.
    pub amount: i64,
    /// Maximum total redemptions.
    pub max_uses: u32,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Redeem code summary for the back office.
#[derive(Debug, Serialize)]
pub struct CodeResponse {
    /// The normalized code.
    pub code: String,
    /// Reward type.
    pub reward_type: String,
    /// Reward amount.
    pub amount: i64,
    /// Maximum redemptions.
    pub max_uses: u32,
    /// Redemptions so far.
    pub current_uses: u32,
    /// Whether the code is active.
    pub is_active: bool,
}

impl From<&RedeemCode> for CodeResponse {
    fn from(code: &RedeemCode) -> Self {
        let (reward_type, amount) = match code.reward {
            RedeemReward::Coins(n) => ("coins", n),
            RedeemReward::Balance(n) => ("balance", n),
        };
        Self {
            code: code.code.clone(),
            reward_type: reward_type.to_string(),
            amount,
            max_uses: code.max_uses,
            current_uses: code.current_uses,
            is_active: code.is_active,
        }
    }
}

/// Create a redeem code.
pub async fn create_code(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Json(body): Json<CreateCodeRequest>,
) -> Result<Json<CodeResponse>, ApiError> {
    if body.amount <= 0 {
        return Err(ApiError::BadRequest("Reward amount must be positive".into()));
    }
    if body.max_uses == 0 {
        return Err(ApiError::BadRequest("Max uses must be positive".into()));
    }
    let reward = match body.reward_type.as_str() {
        "coins" => RedeemReward::Coins(body.amount),
        "balance" => RedeemReward::Balance(body.amount),
        other => return Err(ApiError::BadRequest(format!("Unknown reward type: {other}"))),
    };

    let code = RedeemCode::new(&body.code, reward, body.max_uses, body.expires_at);
    if state.store.get_redeem_code(&code.code)?.is_some() {
        return Err(ApiError::Conflict("Code already exists".into()));
    }
    state.store.put_redeem_code(&code)?;

    tracing::info!(code = %code.code, max_uses = %code.max_uses, "Redeem code created");

    Ok(Json(CodeResponse::from(&code)))
}

/// List all redeem codes.
pub async fn list_codes(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
) -> Result<Json<Vec<CodeResponse>>, ApiError> {
    let codes = state.store.list_redeem_codes()?;
    Ok(Json(codes.iter().map(CodeResponse::from).collect()))
}

/// Deactivate a redeem code (the manual off switch).
pub async fn deactivate_code(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Path(code): Path<String>,
) -> Result<Json<CodeResponse>, ApiError> {
    let mut code = state
        .store
        .get_redeem_code(&code)?
        .ok_or_else(|| ApiError::NotFound("Code not found".into()))?;
    code.is_active = false;
    state.store.put_redeem_code(&code)?;

    tracing::info!(code = %code.code, "Redeem code deactivated");

    Ok(Json(CodeResponse::from(&code)))
}

// ============================================================================
// Notifications
// ============================================================================

/// Notification list query.
#[derive(Debug, Deserialize)]
pub struct NotificationsQuery {
    /// Include acknowledged notifications (default: false).
    #[serde(default)]
    pub include_acknowledged: bool,
}

/// Notification entry.
#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    /// Notification id.
    pub id: String,
    /// Kind ("delivery_failed", "manual_fulfilment").
    pub kind: String,
    /// Message.
    pub message: String,
    /// Related purchase, if any.
    pub purchase_id: Option<String>,
    /// Whether acknowledged.
    pub acknowledged: bool,
    /// When it was filed.
    pub created_at: String,
}

impl From<&AdminNotification> for NotificationResponse {
    fn from(n: &AdminNotification) -> Self {
        Self {
            id: n.id.to_string(),
            kind: match n.kind {
                minimart_core::NotificationKind::DeliveryFailed => "delivery_failed".into(),
                minimart_core::NotificationKind::ManualFulfilment => "manual_fulfilment".into(),
            },
            message: n.message.clone(),
            purchase_id: n.purchase_id.map(|id| id.to_string()),
            acknowledged: n.acknowledged,
            created_at: n.created_at.to_rfc3339(),
        }
    }
}

/// List admin notifications, newest first.
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Query(query): Query<NotificationsQuery>,
) -> Result<Json<Vec<NotificationResponse>>, ApiError> {
    let notifications = state.store.list_notifications(query.include_acknowledged)?;
    Ok(Json(
        notifications.iter().map(NotificationResponse::from).collect(),
    ))
}

/// Acknowledge a notification.
pub async fn acknowledge_notification(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Path(id): Path<NotificationId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.store.acknowledge_notification(&id)?;
    Ok(Json(serde_json::json!({ "acknowledged": true })))
}

// ============================================================================
// Credits
// ============================================================================

/// Admin credit grant request.
#[derive(Debug, Deserialize)]
pub struct GrantRequest {
    /// Account to credit.
    pub account_id: String,
    /// Currency ("balance" or "coins").
    pub currency: String,
    /// Amount to credit. Must be positive.
    pub amount: i64,
    /// Reason recorded on the ledger entry.
    pub reason: String,
}

/// Credit an account from the back office (deposit or coin grant).
pub async fn grant_credits(
    State(state): State<Arc<AppState>>,
    _auth: AdminAuth,
    Json(body): Json<GrantRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let account_id: AccountId = body
        .account_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid account ID".into()))?;

    let currency = match body.currency.as_str() {
        "balance" => Currency::Balance,
        "coins" => Currency::Coins,
        other => return Err(ApiError::BadRequest(format!("Unknown currency: {other}"))),
    };

    let total = state
        .store
        .admin_grant(&account_id, currency, body.amount, body.reason.clone())?;

    tracing::info!(
        account_id = %account_id,
        currency = %body.currency,
        amount = %body.amount,
        reason = %body.reason,
        new_total = %total,
        "Credits granted"
    );

    Ok(Json(serde_json::json!({
        "currency": body.currency,
        "total": total
    })))
}
