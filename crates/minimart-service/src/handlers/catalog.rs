//! Public catalog read handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use minimart_core::{ApiPlan, Bot, Product, ProductPrice};
use minimart_store::Store;

use crate::error::ApiError;
use crate::state::AppState;

/// Product listing entry.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    /// Product id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Price currency ("balance" or "coins").
    pub price_currency: String,
    /// Price amount.
    pub price_amount: i64,
}

impl From<&Product> for ProductResponse {
    fn from(product: &Product) -> Self {
        let (price_currency, price_amount) = match product.price {
            ProductPrice::Balance(n) => ("balance", n),
            ProductPrice::Coins(n) => ("coins", n),
        };
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            description: product.description.clone(),
            price_currency: price_currency.to_string(),
            price_amount,
        }
    }
}

/// List active products.
pub async fn list_products(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state.store.list_products()?;
    Ok(Json(
        products
            .iter()
            .filter(|p| p.is_active)
            .map(ProductResponse::from)
            .collect(),
    ))
}

/// Bot listing entry.
#[derive(Debug, Serialize)]
pub struct BotResponse {
    /// Bot id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Price in balance.
    pub price: i64,
}

impl From<&Bot> for BotResponse {
    fn from(bot: &Bot) -> Self {
        Self {
            id: bot.id.to_string(),
            name: bot.name.clone(),
            description: bot.description.clone(),
            price: bot.price,
        }
    }
}

/// List active bots.
pub async fn list_bots(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BotResponse>>, ApiError> {
    let bots = state.store.list_bots()?;
    Ok(Json(
        bots.iter()
            .filter(|b| b.is_active)
            .map(BotResponse::from)
            .collect(),
    ))
}

/// API plan listing entry.
#[derive(Debug, Serialize)]
pub struct PlanResponse {
    /// Plan id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Price in balance.
    pub price: i64,
    /// Validity in days.
    pub validity_days: u32,
    /// Request quota granted.
    pub request_quota: u64,
}

impl From<&ApiPlan> for PlanResponse {
    fn from(plan: &ApiPlan) -> Self {
        Self {
            id: plan.id.to_string(),
            name: plan.name.clone(),
            price: plan.price,
            validity_days: plan.validity_days,
            request_quota: plan.request_quota,
        }
    }
}

/// List active API plans.
pub async fn list_plans(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PlanResponse>>, ApiError> {
    let plans = state.store.list_plans()?;
    Ok(Json(
        plans
            .iter()
            .filter(|p| p.is_active)
            .map(PlanResponse::from)
            .collect(),
    ))
}
