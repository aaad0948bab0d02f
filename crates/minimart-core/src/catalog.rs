//! Catalog entities and purchase records.
//!
//! Products, bots, and API plans are admin-managed and read-mostly; the
//! economy engine references them for prices and quotas. Plan purchases carry
//! the metered request quota and are never deleted.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EconomyError, Result};
use crate::ids::{AccountId, BotId, NotificationId, PlanId, ProductId, PurchaseId};

/// Price of a digital product, in one of the two currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "currency", content = "amount", rename_all = "snake_case")]
pub enum ProductPrice {
    /// Priced in wallet balance.
    Balance(i64),

    /// Priced in coins.
    Coins(i64),
}

/// A digital product (game, code, template).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Product id.
    pub id: ProductId,

    /// Display name.
    pub name: String,

    /// Description shown in the storefront.
    pub description: String,

    /// Price.
    pub price: ProductPrice,

    /// Object-storage reference to the unlockable file.
    pub file_ref: String,

    /// Whether the product is listed.
    pub is_active: bool,

    /// When the product was created.
    pub created_at: DateTime<Utc>,
}

/// A purchasable bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bot {
    /// Bot id.
    pub id: BotId,

    /// Display name.
    pub name: String,

    /// Description shown in the storefront.
    pub description: String,

    /// Price in wallet balance.
    pub price: i64,

    /// Delivery webhook URL, if the seller has automated fulfilment.
    pub webhook_url: Option<String>,

    /// Whether the bot is listed.
    pub is_active: bool,

    /// When the bot was created.
    pub created_at: DateTime<Utc>,
}

/// A metered API plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiPlan {
    /// Plan id.
    pub id: PlanId,

    /// Display name.
    pub name: String,

    /// Price in wallet balance.
    pub price: i64,

    /// Days the plan stays valid after purchase.
    pub validity_days: u32,

    /// Total metered requests granted.
    pub request_quota: u64,

    /// Whether the plan is offered.
    pub is_active: bool,

    /// When the plan was created.
    pub created_at: DateTime<Utc>,
}

/// Lifecycle status of a plan purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    /// Quota remains and the expiry has not passed.
    Active,

    /// The validity window has passed.
    Expired,

    /// All granted requests were consumed.
    Exhausted,
}

/// One plan purchase. Created on purchase, mutated by metering, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanPurchase {
    /// Purchase id (ULID, time-ordered).
    pub id: PurchaseId,

    /// The buying account.
    pub account_id: AccountId,

    /// The purchased plan.
    pub plan_id: PlanId,

    /// Plan name at purchase time.
    pub plan_name: String,

    /// When the plan was bought.
    pub purchased_at: DateTime<Utc>,

    /// When the plan expires.
    pub expires_at: DateTime<Utc>,

    /// Total request quota granted.
    pub total_requests: u64,

    /// Requests consumed so far.
    pub used_requests: u64,

    /// Current status.
    pub status: PurchaseStatus,
}

impl PlanPurchase {
    /// Create a purchase record for `plan` bought now.
    #[must_use]
    pub fn new(account_id: AccountId, plan: &ApiPlan, now: DateTime<Utc>) -> Self {
        Self {
            id: PurchaseId::generate(),
            account_id,
            plan_id: plan.id,
            plan_name: plan.name.clone(),
            purchased_at: now,
            expires_at: now + Duration::days(i64::from(plan.validity_days)),
            total_requests: plan.request_quota,
            used_requests: 0,
            status: PurchaseStatus::Active,
        }
    }

    /// Requests still available on this purchase.
    #[must_use]
    pub fn remaining_requests(&self) -> u64 {
        self.total_requests.saturating_sub(self.used_requests)
    }

    /// Whether this purchase can serve a metered request at `now`.
    #[must_use]
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.status == PurchaseStatus::Active
            && self.remaining_requests() > 0
            && self.expires_at > now
    }

    /// Consume one metered request, flipping to `Exhausted` at quota.
    ///
    /// # Errors
    ///
    /// Returns `NoActivePlan` if the purchase is not usable at `now`.
    pub fn consume_one(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.expires_at <= now && self.status == PurchaseStatus::Active {
            self.status = PurchaseStatus::Expired;
        }
        if !self.is_usable(now) {
            return Err(EconomyError::NoActivePlan);
        }
        self.used_requests += 1;
        if self.used_requests >= self.total_requests {
            self.status = PurchaseStatus::Exhausted;
        }
        Ok(())
    }
}

/// Delivery status of a bot purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotDeliveryStatus {
    /// Paid, delivery not yet attempted or in flight.
    Pending,

    /// The delivery webhook accepted the payload.
    Delivered,

    /// Delivery failed or no webhook is configured; manual fulfilment needed.
    Failed,
}

/// One bot purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotPurchase {
    /// Purchase id (ULID, time-ordered).
    pub id: PurchaseId,

    /// The buying account.
    pub account_id: AccountId,

    /// The purchased bot.
    pub bot_id: BotId,

    /// Amount debited.
    pub amount: i64,

    /// Delivery status.
    pub status: BotDeliveryStatus,

    /// When the bot was bought.
    pub created_at: DateTime<Utc>,
}

impl BotPurchase {
    /// Create a pending purchase record.
    #[must_use]
    pub fn new(account_id: AccountId, bot: &Bot) -> Self {
        Self {
            id: PurchaseId::generate(),
            account_id,
            bot_id: bot.id,
            amount: bot.price,
            status: BotDeliveryStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

/// Kind of admin notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A bot purchase webhook delivery failed.
    DeliveryFailed,

    /// A bot purchase has no webhook and needs manual fulfilment.
    ManualFulfilment,
}

/// A back-office notification requiring admin attention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminNotification {
    /// Notification id (ULID, time-ordered).
    pub id: NotificationId,

    /// What happened.
    pub kind: NotificationKind,

    /// Free-form message for the admin.
    pub message: String,

    /// The related purchase, if any.
    pub purchase_id: Option<PurchaseId>,

    /// Whether an admin has acknowledged it.
    pub acknowledged: bool,

    /// When the notification was filed.
    pub created_at: DateTime<Utc>,
}

impl AdminNotification {
    /// File a new unacknowledged notification.
    #[must_use]
    pub fn new(kind: NotificationKind, message: String, purchase_id: Option<PurchaseId>) -> Self {
        Self {
            id: NotificationId::generate(),
            kind,
            message,
            purchase_id,
            acknowledged: false,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> AccountId {
        AccountId::from_telegram(500).unwrap()
    }

    fn plan(quota: u64, validity_days: u32) -> ApiPlan {
        ApiPlan {
            id: PlanId::generate(),
            name: "Starter".into(),
            price: 300,
            validity_days,
            request_quota: quota,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn plan_purchase_expiry_is_purchase_plus_validity() {
        let now = Utc::now();
        let purchase = PlanPurchase::new(account(), &plan(100, 30), now);
        assert_eq!(purchase.expires_at, now + Duration::days(30));
        assert_eq!(purchase.status, PurchaseStatus::Active);
        assert_eq!(purchase.remaining_requests(), 100);
    }

    #[test]
    fn consume_flips_exhausted_at_quota() {
        let now = Utc::now();
        let mut purchase = PlanPurchase::new(account(), &plan(2, 30), now);

        purchase.consume_one(now).unwrap();
        assert_eq!(purchase.status, PurchaseStatus::Active);

        purchase.consume_one(now).unwrap();
        assert_eq!(purchase.status, PurchaseStatus::Exhausted);

        let err = purchase.consume_one(now).unwrap_err();
        assert_eq!(err, EconomyError::NoActivePlan);
        assert_eq!(purchase.used_requests, 2);
    }

    #[test]
    fn consume_flips_expired_past_window() {
        let bought = Utc::now() - Duration::days(31);
        let mut purchase = PlanPurchase::new(account(), &plan(100, 30), bought);

        let err = purchase.consume_one(Utc::now()).unwrap_err();
        assert_eq!(err, EconomyError::NoActivePlan);
        assert_eq!(purchase.status, PurchaseStatus::Expired);
        assert_eq!(purchase.used_requests, 0);
    }

    #[test]
    fn bot_purchase_starts_pending() {
        let bot = Bot {
            id: BotId::generate(),
            name: "Notifier".into(),
            description: String::new(),
            price: 150,
            webhook_url: None,
            is_active: true,
            created_at: Utc::now(),
        };
        let purchase = BotPurchase::new(account(), &bot);
        assert_eq!(purchase.status, BotDeliveryStatus::Pending);
        assert_eq!(purchase.amount, 150);
    }
}
