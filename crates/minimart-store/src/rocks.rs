//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.
//! Compound operations follow the same shape throughout: load the current
//! records, validate through `minimart-core`, stage every write into one
//! `WriteBatch`, commit.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use minimart_core::{
    redeem, Account, AccountId, ActivePlan, AdminNotification, ApiKeyRecord, ApiPlan, Bot,
    BotDeliveryStatus, BotId, BotPurchase, Currency, EconomyConfig, EconomyError, NotificationId,
    PlanId, PlanPurchase, Product, ProductId, ProductPrice, PurchaseId, RedeemCode, RedeemReward,
    Transaction,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{
    AdWatchOutcome, BonusOutcome, BotPurchaseOutcome, ChannelRewardOutcome, ConversionOutcome,
    MeterOutcome, PlanPurchaseOutcome, ProductPurchaseOutcome, ProvisionOutcome, RedeemOutcome,
    Store,
};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Load an account, mapping a miss to `AccountNotFound`.
    fn load_account(&self, id: &AccountId) -> Result<Account> {
        self.get_account(id)?.ok_or_else(|| {
            EconomyError::AccountNotFound {
                account_id: id.to_string(),
            }
            .into()
        })
    }

    /// Stage an account record into a batch.
    fn stage_account(&self, batch: &mut WriteBatch, account: &Account) -> Result<()> {
        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        batch.put_cf(
            &cf_accounts,
            keys::account_key(&account.id),
            Self::serialize(account)?,
        );
        Ok(())
    }

    /// Stage a ledger transaction and its account index entry into a batch.
    fn stage_transaction(&self, batch: &mut WriteBatch, tx: &Transaction) -> Result<()> {
        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let cf_by_account = self.cf(cf::TRANSACTIONS_BY_ACCOUNT)?;

        batch.put_cf(&cf_tx, keys::transaction_key(&tx.id), Self::serialize(tx)?);
        batch.put_cf(
            &cf_by_account,
            keys::account_transaction_key(&tx.account_id, &tx.id),
            [], // Index entry (empty value)
        );
        Ok(())
    }

    /// Generic get from a column family.
    fn get_value<T: serde::de::DeserializeOwned>(
        &self,
        cf_name: &str,
        key: &[u8],
    ) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Generic put into a column family.
    fn put_value<T: serde::Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        self.db
            .put_cf(&cf, key, Self::serialize(value)?)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Generic delete from a column family; `NotFound` if absent.
    fn delete_value(&self, cf_name: &str, key: &[u8]) -> Result<()> {
        let cf = self.cf(cf_name)?;
        if self
            .db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_none()
        {
            return Err(StoreError::NotFound);
        }
        self.db
            .delete_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Scan all values of a column family.
    fn scan_values<T: serde::de::DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            values.push(Self::deserialize(&value)?);
        }
        Ok(values)
    }

    /// Collect index keys under an account prefix, oldest first.
    fn scan_index_keys(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let cf = self.cf(cf_name)?;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, rocksdb::Direction::Forward));

        let mut keys = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            keys.push(key.to_vec());
        }
        Ok(keys)
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    fn provision_account(
        &self,
        id: AccountId,
        referrer_code: Option<&str>,
        config: &EconomyConfig,
    ) -> Result<ProvisionOutcome> {
        if self.get_account(&id)?.is_some() {
            return Err(EconomyError::AccountAlreadyExists {
                account_id: id.to_string(),
            }
            .into());
        }

        let (mut account, raw_api_key) = Account::provision(id, config);
        let mut batch = WriteBatch::default();
        let mut referred_by = None;

        // Best-effort referral attribution: failures are logged and
        // swallowed, never surfaced to the new account.
        if let Some(code) = referrer_code {
            let code = code.trim().to_uppercase();
            match self.find_account_by_referral_code(&code) {
                Ok(Some(referrer_id)) if referrer_id != id => {
                    match self.load_account(&referrer_id) {
                        Ok(mut referrer) => {
                            referrer.referral.referral_count += 1;
                            referrer.touch();
                            self.stage_account(&mut batch, &referrer)?;
                            account.referral.referred_by = Some(referrer_id);
                            referred_by = Some(referrer_id);
                        }
                        Err(e) => {
                            tracing::warn!(
                                referrer_id = %referrer_id,
                                error = %e,
                                "Referrer record unreadable, skipping attribution"
                            );
                        }
                    }
                }
                Ok(Some(_)) => {
                    tracing::debug!(code = %code, "Self-referral ignored");
                }
                Ok(None) => {
                    tracing::debug!(code = %code, "Unknown referral code, skipping attribution");
                }
                Err(e) => {
                    tracing::warn!(code = %code, error = %e, "Referral lookup failed, skipping attribution");
                }
            }
        }

        self.stage_account(&mut batch, &account)?;
        let cf_codes = self.cf(cf::REFERRAL_CODES)?;
        batch.put_cf(
            &cf_codes,
            keys::referral_code_key(&account.referral.code),
            id.to_string().as_bytes(),
        );

        self.write(batch)?;

        Ok(ProvisionOutcome {
            account,
            raw_api_key,
            referred_by,
        })
    }

    fn get_account(&self, id: &AccountId) -> Result<Option<Account>> {
        self.get_value(cf::ACCOUNTS, &keys::account_key(id))
    }

    fn get_account_rolled(&self, id: &AccountId, today: NaiveDate) -> Result<Option<Account>> {
        let Some(mut account) = self.get_account(id)? else {
            return Ok(None);
        };
        if account.ad_rewards.roll_to(today) {
            account.touch();
            self.put_account(&account)?;
        }
        Ok(Some(account))
    }

    fn put_account(&self, account: &Account) -> Result<()> {
        self.put_value(cf::ACCOUNTS, &keys::account_key(&account.id), account)
    }

    fn find_account_by_referral_code(&self, code: &str) -> Result<Option<AccountId>> {
        let cf = self.cf(cf::REFERRAL_CODES)?;
        let Some(data) = self
            .db
            .get_cf(&cf, keys::referral_code_key(code))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };
        let id = std::str::from_utf8(&data)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| StoreError::Serialization("invalid referral index entry".into()))?;
        Ok(Some(id))
    }

    fn rotate_api_key(&self, id: &AccountId) -> Result<(String, Account)> {
        let mut account = self.load_account(id)?;
        let (raw_key, record) = ApiKeyRecord::generate();
        account.api_key = Some(record);
        account.touch();
        self.put_account(&account)?;
        Ok((raw_key, account))
    }

    // =========================================================================
    // Wallet Operations
    // =========================================================================

    fn convert_coins(
        &self,
        id: &AccountId,
        amount: i64,
        config: &EconomyConfig,
    ) -> Result<ConversionOutcome> {
        let mut account = self.load_account(id)?;
        let credited = config.conversion_credit(amount, account.coins)?;

        account.coins -= amount;
        account.balance += credited;
        account.touch();

        let tx = Transaction::deposit(
            *id,
            credited,
            account.balance,
            format!("Converted {amount} coins"),
        );

        let mut batch = WriteBatch::default();
        self.stage_account(&mut batch, &account)?;
        self.stage_transaction(&mut batch, &tx)?;
        self.write(batch)?;

        Ok(ConversionOutcome {
            credited,
            coins: account.coins,
            balance: account.balance,
        })
    }

    fn admin_grant(
        &self,
        id: &AccountId,
        currency: Currency,
        amount: i64,
        reason: String,
    ) -> Result<i64> {
        if amount <= 0 {
            return Err(EconomyError::InvalidAmount("grant must be positive".into()).into());
        }
        let mut account = self.load_account(id)?;

        let (tx, total) = match currency {
            Currency::Balance => {
                account.balance += amount;
                (
                    Transaction::deposit(*id, amount, account.balance, reason),
                    account.balance,
                )
            }
            Currency::Coins => {
                account.coins += amount;
                (
                    Transaction::coin_earning(*id, amount, account.coins, reason),
                    account.coins,
                )
            }
        };
        account.touch();

        let mut batch = WriteBatch::default();
        self.stage_account(&mut batch, &account)?;
        self.stage_transaction(&mut batch, &tx)?;
        self.write(batch)?;

        Ok(total)
    }

    fn list_transactions(
        &self,
        id: &AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>> {
        let prefix = keys::account_transactions_prefix(id);
        let mut index_keys = self.scan_index_keys(cf::TRANSACTIONS_BY_ACCOUNT, &prefix)?;

        // ULID keys sort oldest first; reverse for newest first.
        index_keys.reverse();

        let mut transactions = Vec::new();
        for key in index_keys.into_iter().skip(offset) {
            if transactions.len() >= limit {
                break;
            }
            let tx_id = keys::extract_transaction_id(&key);
            if let Some(tx) =
                self.get_value::<Transaction>(cf::TRANSACTIONS, &keys::transaction_key(&tx_id))?
            {
                transactions.push(tx);
            }
        }
        Ok(transactions)
    }

    // =========================================================================
    // Ad Rewards
    // =========================================================================

    fn record_ad_watch(
        &self,
        id: &AccountId,
        network_id: &str,
        today: NaiveDate,
        config: &EconomyConfig,
    ) -> Result<AdWatchOutcome> {
        let network = config
            .ad_network(network_id)
            .ok_or_else(|| EconomyError::UnknownAdNetwork(network_id.to_string()))?;

        let mut account = self.load_account(id)?;
        account
            .ad_rewards
            .record_watch(network, config.daily_ad_cap, today)?;
        account.coins += network.reward_coins;
        account.touch();

        let tx = Transaction::ad_reward(*id, network.reward_coins, account.coins, network_id);

        let mut batch = WriteBatch::default();
        self.stage_account(&mut batch, &account)?;
        self.stage_transaction(&mut batch, &tx)?;
        self.write(batch)?;

        Ok(AdWatchOutcome {
            coins_earned: network.reward_coins,
            coins: account.coins,
            watched_today: account.ad_rewards.total_today(),
            lifetime_watched: account.ad_rewards.lifetime_watched,
        })
    }

    fn claim_daily_bonus(
        &self,
        id: &AccountId,
        today: NaiveDate,
        config: &EconomyConfig,
    ) -> Result<BonusOutcome> {
        let mut account = self.load_account(id)?;
        account.ad_rewards.claim_bonus(config, today)?;
        account.coins += config.daily_bonus_coins;
        account.touch();

        let tx = Transaction::coin_earning(
            *id,
            config.daily_bonus_coins,
            account.coins,
            "Daily ad bonus".into(),
        );

        let mut batch = WriteBatch::default();
        self.stage_account(&mut batch, &account)?;
        self.stage_transaction(&mut batch, &tx)?;
        self.write(batch)?;

        Ok(BonusOutcome {
            coins_earned: config.daily_bonus_coins,
            coins: account.coins,
        })
    }

    // =========================================================================
    // Redeem Codes
    // =========================================================================

    fn put_redeem_code(&self, code: &RedeemCode) -> Result<()> {
        self.put_value(cf::REDEEM_CODES, &keys::redeem_code_key(&code.code), code)
    }

    fn get_redeem_code(&self, code: &str) -> Result<Option<RedeemCode>> {
        let normalized = redeem::normalize(code);
        self.get_value(cf::REDEEM_CODES, &keys::redeem_code_key(&normalized))
    }

    fn list_redeem_codes(&self) -> Result<Vec<RedeemCode>> {
        self.scan_values(cf::REDEEM_CODES)
    }

    fn redeem(&self, id: &AccountId, code: &str, now: DateTime<Utc>) -> Result<RedeemOutcome> {
        let mut redeem_code = self
            .get_redeem_code(code)?
            .ok_or(EconomyError::InvalidCode)?;
        let mut account = self.load_account(id)?;

        redeem_code.mark_redeemed(*id, now)?;

        let tx = match redeem_code.reward {
            RedeemReward::Coins(n) => {
                account.coins += n;
                Transaction::coin_earning(
                    *id,
                    n,
                    account.coins,
                    format!("Redeemed code {}", redeem_code.code),
                )
            }
            RedeemReward::Balance(n) => {
                account.balance += n;
                Transaction::deposit(
                    *id,
                    n,
                    account.balance,
                    format!("Redeemed code {}", redeem_code.code),
                )
            }
        };
        account.touch();

        let cf_codes = self.cf(cf::REDEEM_CODES)?;
        let mut batch = WriteBatch::default();
        self.stage_account(&mut batch, &account)?;
        self.stage_transaction(&mut batch, &tx)?;
        batch.put_cf(
            &cf_codes,
            keys::redeem_code_key(&redeem_code.code),
            Self::serialize(&redeem_code)?,
        );
        self.write(batch)?;

        Ok(RedeemOutcome {
            reward: redeem_code.reward,
            balance: account.balance,
            coins: account.coins,
        })
    }

    // =========================================================================
    // Purchases & Entitlements
    // =========================================================================

    fn purchase_product(
        &self,
        id: &AccountId,
        product_id: ProductId,
    ) -> Result<ProductPurchaseOutcome> {
        let product = self
            .get_product(&product_id)?
            .filter(|p| p.is_active)
            .ok_or_else(|| EconomyError::CatalogNotFound {
                entity: "product",
                id: product_id.to_string(),
            })?;

        let mut account = self.load_account(id)?;
        if account.owns(product_id) {
            return Err(EconomyError::AlreadyOwned {
                product_id: product_id.to_string(),
            }
            .into());
        }

        let tx = match product.price {
            ProductPrice::Balance(price) => {
                if !account.has_sufficient_balance(price) {
                    return Err(EconomyError::InsufficientBalance {
                        balance: account.balance,
                        required: price,
                    }
                    .into());
                }
                account.balance -= price;
                Transaction::purchase(
                    *id,
                    Currency::Balance,
                    price,
                    account.balance,
                    product.name.clone(),
                )
            }
            ProductPrice::Coins(price) => {
                if !account.has_sufficient_coins(price) {
                    return Err(EconomyError::InsufficientCoins {
                        coins: account.coins,
                        required: price,
                    }
                    .into());
                }
                account.coins -= price;
                Transaction::purchase(
                    *id,
                    Currency::Coins,
                    price,
                    account.coins,
                    product.name.clone(),
                )
            }
        };

        account.purchased_products.insert(product_id);
        account.touch();

        let mut batch = WriteBatch::default();
        self.stage_account(&mut batch, &account)?;
        self.stage_transaction(&mut batch, &tx)?;
        self.write(batch)?;

        Ok(ProductPurchaseOutcome {
            balance: account.balance,
            coins: account.coins,
        })
    }

    #[allow(clippy::cast_possible_wrap)]
    fn purchase_plan(
        &self,
        id: &AccountId,
        plan_id: PlanId,
        now: DateTime<Utc>,
        config: &EconomyConfig,
    ) -> Result<PlanPurchaseOutcome> {
        let plan = self
            .get_plan(&plan_id)?
            .filter(|p| p.is_active)
            .ok_or_else(|| EconomyError::CatalogNotFound {
                entity: "plan",
                id: plan_id.to_string(),
            })?;

        let mut account = self.load_account(id)?;
        if !account.has_sufficient_balance(plan.price) {
            return Err(EconomyError::InsufficientBalance {
                balance: account.balance,
                required: plan.price,
            }
            .into());
        }

        account.balance -= plan.price;
        let granted = plan.request_quota as i64;
        account.api_credits += granted;

        let purchase = PlanPurchase::new(*id, &plan, now);
        account.active_plan = Some(ActivePlan {
            plan_id,
            name: plan.name.clone(),
            purchased_at: now,
            expires_at: purchase.expires_at,
            granted_credits: granted,
        });

        let tx = Transaction::purchase(
            *id,
            Currency::Balance,
            plan.price,
            account.balance,
            format!("{} plan", plan.name),
        );

        let mut batch = WriteBatch::default();
        self.stage_transaction(&mut batch, &tx)?;

        // One-time referral bonus: first plan purchase by a referred account
        // credits the referrer; the flag pins it to once per edge.
        let mut referrer_credited = None;
        if let Some(referrer_id) = account.referral.referred_by {
            if !account.referral.purchase_reward_granted {
                match self.load_account(&referrer_id) {
                    Ok(mut referrer) => {
                        let bonus = config.referral_purchase_bonus_coins;
                        referrer.coins += bonus;
                        referrer.referral.earned_coins += bonus;
                        referrer.touch();

                        let ref_tx = Transaction::coin_earning(
                            referrer_id,
                            bonus,
                            referrer.coins,
                            format!("Referral bonus: plan purchase by {id}"),
                        );
                        self.stage_account(&mut batch, &referrer)?;
                        self.stage_transaction(&mut batch, &ref_tx)?;

                        account.referral.purchase_reward_granted = true;
                        referrer_credited = Some(referrer_id);
                    }
                    Err(e) => {
                        tracing::warn!(
                            referrer_id = %referrer_id,
                            error = %e,
                            "Referrer record unreadable, skipping purchase bonus"
                        );
                    }
                }
            }
        }

        account.touch();
        self.stage_account(&mut batch, &account)?;

        let cf_purchases = self.cf(cf::PLAN_PURCHASES)?;
        let cf_by_account = self.cf(cf::PLAN_PURCHASES_BY_ACCOUNT)?;
        batch.put_cf(
            &cf_purchases,
            keys::purchase_key(&purchase.id),
            Self::serialize(&purchase)?,
        );
        batch.put_cf(
            &cf_by_account,
            keys::account_purchase_key(id, &purchase.id),
            [],
        );
        self.write(batch)?;

        Ok(PlanPurchaseOutcome {
            purchase,
            balance: account.balance,
            api_credits: account.api_credits,
            referrer_credited,
        })
    }

    fn purchase_bot(&self, id: &AccountId, bot_id: BotId) -> Result<BotPurchaseOutcome> {
        let bot = self
            .get_bot(&bot_id)?
            .filter(|b| b.is_active)
            .ok_or_else(|| EconomyError::CatalogNotFound {
                entity: "bot",
                id: bot_id.to_string(),
            })?;

        let mut account = self.load_account(id)?;
        if !account.has_sufficient_balance(bot.price) {
            return Err(EconomyError::InsufficientBalance {
                balance: account.balance,
                required: bot.price,
            }
            .into());
        }

        account.balance -= bot.price;
        account.touch();

        let purchase = BotPurchase::new(*id, &bot);
        let tx = Transaction::purchase(
            *id,
            Currency::Balance,
            bot.price,
            account.balance,
            format!("{} bot", bot.name),
        );

        let cf_bot_purchases = self.cf(cf::BOT_PURCHASES)?;
        let mut batch = WriteBatch::default();
        self.stage_account(&mut batch, &account)?;
        self.stage_transaction(&mut batch, &tx)?;
        batch.put_cf(
            &cf_bot_purchases,
            keys::purchase_key(&purchase.id),
            Self::serialize(&purchase)?,
        );
        self.write(batch)?;

        Ok(BotPurchaseOutcome {
            purchase,
            balance: account.balance,
            webhook_url: bot.webhook_url,
        })
    }

    fn complete_bot_delivery(
        &self,
        purchase_id: &PurchaseId,
        status: BotDeliveryStatus,
    ) -> Result<()> {
        let mut purchase = self
            .get_bot_purchase(purchase_id)?
            .ok_or(StoreError::NotFound)?;
        purchase.status = status;
        self.put_value(
            cf::BOT_PURCHASES,
            &keys::purchase_key(purchase_id),
            &purchase,
        )
    }

    fn get_bot_purchase(&self, purchase_id: &PurchaseId) -> Result<Option<BotPurchase>> {
        self.get_value(cf::BOT_PURCHASES, &keys::purchase_key(purchase_id))
    }

    fn list_plan_purchases(&self, id: &AccountId) -> Result<Vec<PlanPurchase>> {
        let prefix = keys::account_purchases_prefix(id);
        let index_keys = self.scan_index_keys(cf::PLAN_PURCHASES_BY_ACCOUNT, &prefix)?;

        let mut purchases = Vec::with_capacity(index_keys.len());
        for key in index_keys {
            let purchase_id = keys::extract_purchase_id(&key);
            if let Some(purchase) =
                self.get_value::<PlanPurchase>(cf::PLAN_PURCHASES, &keys::purchase_key(&purchase_id))?
            {
                purchases.push(purchase);
            }
        }
        Ok(purchases)
    }

    fn claim_channel_reward(
        &self,
        referred: &AccountId,
        config: &EconomyConfig,
    ) -> Result<ChannelRewardOutcome> {
        let mut account = self.load_account(referred)?;
        let Some(referrer_id) = account.referral.referred_by else {
            return Err(EconomyError::BonusUnavailable.into());
        };
        if account.referral.channel_reward_claimed {
            return Err(EconomyError::BonusUnavailable.into());
        }

        let mut referrer = self.load_account(&referrer_id)?;
        let bonus = config.referral_channel_bonus_balance;
        referrer.balance += bonus;
        referrer.referral.earned_balance += bonus;
        referrer.touch();

        account.referral.channel_reward_claimed = true;
        account.touch();

        let tx = Transaction::deposit(
            referrer_id,
            bonus,
            referrer.balance,
            format!("Referral bonus: channel join by {referred}"),
        );

        let mut batch = WriteBatch::default();
        self.stage_account(&mut batch, &account)?;
        self.stage_account(&mut batch, &referrer)?;
        self.stage_transaction(&mut batch, &tx)?;
        self.write(batch)?;

        Ok(ChannelRewardOutcome {
            referrer: referrer_id,
            bonus,
        })
    }

    fn use_api_request(&self, id: &AccountId, now: DateTime<Utc>) -> Result<MeterOutcome> {
        let mut account = self.load_account(id)?;

        // Earliest-expiring usable purchase serves the request.
        let mut purchase = self
            .list_plan_purchases(id)?
            .into_iter()
            .filter(|p| p.is_usable(now))
            .min_by_key(|p| p.expires_at)
            .ok_or(EconomyError::NoActivePlan)?;

        purchase.consume_one(now)?;
        account.api_credits = (account.api_credits - 1).max(0);
        account.touch();

        let cf_purchases = self.cf(cf::PLAN_PURCHASES)?;
        let mut batch = WriteBatch::default();
        self.stage_account(&mut batch, &account)?;
        batch.put_cf(
            &cf_purchases,
            keys::purchase_key(&purchase.id),
            Self::serialize(&purchase)?,
        );
        self.write(batch)?;

        Ok(MeterOutcome {
            purchase_id: purchase.id,
            remaining_requests: purchase.remaining_requests(),
            api_credits: account.api_credits,
        })
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    fn put_product(&self, product: &Product) -> Result<()> {
        self.put_value(cf::PRODUCTS, product.id.as_ref(), product)
    }

    fn get_product(&self, id: &ProductId) -> Result<Option<Product>> {
        self.get_value(cf::PRODUCTS, id.as_ref())
    }

    fn list_products(&self) -> Result<Vec<Product>> {
        self.scan_values(cf::PRODUCTS)
    }

    fn delete_product(&self, id: &ProductId) -> Result<()> {
        self.delete_value(cf::PRODUCTS, id.as_ref())
    }

    fn put_bot(&self, bot: &Bot) -> Result<()> {
        self.put_value(cf::BOTS, bot.id.as_ref(), bot)
    }

    fn get_bot(&self, id: &BotId) -> Result<Option<Bot>> {
        self.get_value(cf::BOTS, id.as_ref())
    }

    fn list_bots(&self) -> Result<Vec<Bot>> {
        self.scan_values(cf::BOTS)
    }

    fn delete_bot(&self, id: &BotId) -> Result<()> {
        self.delete_value(cf::BOTS, id.as_ref())
    }

    fn put_plan(&self, plan: &ApiPlan) -> Result<()> {
        self.put_value(cf::API_PLANS, plan.id.as_ref(), plan)
    }

    fn get_plan(&self, id: &PlanId) -> Result<Option<ApiPlan>> {
        self.get_value(cf::API_PLANS, id.as_ref())
    }

    fn list_plans(&self) -> Result<Vec<ApiPlan>> {
        self.scan_values(cf::API_PLANS)
    }

    fn delete_plan(&self, id: &PlanId) -> Result<()> {
        self.delete_value(cf::API_PLANS, id.as_ref())
    }

    // =========================================================================
    // Admin Notifications
    // =========================================================================

    fn file_notification(&self, notification: &AdminNotification) -> Result<()> {
        self.put_value(
            cf::NOTIFICATIONS,
            &keys::notification_key(&notification.id),
            notification,
        )
    }

    fn list_notifications(&self, include_acknowledged: bool) -> Result<Vec<AdminNotification>> {
        let mut notifications: Vec<AdminNotification> = self.scan_values(cf::NOTIFICATIONS)?;
        if !include_acknowledged {
            notifications.retain(|n| !n.acknowledged);
        }
        notifications.reverse(); // ULID keys scan oldest first
        Ok(notifications)
    }

    fn acknowledge_notification(&self, id: &NotificationId) -> Result<()> {
        let mut notification = self
            .get_value::<AdminNotification>(cf::NOTIFICATIONS, &keys::notification_key(id))?
            .ok_or(StoreError::NotFound)?;
        notification.acknowledged = true;
        self.put_value(cf::NOTIFICATIONS, &keys::notification_key(id), &notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use minimart_core::{NotificationKind, PurchaseStatus};
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn account_id(n: i64) -> AccountId {
        AccountId::from_telegram(n).unwrap()
    }

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, n).unwrap()
    }

    fn sample_product(price: ProductPrice) -> Product {
        Product {
            id: ProductId::generate(),
            name: "Snake Game".into(),
            description: "Classic snake".into(),
            price,
            file_ref: "products/snake.zip".into(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn sample_plan(price: i64, quota: u64) -> ApiPlan {
        ApiPlan {
            id: PlanId::generate(),
            name: "Starter".into(),
            price,
            validity_days: 30,
            request_quota: quota,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn sample_bot(price: i64, webhook_url: Option<&str>) -> Bot {
        Bot {
            id: BotId::generate(),
            name: "Notifier".into(),
            description: "Notifies things".into(),
            price,
            webhook_url: webhook_url.map(String::from),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn provision_seeds_and_indexes_referral_code() {
        let (store, _dir) = create_test_store();
        let config = EconomyConfig::default();
        let id = account_id(1001);

        let outcome = store.provision_account(id, None, &config).unwrap();
        assert_eq!(outcome.account.balance, 500);
        assert_eq!(outcome.account.coins, 100);
        assert!(outcome.referred_by.is_none());
        assert!(outcome.raw_api_key.starts_with("mk_"));

        let found = store
            .find_account_by_referral_code(&outcome.account.referral.code)
            .unwrap();
        assert_eq!(found, Some(id));

        // Second provisioning attempt conflicts.
        let err = store.provision_account(id, None, &config).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Economy(EconomyError::AccountAlreadyExists { .. })
        ));
    }

    #[test]
    fn provision_attributes_referral() {
        let (store, _dir) = create_test_store();
        let config = EconomyConfig::default();

        let referrer_id = account_id(1001);
        let referrer = store.provision_account(referrer_id, None, &config).unwrap();

        let referred_id = account_id(2002);
        let outcome = store
            .provision_account(referred_id, Some(&referrer.account.referral.code), &config)
            .unwrap();

        assert_eq!(outcome.referred_by, Some(referrer_id));
        assert_eq!(
            outcome.account.referral.referred_by,
            Some(referrer_id)
        );
        let referrer = store.get_account(&referrer_id).unwrap().unwrap();
        assert_eq!(referrer.referral.referral_count, 1);
    }

    #[test]
    fn provision_swallows_unknown_referral_code() {
        let (store, _dir) = create_test_store();
        let config = EconomyConfig::default();

        let outcome = store
            .provision_account(account_id(3003), Some("NOSUCHCODE"), &config)
            .unwrap();
        assert!(outcome.referred_by.is_none());
    }

    #[test]
    fn rolled_read_resets_and_persists() {
        let (store, _dir) = create_test_store();
        let config = EconomyConfig::default();
        let id = account_id(1001);
        store.provision_account(id, None, &config).unwrap();

        store
            .record_ad_watch(&id, "adsgram", day(1), &config)
            .unwrap();

        // Days later the counters read as zero, and the roll is persisted.
        let rolled = store.get_account_rolled(&id, day(5)).unwrap().unwrap();
        assert_eq!(rolled.ad_rewards.total_today(), 0);
        assert!(!rolled.ad_rewards.bonus_claimed);

        let raw = store.get_account(&id).unwrap().unwrap();
        assert_eq!(raw.ad_rewards.last_watch_date, Some(day(5)));
        assert_eq!(raw.ad_rewards.lifetime_watched, 1);
    }

    #[test]
    fn ad_watch_credits_coins_and_enforces_cap() {
        let (store, _dir) = create_test_store();
        let config = EconomyConfig {
            daily_ad_cap: 2,
            ..EconomyConfig::default()
        };
        let id = account_id(1001);
        store.provision_account(id, None, &config).unwrap();

        let outcome = store
            .record_ad_watch(&id, "adsgram", day(1), &config)
            .unwrap();
        assert_eq!(outcome.coins, 105);
        assert_eq!(outcome.watched_today, 1);

        store
            .record_ad_watch(&id, "monetag", day(1), &config)
            .unwrap();

        let err = store
            .record_ad_watch(&id, "adsgram", day(1), &config)
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Economy(EconomyError::AdCapReached { .. })
        ));

        // Counters unchanged by the failed watch.
        let account = store.get_account(&id).unwrap().unwrap();
        assert_eq!(account.coins, 110);
        assert_eq!(account.ad_rewards.total_today(), 2);
    }

    #[test]
    fn unknown_network_is_rejected() {
        let (store, _dir) = create_test_store();
        let config = EconomyConfig::default();
        let id = account_id(1001);
        store.provision_account(id, None, &config).unwrap();

        let err = store
            .record_ad_watch(&id, "mystery", day(1), &config)
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Economy(EconomyError::UnknownAdNetwork(_))
        ));
    }

    #[test]
    fn daily_bonus_after_cap_once() {
        let (store, _dir) = create_test_store();
        let config = EconomyConfig {
            daily_ad_cap: 2,
            daily_bonus_coins: 20,
            ..EconomyConfig::default()
        };
        let id = account_id(1001);
        store.provision_account(id, None, &config).unwrap();

        let err = store.claim_daily_bonus(&id, day(1), &config).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Economy(EconomyError::BonusUnavailable)
        ));

        store
            .record_ad_watch(&id, "adsgram", day(1), &config)
            .unwrap();
        store
            .record_ad_watch(&id, "adsgram", day(1), &config)
            .unwrap();

        let outcome = store.claim_daily_bonus(&id, day(1), &config).unwrap();
        assert_eq!(outcome.coins, 100 + 10 + 20);

        let err = store.claim_daily_bonus(&id, day(1), &config).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Economy(EconomyError::BonusUnavailable)
        ));
    }

    #[test]
    fn conversion_conserves_value() {
        let (store, _dir) = create_test_store();
        let config = EconomyConfig::default();
        let id = account_id(1001);
        store.provision_account(id, None, &config).unwrap();
        store
            .record_ad_watch(&id, "adsgram", day(1), &config)
            .unwrap();

        // Worked scenario: 105 coins, convert 100 at rate 10.
        let outcome = store.convert_coins(&id, 100, &config).unwrap();
        assert_eq!(outcome.coins, 5);
        assert_eq!(outcome.balance, 510);
        assert_eq!(outcome.credited, 10);

        let account = store.get_account(&id).unwrap().unwrap();
        assert_eq!(account.coins, 5);
        assert_eq!(account.balance, 510);
    }

    #[test]
    fn conversion_rejects_without_mutation() {
        let (store, _dir) = create_test_store();
        let config = EconomyConfig::default();
        let id = account_id(1001);
        store.provision_account(id, None, &config).unwrap();

        let err = store.convert_coins(&id, 150, &config).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Economy(EconomyError::InsufficientCoins { .. })
        ));

        let account = store.get_account(&id).unwrap().unwrap();
        assert_eq!(account.coins, 100);
        assert_eq!(account.balance, 500);
        assert!(store.list_transactions(&id, 10, 0).unwrap().is_empty());
    }

    #[test]
    fn redeem_is_single_use_per_account() {
        let (store, _dir) = create_test_store();
        let config = EconomyConfig::default();
        let id = account_id(1001);
        store.provision_account(id, None, &config).unwrap();

        let code = RedeemCode::new("WELCOME50", RedeemReward::Coins(50), 10, None);
        store.put_redeem_code(&code).unwrap();

        let outcome = store.redeem(&id, "welcome50", Utc::now()).unwrap();
        assert_eq!(outcome.coins, 150);

        let err = store.redeem(&id, "WELCOME50", Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Economy(EconomyError::CodeAlreadyUsed)
        ));

        let stored = store.get_redeem_code("WELCOME50").unwrap().unwrap();
        assert_eq!(stored.current_uses, 1);
    }

    #[test]
    fn redeem_respects_max_uses() {
        let (store, _dir) = create_test_store();
        let config = EconomyConfig::default();
        let first = account_id(1001);
        let second = account_id(2002);
        store.provision_account(first, None, &config).unwrap();
        store.provision_account(second, None, &config).unwrap();

        let code = RedeemCode::new("ONCE", RedeemReward::Balance(25), 1, None);
        store.put_redeem_code(&code).unwrap();

        store.redeem(&first, "ONCE", Utc::now()).unwrap();
        let err = store.redeem(&second, "ONCE", Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Economy(EconomyError::CodeLimitReached)
        ));

        let stored = store.get_redeem_code("ONCE").unwrap().unwrap();
        assert_eq!(stored.current_uses, 1);
    }

    #[test]
    fn product_purchase_grants_entitlement_once() {
        let (store, _dir) = create_test_store();
        let config = EconomyConfig::default();
        let id = account_id(1001);
        store.provision_account(id, None, &config).unwrap();

        let product = sample_product(ProductPrice::Balance(200));
        store.put_product(&product).unwrap();

        let outcome = store.purchase_product(&id, product.id).unwrap();
        assert_eq!(outcome.balance, 300);

        let account = store.get_account(&id).unwrap().unwrap();
        assert!(account.owns(product.id));

        let err = store.purchase_product(&id, product.id).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Economy(EconomyError::AlreadyOwned { .. })
        ));
    }

    #[test]
    fn purchase_gate_leaves_state_untouched() {
        let (store, _dir) = create_test_store();
        let config = EconomyConfig::default();
        let id = account_id(1001);
        store.provision_account(id, None, &config).unwrap();

        let product = sample_product(ProductPrice::Balance(9_999));
        store.put_product(&product).unwrap();

        let err = store.purchase_product(&id, product.id).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Economy(EconomyError::InsufficientBalance {
                balance: 500,
                required: 9_999
            })
        ));

        let account = store.get_account(&id).unwrap().unwrap();
        assert_eq!(account.balance, 500);
        assert!(!account.owns(product.id));
        assert!(store.list_transactions(&id, 10, 0).unwrap().is_empty());
    }

    #[test]
    fn coin_priced_product_debits_coins() {
        let (store, _dir) = create_test_store();
        let config = EconomyConfig::default();
        let id = account_id(1001);
        store.provision_account(id, None, &config).unwrap();

        let product = sample_product(ProductPrice::Coins(80));
        store.put_product(&product).unwrap();

        let outcome = store.purchase_product(&id, product.id).unwrap();
        assert_eq!(outcome.coins, 20);
        assert_eq!(outcome.balance, 500);
    }

    #[test]
    fn plan_purchase_grants_credits_and_referral_bonus_once() {
        let (store, _dir) = create_test_store();
        let config = EconomyConfig::default();

        let referrer_id = account_id(1001);
        let referrer = store.provision_account(referrer_id, None, &config).unwrap();
        let referred_id = account_id(2002);
        store
            .provision_account(referred_id, Some(&referrer.account.referral.code), &config)
            .unwrap();

        let plan = sample_plan(100, 500);
        store.put_plan(&plan).unwrap();

        let outcome = store
            .purchase_plan(&referred_id, plan.id, Utc::now(), &config)
            .unwrap();
        assert_eq!(outcome.balance, 400);
        assert_eq!(outcome.api_credits, 500);
        assert_eq!(outcome.referrer_credited, Some(referrer_id));

        let referrer_account = store.get_account(&referrer_id).unwrap().unwrap();
        assert_eq!(referrer_account.coins, 150);
        assert_eq!(referrer_account.referral.earned_coins, 50);

        // Second purchase: no further bonus on the same edge.
        let outcome = store
            .purchase_plan(&referred_id, plan.id, Utc::now(), &config)
            .unwrap();
        assert_eq!(outcome.referrer_credited, None);
        let referrer_account = store.get_account(&referrer_id).unwrap().unwrap();
        assert_eq!(referrer_account.coins, 150);
    }

    #[test]
    fn channel_reward_claims_once() {
        let (store, _dir) = create_test_store();
        let config = EconomyConfig::default();

        let referrer_id = account_id(1001);
        let referrer = store.provision_account(referrer_id, None, &config).unwrap();
        let referred_id = account_id(2002);
        store
            .provision_account(referred_id, Some(&referrer.account.referral.code), &config)
            .unwrap();

        let outcome = store.claim_channel_reward(&referred_id, &config).unwrap();
        assert_eq!(outcome.referrer, referrer_id);
        assert_eq!(outcome.bonus, 25);

        let referrer_account = store.get_account(&referrer_id).unwrap().unwrap();
        assert_eq!(referrer_account.balance, 525);
        assert_eq!(referrer_account.referral.earned_balance, 25);

        let err = store
            .claim_channel_reward(&referred_id, &config)
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Economy(EconomyError::BonusUnavailable)
        ));
    }

    #[test]
    fn channel_reward_requires_referrer() {
        let (store, _dir) = create_test_store();
        let config = EconomyConfig::default();
        let id = account_id(1001);
        store.provision_account(id, None, &config).unwrap();

        let err = store.claim_channel_reward(&id, &config).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Economy(EconomyError::BonusUnavailable)
        ));
    }

    #[test]
    fn bot_purchase_creates_pending_record() {
        let (store, _dir) = create_test_store();
        let config = EconomyConfig::default();
        let id = account_id(1001);
        store.provision_account(id, None, &config).unwrap();

        let bot = sample_bot(150, Some("https://bots.example/deliver"));
        store.put_bot(&bot).unwrap();

        let outcome = store.purchase_bot(&id, bot.id).unwrap();
        assert_eq!(outcome.balance, 350);
        assert_eq!(outcome.purchase.status, BotDeliveryStatus::Pending);
        assert_eq!(
            outcome.webhook_url.as_deref(),
            Some("https://bots.example/deliver")
        );

        store
            .complete_bot_delivery(&outcome.purchase.id, BotDeliveryStatus::Delivered)
            .unwrap();
        let stored = store.get_bot_purchase(&outcome.purchase.id).unwrap().unwrap();
        assert_eq!(stored.status, BotDeliveryStatus::Delivered);
    }

    #[test]
    fn metering_picks_earliest_expiring_purchase() {
        let (store, _dir) = create_test_store();
        let config = EconomyConfig::default();
        let id = account_id(1001);
        store.provision_account(id, None, &config).unwrap();
        store
            .admin_grant(&id, Currency::Balance, 1_000, "top-up".into())
            .unwrap();

        let long_plan = ApiPlan {
            validity_days: 60,
            ..sample_plan(100, 10)
        };
        let short_plan = ApiPlan {
            id: PlanId::generate(),
            validity_days: 10,
            ..sample_plan(100, 10)
        };
        store.put_plan(&long_plan).unwrap();
        store.put_plan(&short_plan).unwrap();

        // Buy the long plan first so store order differs from expiry order.
        store
            .purchase_plan(&id, long_plan.id, Utc::now(), &config)
            .unwrap();
        let short = store
            .purchase_plan(&id, short_plan.id, Utc::now(), &config)
            .unwrap();

        let outcome = store.use_api_request(&id, Utc::now()).unwrap();
        assert_eq!(outcome.purchase_id, short.purchase.id);
        assert_eq!(outcome.remaining_requests, 9);
        assert_eq!(outcome.api_credits, 19);
    }

    #[test]
    fn metering_exhausts_quota() {
        let (store, _dir) = create_test_store();
        let config = EconomyConfig::default();
        let id = account_id(1001);
        store.provision_account(id, None, &config).unwrap();

        let plan = sample_plan(100, 2);
        store.put_plan(&plan).unwrap();
        store
            .purchase_plan(&id, plan.id, Utc::now(), &config)
            .unwrap();

        store.use_api_request(&id, Utc::now()).unwrap();
        let outcome = store.use_api_request(&id, Utc::now()).unwrap();
        assert_eq!(outcome.remaining_requests, 0);

        let err = store.use_api_request(&id, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Economy(EconomyError::NoActivePlan)
        ));

        let purchases = store.list_plan_purchases(&id).unwrap();
        assert_eq!(purchases[0].status, PurchaseStatus::Exhausted);
    }

    #[test]
    fn expired_purchase_is_skipped() {
        let (store, _dir) = create_test_store();
        let config = EconomyConfig::default();
        let id = account_id(1001);
        store.provision_account(id, None, &config).unwrap();

        let plan = sample_plan(100, 10);
        store.put_plan(&plan).unwrap();
        let bought = Utc::now() - Duration::days(40);
        store.purchase_plan(&id, plan.id, bought, &config).unwrap();

        let err = store.use_api_request(&id, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Economy(EconomyError::NoActivePlan)
        ));
    }

    #[test]
    fn transactions_list_newest_first_with_pagination() {
        let (store, _dir) = create_test_store();
        let config = EconomyConfig::default();
        let id = account_id(1001);
        store.provision_account(id, None, &config).unwrap();

        store
            .admin_grant(&id, Currency::Balance, 100, "First".into())
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2)); // Ensure different ULIDs
        store
            .admin_grant(&id, Currency::Coins, 10, "Second".into())
            .unwrap();

        let transactions = store.list_transactions(&id, 10, 0).unwrap();
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].description, "Second");
        assert_eq!(transactions[1].description, "First");

        let page2 = store.list_transactions(&id, 1, 1).unwrap();
        assert_eq!(page2.len(), 1);
        assert_eq!(page2[0].description, "First");
    }

    #[test]
    fn rotate_api_key_replaces_digest() {
        let (store, _dir) = create_test_store();
        let config = EconomyConfig::default();
        let id = account_id(1001);
        let first = store.provision_account(id, None, &config).unwrap();

        let (new_key, account) = store.rotate_api_key(&id).unwrap();
        assert_ne!(new_key, first.raw_api_key);

        let record = account.api_key.unwrap();
        assert!(record.verify(&new_key));
        assert!(!record.verify(&first.raw_api_key));
    }

    #[test]
    fn notifications_ack_flow() {
        let (store, _dir) = create_test_store();
        let notification = AdminNotification::new(
            NotificationKind::ManualFulfilment,
            "Deliver bot manually".into(),
            None,
        );
        store.file_notification(&notification).unwrap();

        let open = store.list_notifications(false).unwrap();
        assert_eq!(open.len(), 1);

        store.acknowledge_notification(&notification.id).unwrap();
        assert!(store.list_notifications(false).unwrap().is_empty());
        assert_eq!(store.list_notifications(true).unwrap().len(), 1);
    }

    #[test]
    fn catalog_crud() {
        let (store, _dir) = create_test_store();

        let product = sample_product(ProductPrice::Balance(100));
        store.put_product(&product).unwrap();
        assert_eq!(store.list_products().unwrap().len(), 1);
        store.delete_product(&product.id).unwrap();
        assert!(store.get_product(&product.id).unwrap().is_none());
        assert!(matches!(
            store.delete_product(&product.id).unwrap_err(),
            StoreError::NotFound
        ));
    }
}
