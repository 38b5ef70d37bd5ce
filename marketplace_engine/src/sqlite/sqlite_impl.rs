//! `SqliteDatabase` is a concrete implementation of a marketplace engine backend.
//!
//! Multi-step writes (placing an order, settling a payment) each run inside one `pool.begin()` transaction, so a
//! failure at any step leaves nothing behind.
use std::fmt::Debug;

use log::*;
use serde_json::Value;
use sqlx::SqlitePool;

use super::db::{commission, db_url, new_pool, orders, products, shipping, transactions, vendor_accounts, webhook_events};
use crate::{
    db_types::{
        CommissionRate,
        CommissionRule,
        NewOrder,
        NewProduct,
        NewTransaction,
        NewVendorPaymentAccount,
        NewWebhookEvent,
        Order,
        OrderItem,
        OrderStatusType,
        PaymentProvider,
        PaymentStatus,
        Product,
        ShippingConfig,
        Transaction,
        VendorPaymentAccount,
    },
    traits::{
        MarketplaceDatabase,
        MarketplaceDbError,
        RecordedWebhookEvent,
        SettlementManagement,
        SettlementResult,
        ShippingManagement,
        VendorAccountManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using `MKT_DATABASE_URL` (or its default) as the connection string.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&mut self) -> Result<(), sqlx::Error> {
        self.pool.close().await;
        Ok(())
    }

    /// Adds a product to the catalogue. Catalogue management lives outside the checkout pipeline, so this is mostly
    /// useful for seeding and tests.
    pub async fn create_product(&self, product: NewProduct) -> Result<Product, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::insert_product(product, &mut conn).await?;
        debug!("🗃️ Product #{} ({}) created for store {}", product.id, product.name, product.store_id);
        Ok(product)
    }

    /// Adds an active commission rule. Leave both scopes empty to set the platform-wide rate.
    pub async fn add_commission_rule(
        &self,
        store_id: Option<i64>,
        category_id: Option<i64>,
        rate: CommissionRate,
    ) -> Result<CommissionRule, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        let rule = commission::insert_rule(store_id, category_id, rate, &mut conn).await?;
        info!("🗃️ Commission rule #{} set to {rate} (store: {store_id:?}, category: {category_id:?})", rule.id);
        Ok(rule)
    }

    pub async fn deactivate_commission_rule(&self, id: i64) -> Result<(), MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        commission::deactivate_rule(id, &mut conn).await
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_products(&self, ids: &[i64]) -> Result<Vec<Product>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        products::fetch_products(ids, &mut conn).await
    }

    async fn insert_order_with_items(&self, order: NewOrder) -> Result<(Order, Vec<OrderItem>), MarketplaceDbError> {
        let mut tx = self.pool.begin().await?;
        let header = orders::insert_order(&order, &mut tx).await?;
        let mut items = Vec::with_capacity(order.items.len());
        for item in &order.items {
            let saved = orders::insert_order_item(header.id, item, &mut tx).await?;
            if !products::decrement_stock(item.product_id, item.quantity, &mut tx).await? {
                let available = products::fetch_stock(item.product_id, &mut tx).await?.unwrap_or_default();
                warn!(
                    "🗃️ Product {} ran out of stock while order #{} was being written. {} requested, {available} left. \
                     Rolling back.",
                    item.product_id, header.id, item.quantity
                );
                tx.rollback().await?;
                return Err(MarketplaceDbError::StockExhausted { product_id: item.product_id, available });
            }
            items.push(saved);
        }
        tx.commit().await?;
        debug!("🗃️ Order #{} saved with {} items. Stock has been reserved.", header.id, items.len());
        Ok((header, items))
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_id(order_id, &mut conn).await
    }

    async fn fetch_order_by_payment_intent(&self, payment_intent_id: &str) -> Result<Option<Order>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_payment_intent(payment_intent_id, &mut conn).await
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_items(order_id, &mut conn).await
    }

    async fn attach_payment_intent(
        &self,
        order_id: i64,
        provider: PaymentProvider,
        payment_intent_id: &str,
    ) -> Result<Order, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::attach_payment_intent(order_id, provider, payment_intent_id, &mut conn).await?;
        debug!("🗃️ Order #{order_id} is now linked to {provider} payment {payment_intent_id}");
        Ok(order)
    }

    async fn fetch_commission_rules(&self, store_id: i64) -> Result<Vec<CommissionRule>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        commission::fetch_rules_for_store(store_id, &mut conn).await
    }
}

impl ShippingManagement for SqliteDatabase {
    async fn fetch_shipping_config(&self, store_id: i64) -> Result<Option<ShippingConfig>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        shipping::fetch_config(store_id, &mut conn).await
    }

    async fn upsert_shipping_config(&self, config: ShippingConfig) -> Result<ShippingConfig, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        let config = shipping::upsert_config(config, &mut conn).await?;
        debug!("🗃️ Shipping settings for store {} saved", config.store_id);
        Ok(config)
    }
}

impl VendorAccountManagement for SqliteDatabase {
    async fn fetch_payment_accounts(&self, store_id: i64) -> Result<Vec<VendorPaymentAccount>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        vendor_accounts::fetch_accounts_for_store(store_id, &mut conn).await
    }

    async fn fetch_payment_account(
        &self,
        store_id: i64,
        provider: PaymentProvider,
    ) -> Result<Option<VendorPaymentAccount>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        vendor_accounts::fetch_account(store_id, provider, &mut conn).await
    }

    async fn upsert_payment_account(
        &self,
        account: NewVendorPaymentAccount,
    ) -> Result<VendorPaymentAccount, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        let account = vendor_accounts::upsert_account(account, &mut conn).await?;
        info!(
            "🗃️ Store {} {} account {} saved (active: {})",
            account.store_id, account.provider, account.account_id, account.is_active
        );
        Ok(account)
    }

    async fn update_account_status(
        &self,
        provider: PaymentProvider,
        account_id: &str,
        is_active: bool,
        metadata: Value,
    ) -> Result<Option<VendorPaymentAccount>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        vendor_accounts::update_status(provider, account_id, is_active, metadata, &mut conn).await
    }
}

impl SettlementManagement for SqliteDatabase {
    async fn record_webhook_event(&self, event: NewWebhookEvent) -> Result<RecordedWebhookEvent, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        webhook_events::idempotent_insert(event, &mut conn).await
    }

    async fn mark_webhook_processed(&self, id: i64) -> Result<(), MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        webhook_events::mark_processed(id, &mut conn).await
    }

    async fn mark_webhook_failed(&self, id: i64, error: &str) -> Result<(), MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        webhook_events::mark_failed(id, error, &mut conn).await
    }

    async fn settle_order(&self, transaction: NewTransaction) -> Result<SettlementResult, MarketplaceDbError> {
        let mut tx = self.pool.begin().await?;
        let order_id = transaction.order_id;
        let order = orders::fetch_order_by_id(order_id, &mut tx)
            .await?
            .ok_or(MarketplaceDbError::OrderNotFound(order_id))?;
        if order.is_settled() {
            debug!("🗃️ Order #{order_id} has already been settled. Nothing to do.");
            tx.rollback().await?;
            return Ok(SettlementResult::AlreadySettled(order));
        }
        let Some(record) = transactions::insert_transaction(transaction, &mut tx).await? else {
            tx.rollback().await?;
            return Ok(SettlementResult::AlreadySettled(order));
        };
        let order =
            orders::update_order_status(order_id, OrderStatusType::Paid, PaymentStatus::Completed, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ Order #{order_id} settled. {} fee, {} to store {}",
            record.marketplace_fee, record.vendor_payout, record.store_id
        );
        Ok(SettlementResult::Settled { order, transaction: record })
    }

    async fn fail_order(&self, order_id: i64) -> Result<Order, MarketplaceDbError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_id(order_id, &mut tx)
            .await?
            .ok_or(MarketplaceDbError::OrderNotFound(order_id))?;
        if order.is_settled() {
            warn!("🗃️ Ignoring a payment failure for order #{order_id}, which has already been paid");
            tx.rollback().await?;
            return Ok(order);
        }
        let order =
            orders::update_order_status(order_id, OrderStatusType::Failed, PaymentStatus::Failed, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn refund_transaction(&self, charge_id: &str) -> Result<Option<Transaction>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        transactions::refund_by_charge_id(charge_id, &mut conn).await
    }

    async fn fetch_transactions_for_order(&self, order_id: i64) -> Result<Vec<Transaction>, MarketplaceDbError> {
        let mut conn = self.pool.acquire().await?;
        transactions::fetch_transactions_for_order(order_id, &mut conn).await
    }
}
