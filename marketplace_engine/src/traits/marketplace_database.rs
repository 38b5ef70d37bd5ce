use thiserror::Error;

use crate::{
    db_types::{CommissionRule, NewOrder, Order, OrderItem, PaymentProvider, Product},
    traits::{ShippingManagement, VendorAccountManagement},
};

/// This trait defines the highest level of behaviour for backends supporting the marketplace engine.
///
/// This behaviour includes:
/// * Batched product lookups for the inventory and pricing check
/// * Writing an order, its line items and the stock decrements as one unit
/// * Attaching a provider payment intent to an order
/// * Reading the commission rules that apply to a store
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase: Clone + ShippingManagement + VendorAccountManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Fetches every product in `ids` in a single query. Ids that do not exist are simply absent from the result.
    async fn fetch_products(&self, ids: &[i64]) -> Result<Vec<Product>, MarketplaceDbError>;

    /// Takes a priced order, and in a single atomic transaction,
    /// * inserts the order header with status `processing` and payment status `pending`,
    /// * inserts one `order_items` row per line, carrying the captured price,
    /// * decrements the stock of each product by the ordered quantity.
    ///
    /// The decrement is guarded, so if another order has taken the stock in the meantime, nothing is written and
    /// [`MarketplaceDbError::StockExhausted`] is returned.
    async fn insert_order_with_items(&self, order: NewOrder) -> Result<(Order, Vec<OrderItem>), MarketplaceDbError>;

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, MarketplaceDbError>;

    async fn fetch_order_by_payment_intent(&self, payment_intent_id: &str) -> Result<Option<Order>, MarketplaceDbError>;

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, MarketplaceDbError>;

    /// Records the provider's intent (or preference) id against the order. The payment status is left as `pending`.
    async fn attach_payment_intent(
        &self,
        order_id: i64,
        provider: PaymentProvider,
        payment_intent_id: &str,
    ) -> Result<Order, MarketplaceDbError>;

    /// Returns the active commission rules that could apply to orders from `store_id`: rules scoped to the store, rules
    /// scoped to a category only, and the platform-wide rule.
    async fn fetch_commission_rules(&self, store_id: i64) -> Result<Vec<CommissionRule>, MarketplaceDbError>;
}

#[derive(Debug, Clone, Error)]
pub enum MarketplaceDbError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("Product {product_id} only has {available} units left")]
    StockExhausted { product_id: i64, available: i64 },
    #[error("The requested order {0} does not exist")]
    OrderNotFound(i64),
    #[error("The requested webhook event (internal id {0}) does not exist")]
    WebhookEventNotFound(i64),
}

impl From<sqlx::Error> for MarketplaceDbError {
    fn from(e: sqlx::Error) -> Self {
        MarketplaceDbError::DatabaseError(e.to_string())
    }
}
