use crate::{
    db_types::{NewTransaction, NewWebhookEvent, Order, Transaction},
    traits::{MarketplaceDatabase, MarketplaceDbError, RecordedWebhookEvent, SettlementResult},
};

/// Backend behaviour for the webhook consumer.
#[allow(async_fn_in_trait)]
pub trait SettlementManagement: MarketplaceDatabase {
    /// Logs an inbound provider callback. This call is idempotent on `(provider, event_id)`: if the event was seen
    /// before, the existing row is returned with `is_new` set to false and the payload is not overwritten.
    async fn record_webhook_event(&self, event: NewWebhookEvent) -> Result<RecordedWebhookEvent, MarketplaceDbError>;

    async fn mark_webhook_processed(&self, id: i64) -> Result<(), MarketplaceDbError>;

    /// Stores the handling error against the event. The event stays unprocessed so that a redelivery is handled again.
    async fn mark_webhook_failed(&self, id: i64, error: &str) -> Result<(), MarketplaceDbError>;

    /// In a single atomic transaction, marks the order `paid`/`completed` and appends the settlement transaction.
    ///
    /// If the order is already completed, or a transaction for the same provider payment exists, nothing is written
    /// and [`SettlementResult::AlreadySettled`] is returned.
    async fn settle_order(&self, transaction: NewTransaction) -> Result<SettlementResult, MarketplaceDbError>;

    /// Marks the order `failed`/`failed`. An order that has already been paid is left untouched and returned as is.
    async fn fail_order(&self, order_id: i64) -> Result<Order, MarketplaceDbError>;

    /// Marks the transaction with the given charge id as refunded. Returns `None` if there is no such transaction.
    async fn refund_transaction(&self, charge_id: &str) -> Result<Option<Transaction>, MarketplaceDbError>;

    async fn fetch_transactions_for_order(&self, order_id: i64) -> Result<Vec<Transaction>, MarketplaceDbError>;
}
