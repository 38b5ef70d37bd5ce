use std::{collections::HashMap, fmt::Debug};

use log::*;
use mkt_common::DEFAULT_CURRENCY_CODE_LOWER;

use crate::{
    db_types::{CommissionRate, CommissionSplit, Order, PaymentStatus},
    mkt_api::{
        commission::commission_rate_for,
        errors::MarketplaceError,
        order_objects::PaymentIntentRequest,
        payment_accounts_api::select_payment_account,
    },
    traits::{IntentLineItem, MarketplaceDatabase, PaymentGateway, ProviderIntent, ProviderIntentRequest},
};

/// Second step of checkout: hand a stored order to the vendor's payment provider.
///
/// The provider is chosen from the store's active payment accounts. The marketplace commission travels with the
/// request as an application (or marketplace) fee so the provider splits the funds itself.
pub struct PaymentIntentApi<B, G> {
    db: B,
    gateway: G,
    default_commission: CommissionRate,
    currency: String,
}

impl<B, G> Debug for PaymentIntentApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentIntentApi ({}, default commission {})", self.currency, self.default_commission)
    }
}

impl<B, G> PaymentIntentApi<B, G> {
    pub fn new(db: B, gateway: G) -> Self {
        Self {
            db,
            gateway,
            default_commission: CommissionRate::default(),
            currency: DEFAULT_CURRENCY_CODE_LOWER.to_string(),
        }
    }

    /// The rate used when no `commission_config` rule applies.
    pub fn with_default_commission(mut self, rate: CommissionRate) -> Self {
        self.default_commission = rate;
        self
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into().to_ascii_lowercase();
        self
    }
}

impl<B, G> PaymentIntentApi<B, G>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    /// Creates a payment intent for the buyer's pending order and records it against the order.
    ///
    /// The charge is always the stored order total. If the store has no active payment account, or the provider
    /// call fails, the order is left exactly as it was and this step may be retried.
    pub async fn create_payment_intent(
        &self,
        buyer_id: &str,
        request: PaymentIntentRequest,
    ) -> Result<ProviderIntent, MarketplaceError> {
        let order_id = request.order_id;
        let order = self.db.fetch_order(order_id).await?.ok_or(MarketplaceError::OrderNotFound(order_id))?;
        check_order(&order, buyer_id, &request)?;
        let account = select_payment_account(&self.db, order.store_id).await?.ok_or_else(|| {
            warn!("💳️ Store {} has no active payment account. Cannot take payment for #{order_id}", order.store_id);
            MarketplaceError::VendorPaymentNotConfigured(order.store_id)
        })?;

        let items = self.db.fetch_order_items(order_id).await?;
        let ids = items.iter().map(|i| i.product_id).collect::<Vec<i64>>();
        let products = self.db.fetch_products(&ids).await?;
        let rate = commission_rate_for(&self.db, order.store_id, &products, self.default_commission).await?;
        let split = CommissionSplit::new(order.total_amount, rate);
        let titles = products.into_iter().map(|p| (p.id, p.name)).collect::<HashMap<i64, String>>();
        let items = items
            .iter()
            .map(|item| IntentLineItem {
                product_id: item.product_id,
                title: titles.get(&item.product_id).cloned().unwrap_or_else(|| format!("Product {}", item.product_id)),
                quantity: item.quantity,
                unit_price: item.price_at_purchase,
            })
            .collect();
        let provider_request = ProviderIntentRequest {
            order_id,
            store_id: order.store_id,
            buyer_id: buyer_id.to_string(),
            currency: self.currency.clone(),
            split,
            items,
        };
        debug!(
            "💳️ Requesting a {} payment of {} for order #{order_id}. Commission {rate} ({})",
            account.provider, split.gross, split.marketplace_fee
        );
        let intent = self.gateway.create_payment_intent(&account, &provider_request).await.map_err(|e| {
            error!("💳️ {} could not create a payment for order #{order_id}. {e}", e.provider());
            MarketplaceError::from(e)
        })?;
        self.db.attach_payment_intent(order_id, intent.provider, &intent.payment_intent_id).await?;
        info!("💳️ Order #{order_id} is awaiting {} payment {}", intent.provider, intent.payment_intent_id);
        Ok(intent)
    }
}

fn check_order(order: &Order, buyer_id: &str, request: &PaymentIntentRequest) -> Result<(), MarketplaceError> {
    let order_id = order.id;
    if order.user_id != buyer_id {
        warn!("💳️ {buyer_id} tried to pay for order #{order_id}, which belongs to someone else");
        return Err(MarketplaceError::Unauthorized(format!("Order {order_id} does not belong to you")));
    }
    if order.store_id != request.store_id {
        return Err(MarketplaceError::InvalidOrder(format!(
            "Order {order_id} was placed with store {}, not {}",
            order.store_id, request.store_id
        )));
    }
    if order.payment_status != PaymentStatus::Pending {
        return Err(MarketplaceError::OrderAlreadySettled(order_id));
    }
    if let Some(amount) = request.amount.filter(|a| *a != order.total_amount) {
        warn!(
            "💳️ Client quoted {amount} for order #{order_id}, but the order total is {}. Charging the order total.",
            order.total_amount
        );
    }
    Ok(())
}
