use std::{collections::BTreeMap, fmt::Debug};

use log::*;

use crate::{
    db_types::{Money, NewOrder, NewOrderItem, Product},
    events::{EventProducers, OrderCreatedEvent},
    mkt_api::{
        errors::MarketplaceError,
        order_objects::{NewOrderRequest, OrderLine, OrderPlaced, OrderWithItems},
        shipping_api::lookup_shipping_config,
    },
    resolvers::{resolve_shipping_cost, DEFAULT_SHIPPING_COST},
    traits::{MarketplaceDatabase, MarketplaceDbError},
};

/// `CheckoutApi` turns a buyer's cart into a stored order: inventory and pricing check, shipping cost, and the
/// atomic order write.
///
/// This is the first half of the checkout flow. The second half, asking a payment provider for an intent, is
/// [`crate::PaymentIntentApi`].
pub struct CheckoutApi<B> {
    db: B,
    producers: EventProducers,
    default_shipping_cost: Money,
}

impl<B> Debug for CheckoutApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi (default shipping {})", self.default_shipping_cost)
    }
}

impl<B> CheckoutApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, default_shipping_cost: DEFAULT_SHIPPING_COST }
    }

    /// The shipping cost charged when a store has no usable settings.
    pub fn with_default_shipping_cost(mut self, cost: Money) -> Self {
        self.default_shipping_cost = cost;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> CheckoutApi<B>
where B: MarketplaceDatabase
{
    /// Places an order for `buyer_id`.
    ///
    /// Nothing is written unless every product exists, belongs to the store and has enough stock. The order header,
    /// its items and the stock decrements are then written in one transaction. If another order takes the last units
    /// between the check and the write, the write is rolled back and `InsufficientStock` is returned.
    pub async fn place_order(&self, buyer_id: &str, request: NewOrderRequest) -> Result<OrderPlaced, MarketplaceError> {
        let lines = validate_request(&request)?;
        let store_id = request.store_id;
        let items = self.check_inventory(store_id, &lines).await?;
        let subtotal = order_subtotal(&items)?;
        let config = lookup_shipping_config(&self.db, store_id).await;
        let shipping_cost = resolve_shipping_cost(config.as_ref(), subtotal, self.default_shipping_cost);
        if subtotal.checked_add(shipping_cost).is_none() {
            return Err(MarketplaceError::InvalidOrder("The order total is too large".into()));
        }
        trace!("🔄️📦️ Store {store_id}: subtotal {subtotal}, shipping {shipping_cost}");
        let order = NewOrder {
            user_id: buyer_id.to_string(),
            store_id,
            shipping_address_id: request.shipping_address_id,
            shipping_cost,
            items,
        };
        let (order, items) = self.db.insert_order_with_items(order).await.map_err(|e| match e {
            MarketplaceDbError::StockExhausted { product_id, available } => {
                MarketplaceError::InsufficientStock { product_id, available }
            },
            e => {
                error!("🔄️📦️ Could not write order for {buyer_id}. {e}");
                MarketplaceError::OrderWriteFailed(e.to_string())
            },
        })?;
        info!("🔄️📦️ Order #{} placed by {buyer_id} for {} ({} items)", order.id, order.total_amount, items.len());
        let result = OrderPlaced::from(&order);
        self.call_order_created_hook(OrderCreatedEvent::new(order, items)).await;
        Ok(result)
    }

    /// Fetches every product on the order in one read and prices each line at the current price.
    ///
    /// Fails on the first product that is missing, belongs to another store, or is short on stock.
    pub async fn check_inventory(&self, store_id: i64, lines: &[OrderLine]) -> Result<Vec<NewOrderItem>, MarketplaceError> {
        let ids = lines.iter().map(|l| l.product_id).collect::<Vec<i64>>();
        let products = self.db.fetch_products(&ids).await?;
        let products = products.into_iter().map(|p| (p.id, p)).collect::<BTreeMap<i64, Product>>();
        lines
            .iter()
            .map(|line| {
                let product = products.get(&line.product_id).ok_or(MarketplaceError::ProductNotFound(line.product_id))?;
                if product.store_id != store_id {
                    warn!("🔄️📦️ Product {} belongs to store {}, not {store_id}", product.id, product.store_id);
                    return Err(MarketplaceError::InvalidOrder(format!(
                        "Product {} is not sold by store {store_id}",
                        product.id
                    )));
                }
                if line.quantity > product.stock_quantity {
                    return Err(MarketplaceError::InsufficientStock {
                        product_id: product.id,
                        available: product.stock_quantity,
                    });
                }
                Ok(NewOrderItem { product_id: product.id, quantity: line.quantity, price_at_purchase: product.price })
            })
            .collect()
    }

    /// Returns the order and its items, provided it belongs to `buyer_id`.
    pub async fn fetch_order_for_buyer(&self, buyer_id: &str, order_id: i64) -> Result<OrderWithItems, MarketplaceError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(MarketplaceError::OrderNotFound(order_id))?;
        if order.user_id != buyer_id {
            warn!("🔄️📦️ {buyer_id} asked for order #{order_id}, which belongs to someone else");
            return Err(MarketplaceError::Unauthorized(format!("Order {order_id} does not belong to you")));
        }
        let items = self.db.fetch_order_items(order_id).await?;
        Ok(OrderWithItems { order, items })
    }

    async fn call_order_created_hook(&self, event: OrderCreatedEvent) {
        for emitter in &self.producers.order_created_producer {
            debug!("🔄️📦️ Notifying order created hook subscribers");
            emitter.publish_event(event.clone()).await;
        }
    }
}

/// Rejects incomplete carts and merges repeated products into a single line.
fn validate_request(request: &NewOrderRequest) -> Result<Vec<OrderLine>, MarketplaceError> {
    if request.items.is_empty() || request.shipping_address_id.trim().is_empty() {
        return Err(MarketplaceError::InvalidOrder("Missing required order data".into()));
    }
    let mut merged = BTreeMap::<i64, i64>::new();
    for line in &request.items {
        if line.quantity <= 0 {
            return Err(MarketplaceError::InvalidOrder(format!(
                "Quantity for product {} must be positive",
                line.product_id
            )));
        }
        let quantity = merged.entry(line.product_id).or_default();
        *quantity = quantity.checked_add(line.quantity).ok_or_else(|| {
            MarketplaceError::InvalidOrder(format!("Quantity for product {} is too large", line.product_id))
        })?;
    }
    Ok(merged.into_iter().map(|(product_id, quantity)| OrderLine { product_id, quantity }).collect())
}

fn order_subtotal(items: &[NewOrderItem]) -> Result<Money, MarketplaceError> {
    let too_large = || MarketplaceError::InvalidOrder("The order total is too large".into());
    let lines = items.iter().map(|item| item.checked_line_total().ok_or_else(too_large)).collect::<Result<Vec<_>, _>>()?;
    Money::checked_sum(lines).ok_or_else(too_large)
}
