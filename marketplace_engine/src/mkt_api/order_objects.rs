use serde::{Deserialize, Serialize};

use crate::db_types::{Money, Order, OrderItem, PaymentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: i64,
    pub quantity: i64,
}

impl OrderLine {
    pub fn new(product_id: i64, quantity: i64) -> Self {
        Self { product_id, quantity }
    }
}

/// A buyer's cart, as submitted to checkout. Prices are never taken from the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub items: Vec<OrderLine>,
    pub shipping_address_id: String,
    pub store_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub success: bool,
    pub order_id: i64,
    pub total: Money,
    pub shipping_cost: Money,
    pub payment_status: PaymentStatus,
}

impl From<&Order> for OrderPlaced {
    fn from(order: &Order) -> Self {
        Self {
            success: true,
            order_id: order.id,
            total: order.total_amount,
            shipping_cost: order.shipping_cost,
            payment_status: order.payment_status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Second step of checkout. `amount` is what the client believes it owes; the stored order total is what gets
/// charged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntentRequest {
    pub order_id: i64,
    #[serde(default)]
    pub amount: Option<Money>,
    pub store_id: i64,
    #[serde(default)]
    pub items: Vec<OrderLine>,
}
