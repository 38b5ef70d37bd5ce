use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderItem, Transaction};

/// Published once an order and its items have been written and stock has been reserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderCreatedEvent {
    pub fn new(order: Order, items: Vec<OrderItem>) -> Self {
        Self { order, items }
    }
}

/// Published when a provider confirms payment and the settlement transaction has been recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
    pub transaction: Transaction,
}

impl OrderPaidEvent {
    pub fn new(order: Order, transaction: Transaction) -> Self {
        Self { order, transaction }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFailedEvent {
    pub order: Order,
}

impl OrderFailedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderCreated(OrderCreatedEvent),
    OrderPaid(OrderPaidEvent),
    OrderFailed(OrderFailedEvent),
}
