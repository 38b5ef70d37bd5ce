//! Audit trail hooks. Every order that is created, paid or fails is written to the `mkt::audit` log target, which can
//! be routed separately with `RUST_LOG=mkt::audit=info`.
use log::*;
use marketplace_engine::events::{EventHooks, OrderCreatedEvent, OrderFailedEvent, OrderPaidEvent};

pub const AUDIT_TARGET: &str = "mkt::audit";

pub fn audit_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_created(|ev: OrderCreatedEvent| {
            Box::pin(async move {
                let units = ev.items.iter().map(|i| i.quantity).sum::<i64>();
                info!(
                    target: AUDIT_TARGET,
                    "📬️ order_created order={} buyer={} store={} total={} shipping={} units={units}",
                    ev.order.id, ev.order.user_id, ev.order.store_id, ev.order.total_amount, ev.order.shipping_cost
                );
            })
        })
        .on_order_paid(|ev: OrderPaidEvent| {
            Box::pin(async move {
                let tx = &ev.transaction;
                info!(
                    target: AUDIT_TARGET,
                    "📬️ order_paid order={} provider={} intent={} amount={} fee={} payout={}",
                    ev.order.id, tx.provider, tx.payment_intent_id, tx.amount, tx.marketplace_fee, tx.vendor_payout
                );
            })
        })
        .on_order_failed(|ev: OrderFailedEvent| {
            Box::pin(async move {
                warn!(
                    target: AUDIT_TARGET,
                    "📬️ order_failed order={} buyer={} store={} intent={:?}",
                    ev.order.id, ev.order.user_id, ev.order.store_id, ev.order.payment_intent_id
                );
            })
        });
    hooks
}
