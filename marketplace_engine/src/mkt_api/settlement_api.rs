use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{CommissionRate, CommissionSplit, Money, NewTransaction, NewWebhookEvent, Order, PaymentProvider},
    events::{EventProducers, OrderFailedEvent, OrderPaidEvent},
    mkt_api::{
        commission::commission_rate_for_order,
        errors::MarketplaceError,
        settlement_objects::{SettlementEvent, WebhookOutcome},
    },
    traits::{RecordedWebhookEvent, SettlementManagement, SettlementResult},
};

/// `SettlementApi` consumes provider callbacks and moves orders to their final payment state.
///
/// Deliveries are at-least-once. Every callback is logged before it is handled, and `(provider, event_id)` identifies
/// a delivery, so a redelivered event that was handled successfully is acknowledged without side effects. If handling
/// fails, the error is stored against the event and it stays unprocessed; the provider's redelivery is then handled
/// from scratch.
pub struct SettlementApi<B> {
    db: B,
    producers: EventProducers,
    default_commission: CommissionRate,
}

impl<B> Debug for SettlementApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi")
    }
}

impl<B> SettlementApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, default_commission: CommissionRate::default() }
    }

    pub fn with_default_commission(mut self, rate: CommissionRate) -> Self {
        self.default_commission = rate;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> SettlementApi<B>
where B: SettlementManagement
{
    /// Logs and handles a callback whose meaning is already known.
    pub async fn receive(&self, raw: NewWebhookEvent, event: SettlementEvent) -> Result<WebhookOutcome, MarketplaceError> {
        let recorded = self.record_event(raw).await?;
        if recorded.is_duplicate() {
            return Ok(WebhookOutcome::Duplicate);
        }
        self.process_event(&recorded, event).await
    }

    /// Logs the callback verbatim. Call this before doing anything else with it, including provider lookups.
    pub async fn record_event(&self, raw: NewWebhookEvent) -> Result<RecordedWebhookEvent, MarketplaceError> {
        let recorded = self.db.record_webhook_event(raw).await?;
        let ev = &recorded.event;
        if recorded.is_duplicate() {
            info!("🪝️ {} event {} ({}) was already processed. Ignoring the redelivery.", ev.provider, ev.event_id, ev.event_type);
        } else if !recorded.is_new {
            info!("🪝️ {} event {} failed previously ({:?}). Trying again.", ev.provider, ev.event_id, ev.error);
        } else {
            debug!("🪝️ {} event {} ({}) logged as #{}", ev.provider, ev.event_id, ev.event_type, ev.id);
        }
        Ok(recorded)
    }

    /// Handles a logged event, then marks it processed. On error the event is marked failed and the error returned.
    pub async fn process_event(
        &self,
        recorded: &RecordedWebhookEvent,
        event: SettlementEvent,
    ) -> Result<WebhookOutcome, MarketplaceError> {
        let provider = recorded.event.provider;
        match self.apply_event(provider, event).await {
            Ok(outcome) => {
                self.db.mark_webhook_processed(recorded.event.id).await?;
                trace!("🪝️ Event #{} marked as processed ({outcome:?})", recorded.event.id);
                Ok(outcome)
            },
            Err(e) => {
                self.abandon_event(recorded, &e).await;
                Err(e)
            },
        }
    }

    /// Stores `error` against a logged event that could not be handled, leaving it open for redelivery.
    pub async fn abandon_event(&self, recorded: &RecordedWebhookEvent, error: &MarketplaceError) {
        let ev = &recorded.event;
        warn!("🪝️ Could not handle {} event {} ({}). {error}", ev.provider, ev.event_id, ev.event_type);
        if let Err(e) = self.db.mark_webhook_failed(ev.id, &error.to_string()).await {
            error!("🪝️ Could not record the failure of event #{}. {e}", ev.id);
        }
    }

    async fn apply_event(
        &self,
        provider: PaymentProvider,
        event: SettlementEvent,
    ) -> Result<WebhookOutcome, MarketplaceError> {
        match event {
            SettlementEvent::PaymentSucceeded { order_id, payment_intent_id, charge_id, amount, marketplace_fee } => {
                let Some(order) = self.find_order(order_id, &payment_intent_id).await? else {
                    return Ok(WebhookOutcome::Ignored);
                };
                self.settle(provider, order, payment_intent_id, charge_id, amount, marketplace_fee).await
            },
            SettlementEvent::PaymentFailed { order_id, payment_intent_id } => {
                let Some(order) = self.find_order(order_id, &payment_intent_id).await? else {
                    return Ok(WebhookOutcome::Ignored);
                };
                if order.is_settled() {
                    warn!("🪝️ {provider} reported a failed payment for order #{}, which is already paid", order.id);
                    return Ok(WebhookOutcome::Ignored);
                }
                let order = self.db.fail_order(order.id).await?;
                info!("🪝️ Payment {payment_intent_id} for order #{} failed", order.id);
                self.call_order_failed_hook(OrderFailedEvent::new(order)).await;
                Ok(WebhookOutcome::Processed)
            },
            SettlementEvent::AccountUpdated { account_id, charges_enabled, payouts_enabled, metadata } => {
                let is_active = charges_enabled && payouts_enabled;
                match self.db.update_account_status(provider, &account_id, is_active, metadata).await? {
                    Some(account) => {
                        info!("🪝️ {provider} account {account_id} of store {} is_active={is_active}", account.store_id);
                        Ok(WebhookOutcome::Processed)
                    },
                    None => {
                        warn!("🪝️ No store has connected {provider} account {account_id}");
                        Ok(WebhookOutcome::Ignored)
                    },
                }
            },
            SettlementEvent::Refunded { charge_id } => match self.db.refund_transaction(&charge_id).await? {
                Some(tx) => {
                    info!("🪝️ Charge {charge_id} refunded. Transaction #{} for order #{} updated", tx.id, tx.order_id);
                    Ok(WebhookOutcome::Processed)
                },
                None => {
                    warn!("🪝️ Refund for unknown charge {charge_id}");
                    Ok(WebhookOutcome::Ignored)
                },
            },
            SettlementEvent::Ignored { reason } => {
                debug!("🪝️ Nothing to do: {reason}");
                Ok(WebhookOutcome::Ignored)
            },
        }
    }

    async fn settle(
        &self,
        provider: PaymentProvider,
        order: Order,
        payment_intent_id: String,
        charge_id: Option<String>,
        amount: Money,
        marketplace_fee: Option<Money>,
    ) -> Result<WebhookOutcome, MarketplaceError> {
        if amount != order.total_amount {
            warn!(
                "🪝️ {provider} captured {amount} for order #{}, but the order total is {}",
                order.id, order.total_amount
            );
        }
        let fee = match marketplace_fee {
            Some(fee) => fee,
            None => {
                let rate =
                    commission_rate_for_order(&self.db, order.id, order.store_id, self.default_commission).await?;
                rate.fee_for(amount)
            },
        };
        if fee > amount || fee < Money::default() {
            return Err(MarketplaceError::InvalidOrder(format!(
                "A fee of {fee} cannot be taken from a payment of {amount}"
            )));
        }
        let transaction = NewTransaction {
            order_id: order.id,
            store_id: order.store_id,
            buyer_id: order.user_id.clone(),
            provider,
            payment_intent_id,
            charge_id,
            split: CommissionSplit::with_fee(amount, fee),
        };
        match self.db.settle_order(transaction).await? {
            SettlementResult::Settled { order, transaction } => {
                info!(
                    "🪝️ Order #{} paid. Marketplace fee {}, payout {} to store {}",
                    order.id, transaction.marketplace_fee, transaction.vendor_payout, order.store_id
                );
                self.call_order_paid_hook(OrderPaidEvent::new(order, transaction)).await;
                Ok(WebhookOutcome::Processed)
            },
            SettlementResult::AlreadySettled(order) => {
                info!("🪝️ Order #{} had already been settled", order.id);
                Ok(WebhookOutcome::Duplicate)
            },
        }
    }

    async fn find_order(&self, order_id: Option<i64>, payment_intent_id: &str) -> Result<Option<Order>, MarketplaceError> {
        let order = match order_id {
            Some(id) => self.db.fetch_order(id).await?,
            None => self.db.fetch_order_by_payment_intent(payment_intent_id).await?,
        };
        if order.is_none() {
            warn!("🪝️ Payment {payment_intent_id} does not match any order (order id: {order_id:?})");
        }
        Ok(order)
    }

    async fn call_order_paid_hook(&self, event: OrderPaidEvent) {
        for emitter in &self.producers.order_paid_producer {
            debug!("🪝️ Notifying order paid hook subscribers");
            emitter.publish_event(event.clone()).await;
        }
    }

    async fn call_order_failed_hook(&self, event: OrderFailedEvent) {
        for emitter in &self.producers.order_failed_producer {
            debug!("🪝️ Notifying order failed hook subscribers");
            emitter.publish_event(event.clone()).await;
        }
    }
}
