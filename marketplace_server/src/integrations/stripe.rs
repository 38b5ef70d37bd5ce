use marketplace_engine::{
    db_types::{NewWebhookEvent, PaymentProvider},
    settlement_objects::SettlementEvent,
};
use mkt_common::Money;
use provider_tools::{AccountLink, ProviderApiError, StripeAccount, StripeApi, StripeEvent};
use serde_json::{json, Value};

/// The Stripe Connect calls used by vendor onboarding.
#[allow(async_fn_in_trait)]
pub trait StripeConnect {
    async fn create_account(&self, store_id: i64, email: Option<String>) -> Result<StripeAccount, ProviderApiError>;
    async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<AccountLink, ProviderApiError>;
    async fn get_account(&self, account_id: &str) -> Result<StripeAccount, ProviderApiError>;
}

impl StripeConnect for StripeApi {
    async fn create_account(&self, store_id: i64, email: Option<String>) -> Result<StripeAccount, ProviderApiError> {
        StripeApi::create_account(self, store_id, email.as_deref()).await
    }

    async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<AccountLink, ProviderApiError> {
        StripeApi::create_account_link(self, account_id, refresh_url, return_url).await
    }

    async fn get_account(&self, account_id: &str) -> Result<StripeAccount, ProviderApiError> {
        StripeApi::get_account(self, account_id).await
    }
}

/// The webhook log entry for a Stripe delivery. The payload is the body exactly as received.
pub fn raw_stripe_event(event: &StripeEvent, body: &str) -> NewWebhookEvent {
    NewWebhookEvent::new(PaymentProvider::Stripe, event.event_type.as_str(), event.id.as_str(), body)
}

/// What a Stripe event means for the marketplace. Types the marketplace does not act on become `Ignored`.
pub fn stripe_settlement_event(event: &StripeEvent) -> SettlementEvent {
    let object = &event.data.object;
    match event.event_type.as_str() {
        "payment_intent.succeeded" => {
            let Some(payment_intent_id) = str_field(object, "id") else {
                return SettlementEvent::ignored("payment_intent.succeeded without an intent id");
            };
            let amount = object["amount_received"].as_i64().or_else(|| object["amount"].as_i64()).unwrap_or_default();
            SettlementEvent::PaymentSucceeded {
                order_id: order_id_from_metadata(object),
                payment_intent_id,
                charge_id: str_field(object, "latest_charge"),
                amount: Money::from(amount),
                marketplace_fee: object["application_fee_amount"].as_i64().map(Money::from),
            }
        },
        "payment_intent.payment_failed" => match str_field(object, "id") {
            Some(payment_intent_id) => {
                SettlementEvent::PaymentFailed { order_id: order_id_from_metadata(object), payment_intent_id }
            },
            None => SettlementEvent::ignored("payment_intent.payment_failed without an intent id"),
        },
        "account.updated" => match str_field(object, "id") {
            Some(account_id) => {
                let charges_enabled = object["charges_enabled"].as_bool().unwrap_or(false);
                let payouts_enabled = object["payouts_enabled"].as_bool().unwrap_or(false);
                let metadata = json!({
                    "charges_enabled": charges_enabled,
                    "payouts_enabled": payouts_enabled,
                    "details_submitted": object["details_submitted"].as_bool().unwrap_or(false),
                    "stripe_event_id": event.id,
                });
                SettlementEvent::AccountUpdated { account_id, charges_enabled, payouts_enabled, metadata }
            },
            None => SettlementEvent::ignored("account.updated without an account id"),
        },
        "charge.refunded" => match str_field(object, "id") {
            Some(charge_id) => SettlementEvent::Refunded { charge_id },
            None => SettlementEvent::ignored("charge.refunded without a charge id"),
        },
        other => SettlementEvent::ignored(format!("Stripe event type {other} is not handled")),
    }
}

fn str_field(object: &Value, field: &str) -> Option<String> {
    object[field].as_str().map(String::from)
}

fn order_id_from_metadata(object: &Value) -> Option<i64> {
    object["metadata"]["marketplace_order_id"].as_str().and_then(|s| s.trim().parse().ok())
}
