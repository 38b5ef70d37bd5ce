use marketplace_engine::{
    db_types::{NewWebhookEvent, PaymentProvider},
    settlement_objects::SettlementEvent,
};
use provider_tools::{money_from_major, MercadoPagoApi, MercadoPagoPayment, OAuthToken, ProviderApiError};
use serde_json::{json, Value};

use crate::data_objects::MercadoPagoQuery;

/// The MercadoPago calls used by vendor onboarding and IPN handling.
#[allow(async_fn_in_trait)]
pub trait MercadoPagoClient {
    fn authorization_url(&self, store_id: i64, redirect_uri: &str) -> Result<String, ProviderApiError>;
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<OAuthToken, ProviderApiError>;
    /// Looks a payment up with the platform's token.
    async fn get_payment(&self, payment_id: &str) -> Result<MercadoPagoPayment, ProviderApiError>;
}

impl MercadoPagoClient for MercadoPagoApi {
    fn authorization_url(&self, store_id: i64, redirect_uri: &str) -> Result<String, ProviderApiError> {
        MercadoPagoApi::authorization_url(self, store_id, redirect_uri)
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<OAuthToken, ProviderApiError> {
        MercadoPagoApi::exchange_code(self, code, redirect_uri).await
    }

    async fn get_payment(&self, payment_id: &str) -> Result<MercadoPagoPayment, ProviderApiError> {
        MercadoPagoApi::get_payment(self, payment_id).await
    }
}

/// An IPN delivery: which kind of resource changed, and its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MercadoPagoNotification {
    pub topic: String,
    pub id: String,
}

impl MercadoPagoNotification {
    /// Reads the notification from the query string, falling back to a JSON body of the form
    /// `{"type": "payment", "data": {"id": "123"}}`.
    pub fn from_request(query: &MercadoPagoQuery, body: &[u8]) -> Option<Self> {
        let json = serde_json::from_slice::<Value>(body).unwrap_or_default();
        let topic = query
            .topic
            .clone()
            .or_else(|| query.event_type.clone())
            .or_else(|| json["topic"].as_str().map(String::from))
            .or_else(|| json["type"].as_str().map(String::from))
            .filter(|s| !s.trim().is_empty())?;
        let id = query
            .id
            .clone()
            .or_else(|| query.data_id.clone())
            .or_else(|| value_to_id(&json["data"]["id"]))
            .or_else(|| value_to_id(&json["id"]))
            .filter(|s| !s.trim().is_empty())?;
        Some(Self { topic, id })
    }

    /// Deliveries are identified by topic and resource id.
    pub fn event_id(&self) -> String {
        format!("{}:{}", self.topic, self.id)
    }

    pub fn is_payment(&self) -> bool {
        self.topic == "payment"
    }

    /// The webhook log entry. When the provider sent no body, the notification itself is logged.
    pub fn raw_event(&self, body: &[u8]) -> NewWebhookEvent {
        let payload = match std::str::from_utf8(body) {
            Ok(s) if !s.trim().is_empty() => s.to_string(),
            _ => json!({ "topic": self.topic, "id": self.id }).to_string(),
        };
        NewWebhookEvent::new(PaymentProvider::MercadoPago, self.topic.as_str(), self.event_id(), payload)
    }
}

fn value_to_id(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// What a payment's current state means for the marketplace.
pub fn payment_settlement_event(payment: &MercadoPagoPayment) -> SettlementEvent {
    let payment_id = payment.id.to_string();
    match payment.status.as_str() {
        "approved" => SettlementEvent::PaymentSucceeded {
            order_id: payment.order_id(),
            payment_intent_id: payment_id.clone(),
            charge_id: Some(payment_id),
            amount: money_from_major(payment.transaction_amount),
            marketplace_fee: payment.marketplace_fee.map(money_from_major),
        },
        "rejected" | "cancelled" => {
            SettlementEvent::PaymentFailed { order_id: payment.order_id(), payment_intent_id: payment_id }
        },
        other => SettlementEvent::ignored(format!("MercadoPago payment {payment_id} is {other}")),
    }
}
