use marketplace_engine::{resolvers::ShippingRate, settlement_objects::WebhookOutcome};
use mkt_common::Money;
use serde::{Deserialize, Serialize};

/// `?store_id=` on vendor routes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StoreQuery {
    pub store_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeConnectRequest {
    pub store_id: i64,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripeConnectResponse {
    pub url: String,
    pub account_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripeAccountStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    pub charges_enabled: bool,
    pub payouts_enabled: bool,
    pub is_active: bool,
    pub onboarding_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationUrl {
    pub url: String,
}

/// Query string MercadoPago appends when redirecting a vendor back to the marketplace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuthCallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingRatesRequest {
    pub store_id: i64,
    #[serde(default)]
    pub subtotal: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingRatesResponse {
    pub rates: Vec<ShippingRate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
    pub outcome: WebhookOutcome,
}

impl WebhookAck {
    pub fn new(outcome: WebhookOutcome) -> Self {
        Self { received: true, outcome }
    }
}

/// MercadoPago IPN parameters. Older notifications use `topic` and `id`; newer ones use `type` and `data.id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MercadoPagoQuery {
    pub topic: Option<String>,
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    #[serde(rename = "data.id")]
    pub data_id: Option<String>,
}
