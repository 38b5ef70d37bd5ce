use serde::{Deserialize, Serialize};
use serde_json::Value;

//--------------------------------------   Stripe    ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StripeAccount {
    pub id: String,
    #[serde(default)]
    pub charges_enabled: bool,
    #[serde(default)]
    pub payouts_enabled: bool,
    #[serde(default)]
    pub details_submitted: bool,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub metadata: Value,
}

impl StripeAccount {
    pub fn onboarding_complete(&self) -> bool {
        self.details_submitted && self.charges_enabled && self.payouts_enabled
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountLink {
    pub url: String,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

/// A destination charge on behalf of a connected account. `amount` and `application_fee_amount` are in minor units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaymentIntent {
    pub amount: i64,
    pub currency: String,
    pub application_fee_amount: i64,
    pub destination: String,
    pub metadata: Vec<(String, String)>,
}

impl NewPaymentIntent {
    /// Stripe's form encoding, with nested keys in bracket notation.
    pub fn form_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("amount".to_string(), self.amount.to_string()),
            ("currency".to_string(), self.currency.clone()),
            ("application_fee_amount".to_string(), self.application_fee_amount.to_string()),
            ("transfer_data[destination]".to_string(), self.destination.clone()),
            ("automatic_payment_methods[enabled]".to_string(), "true".to_string()),
        ];
        params.extend(self.metadata.iter().map(|(k, v)| (format!("metadata[{k}]"), v.clone())));
        params
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripePaymentIntent {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub application_fee_amount: Option<i64>,
    #[serde(default)]
    pub latest_charge: Option<String>,
    #[serde(default)]
    pub metadata: Value,
}

/// The envelope of every Stripe webhook. `data.object` is left untyped because its shape depends on `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created: i64,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeEventData {
    pub object: Value,
}

//--------------------------------------   MercadoPago    ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub public_key: Option<String>,
    pub user_id: Value,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl OAuthToken {
    /// MercadoPago returns the collector id as a number, but it is stored as a string account id.
    pub fn account_id(&self) -> String {
        match &self.user_id {
            Value::String(s) => s.clone(),
            v => v.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceItem {
    pub id: String,
    pub title: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub currency_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceBackUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
}

impl PreferenceBackUrls {
    pub fn under(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            success: format!("{base}/checkout/success"),
            failure: format!("{base}/checkout/failure"),
            pending: format!("{base}/checkout/pending"),
        }
    }
}

/// A checkout preference. Amounts here are decimal major units, as MercadoPago expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPreference {
    pub items: Vec<PreferenceItem>,
    pub marketplace_fee: f64,
    pub external_reference: String,
    pub notification_url: String,
    pub back_urls: PreferenceBackUrls,
    pub auto_return: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preference {
    pub id: String,
    pub init_point: String,
    #[serde(default)]
    pub sandbox_init_point: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MercadoPagoPayment {
    pub id: i64,
    pub status: String,
    #[serde(default)]
    pub status_detail: Option<String>,
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub transaction_amount: f64,
    #[serde(default)]
    pub marketplace_fee: Option<f64>,
    #[serde(default)]
    pub currency_id: Option<String>,
}

impl MercadoPagoPayment {
    /// The marketplace order id carried in `external_reference`, when it is a valid id.
    pub fn order_id(&self) -> Option<i64> {
        self.external_reference.as_deref().and_then(|r| r.trim().parse().ok())
    }
}
