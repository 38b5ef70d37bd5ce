use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{CommissionSplit, Money, PaymentProvider, VendorPaymentAccount};

/// Creates payments with an external provider on behalf of a vendor's connected account.
///
/// Implementations dispatch on `account.provider`. The provider performs the commission split on its side: the
/// marketplace fee in `request.split` is passed as the platform's application fee (Stripe) or marketplace fee
/// (MercadoPago), and the remainder goes to the vendor account.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    async fn create_payment_intent(
        &self,
        account: &VendorPaymentAccount,
        request: &ProviderIntentRequest,
    ) -> Result<ProviderIntent, PaymentProviderError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentLineItem {
    pub product_id: i64,
    pub title: String,
    pub quantity: i64,
    pub unit_price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderIntentRequest {
    pub order_id: i64,
    pub store_id: i64,
    pub buyer_id: String,
    pub currency: String,
    pub split: CommissionSplit,
    pub items: Vec<IntentLineItem>,
}

impl ProviderIntentRequest {
    pub fn amount(&self) -> Money {
        self.split.gross
    }
}

/// What the buyer's client needs to complete the payment. Stripe-style providers return a client secret; hosted
/// checkouts return a redirect URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderIntent {
    pub provider: PaymentProvider,
    pub payment_intent_id: String,
    pub client_secret: Option<String>,
    pub redirect_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentProviderError {
    #[error("{provider} is not configured. {detail}")]
    NotConfigured { provider: PaymentProvider, detail: String },
    #[error("{provider} rejected the request ({code}). {message}")]
    Rejected { provider: PaymentProvider, code: String, message: String },
    #[error("Could not complete the request to {provider}. {message}")]
    Unavailable { provider: PaymentProvider, message: String },
}

impl PaymentProviderError {
    pub fn provider(&self) -> PaymentProvider {
        match self {
            Self::NotConfigured { provider, .. } => *provider,
            Self::Rejected { provider, .. } => *provider,
            Self::Unavailable { provider, .. } => *provider,
        }
    }
}
