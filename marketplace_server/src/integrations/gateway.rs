use log::*;
use marketplace_engine::{
    db_types::{PaymentProvider, VendorPaymentAccount},
    traits::{PaymentGateway, PaymentProviderError, ProviderIntent, ProviderIntentRequest},
};
use mkt_common::Money;
use provider_tools::{
    MercadoPagoApi,
    NewPaymentIntent,
    NewPreference,
    PreferenceBackUrls,
    PreferenceItem,
    ProviderApiError,
    StripeApi,
};

/// Both provider clients, built once at start-up and shared by every worker.
#[derive(Clone)]
pub struct ProviderClients {
    pub stripe: StripeApi,
    pub mercadopago: MercadoPagoApi,
    base_url: String,
}

impl ProviderClients {
    pub fn new(stripe: StripeApi, mercadopago: MercadoPagoApi, base_url: &str) -> Self {
        Self { stripe, mercadopago, base_url: base_url.trim_end_matches('/').to_string() }
    }

    async fn stripe_intent(
        &self,
        account: &VendorPaymentAccount,
        request: &ProviderIntentRequest,
    ) -> Result<ProviderIntent, PaymentProviderError> {
        let intent = stripe_payment_intent(account, request);
        let result = self
            .stripe
            .create_payment_intent(&intent)
            .await
            .map_err(|e| provider_error(PaymentProvider::Stripe, e))?;
        Ok(ProviderIntent {
            provider: PaymentProvider::Stripe,
            payment_intent_id: result.id,
            client_secret: result.client_secret,
            redirect_url: None,
        })
    }

    async fn mercadopago_intent(
        &self,
        account: &VendorPaymentAccount,
        request: &ProviderIntentRequest,
    ) -> Result<ProviderIntent, PaymentProviderError> {
        let token = account.access_token.as_deref().filter(|t| !t.trim().is_empty()).ok_or_else(|| {
            PaymentProviderError::NotConfigured {
                provider: PaymentProvider::MercadoPago,
                detail: format!("Store {} has no MercadoPago access token", account.store_id),
            }
        })?;
        let preference = mercadopago_preference(request, &self.base_url);
        let result = self
            .mercadopago
            .create_preference(token, &preference)
            .await
            .map_err(|e| provider_error(PaymentProvider::MercadoPago, e))?;
        Ok(ProviderIntent {
            provider: PaymentProvider::MercadoPago,
            payment_intent_id: result.id,
            client_secret: None,
            redirect_url: Some(result.init_point),
        })
    }
}

impl PaymentGateway for ProviderClients {
    async fn create_payment_intent(
        &self,
        account: &VendorPaymentAccount,
        request: &ProviderIntentRequest,
    ) -> Result<ProviderIntent, PaymentProviderError> {
        debug!("💳️ Routing payment for order #{} to {}", request.order_id, account.provider);
        match account.provider {
            PaymentProvider::Stripe => self.stripe_intent(account, request).await,
            PaymentProvider::MercadoPago => self.mercadopago_intent(account, request).await,
        }
    }
}

/// A destination charge: the full amount is charged on the platform, the commission is kept as the application fee,
/// and the rest is transferred to the vendor's connected account.
pub fn stripe_payment_intent(account: &VendorPaymentAccount, request: &ProviderIntentRequest) -> NewPaymentIntent {
    NewPaymentIntent {
        amount: request.split.gross.value(),
        currency: request.currency.to_ascii_lowercase(),
        application_fee_amount: request.split.marketplace_fee.value(),
        destination: account.account_id.clone(),
        metadata: vec![
            ("marketplace_order_id".to_string(), request.order_id.to_string()),
            ("marketplace_store_id".to_string(), request.store_id.to_string()),
            ("buyer_id".to_string(), request.buyer_id.clone()),
        ],
    }
}

/// A checkout preference created on the vendor's account. The items are priced at the captured prices, and whatever
/// the order total holds beyond them (shipping) is added as its own line, so the buyer pays exactly the stored total.
pub fn mercadopago_preference(request: &ProviderIntentRequest, base_url: &str) -> NewPreference {
    let currency_id = request.currency.to_ascii_uppercase();
    let mut items = request
        .items
        .iter()
        .map(|item| PreferenceItem {
            id: item.product_id.to_string(),
            title: item.title.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price.to_major_f64(),
            currency_id: currency_id.clone(),
        })
        .collect::<Vec<_>>();
    let items_total = request.items.iter().map(|i| i.unit_price * i.quantity).sum::<Money>();
    let shipping = request.amount() - items_total;
    if shipping.is_positive() {
        items.push(PreferenceItem {
            id: "shipping".to_string(),
            title: "Envío".to_string(),
            quantity: 1,
            unit_price: shipping.to_major_f64(),
            currency_id,
        });
    }
    NewPreference {
        items,
        marketplace_fee: request.split.marketplace_fee.to_major_f64(),
        external_reference: request.order_id.to_string(),
        notification_url: format!("{base_url}/webhooks/mercadopago"),
        back_urls: PreferenceBackUrls::under(base_url),
        auto_return: "approved".to_string(),
    }
}

pub fn provider_error(provider: PaymentProvider, e: ProviderApiError) -> PaymentProviderError {
    match e {
        ProviderApiError::NotConfigured(detail) | ProviderApiError::Initialization(detail) => {
            PaymentProviderError::NotConfigured { provider, detail }
        },
        ProviderApiError::QueryError { status, code, message } => {
            PaymentProviderError::Rejected { provider, code: format!("{status}:{code}"), message }
        },
        e => PaymentProviderError::Unavailable { provider, message: e.to_string() },
    }
}
