use log::*;
use mkt_common::Secret;

const STRIPE_API_URL: &str = "https://api.stripe.com";
const MERCADOPAGO_API_URL: &str = "https://api.mercadopago.com";
const MERCADOPAGO_AUTH_URL: &str = "https://auth.mercadopago.com.mx/authorization";

#[derive(Debug, Clone, Default)]
pub struct StripeConfig {
    pub api_url: String,
    pub secret_key: Secret<String>,
    pub webhook_secret: Secret<String>,
}

impl StripeConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("MKT_STRIPE_API_URL").unwrap_or_else(|_| STRIPE_API_URL.to_string());
        let secret_key = Secret::new(std::env::var("MKT_STRIPE_SECRET_KEY").unwrap_or_else(|_| {
            warn!("💳️ MKT_STRIPE_SECRET_KEY is not set. Stripe payments and onboarding will be unavailable.");
            String::default()
        }));
        let webhook_secret = Secret::new(std::env::var("MKT_STRIPE_WEBHOOK_SECRET").unwrap_or_else(|_| {
            warn!("💳️ MKT_STRIPE_WEBHOOK_SECRET is not set. Every Stripe webhook will be rejected.");
            String::default()
        }));
        Self { api_url, secret_key, webhook_secret }
    }

    pub fn is_configured(&self) -> bool {
        !self.secret_key.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MercadoPagoConfig {
    pub api_url: String,
    pub auth_url: String,
    pub client_id: String,
    pub client_secret: Secret<String>,
    /// The platform's own token, used to look up payments reported by IPN.
    pub access_token: Secret<String>,
}

impl MercadoPagoConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("MKT_MERCADOPAGO_API_URL").unwrap_or_else(|_| MERCADOPAGO_API_URL.to_string());
        let auth_url = std::env::var("MKT_MERCADOPAGO_AUTH_URL").unwrap_or_else(|_| MERCADOPAGO_AUTH_URL.to_string());
        let client_id = std::env::var("MKT_MERCADOPAGO_CLIENT_ID").unwrap_or_else(|_| {
            warn!("💳️ MKT_MERCADOPAGO_CLIENT_ID is not set. Vendors cannot connect MercadoPago accounts.");
            String::default()
        });
        let client_secret = Secret::new(std::env::var("MKT_MERCADOPAGO_CLIENT_SECRET").unwrap_or_default());
        let access_token = Secret::new(std::env::var("MKT_MERCADOPAGO_ACCESS_TOKEN").unwrap_or_else(|_| {
            warn!("💳️ MKT_MERCADOPAGO_ACCESS_TOKEN is not set. MercadoPago notifications cannot be verified.");
            String::default()
        }));
        Self { api_url, auth_url, client_id, client_secret, access_token }
    }

    pub fn oauth_configured(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.is_empty()
    }
}
