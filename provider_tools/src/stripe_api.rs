use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
    Method,
};
use serde::de::DeserializeOwned;

use crate::{
    config::StripeConfig,
    data_objects::{AccountLink, NewPaymentIntent, StripeAccount, StripePaymentIntent},
    ProviderApiError,
};

#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, ProviderApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        if config.is_configured() {
            let val = HeaderValue::from_str(&format!("Bearer {}", config.secret_key.reveal()))
                .map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
            headers.insert(AUTHORIZATION, val);
        }
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.api_url.trim_end_matches('/'))
    }

    /// Stripe takes form-encoded bodies and answers in JSON.
    pub async fn rest_query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T, ProviderApiError> {
        if !self.config.is_configured() {
            return Err(ProviderApiError::NotConfigured("MKT_STRIPE_SECRET_KEY is not set".into()));
        }
        let url = self.url(path);
        trace!("💳️ Sending Stripe query: {method} {url}");
        let mut req = self.client.request(method, url);
        if !form.is_empty() {
            req = req.form(form);
        }
        let response = req.send().await.map_err(|e| ProviderApiError::RestRequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("💳️ Stripe query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| ProviderApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| ProviderApiError::RestResponseError(e.to_string()))?;
            Err(ProviderApiError::from_error_body(status, &body))
        }
    }

    /// Creates a standard connected account for a vendor. The store id is recorded in the account metadata.
    pub async fn create_account(&self, store_id: i64, email: Option<&str>) -> Result<StripeAccount, ProviderApiError> {
        let mut form = vec![
            ("type".to_string(), "standard".to_string()),
            ("metadata[marketplace_store_id]".to_string(), store_id.to_string()),
        ];
        if let Some(email) = email {
            form.push(("email".to_string(), email.to_string()));
        }
        debug!("💳️ Creating Stripe account for store #{store_id}");
        let account = self.rest_query::<StripeAccount>(Method::POST, "/accounts", &form).await?;
        info!("💳️ Created Stripe account {} for store #{store_id}", account.id);
        Ok(account)
    }

    pub async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> Result<AccountLink, ProviderApiError> {
        let form = vec![
            ("account".to_string(), account_id.to_string()),
            ("refresh_url".to_string(), refresh_url.to_string()),
            ("return_url".to_string(), return_url.to_string()),
            ("type".to_string(), "account_onboarding".to_string()),
        ];
        self.rest_query(Method::POST, "/account_links", &form).await
    }

    pub async fn get_account(&self, account_id: &str) -> Result<StripeAccount, ProviderApiError> {
        let path = format!("/accounts/{account_id}");
        self.rest_query(Method::GET, &path, &[]).await
    }

    pub async fn create_payment_intent(
        &self,
        intent: &NewPaymentIntent,
    ) -> Result<StripePaymentIntent, ProviderApiError> {
        debug!(
            "💳️ Creating Stripe payment intent for {} {} (fee {}) to {}",
            intent.amount, intent.currency, intent.application_fee_amount, intent.destination
        );
        let result =
            self.rest_query::<StripePaymentIntent>(Method::POST, "/payment_intents", &intent.form_params()).await?;
        info!("💳️ Created Stripe payment intent {}", result.id);
        Ok(result)
    }
}
