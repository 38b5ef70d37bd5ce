use std::sync::Arc;

use log::*;
use reqwest::{header::AUTHORIZATION, Client, Method};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::MercadoPagoConfig,
    data_objects::{MercadoPagoPayment, NewPreference, OAuthToken, Preference},
    helpers::encode_oauth_state,
    ProviderApiError,
};

#[derive(Clone)]
pub struct MercadoPagoApi {
    config: MercadoPagoConfig,
    client: Arc<Client>,
}

impl MercadoPagoApi {
    pub fn new(config: MercadoPagoConfig) -> Result<Self, ProviderApiError> {
        let client = Client::builder().build().map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &MercadoPagoConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url.trim_end_matches('/'))
    }

    /// Unlike Stripe, the bearer token varies per call: preferences are created with the vendor's OAuth token, and
    /// lookups use the platform's token.
    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        token: &str,
        body: Option<B>,
    ) -> Result<T, ProviderApiError> {
        if token.is_empty() {
            return Err(ProviderApiError::NotConfigured("No MercadoPago access token is available".into()));
        }
        let url = self.url(path);
        trace!("💳️ Sending MercadoPago query: {method} {url}");
        let mut req = self.client.request(method, url).header(AUTHORIZATION, format!("Bearer {token}"));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| ProviderApiError::RestRequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("💳️ MercadoPago query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| ProviderApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| ProviderApiError::RestResponseError(e.to_string()))?;
            Err(ProviderApiError::from_error_body(status, &body))
        }
    }

    /// The URL a vendor is sent to in order to authorize the marketplace on their MercadoPago account.
    pub fn authorization_url(&self, store_id: i64, redirect_uri: &str) -> Result<String, ProviderApiError> {
        if self.config.client_id.trim().is_empty() {
            return Err(ProviderApiError::NotConfigured("MKT_MERCADOPAGO_CLIENT_ID is not set".into()));
        }
        let state = encode_oauth_state(store_id);
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("response_type", "code"),
            ("platform_id", "mp"),
            ("state", state.as_str()),
            ("redirect_uri", redirect_uri),
        ];
        let url = reqwest::Url::parse_with_params(&self.config.auth_url, params)
            .map_err(|e| ProviderApiError::NotConfigured(format!("Invalid MercadoPago auth URL. {e}")))?;
        Ok(url.to_string())
    }

    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<OAuthToken, ProviderApiError> {
        if !self.config.oauth_configured() {
            return Err(ProviderApiError::NotConfigured("MercadoPago OAuth credentials are not set".into()));
        }
        let body = serde_json::json!({
            "client_id": self.config.client_id,
            "client_secret": self.config.client_secret.reveal(),
            "grant_type": "authorization_code",
            "code": code,
            "redirect_uri": redirect_uri,
        });
        let url = self.url("/oauth/token");
        debug!("💳️ Exchanging MercadoPago authorization code");
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderApiError::RestRequestError(e.to_string()))?;
        if response.status().is_success() {
            let token = response.json::<OAuthToken>().await.map_err(|e| ProviderApiError::JsonError(e.to_string()))?;
            info!("💳️ MercadoPago account {} authorized the marketplace", token.account_id());
            Ok(token)
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| ProviderApiError::RestResponseError(e.to_string()))?;
            Err(ProviderApiError::from_error_body(status, &body))
        }
    }

    pub async fn create_preference(
        &self,
        vendor_token: &str,
        preference: &NewPreference,
    ) -> Result<Preference, ProviderApiError> {
        debug!(
            "💳️ Creating MercadoPago preference for order {} (fee {:.2})",
            preference.external_reference, preference.marketplace_fee
        );
        let path = "/checkout/preferences";
        let result = self.rest_query::<Preference, _>(Method::POST, path, vendor_token, Some(preference)).await?;
        info!("💳️ Created MercadoPago preference {}", result.id);
        Ok(result)
    }

    pub async fn get_payment(&self, payment_id: &str) -> Result<MercadoPagoPayment, ProviderApiError> {
        let path = format!("/v1/payments/{payment_id}");
        let token = self.config.access_token.reveal().clone();
        self.rest_query::<MercadoPagoPayment, ()>(Method::GET, &path, &token, None).await
    }
}
