use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ProviderApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("The provider client is not configured: {0}")]
    NotConfigured(String),
    #[error("Could not send request: {0}")]
    RestRequestError(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("The provider rejected the request. Status: {status}. Code: {code}. {message}")]
    QueryError { status: u16, code: String, message: String },
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),
    #[error("Invalid OAuth state: {0}")]
    InvalidState(String),
}

impl ProviderApiError {
    /// Pulls a code and message out of a provider's error body. Both providers wrap errors differently, so a few
    /// shapes are tried before falling back to the raw text.
    pub fn from_error_body(status: u16, body: &str) -> Self {
        let json = serde_json::from_str::<serde_json::Value>(body).unwrap_or_default();
        // Stripe: {"error": {"code": .., "message": ..}}, MercadoPago: {"error": .., "message": ..}
        let (code, message) = match &json["error"] {
            serde_json::Value::Object(e) => (
                e.get("code").and_then(|c| c.as_str()).or_else(|| e.get("type").and_then(|t| t.as_str())),
                e.get("message").and_then(|m| m.as_str()),
            ),
            serde_json::Value::String(code) => (Some(code.as_str()), json["message"].as_str()),
            _ => (None, json["message"].as_str()),
        };
        Self::QueryError {
            status,
            code: code.unwrap_or("unknown").to_string(),
            message: message.map(String::from).unwrap_or_else(|| body.to_string()),
        }
    }
}
