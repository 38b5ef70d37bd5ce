use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use marketplace_engine::{traits::PaymentProviderError, MarketplaceError};
use provider_tools::ProviderApiError;
use serde_json::json;
use thiserror::Error;

/// Machine-readable code sent with the 400 a buyer gets when the store cannot take payments yet.
pub const VENDOR_PAYMENT_NOT_CONFIGURED: &str = "VENDOR_PAYMENT_NOT_CONFIGURED";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error(transparent)]
    MarketplaceError(#[from] MarketplaceError),
    #[error("The payment provider returned an error. {0}")]
    ProviderError(String),
    #[error("Could not process the webhook. {0}")]
    WebhookProcessingError(String),
    #[error("{0} account already connected")]
    AccountAlreadyConnected(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::Expired => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
                AuthError::StoreNotOwned(_) => StatusCode::FORBIDDEN,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::MarketplaceError(e) => marketplace_status_code(e),
            Self::ProviderError(_) => StatusCode::BAD_GATEWAY,
            Self::WebhookProcessingError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::AccountAlreadyConnected(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::MarketplaceError(MarketplaceError::VendorPaymentNotConfigured(_)) => {
                json!({ "error": self.to_string(), "code": VENDOR_PAYMENT_NOT_CONFIGURED })
            },
            _ => json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).body(body.to_string())
    }
}

fn marketplace_status_code(e: &MarketplaceError) -> StatusCode {
    match e {
        MarketplaceError::ProductNotFound(_) | MarketplaceError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        MarketplaceError::InsufficientStock { .. } => StatusCode::BAD_REQUEST,
        MarketplaceError::InvalidOrder(_) | MarketplaceError::InvalidShippingConfig(_) => StatusCode::BAD_REQUEST,
        MarketplaceError::VendorPaymentNotConfigured(_) => StatusCode::BAD_REQUEST,
        MarketplaceError::WebhookSignatureInvalid(_) => StatusCode::BAD_REQUEST,
        MarketplaceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        MarketplaceError::OrderAlreadySettled(_) => StatusCode::CONFLICT,
        // Missing provider credentials are a server configuration problem
        MarketplaceError::PaymentProviderError(PaymentProviderError::NotConfigured { .. }) => {
            StatusCode::INTERNAL_SERVER_ERROR
        },
        MarketplaceError::PaymentProviderError(_) => StatusCode::BAD_GATEWAY,
        // Lookups fall back to defaults before a caller would see this
        MarketplaceError::ShippingConfigUnavailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        MarketplaceError::OrderWriteFailed(_) | MarketplaceError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ProviderApiError> for ServerError {
    fn from(e: ProviderApiError) -> Self {
        match e {
            ProviderApiError::NotConfigured(s) => Self::ConfigurationError(s),
            ProviderApiError::Initialization(s) => Self::ConfigurationError(s),
            ProviderApiError::InvalidState(s) => Self::InvalidRequestBody(format!("Invalid OAuth state. {s}")),
            ProviderApiError::InvalidSignature(s) => Self::MarketplaceError(MarketplaceError::WebhookSignatureInvalid(s)),
            e => Self::ProviderError(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No session token was provided.")]
    MissingToken,
    #[error("Session token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("Session token signature is invalid. {0}")]
    ValidationError(String),
    #[error("Session token has expired.")]
    Expired,
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("You do not manage store {0}.")]
    StoreNotOwned(i64),
}
