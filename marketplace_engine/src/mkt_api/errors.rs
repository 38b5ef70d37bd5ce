use thiserror::Error;

use crate::traits::{MarketplaceDbError, PaymentProviderError};

/// Everything that can go wrong in the checkout and settlement flows.
#[derive(Debug, Clone, Error)]
pub enum MarketplaceError {
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Insufficient stock for product {product_id}. Only {available} available")]
    InsufficientStock { product_id: i64, available: i64 },
    #[error("The order could not be written. {0}")]
    OrderWriteFailed(String),
    #[error("Store {0} has not connected an active payment account")]
    VendorPaymentNotConfigured(i64),
    #[error(transparent)]
    PaymentProviderError(#[from] PaymentProviderError),
    #[error("Shipping settings for store {store_id} are unavailable. {reason}")]
    ShippingConfigUnavailable { store_id: i64, reason: String },
    #[error("Unauthorized. {0}")]
    Unauthorized(String),
    #[error("Invalid webhook signature. {0}")]
    WebhookSignatureInvalid(String),
    #[error("Invalid order. {0}")]
    InvalidOrder(String),
    #[error("Invalid shipping settings. {0}")]
    InvalidShippingConfig(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Order {0} is no longer awaiting payment")]
    OrderAlreadySettled(i64),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<MarketplaceDbError> for MarketplaceError {
    fn from(e: MarketplaceDbError) -> Self {
        match e {
            MarketplaceDbError::StockExhausted { product_id, available } => Self::InsufficientStock { product_id, available },
            MarketplaceDbError::OrderNotFound(id) => Self::OrderNotFound(id),
            MarketplaceDbError::DatabaseError(s) => Self::DatabaseError(s),
            e @ MarketplaceDbError::WebhookEventNotFound(_) => Self::DatabaseError(e.to_string()),
        }
    }
}

impl From<sqlx::Error> for MarketplaceError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}
