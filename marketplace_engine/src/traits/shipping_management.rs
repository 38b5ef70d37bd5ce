use crate::{db_types::ShippingConfig, traits::MarketplaceDbError};

/// Per-store shipping settings. A store without a row is valid; callers fall back to defaults.
#[allow(async_fn_in_trait)]
pub trait ShippingManagement {
    async fn fetch_shipping_config(&self, store_id: i64) -> Result<Option<ShippingConfig>, MarketplaceDbError>;

    /// Inserts or replaces the settings for `config.store_id`.
    async fn upsert_shipping_config(&self, config: ShippingConfig) -> Result<ShippingConfig, MarketplaceDbError>;
}
