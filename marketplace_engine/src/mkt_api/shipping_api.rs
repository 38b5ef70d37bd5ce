use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Money, ShippingConfig},
    mkt_api::errors::MarketplaceError,
    resolvers::{shipping_rates, ShippingRate, DEFAULT_SHIPPING_COST},
    traits::ShippingManagement,
};

/// Reads the store's shipping settings for checkout. A failed lookup is logged and treated as "no settings", so it
/// can never block an order.
pub async fn lookup_shipping_config<B: ShippingManagement>(db: &B, store_id: i64) -> Option<ShippingConfig> {
    match db.fetch_shipping_config(store_id).await {
        Ok(config) => config,
        Err(e) => {
            let err = MarketplaceError::ShippingConfigUnavailable { store_id, reason: e.to_string() };
            warn!("🚚️ {err}. Falling back to the default shipping cost.");
            None
        },
    }
}

/// Vendor-facing shipping settings, and the rate quotes shown to buyers.
pub struct ShippingApi<B> {
    db: B,
    default_shipping_cost: Money,
}

impl<B> Debug for ShippingApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ShippingApi")
    }
}

impl<B> ShippingApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, default_shipping_cost: DEFAULT_SHIPPING_COST }
    }

    pub fn with_default_shipping_cost(mut self, cost: Money) -> Self {
        self.default_shipping_cost = cost;
        self
    }
}

impl<B> ShippingApi<B>
where B: ShippingManagement
{
    /// The stored settings, or what a store gets before it saves any.
    pub async fn shipping_config(&self, store_id: i64) -> Result<ShippingConfig, MarketplaceError> {
        let config = self.db.fetch_shipping_config(store_id).await?;
        Ok(config.unwrap_or_else(|| ShippingConfig::default_for_store(store_id)))
    }

    pub async fn save_shipping_config(&self, config: ShippingConfig) -> Result<ShippingConfig, MarketplaceError> {
        validate_config(&config)?;
        let config = self.db.upsert_shipping_config(config).await?;
        info!("🚚️ Shipping settings for store {} updated", config.store_id);
        Ok(config)
    }

    pub async fn quote_rates(&self, store_id: i64, subtotal: Money) -> Vec<ShippingRate> {
        let config = lookup_shipping_config(&self.db, store_id).await;
        shipping_rates(config.as_ref(), subtotal, self.default_shipping_cost)
    }
}

fn validate_config(config: &ShippingConfig) -> Result<(), MarketplaceError> {
    let amounts = [Some(config.local_base_price), config.national_flat_rate, config.free_shipping_threshold];
    if amounts.into_iter().flatten().any(|m| m < Money::default()) {
        return Err(MarketplaceError::InvalidShippingConfig("Prices cannot be negative".into()));
    }
    if config.local_radius_km < 0 {
        return Err(MarketplaceError::InvalidShippingConfig("The local delivery radius cannot be negative".into()));
    }
    Ok(())
}
