use mkt_common::DEFAULT_CURRENCY_CODE;
use serde::{Deserialize, Serialize};

use crate::db_types::{Money, ShippingConfig};

/// 150.00, charged when a store has not configured anything more specific.
pub const DEFAULT_SHIPPING_COST: Money = Money::from_minor(15_000);

pub const LOCAL_RATE_ID: &str = "manual-local";
pub const NATIONAL_RATE_ID: &str = "national-flat";

/// Picks the shipping cost for an order from the store's settings.
///
/// * no settings: `default`
/// * the subtotal reaches the store's free-shipping threshold: zero
/// * national shipping is off and local delivery is on: the local base price
/// * the store has a national flat rate: that rate
/// * otherwise: `default`
pub fn resolve_shipping_cost(config: Option<&ShippingConfig>, subtotal: Money, default: Money) -> Money {
    let Some(config) = config else {
        return default;
    };
    if config.free_shipping_threshold.is_some_and(|threshold| subtotal >= threshold) {
        return Money::default();
    }
    if !config.national_shipping_enabled && config.local_delivery_enabled {
        return config.local_base_price;
    }
    config.national_flat_rate.unwrap_or(default)
}

/// A delivery option offered to the buyer at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRate {
    pub id: String,
    pub name: String,
    pub price: Money,
    pub currency: String,
    pub estimated_days: String,
}

/// Quotes every delivery option the store has switched on.
///
/// A store without settings ships nationally at `default`. If a store has disabled both options the list is empty.
pub fn shipping_rates(config: Option<&ShippingConfig>, subtotal: Money, default: Money) -> Vec<ShippingRate> {
    let mut rates = Vec::with_capacity(2);
    if let Some(cfg) = config.filter(|c| c.local_delivery_enabled) {
        rates.push(ShippingRate {
            id: LOCAL_RATE_ID.to_string(),
            name: "Entrega Local (Directo)".to_string(),
            price: cfg.local_base_price,
            currency: DEFAULT_CURRENCY_CODE.to_string(),
            estimated_days: "same day".to_string(),
        });
    }
    if config.map(|c| c.national_shipping_enabled).unwrap_or(true) {
        rates.push(ShippingRate {
            id: NATIONAL_RATE_ID.to_string(),
            name: "Envío Nacional".to_string(),
            price: resolve_shipping_cost(config, subtotal, default),
            currency: DEFAULT_CURRENCY_CODE.to_string(),
            estimated_days: "3-5".to_string(),
        });
    }
    rates
}
