//! # Fallback resolvers
//!
//! Every place where checkout substitutes a default for a missing setting goes through one of these functions. Each
//! takes the optional, stored value(s) and the default explicitly, so the fallback policy is visible at the call site
//! and can be tested without a database.
//!
//! * [`resolve_shipping_cost`] / [`shipping_rates`]: per-store shipping settings, defaulting to a flat national rate.
//! * [`resolve_commission_rate`]: scoped `commission_config` rules, defaulting to the platform rate.
//! * [`resolve_currency`]: the settlement currency, defaulting to MXN.
mod commission;
mod currency;
mod shipping;

pub use commission::{common_category, resolve_commission_rate, CommissionScopes};
pub use currency::resolve_currency;
pub use shipping::{resolve_shipping_cost, shipping_rates, ShippingRate, DEFAULT_SHIPPING_COST};
