//! Marketplace Engine
//!
//! The engine holds the order placement and payment settlement pipeline of a multi-vendor marketplace. It is
//! independent of HTTP and of any particular payment provider.
//!
//! The library is divided into these sections:
//! 1. Backend contracts ([`mod@traits`]) and the SQLite backend ([`SqliteDatabase`]). You should not need to reach
//!    the database directly; go through the APIs below. The row types are in [`mod@db_types`] and are public.
//! 2. The engine API ([`mod@mkt_api`]): checkout, payment intents, settlement, vendor accounts and shipping.
//! 3. Fallback resolvers ([`mod@resolvers`]) for shipping cost, commission rate and currency.
//!
//! The engine also emits events ([`mod@events`]) when orders are created, paid or fail. Hooks are plain async
//! closures, run on their own tasks.
pub mod db_types;
pub mod events;
pub mod mkt_api;
pub mod resolvers;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use mkt_api::{
    checkout_api::CheckoutApi,
    errors::MarketplaceError,
    order_objects,
    payment_accounts_api::PaymentAccountsApi,
    payment_intent_api::PaymentIntentApi,
    settlement_api::SettlementApi,
    settlement_objects,
    shipping_api::ShippingApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    MarketplaceDatabase,
    MarketplaceDbError,
    PaymentGateway,
    SettlementManagement,
    ShippingManagement,
    VendorAccountManagement,
};
