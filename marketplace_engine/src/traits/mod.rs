//! # Backend and provider contracts
//!
//! This module defines the interfaces that the marketplace engine depends on. Nothing in the engine talks to SQLite
//! or to a payment provider directly; it goes through one of these traits, so that backends can be swapped and the
//! APIs can be tested against mocks.
//!
//! ## Database backends
//! * [`MarketplaceDatabase`] is the core contract: products, orders and their items, and commission rules. It is what
//!   the checkout and payment-intent flows are written against.
//! * [`ShippingManagement`] stores per-store shipping settings.
//! * [`VendorAccountManagement`] tracks the payment accounts that vendors have connected with each provider.
//! * [`SettlementManagement`] is the webhook side: the raw event log, settling or failing orders, and refunds.
//!
//! ## Payment providers
//! * [`PaymentGateway`] creates payment intents (or checkout preferences) on behalf of a connected vendor account.
mod data_objects;
mod marketplace_database;
mod payment_gateway;
mod settlement_management;
mod shipping_management;
mod vendor_account_management;

pub use data_objects::{RecordedWebhookEvent, SettlementResult};
pub use marketplace_database::{MarketplaceDatabase, MarketplaceDbError};
pub use payment_gateway::{IntentLineItem, PaymentGateway, PaymentProviderError, ProviderIntent, ProviderIntentRequest};
pub use settlement_management::SettlementManagement;
pub use shipping_management::ShippingManagement;
pub use vendor_account_management::VendorAccountManagement;
