//! # Marketplace engine public API
//!
//! The `mkt_api` module exposes the programmatic API for the order and settlement pipeline. Each API is created by
//! supplying a backend that implements the traits it needs, so the pieces can be deployed and tested independently.
//!
//! * [`checkout_api`]: inventory and pricing check, shipping cost, and the atomic order write.
//! * [`payment_intent_api`]: hands a stored order to the vendor's payment provider with the marketplace commission.
//! * [`settlement_api`]: the webhook consumer. Settles, fails and refunds payments; tracks vendor account status.
//! * [`payment_accounts_api`]: the payment accounts vendors connect with each provider.
//! * [`shipping_api`]: per-store shipping settings and rate quotes.
//!
//! The canonical checkout flow is two calls: [`checkout_api::CheckoutApi::place_order`] followed by
//! [`payment_intent_api::PaymentIntentApi::create_payment_intent`] on the returned order id. The payment is
//! confirmed asynchronously through [`settlement_api::SettlementApi`].
//!
//! ```rust,ignore
//! use marketplace_engine::{CheckoutApi, SqliteDatabase, events::EventProducers};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = CheckoutApi::new(db, EventProducers::default());
//! let placed = api.place_order("buyer-1", request).await?;
//! ```
pub mod checkout_api;
pub mod commission;
pub mod errors;
pub mod order_objects;
pub mod payment_accounts_api;
pub mod payment_intent_api;
pub mod settlement_api;
pub mod settlement_objects;
pub mod shipping_api;
