//! Glue between the provider clients in `provider_tools` and the marketplace engine.
//!
//! The engine knows nothing about Stripe or MercadoPago. This module
//! * implements the engine's [`PaymentGateway`](marketplace_engine::PaymentGateway) over both clients ([`gateway`]),
//! * turns provider webhook payloads into engine [`SettlementEvent`](marketplace_engine::settlement_objects::SettlementEvent)s
//!   ([`stripe`], [`mercadopago`]),
//! * defines the narrow client traits the onboarding routes are written against, so they can be mocked,
//! * installs the audit log hooks ([`audit`]).
pub mod audit;
pub mod gateway;
pub mod mercadopago;
pub mod stripe;

pub use gateway::ProviderClients;
pub use mercadopago::MercadoPagoClient;
pub use stripe::StripeConnect;
