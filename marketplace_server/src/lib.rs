//! # Marketplace server
//! This crate hosts the HTTP surface of the marketplace's order and settlement pipeline. It is responsible for:
//! * Authenticating buyers and vendors from their session tokens.
//! * Taking orders and creating payment intents with the vendor's connected payment provider.
//! * Receiving payment provider webhooks and handing them to the settlement engine.
//! * Vendor onboarding with Stripe and MercadoPago, and per-store shipping settings.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/*`: Buyer and vendor routes. These need a session token in the `mkt_session_token` header.
//! * `/webhooks/stripe` and `/webhooks/mercadopago`: Provider callbacks.
//! * `/mercadopago/callback`: The OAuth redirect target for vendors connecting MercadoPago.
pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
