//! Clients for the two payment providers the marketplace settles through.
//!
//! * [`StripeApi`]: connected accounts, onboarding links and destination-charge payment intents.
//! * [`MercadoPagoApi`]: OAuth onboarding, checkout preferences created on the vendor's behalf, and payment lookups
//!   for IPN notifications.
//! * [`stripe_signature`] verifies the `Stripe-Signature` header on inbound webhooks.
//!
//! Clients are built once from an explicit config struct and shared. Nothing in here reads the environment except
//! the `new_from_env_or_default` constructors.
mod config;
mod data_objects;
mod error;
mod helpers;
mod mercadopago_api;
mod stripe_api;

pub mod stripe_signature;

pub use config::{MercadoPagoConfig, StripeConfig};
pub use data_objects::{
    AccountLink,
    MercadoPagoPayment,
    NewPaymentIntent,
    NewPreference,
    OAuthToken,
    Preference,
    PreferenceBackUrls,
    PreferenceItem,
    StripeAccount,
    StripeEvent,
    StripeEventData,
    StripePaymentIntent,
};
pub use error::ProviderApiError;
pub use helpers::{decode_oauth_state, encode_oauth_state, money_from_major};
pub use mercadopago_api::MercadoPagoApi;
pub use stripe_api::StripeApi;
