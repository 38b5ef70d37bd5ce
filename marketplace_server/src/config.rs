use std::env;

use log::*;
use marketplace_engine::resolvers::DEFAULT_SHIPPING_COST;
use mkt_common::{
    helpers::{parse_boolean_flag, parse_env},
    CommissionRate,
    Money,
    Secret,
    DEFAULT_CURRENCY_CODE_LOWER,
};
use provider_tools::{MercadoPagoConfig, StripeConfig};
use rand::{thread_rng, RngCore};

const DEFAULT_MKT_HOST: &str = "127.0.0.1";
const DEFAULT_MKT_PORT: u16 = 8480;
const DEFAULT_BASE_URL: &str = "http://localhost:3000";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The public URL of the marketplace front end. Provider redirects and notification URLs are built from it.
    pub base_url: String,
    /// Key for signing and checking session tokens.
    pub session_secret: Secret<String>,
    /// Charged when a store has no usable shipping settings.
    pub default_shipping_cost: Money,
    /// Applied when no `commission_config` rule matches an order.
    pub default_commission: CommissionRate,
    pub currency: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    pub stripe: StripeConfig,
    pub mercadopago: MercadoPagoConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MKT_HOST.to_string(),
            port: DEFAULT_MKT_PORT,
            database_url: String::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            session_secret: Secret::default(),
            default_shipping_cost: DEFAULT_SHIPPING_COST,
            default_commission: CommissionRate::default(),
            currency: DEFAULT_CURRENCY_CODE_LOWER.to_string(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            stripe: StripeConfig::default(),
            mercadopago: MercadoPagoConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("MKT_HOST").ok().unwrap_or_else(|| DEFAULT_MKT_HOST.into());
        let port = parse_env::<u16>("MKT_PORT")
            .unwrap_or_else(|e| {
                error!("🪛️ {e} Using the default, {DEFAULT_MKT_PORT}, instead.");
                None
            })
            .unwrap_or(DEFAULT_MKT_PORT);
        let database_url = env::var("MKT_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ MKT_DATABASE_URL is not set. Please set it to the URL for the marketplace database.");
            String::default()
        });
        let base_url = env::var("MKT_BASE_URL").map(|s| s.trim_end_matches('/').to_string()).unwrap_or_else(|_| {
            warn!("🪛️ MKT_BASE_URL is not set. Provider redirects will point at {DEFAULT_BASE_URL}.");
            DEFAULT_BASE_URL.to_string()
        });
        let session_secret = env::var("MKT_SESSION_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(Secret::new)
            .unwrap_or_else(random_session_secret);
        let default_shipping_cost = parse_env::<Money>("MKT_DEFAULT_SHIPPING_COST")
            .unwrap_or_else(|e| {
                warn!("🪛️ {e} Using the default shipping cost of {DEFAULT_SHIPPING_COST}.");
                None
            })
            .filter(|cost| *cost >= Money::default())
            .unwrap_or(DEFAULT_SHIPPING_COST);
        let default_commission = configure_default_commission();
        let currency = env::var("MKT_CURRENCY")
            .map(|s| s.trim().to_ascii_lowercase())
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY_CODE_LOWER.to_string());
        let use_x_forwarded_for = parse_boolean_flag(env::var("MKT_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("MKT_USE_FORWARDED").ok(), false);
        let stripe = StripeConfig::new_from_env_or_default();
        let mercadopago = MercadoPagoConfig::new_from_env_or_default();
        Self {
            host,
            port,
            database_url,
            base_url,
            session_secret,
            default_shipping_cost,
            default_commission,
            currency,
            use_x_forwarded_for,
            use_forwarded,
            stripe,
            mercadopago,
        }
    }
}

fn configure_default_commission() -> CommissionRate {
    match parse_env::<i64>("MKT_DEFAULT_COMMISSION_BPS") {
        Ok(Some(bps)) => CommissionRate::try_from(bps).unwrap_or_else(|e| {
            warn!("🪛️ Invalid configuration value for MKT_DEFAULT_COMMISSION_BPS. {e}. Using the default of 10%.");
            CommissionRate::default()
        }),
        Ok(None) => {
            info!("🪛️ MKT_DEFAULT_COMMISSION_BPS is not set. Using the default commission of {}.", CommissionRate::default());
            CommissionRate::default()
        },
        Err(e) => {
            warn!("🪛️ {e} Using the default commission of {}.", CommissionRate::default());
            CommissionRate::default()
        },
    }
}

fn random_session_secret() -> Secret<String> {
    warn!(
        "🚨️🚨️🚨️ MKT_SESSION_SECRET has not been set. I'm using a random value for this session. Every session token \
         issued with it becomes invalid when the server restarts. DO NOT operate on production like this. 🚨️🚨️🚨️"
    );
    let mut key = [0u8; 32];
    thread_rng().fill_bytes(&mut key);
    Secret::new(hex::encode(key))
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub base_url: String,
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            use_x_forwarded_for: config.use_x_forwarded_for,
            use_forwarded: config.use_forwarded,
        }
    }

    /// Where vendors land after connecting a provider.
    pub fn vendor_settings_url(&self) -> String {
        format!("{}/dashboard/vendor/settings", self.base_url)
    }

    pub fn mercadopago_redirect_uri(&self) -> String {
        format!("{}/mercadopago/callback", self.base_url)
    }
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}
