use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use marketplace_engine::{
    events::{EventHandlers, EventProducers},
    CheckoutApi,
    PaymentAccountsApi,
    PaymentIntentApi,
    SettlementApi,
    ShippingApi,
    SqliteDatabase,
};
use provider_tools::{MercadoPagoApi, StripeApi};

use crate::{
    auth::TokenIssuer,
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    integrations::{audit::audit_hooks, ProviderClients},
    middleware::StripeSignatureMiddlewareFactory,
    routes::{
        health,
        CreatePaymentIntentRoute,
        MercadopagoCallbackRoute,
        MercadopagoConnectRoute,
        MercadopagoWebhookRoute,
        OrderByIdRoute,
        PaymentAccountsRoute,
        PlaceOrderRoute,
        ShippingConfigRoute,
        ShippingRatesRoute,
        StripeConnectRoute,
        StripeStatusRoute,
        StripeWebhookRoute,
        UpdateShippingConfigRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 25;
const MAX_DB_CONNECTIONS: u32 = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, MAX_DB_CONNECTIONS)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, audit_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let stripe = StripeApi::new(config.stripe.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let mercadopago =
        MercadoPagoApi::new(config.mercadopago.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway = ProviderClients::new(stripe.clone(), mercadopago.clone(), &config.base_url);
    let options = ServerOptions::from_config(&config);
    info!("🚀️ Marketplace server listening on {}:{} for {}", config.host, config.port, options.base_url);
    let srv = HttpServer::new(move || {
        let checkout_api = CheckoutApi::new(db.clone(), producers.clone())
            .with_default_shipping_cost(config.default_shipping_cost);
        let payment_intent_api = PaymentIntentApi::new(db.clone(), gateway.clone())
            .with_default_commission(config.default_commission)
            .with_currency(config.currency.as_str());
        let settlement_api =
            SettlementApi::new(db.clone(), producers.clone()).with_default_commission(config.default_commission);
        let accounts_api = PaymentAccountsApi::new(db.clone());
        let shipping_api = ShippingApi::new(db.clone()).with_default_shipping_cost(config.default_shipping_cost);
        let token_issuer = TokenIssuer::new(config.session_secret.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("mkt::access_log"))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(payment_intent_api))
            .app_data(web::Data::new(settlement_api))
            .app_data(web::Data::new(accounts_api))
            .app_data(web::Data::new(shipping_api))
            .app_data(web::Data::new(token_issuer))
            .app_data(web::Data::new(options.clone()))
            .app_data(web::Data::new(stripe.clone()))
            .app_data(web::Data::new(mercadopago.clone()));
        // Buyer and vendor routes. Each handler checks the session itself.
        let api_scope = web::scope("/api")
            .service(PlaceOrderRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(CreatePaymentIntentRoute::<SqliteDatabase, ProviderClients>::new())
            .service(ShippingRatesRoute::<SqliteDatabase>::new())
            .service(ShippingConfigRoute::<SqliteDatabase>::new())
            .service(UpdateShippingConfigRoute::<SqliteDatabase>::new())
            .service(StripeConnectRoute::<SqliteDatabase, StripeApi>::new())
            .service(StripeStatusRoute::<SqliteDatabase, StripeApi>::new())
            .service(MercadopagoConnectRoute::<MercadoPagoApi>::new())
            .service(PaymentAccountsRoute::<SqliteDatabase>::new());
        let stripe_scope = web::scope("/webhooks/stripe")
            .wrap(StripeSignatureMiddlewareFactory::new(config.stripe.webhook_secret.clone()))
            .service(StripeWebhookRoute::<SqliteDatabase>::new());
        app.service(health)
            .service(api_scope)
            .service(stripe_scope)
            .service(MercadopagoWebhookRoute::<SqliteDatabase, MercadoPagoApi>::new())
            .service(MercadopagoCallbackRoute::<SqliteDatabase, MercadoPagoApi>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
