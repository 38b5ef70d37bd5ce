//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every database and provider call here is async, so handlers
//! yield while they wait:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, http::header, web, HttpRequest, HttpResponse, Responder};
use log::*;
use marketplace_engine::{
    db_types::{NewVendorPaymentAccount, PaymentProvider, Role, ShippingConfig},
    order_objects::{NewOrderRequest, PaymentIntentRequest},
    settlement_objects::{SettlementEvent, WebhookOutcome},
    traits::{MarketplaceDatabase, PaymentGateway, SettlementManagement, ShippingManagement, VendorAccountManagement},
    CheckoutApi,
    MarketplaceError,
    PaymentAccountsApi,
    PaymentIntentApi,
    SettlementApi,
    ShippingApi,
};
use provider_tools::{decode_oauth_state, StripeEvent};
use serde_json::json;

use crate::{
    auth::SessionClaims,
    config::ServerOptions,
    data_objects::{
        AuthorizationUrl,
        MercadoPagoQuery,
        OAuthCallbackParams,
        ShippingRatesRequest,
        ShippingRatesResponse,
        StoreQuery,
        StripeAccountStatus,
        StripeConnectRequest,
        StripeConnectResponse,
        WebhookAck,
    },
    errors::ServerError,
    helpers::get_remote_ip,
    integrations::{
        gateway::provider_error,
        mercadopago::{payment_settlement_event, MercadoPagoNotification},
        stripe::{raw_stripe_event, stripe_settlement_event},
        MercadoPagoClient,
        StripeConnect,
    },
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro.
// Each bound in `impl A, B` becomes one type parameter of the route, in the same order as the handler's.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ident),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ident),+ where requires [$($roles:expr),+])  => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(place_order => Post "/orders" impl MarketplaceDatabase);
/// Route handler for order creation
///
/// The first step of checkout. The cart is checked against the store's catalogue, priced from the stored product
/// prices, charged shipping, and written as a single pending order. The buyer is the session's user.
///
/// Responds with `{ success, order_id, total, shipping_cost, payment_status }`. Amounts are in minor units.
pub async fn place_order<B: MarketplaceDatabase>(
    claims: SessionClaims,
    body: web::Json<NewOrderRequest>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    debug!("💻️ POST order for {} from store {} ({} lines)", claims.user_id, request.store_id, request.items.len());
    let placed = api.place_order(&claims.user_id, request).await?;
    Ok(HttpResponse::Ok().json(placed))
}

route!(order_by_id => Get "/orders/{order_id}" impl MarketplaceDatabase);
pub async fn order_by_id<B: MarketplaceDatabase>(
    claims: SessionClaims,
    path: web::Path<i64>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET order #{order_id} for {}", claims.user_id);
    let order = api.fetch_order_for_buyer(&claims.user_id, order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(create_payment_intent => Post "/payment_intents" impl MarketplaceDatabase, PaymentGateway);
/// Route handler for the second step of checkout
///
/// Hands the buyer's pending order to the store's payment provider. The stored order total is charged, whatever
/// `amount` the client sends. Stripe returns a `client_secret` for the front end; MercadoPago returns the
/// `redirect_url` of its hosted checkout.
///
/// A store without an active payment account gets a 400 with `code: VENDOR_PAYMENT_NOT_CONFIGURED`.
pub async fn create_payment_intent<B, G>(
    claims: SessionClaims,
    body: web::Json<PaymentIntentRequest>,
    api: web::Data<PaymentIntentApi<B, G>>,
) -> Result<HttpResponse, ServerError>
where
    B: MarketplaceDatabase,
    G: PaymentGateway,
{
    let request = body.into_inner();
    debug!("💻️ POST payment intent for order #{} by {}", request.order_id, claims.user_id);
    let intent = api.create_payment_intent(&claims.user_id, request).await?;
    Ok(HttpResponse::Ok().json(intent))
}

route!(shipping_rates => Post "/shipping/rates" impl ShippingManagement);
pub async fn shipping_rates<B: ShippingManagement>(
    body: web::Json<ShippingRatesRequest>,
    api: web::Data<ShippingApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let ShippingRatesRequest { store_id, subtotal } = body.into_inner();
    trace!("💻️ POST shipping rates for store {store_id}, subtotal {subtotal}");
    let rates = api.quote_rates(store_id, subtotal).await;
    Ok(HttpResponse::Ok().json(ShippingRatesResponse { rates }))
}

//----------------------------------------------   Vendor  ----------------------------------------------------
route!(shipping_config => Get "/vendor/shipping_config" impl ShippingManagement where requires [Role::Vendor]);
pub async fn shipping_config<B: ShippingManagement>(
    claims: SessionClaims,
    query: web::Query<StoreQuery>,
    api: web::Data<ShippingApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let store_id = query.store_id;
    claims.check_store(store_id)?;
    debug!("💻️ GET shipping config for store {store_id}");
    let config = api.shipping_config(store_id).await?;
    Ok(HttpResponse::Ok().json(config))
}

route!(update_shipping_config => Post "/vendor/shipping_config" impl ShippingManagement where requires [Role::Vendor]);
pub async fn update_shipping_config<B: ShippingManagement>(
    claims: SessionClaims,
    body: web::Json<ShippingConfig>,
    api: web::Data<ShippingApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let config = body.into_inner();
    claims.check_store(config.store_id)?;
    debug!("💻️ POST shipping config for store {}", config.store_id);
    let config = api.save_shipping_config(config).await?;
    Ok(HttpResponse::Ok().json(config))
}

route!(stripe_connect => Post "/vendor/stripe/connect" impl VendorAccountManagement, StripeConnect where requires [Role::Vendor]);
/// Route handler for Stripe onboarding
///
/// Creates a Stripe account for the store (or reuses the one it started onboarding with) and returns the link to
/// Stripe's hosted onboarding form. The account is stored inactive; it becomes active once Stripe reports that
/// charges and payouts are enabled, either through `account.updated` webhooks or the status endpoint.
pub async fn stripe_connect<B, S>(
    claims: SessionClaims,
    body: web::Json<StripeConnectRequest>,
    api: web::Data<PaymentAccountsApi<B>>,
    stripe: web::Data<S>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    B: VendorAccountManagement,
    S: StripeConnect,
{
    let StripeConnectRequest { store_id, email } = body.into_inner();
    claims.check_store(store_id)?;
    debug!("💻️ POST Stripe connect for store {store_id}");
    let existing = api.account_for_store(store_id, PaymentProvider::Stripe).await?;
    let account_id = match existing {
        Some(account) if account.is_active => {
            info!("💻️ Store {store_id} already has an active Stripe account ({})", account.account_id);
            return Err(ServerError::AccountAlreadyConnected("Stripe".into()));
        },
        Some(account) => account.account_id,
        None => stripe.create_account(store_id, email).await?.id,
    };
    let settings_url = options.vendor_settings_url();
    let refresh_url = format!("{settings_url}?stripe=refresh");
    let return_url = format!("{settings_url}?stripe=success");
    let link = stripe.create_account_link(&account_id, &refresh_url, &return_url).await?;
    let account = NewVendorPaymentAccount::new(store_id, PaymentProvider::Stripe, account_id);
    let account = api.connect_account(account).await?;
    Ok(HttpResponse::Ok().json(StripeConnectResponse { url: link.url, account_id: account.account_id }))
}

route!(stripe_status => Get "/vendor/stripe/status" impl VendorAccountManagement, StripeConnect where requires [Role::Vendor]);
pub async fn stripe_status<B, S>(
    claims: SessionClaims,
    query: web::Query<StoreQuery>,
    api: web::Data<PaymentAccountsApi<B>>,
    stripe: web::Data<S>,
) -> Result<HttpResponse, ServerError>
where
    B: VendorAccountManagement,
    S: StripeConnect,
{
    let store_id = query.store_id;
    claims.check_store(store_id)?;
    debug!("💻️ GET Stripe status for store {store_id}");
    let Some(account) = api.account_for_store(store_id, PaymentProvider::Stripe).await? else {
        return Ok(HttpResponse::Ok().json(StripeAccountStatus::default()));
    };
    let remote = stripe.get_account(&account.account_id).await?;
    let metadata = json!({
        "charges_enabled": remote.charges_enabled,
        "payouts_enabled": remote.payouts_enabled,
        "details_submitted": remote.details_submitted,
    });
    let is_active = api
        .refresh_account_status(
            PaymentProvider::Stripe,
            &account.account_id,
            remote.charges_enabled,
            remote.payouts_enabled,
            metadata,
        )
        .await?
        .map(|a| a.is_active)
        .unwrap_or(account.is_active);
    let status = StripeAccountStatus {
        connected: true,
        account_id: Some(account.account_id),
        charges_enabled: remote.charges_enabled,
        payouts_enabled: remote.payouts_enabled,
        is_active,
        onboarding_complete: remote.onboarding_complete(),
    };
    Ok(HttpResponse::Ok().json(status))
}

route!(mercadopago_connect => Get "/vendor/mercadopago/connect" impl MercadoPagoClient where requires [Role::Vendor]);
/// Route handler for MercadoPago onboarding
///
/// Returns the MercadoPago OAuth URL the vendor must visit. The store id travels in the `state` parameter and comes
/// back to [`mercadopago_callback`].
pub async fn mercadopago_connect<M: MercadoPagoClient>(
    claims: SessionClaims,
    query: web::Query<StoreQuery>,
    mercadopago: web::Data<M>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError> {
    let store_id = query.store_id;
    claims.check_store(store_id)?;
    debug!("💻️ GET MercadoPago connect URL for store {store_id}");
    let url = mercadopago.authorization_url(store_id, &options.mercadopago_redirect_uri())?;
    Ok(HttpResponse::Ok().json(AuthorizationUrl { url }))
}

route!(payment_accounts => Get "/vendor/payment_accounts" impl VendorAccountManagement where requires [Role::Vendor]);
pub async fn payment_accounts<B: VendorAccountManagement>(
    claims: SessionClaims,
    query: web::Query<StoreQuery>,
    api: web::Data<PaymentAccountsApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let store_id = query.store_id;
    claims.check_store(store_id)?;
    debug!("💻️ GET payment accounts for store {store_id}");
    let accounts = api.accounts_for_store(store_id).await?;
    Ok(HttpResponse::Ok().json(accounts))
}

route!(mercadopago_callback => Get "/mercadopago/callback" impl VendorAccountManagement, MercadoPagoClient);
/// Route handler for the MercadoPago OAuth redirect
///
/// MercadoPago sends the vendor's browser here after they authorize the marketplace. The code is exchanged for the
/// vendor's tokens, which are stored against the store named in `state`, and the vendor is sent back to their
/// dashboard. Failures are reported to the dashboard as an `error` query parameter rather than as an error page.
pub async fn mercadopago_callback<B, M>(
    query: web::Query<OAuthCallbackParams>,
    api: web::Data<PaymentAccountsApi<B>>,
    mercadopago: web::Data<M>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    B: VendorAccountManagement,
    M: MercadoPagoClient,
{
    let settings_url = options.vendor_settings_url();
    let params = query.into_inner();
    let redirect = match connect_mercadopago(params, api.get_ref(), mercadopago.get_ref(), &options).await {
        Ok(store_id) => {
            info!("💻️ Store {store_id} connected its MercadoPago account");
            format!("{settings_url}?mercadopago=connected")
        },
        Err(e) => {
            warn!("💻️ MercadoPago connection failed. {e}");
            format!("{settings_url}?error=mercadopago_connection_failed")
        },
    };
    Ok(HttpResponse::Found().insert_header((header::LOCATION, redirect)).finish())
}

async fn connect_mercadopago<B, M>(
    params: OAuthCallbackParams,
    api: &PaymentAccountsApi<B>,
    mercadopago: &M,
    options: &ServerOptions,
) -> Result<i64, ServerError>
where
    B: VendorAccountManagement,
    M: MercadoPagoClient,
{
    if let Some(error) = params.error {
        return Err(ServerError::InvalidRequestBody(format!("MercadoPago returned an error: {error}")));
    }
    let (Some(code), Some(state)) = (params.code, params.state) else {
        return Err(ServerError::InvalidRequestBody("The callback is missing the code or state".into()));
    };
    let store_id = decode_oauth_state(&state)?;
    let token = mercadopago.exchange_code(&code, &options.mercadopago_redirect_uri()).await?;
    let metadata = json!({ "scope": token.scope, "expires_in": token.expires_in });
    let account = NewVendorPaymentAccount::new(store_id, PaymentProvider::MercadoPago, token.account_id())
        .active()
        .with_tokens(token.access_token, token.refresh_token, token.public_key)
        .with_metadata(metadata);
    api.connect_account(account).await?;
    Ok(store_id)
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
route!(stripe_webhook => Post "" impl SettlementManagement);
/// Route handler for Stripe webhooks
///
/// The signature has been checked by the time this runs (see [`crate::middleware::StripeSignatureMiddlewareFactory`]).
/// Any error while handling the event returns a 500 so that Stripe delivers it again; events that were already
/// handled are acknowledged without side effects.
pub async fn stripe_webhook<B: SettlementManagement>(
    body: web::Bytes,
    api: web::Data<SettlementApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let payload = std::str::from_utf8(body.as_ref())
        .map_err(|e| ServerError::InvalidRequestBody(format!("Webhook body is not UTF-8. {e}")))?;
    let event = serde_json::from_str::<StripeEvent>(payload).map_err(|e| {
        warn!("🪝️ Could not parse Stripe event. {e}");
        ServerError::InvalidRequestBody(e.to_string())
    })?;
    trace!("🪝️ Received Stripe event {} ({})", event.id, event.event_type);
    let outcome = api
        .receive(raw_stripe_event(&event, payload), stripe_settlement_event(&event))
        .await
        .map_err(|e| ServerError::WebhookProcessingError(e.to_string()))?;
    Ok(HttpResponse::Ok().json(WebhookAck::new(outcome)))
}

route!(mercadopago_webhook => Post "/webhooks/mercadopago" impl SettlementManagement, MercadoPagoClient);
/// Route handler for MercadoPago IPN notifications
///
/// Notifications only say which resource changed. The delivery is logged first, then the payment is looked up with
/// the platform's credentials, which is what makes the notification trustworthy.
pub async fn mercadopago_webhook<B, M>(
    req: HttpRequest,
    query: web::Query<MercadoPagoQuery>,
    body: web::Bytes,
    api: web::Data<SettlementApi<B>>,
    mercadopago: web::Data<M>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementManagement,
    M: MercadoPagoClient,
{
    let peer = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded);
    let notification = MercadoPagoNotification::from_request(&query, body.as_ref()).ok_or_else(|| {
        debug!("🪝️ MercadoPago notification without a topic or id: {query:?}");
        ServerError::InvalidRequestBody("Missing topic or id".into())
    })?;
    debug!("🪝️ Received MercadoPago notification {} from {peer:?}", notification.event_id());
    let recorded = api
        .record_event(notification.raw_event(body.as_ref()))
        .await
        .map_err(|e| ServerError::WebhookProcessingError(e.to_string()))?;
    if recorded.is_duplicate() {
        return Ok(HttpResponse::Ok().json(WebhookAck::new(WebhookOutcome::Duplicate)));
    }
    let event = if notification.is_payment() {
        match mercadopago.get_payment(&notification.id).await {
            Ok(payment) => payment_settlement_event(&payment),
            Err(e) => {
                let err = MarketplaceError::from(provider_error(PaymentProvider::MercadoPago, e));
                api.abandon_event(&recorded, &err).await;
                return Err(ServerError::WebhookProcessingError(err.to_string()));
            },
        }
    } else {
        SettlementEvent::ignored(format!("MercadoPago topic {} is not handled", notification.topic))
    };
    let outcome =
        api.process_event(&recorded, event).await.map_err(|e| ServerError::WebhookProcessingError(e.to_string()))?;
    Ok(HttpResponse::Ok().json(WebhookAck::new(outcome)))
}
