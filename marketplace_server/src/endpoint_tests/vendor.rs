use actix_web::{http::StatusCode, web, web::ServiceConfig};
use marketplace_engine::{
    db_types::{Json, Money, PaymentProvider},
    PaymentAccountsApi,
    ShippingApi,
};
use provider_tools::{encode_oauth_state, AccountLink, OAuthToken, ProviderApiError, StripeAccount};
use serde_json::json;

use super::{
    helpers::{buyer_token, get_request, issue_token, json_body, payment_account, post_request, vendor_token, STORE_ID},
    mocks::{MockMarketplaceDb, MockMercadoPago, MockStripe},
};
use crate::{
    config::ServerOptions,
    routes::{
        MercadopagoCallbackRoute,
        MercadopagoConnectRoute,
        PaymentAccountsRoute,
        ShippingConfigRoute,
        StripeConnectRoute,
        StripeStatusRoute,
        UpdateShippingConfigRoute,
    },
};

const SETTINGS_URL: &str = "http://localhost:3000/dashboard/vendor/settings";

fn configure_shipping(db: MockMarketplaceDb) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(ShippingConfigRoute::<MockMarketplaceDb>::new())
            .service(UpdateShippingConfigRoute::<MockMarketplaceDb>::new())
            .app_data(web::Data::new(ShippingApi::new(db)));
    }
}

fn configure_accounts(
    db: MockMarketplaceDb,
    stripe: MockStripe,
    mercadopago: MockMercadoPago,
) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(StripeConnectRoute::<MockMarketplaceDb, MockStripe>::new())
            .service(StripeStatusRoute::<MockMarketplaceDb, MockStripe>::new())
            .service(MercadopagoConnectRoute::<MockMercadoPago>::new())
            .service(MercadopagoCallbackRoute::<MockMarketplaceDb, MockMercadoPago>::new())
            .service(PaymentAccountsRoute::<MockMarketplaceDb>::new())
            .app_data(web::Data::new(PaymentAccountsApi::new(db)))
            .app_data(web::Data::new(stripe))
            .app_data(web::Data::new(mercadopago))
            .app_data(web::Data::new(ServerOptions::default()));
    }
}

fn stripe_account(id: &str, enabled: bool) -> StripeAccount {
    serde_json::from_value(json!({
        "id": id,
        "charges_enabled": enabled,
        "payouts_enabled": enabled,
        "details_submitted": enabled
    }))
    .unwrap()
}

fn shipping_config_json(local_price: i64) -> serde_json::Value {
    json!({
        "store_id": STORE_ID,
        "local_delivery_enabled": true,
        "local_radius_km": 10,
        "local_base_price": local_price,
        "national_shipping_enabled": true,
        "national_flat_rate": 9_900,
        "free_shipping_threshold": 100_000,
        "active_providers": ["estafeta"]
    })
}

#[actix_web::test]
async fn read_default_shipping_config() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_fetch_shipping_config().returning(|_| Ok(None));
    let path = format!("/vendor/shipping_config?store_id={STORE_ID}");
    let (status, body) = get_request(&vendor_token(), &path, configure_shipping(db)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let json = json_body(&body);
    assert_eq!(json["store_id"], STORE_ID);
    assert_eq!(json["national_shipping_enabled"], true);
    assert_eq!(json["local_delivery_enabled"], false);
}

#[actix_web::test]
async fn buyers_cannot_use_vendor_routes() {
    let _ = env_logger::try_init();
    let path = format!("/vendor/shipping_config?store_id={STORE_ID}");
    let (status, body) = get_request(&buyer_token(), &path, configure_shipping(MockMarketplaceDb::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(json_body(&body)["error"].as_str().unwrap().contains("Vendor"));
}

#[actix_web::test]
async fn vendors_only_manage_their_own_store() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_fetch_shipping_config().never();
    let (status, _) = get_request(&vendor_token(), "/vendor/shipping_config?store_id=99", configure_shipping(db)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn admins_manage_every_store() {
    use marketplace_engine::db_types::Role;
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_fetch_shipping_config().returning(|_| Ok(None));
    let token = issue_token("admin", vec![Role::Vendor, Role::Admin], vec![]);
    let (status, _) = get_request(&token, "/vendor/shipping_config?store_id=99", configure_shipping(db)).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn save_shipping_config() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_upsert_shipping_config()
        .withf(|c| c.local_base_price == Money::from(5_000) && c.active_providers == Json(vec!["estafeta".to_string()]))
        .times(1)
        .returning(Ok);
    let (status, body) =
        post_request(&vendor_token(), "/vendor/shipping_config", shipping_config_json(5_000), configure_shipping(db))
            .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json_body(&body)["national_flat_rate"], 9_900);
}

#[actix_web::test]
async fn reject_negative_shipping_prices() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_upsert_shipping_config().never();
    let (status, _) =
        post_request(&vendor_token(), "/vendor/shipping_config", shipping_config_json(-1), configure_shipping(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn stripe_connect_creates_inactive_account() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_fetch_payment_account().returning(|_, _| Ok(None));
    db.expect_upsert_payment_account()
        .withf(|a| {
            a.store_id == STORE_ID && a.provider == PaymentProvider::Stripe && a.account_id == "acct_new" && !a.is_active
        })
        .times(1)
        .returning(|a| Ok(payment_account(a.provider, &a.account_id, a.is_active)));
    let mut stripe = MockStripe::new();
    stripe
        .expect_create_account()
        .withf(|store, email| *store == STORE_ID && email.as_deref() == Some("luis@example.com"))
        .times(1)
        .returning(|_, _| Ok(stripe_account("acct_new", false)));
    stripe
        .expect_create_account_link()
        .withf(|acct, refresh, ret| {
            acct == "acct_new" &&
                refresh == format!("{SETTINGS_URL}?stripe=refresh") &&
                ret == format!("{SETTINGS_URL}?stripe=success")
        })
        .returning(|_, _, _| Ok(AccountLink { url: "https://connect.stripe.test/setup/abc".into(), expires_at: None }));
    let body = json!({"store_id": STORE_ID, "email": "luis@example.com"});
    let (status, body) =
        post_request(&vendor_token(), "/vendor/stripe/connect", body, configure_accounts(db, stripe, MockMercadoPago::new()))
            .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let json = json_body(&body);
    assert_eq!(json["url"], "https://connect.stripe.test/setup/abc");
    assert_eq!(json["account_id"], "acct_new");
}

#[actix_web::test]
async fn stripe_connect_resumes_onboarding() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_fetch_payment_account().returning(|_, p| Ok(Some(payment_account(p, "acct_old", false))));
    db.expect_upsert_payment_account().returning(|a| Ok(payment_account(a.provider, &a.account_id, a.is_active)));
    let mut stripe = MockStripe::new();
    stripe.expect_create_account().never();
    stripe
        .expect_create_account_link()
        .returning(|_, _, _| Ok(AccountLink { url: "https://connect.stripe.test/setup/old".into(), expires_at: None }));
    let body = json!({"store_id": STORE_ID});
    let (status, body) =
        post_request(&vendor_token(), "/vendor/stripe/connect", body, configure_accounts(db, stripe, MockMercadoPago::new()))
            .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json_body(&body)["account_id"], "acct_old");
}

#[actix_web::test]
async fn stripe_connect_when_already_active() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_fetch_payment_account().returning(|_, p| Ok(Some(payment_account(p, "acct_live", true))));
    db.expect_upsert_payment_account().never();
    let mut stripe = MockStripe::new();
    stripe.expect_create_account_link().never();
    let body = json!({"store_id": STORE_ID});
    let (status, body) =
        post_request(&vendor_token(), "/vendor/stripe/connect", body, configure_accounts(db, stripe, MockMercadoPago::new()))
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["error"], "Stripe account already connected");
}

#[actix_web::test]
async fn stripe_status_without_account() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_fetch_payment_account().returning(|_, _| Ok(None));
    let mut stripe = MockStripe::new();
    stripe.expect_get_account().never();
    let path = format!("/vendor/stripe/status?store_id={STORE_ID}");
    let (status, body) =
        get_request(&vendor_token(), &path, configure_accounts(db, stripe, MockMercadoPago::new())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let json = json_body(&body);
    assert_eq!(json["connected"], false);
    assert_eq!(json["is_active"], false);
}

#[actix_web::test]
async fn stripe_status_activates_account() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_fetch_payment_account().returning(|_, p| Ok(Some(payment_account(p, "acct_1", false))));
    db.expect_update_account_status()
        .withf(|p, acct, active, _| *p == PaymentProvider::Stripe && acct == "acct_1" && *active)
        .times(1)
        .returning(|p, acct, active, _| Ok(Some(payment_account(p, acct, active))));
    let mut stripe = MockStripe::new();
    stripe.expect_get_account().returning(|id| Ok(stripe_account(id, true)));
    let path = format!("/vendor/stripe/status?store_id={STORE_ID}");
    let (status, body) =
        get_request(&vendor_token(), &path, configure_accounts(db, stripe, MockMercadoPago::new())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let json = json_body(&body);
    assert_eq!(json["connected"], true);
    assert_eq!(json["account_id"], "acct_1");
    assert_eq!(json["is_active"], true);
    assert_eq!(json["onboarding_complete"], true);
}

#[actix_web::test]
async fn stripe_status_provider_error() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_fetch_payment_account().returning(|_, p| Ok(Some(payment_account(p, "acct_1", false))));
    db.expect_update_account_status().never();
    let mut stripe = MockStripe::new();
    stripe.expect_get_account().returning(|_| {
        Err(ProviderApiError::QueryError { status: 404, code: "resource_missing".into(), message: "No such account".into() })
    });
    let path = format!("/vendor/stripe/status?store_id={STORE_ID}");
    let (status, _) = get_request(&vendor_token(), &path, configure_accounts(db, stripe, MockMercadoPago::new())).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[actix_web::test]
async fn mercadopago_connect_url() {
    let _ = env_logger::try_init();
    let mut mercadopago = MockMercadoPago::new();
    mercadopago
        .expect_authorization_url()
        .withf(|store, uri| *store == STORE_ID && uri == "http://localhost:3000/mercadopago/callback")
        .returning(|_, _| Ok("https://auth.mercadopago.test/authorization?client_id=1".into()));
    let path = format!("/vendor/mercadopago/connect?store_id={STORE_ID}");
    let (status, body) =
        get_request(&vendor_token(), &path, configure_accounts(MockMarketplaceDb::new(), MockStripe::new(), mercadopago))
            .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json_body(&body)["url"], "https://auth.mercadopago.test/authorization?client_id=1");
}

#[actix_web::test]
async fn mercadopago_callback_stores_active_account() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_upsert_payment_account()
        .withf(|a| {
            a.store_id == STORE_ID &&
                a.provider == PaymentProvider::MercadoPago &&
                a.account_id == "987654" &&
                a.is_active &&
                a.access_token.as_deref() == Some("APP_USR-vendor") &&
                a.public_key.as_deref() == Some("APP_USR-pk")
        })
        .times(1)
        .returning(|a| Ok(payment_account(a.provider, &a.account_id, a.is_active)));
    let mut mercadopago = MockMercadoPago::new();
    mercadopago.expect_exchange_code().withf(|code, _| code == "TG-abc").returning(|_, _| {
        let token: OAuthToken = serde_json::from_value(json!({
            "access_token": "APP_USR-vendor",
            "refresh_token": "TG-refresh",
            "public_key": "APP_USR-pk",
            "user_id": 987654,
            "expires_in": 15_552_000,
            "scope": "offline_access payments write"
        }))
        .unwrap();
        Ok(token)
    });
    let path = format!("/mercadopago/callback?code=TG-abc&state={}", encode_oauth_state(STORE_ID));
    let (status, _) = get_request("", &path, configure_accounts(db, MockStripe::new(), mercadopago)).await;
    assert_eq!(status, StatusCode::FOUND);
}

#[actix_web::test]
async fn mercadopago_callback_with_denied_consent() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_upsert_payment_account().never();
    let mut mercadopago = MockMercadoPago::new();
    mercadopago.expect_exchange_code().never();
    let path = "/mercadopago/callback?error=access_denied";
    let req = actix_web::test::TestRequest::get().uri(path);
    let configure = configure_accounts(db, MockStripe::new(), mercadopago);
    let app = actix_web::App::new().configure(configure);
    let service = actix_web::test::init_service(app).await;
    let res = actix_web::test::call_service(&service, req.to_request()).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    let location = res.headers().get("location").unwrap().to_str().unwrap();
    assert_eq!(location, format!("{SETTINGS_URL}?error=mercadopago_connection_failed"));
}

#[actix_web::test]
async fn list_payment_accounts_hides_tokens() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_fetch_payment_accounts().returning(|_| {
        Ok(vec![
            payment_account(PaymentProvider::Stripe, "acct_1", true),
            payment_account(PaymentProvider::MercadoPago, "987654", true),
        ])
    });
    let path = format!("/vendor/payment_accounts?store_id={STORE_ID}");
    let (status, body) =
        get_request(&vendor_token(), &path, configure_accounts(db, MockStripe::new(), MockMercadoPago::new())).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let json = json_body(&body);
    assert_eq!(json.as_array().unwrap().len(), 2);
    assert!(!body.contains("vendor-access-token"));
    assert_eq!(json[1]["provider"], "mercadopago");
}
