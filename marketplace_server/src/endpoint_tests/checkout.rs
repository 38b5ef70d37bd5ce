use actix_web::{http::StatusCode, web, web::ServiceConfig};
use marketplace_engine::{
    db_types::{Money, PaymentProvider, PaymentStatus},
    events::EventProducers,
    traits::{MarketplaceDbError, PaymentProviderError, ProviderIntent},
    CheckoutApi,
    PaymentIntentApi,
    ShippingApi,
};
use serde_json::json;

use super::{
    helpers::{
        buyer_token,
        get_request,
        json_body,
        order,
        order_item,
        payment_account,
        post_request,
        product,
        BUYER_ID,
        STORE_ID,
    },
    mocks::{MockGateway, MockMarketplaceDb},
};
use crate::routes::{CreatePaymentIntentRoute, OrderByIdRoute, PlaceOrderRoute, ShippingRatesRoute};

fn order_request() -> serde_json::Value {
    json!({
        "items": [{"product_id": 1, "quantity": 2}, {"product_id": 2, "quantity": 1}],
        "shipping_address_id": "addr-1",
        "store_id": STORE_ID
    })
}

fn configure_checkout(db: MockMarketplaceDb) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = CheckoutApi::new(db, EventProducers::default());
        cfg.service(PlaceOrderRoute::<MockMarketplaceDb>::new())
            .service(OrderByIdRoute::<MockMarketplaceDb>::new())
            .app_data(web::Data::new(api));
    }
}

fn configure_payments(db: MockMarketplaceDb, gateway: MockGateway) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = PaymentIntentApi::new(db, gateway);
        cfg.service(CreatePaymentIntentRoute::<MockMarketplaceDb, MockGateway>::new()).app_data(web::Data::new(api));
    }
}

#[actix_web::test]
async fn place_order() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_fetch_products().returning(|_| Ok(vec![product(1, 100, 5), product(2, 50, 3)]));
    db.expect_fetch_shipping_config().returning(|_| Ok(None));
    db.expect_insert_order_with_items()
        .withf(|o| {
            o.user_id == BUYER_ID &&
                o.store_id == STORE_ID &&
                o.shipping_cost == Money::from_major(150) &&
                o.subtotal() == Money::from_major(250)
        })
        .times(1)
        .returning(|_| Ok((order(11, 400, PaymentStatus::Pending), vec![order_item(11, 1, 2, 100), order_item(11, 2, 1, 50)])));
    let (status, body) = post_request(&buyer_token(), "/orders", order_request(), configure_checkout(db)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let json = json_body(&body);
    assert_eq!(json["success"], true);
    assert_eq!(json["order_id"], 11);
    assert_eq!(json["total"], 40_000);
    assert_eq!(json["shipping_cost"], 15_000);
    assert_eq!(json["payment_status"], "pending");
}

#[actix_web::test]
async fn place_order_needs_a_session() {
    let _ = env_logger::try_init();
    let (status, body) = post_request("", "/orders", order_request(), configure_checkout(MockMarketplaceDb::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json_body(&body)["error"].as_str().unwrap().contains("No session token"));
}

#[actix_web::test]
async fn place_order_with_tampered_token() {
    let _ = env_logger::try_init();
    let mut token = buyer_token();
    token.replace_range(token.len() - 6..token.len() - 2, "AAAA");
    let (status, _) = post_request(&token, "/orders", order_request(), configure_checkout(MockMarketplaceDb::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn place_order_insufficient_stock() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_fetch_products().returning(|_| Ok(vec![product(1, 100, 1), product(2, 50, 3)]));
    db.expect_insert_order_with_items().never();
    let (status, body) = post_request(&buyer_token(), "/orders", order_request(), configure_checkout(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json_body(&body)["error"].as_str().unwrap().contains("product 1"));
}

#[actix_web::test]
async fn place_order_unknown_product() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_fetch_products().returning(|_| Ok(vec![product(1, 100, 5)]));
    db.expect_insert_order_with_items().never();
    let (status, _) = post_request(&buyer_token(), "/orders", order_request(), configure_checkout(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn place_order_lost_race_for_stock() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_fetch_products().returning(|_| Ok(vec![product(1, 100, 5), product(2, 50, 3)]));
    db.expect_fetch_shipping_config().returning(|_| Ok(None));
    db.expect_insert_order_with_items()
        .returning(|_| Err(MarketplaceDbError::StockExhausted { product_id: 2, available: 0 }));
    let (status, _) = post_request(&buyer_token(), "/orders", order_request(), configure_checkout(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn place_order_write_failure() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_fetch_products().returning(|_| Ok(vec![product(1, 100, 5), product(2, 50, 3)]));
    db.expect_fetch_shipping_config().returning(|_| Err(MarketplaceDbError::DatabaseError("locked".into())));
    db.expect_insert_order_with_items().returning(|_| Err(MarketplaceDbError::DatabaseError("disk full".into())));
    let (status, _) = post_request(&buyer_token(), "/orders", order_request(), configure_checkout(db)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn fetch_own_order() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_fetch_order().returning(|id| Ok(Some(order(id, 400, PaymentStatus::Pending))));
    db.expect_fetch_order_items().returning(|id| Ok(vec![order_item(id, 1, 2, 100)]));
    let (status, body) = get_request(&buyer_token(), "/orders/11", configure_checkout(db)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let json = json_body(&body);
    assert_eq!(json["order"]["id"], 11);
    assert_eq!(json["items"][0]["price_at_purchase"], 10_000);
}

#[actix_web::test]
async fn fetch_someone_elses_order() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_fetch_order().returning(|id| {
        let mut o = order(id, 400, PaymentStatus::Pending);
        o.user_id = "someone-else".into();
        Ok(Some(o))
    });
    db.expect_fetch_order_items().never();
    let (status, _) = get_request(&buyer_token(), "/orders/11", configure_checkout(db)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

fn payment_db(accounts_active: bool) -> MockMarketplaceDb {
    let mut db = MockMarketplaceDb::new();
    db.expect_fetch_order().returning(|id| Ok(Some(order(id, 400, PaymentStatus::Pending))));
    db.expect_fetch_payment_accounts()
        .returning(move |_| Ok(vec![payment_account(PaymentProvider::Stripe, "acct_1", accounts_active)]));
    db.expect_fetch_order_items().returning(|id| Ok(vec![order_item(id, 1, 2, 100), order_item(id, 2, 1, 50)]));
    db.expect_fetch_products().returning(|_| Ok(vec![product(1, 100, 3), product(2, 50, 2)]));
    db.expect_fetch_commission_rules().returning(|_| Ok(vec![]));
    db
}

#[actix_web::test]
async fn create_payment_intent_charges_stored_total() {
    let _ = env_logger::try_init();
    let mut db = payment_db(true);
    db.expect_attach_payment_intent()
        .withf(|id, provider, intent| *id == 11 && *provider == PaymentProvider::Stripe && intent == "pi_123")
        .times(1)
        .returning(|id, _, _| Ok(order(id, 400, PaymentStatus::Pending)));
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_payment_intent()
        .withf(|account, req| {
            account.account_id == "acct_1" &&
                req.amount() == Money::from_major(400) &&
                req.split.marketplace_fee == Money::from_major(40) &&
                req.split.vendor_payout == Money::from_major(360) &&
                req.items.len() == 2
        })
        .times(1)
        .returning(|_, _| {
            Ok(ProviderIntent {
                provider: PaymentProvider::Stripe,
                payment_intent_id: "pi_123".into(),
                client_secret: Some("pi_123_secret".into()),
                redirect_url: None,
            })
        });
    // The client's figure is ignored
    let body = json!({"order_id": 11, "amount": 100, "store_id": STORE_ID});
    let (status, body) = post_request(&buyer_token(), "/payment_intents", body, configure_payments(db, gateway)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let json = json_body(&body);
    assert_eq!(json["payment_intent_id"], "pi_123");
    assert_eq!(json["client_secret"], "pi_123_secret");
}

#[actix_web::test]
async fn create_payment_intent_without_vendor_account() {
    let _ = env_logger::try_init();
    let mut db = payment_db(false);
    db.expect_attach_payment_intent().never();
    let mut gateway = MockGateway::new();
    gateway.expect_create_payment_intent().never();
    let body = json!({"order_id": 11, "store_id": STORE_ID});
    let (status, body) = post_request(&buyer_token(), "/payment_intents", body, configure_payments(db, gateway)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["code"], "VENDOR_PAYMENT_NOT_CONFIGURED");
}

#[actix_web::test]
async fn create_payment_intent_provider_down() {
    let _ = env_logger::try_init();
    let mut db = payment_db(true);
    db.expect_attach_payment_intent().never();
    let mut gateway = MockGateway::new();
    gateway.expect_create_payment_intent().returning(|_, _| {
        Err(PaymentProviderError::Unavailable { provider: PaymentProvider::Stripe, message: "timeout".into() })
    });
    let body = json!({"order_id": 11, "store_id": STORE_ID});
    let (status, _) = post_request(&buyer_token(), "/payment_intents", body, configure_payments(db, gateway)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[actix_web::test]
async fn create_payment_intent_for_paid_order() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_fetch_order().returning(|id| Ok(Some(order(id, 400, PaymentStatus::Completed))));
    let mut gateway = MockGateway::new();
    gateway.expect_create_payment_intent().never();
    let body = json!({"order_id": 11, "store_id": STORE_ID});
    let (status, _) = post_request(&buyer_token(), "/payment_intents", body, configure_payments(db, gateway)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn shipping_rates_without_settings() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_fetch_shipping_config().returning(|_| Ok(None));
    let configure = move |cfg: &mut ServiceConfig| {
        cfg.service(ShippingRatesRoute::<MockMarketplaceDb>::new()).app_data(web::Data::new(ShippingApi::new(db)));
    };
    let body = json!({"store_id": STORE_ID, "subtotal": 25_000});
    let (status, body) = post_request("", "/shipping/rates", body, configure).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let json = json_body(&body);
    let rates = json["rates"].as_array().unwrap();
    assert_eq!(rates.len(), 1);
    assert_eq!(rates[0]["price"], 15_000);
}
