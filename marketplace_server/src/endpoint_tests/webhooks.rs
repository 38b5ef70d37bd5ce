use actix_web::{
    http::StatusCode,
    test::TestRequest,
    web,
    web::ServiceConfig,
};
use chrono::Utc;
use marketplace_engine::{
    db_types::{Money, PaymentProvider, PaymentStatus, Transaction, TransactionStatus},
    events::EventProducers,
    traits::{MarketplaceDbError, RecordedWebhookEvent, SettlementResult},
    SettlementApi,
};
use mkt_common::Secret;
use provider_tools::{
    stripe_signature::{sign, SIGNATURE_HEADER},
    MercadoPagoPayment,
    ProviderApiError,
};
use serde_json::json;

use super::{
    helpers::{json_body, order, send_request, webhook_event, BUYER_ID, STORE_ID},
    mocks::{MockMarketplaceDb, MockMercadoPago},
};
use crate::{
    config::ServerOptions,
    middleware::StripeSignatureMiddlewareFactory,
    routes::{MercadopagoWebhookRoute, StripeWebhookRoute},
};

const WEBHOOK_SECRET: &str = "whsec_test_3f9a1c";

fn transaction(order_id: i64, provider: PaymentProvider, intent: &str, amount: Money, fee: Money) -> Transaction {
    Transaction {
        id: 1,
        order_id,
        store_id: STORE_ID,
        buyer_id: BUYER_ID.to_string(),
        provider,
        payment_intent_id: intent.to_string(),
        charge_id: None,
        amount,
        marketplace_fee: fee,
        vendor_payout: amount - fee,
        status: TransactionStatus::Completed,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn recorded(provider: PaymentProvider, event_id: &str, is_new: bool, processed: bool) -> RecordedWebhookEvent {
    RecordedWebhookEvent { event: webhook_event(3, provider, event_id, processed), is_new }
}

//-----------------------------------------------   Stripe   -----------------------------------------------------

fn configure_stripe(db: MockMarketplaceDb) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = SettlementApi::new(db, EventProducers::default());
        cfg.app_data(web::Data::new(api)).service(
            web::scope("/webhooks/stripe")
                .wrap(StripeSignatureMiddlewareFactory::new(Secret::new(WEBHOOK_SECRET.to_string())))
                .service(StripeWebhookRoute::<MockMarketplaceDb>::new()),
        );
    }
}

fn payment_succeeded_body() -> String {
    json!({
        "id": "evt_pi_1",
        "type": "payment_intent.succeeded",
        "created": 1718000000,
        "data": { "object": {
            "id": "pi_1", "amount": 40000, "amount_received": 40000, "application_fee_amount": 4000,
            "latest_charge": "ch_1", "metadata": { "marketplace_order_id": "11" }
        }}
    })
    .to_string()
}

fn signed_stripe_request(body: &str) -> TestRequest {
    let signature = sign(body.as_bytes(), WEBHOOK_SECRET, Utc::now().timestamp());
    TestRequest::post()
        .uri("/webhooks/stripe")
        .insert_header((SIGNATURE_HEADER, signature))
        .insert_header(("content-type", "application/json"))
        .set_payload(body.to_string())
}

#[actix_web::test]
async fn stripe_payment_settles_order() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_record_webhook_event()
        .withf(|ev| ev.provider == PaymentProvider::Stripe && ev.event_id == "evt_pi_1" && ev.payload.contains("pi_1"))
        .times(1)
        .returning(|ev| Ok(recorded(ev.provider, &ev.event_id, true, false)));
    db.expect_fetch_order().returning(|id| Ok(Some(order(id, 400, PaymentStatus::Pending))));
    db.expect_settle_order()
        .withf(|tx| {
            tx.order_id == 11 &&
                tx.payment_intent_id == "pi_1" &&
                tx.charge_id.as_deref() == Some("ch_1") &&
                tx.split.marketplace_fee == Money::from_major(40) &&
                tx.split.vendor_payout == Money::from_major(360)
        })
        .times(1)
        .returning(|tx| {
            Ok(SettlementResult::Settled {
                order: order(tx.order_id, 400, PaymentStatus::Completed),
                transaction: transaction(
                    tx.order_id,
                    tx.provider,
                    &tx.payment_intent_id,
                    tx.split.gross,
                    tx.split.marketplace_fee,
                ),
            })
        });
    db.expect_mark_webhook_processed().withf(|id| *id == 3).times(1).returning(|_| Ok(()));
    let body = payment_succeeded_body();
    let (status, body) = send_request(signed_stripe_request(&body), configure_stripe(db)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let json = json_body(&body);
    assert_eq!(json["received"], true);
    assert_eq!(json["outcome"], "processed");
}

#[actix_web::test]
async fn stripe_redelivery_is_acknowledged() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_record_webhook_event().returning(|ev| Ok(recorded(ev.provider, &ev.event_id, false, true)));
    db.expect_settle_order().never();
    db.expect_mark_webhook_processed().never();
    let body = payment_succeeded_body();
    let (status, body) = send_request(signed_stripe_request(&body), configure_stripe(db)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json_body(&body)["outcome"], "duplicate");
}

#[actix_web::test]
async fn stripe_webhook_without_signature() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_record_webhook_event().never();
    let req = TestRequest::post().uri("/webhooks/stripe").set_payload(payment_succeeded_body());
    let (status, body) = send_request(req, configure_stripe(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json_body(&body)["error"].as_str().unwrap().contains("signature"));
}

#[actix_web::test]
async fn stripe_webhook_with_tampered_body() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_record_webhook_event().never();
    let signature = sign(payment_succeeded_body().as_bytes(), WEBHOOK_SECRET, Utc::now().timestamp());
    let tampered = payment_succeeded_body().replace("\"application_fee_amount\":4000", "\"application_fee_amount\":0");
    let req = TestRequest::post()
        .uri("/webhooks/stripe")
        .insert_header((SIGNATURE_HEADER, signature))
        .set_payload(tampered);
    let (status, _) = send_request(req, configure_stripe(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn stripe_webhook_failure_is_retried() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_record_webhook_event().returning(|ev| Ok(recorded(ev.provider, &ev.event_id, true, false)));
    db.expect_fetch_order().returning(|id| Ok(Some(order(id, 400, PaymentStatus::Pending))));
    db.expect_settle_order().returning(|_| Err(MarketplaceDbError::DatabaseError("database is locked".into())));
    db.expect_mark_webhook_processed().never();
    db.expect_mark_webhook_failed()
        .withf(|id, error| *id == 3 && error.contains("locked"))
        .times(1)
        .returning(|_, _| Ok(()));
    let body = payment_succeeded_body();
    let (status, _) = send_request(signed_stripe_request(&body), configure_stripe(db)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn stripe_account_update() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_record_webhook_event().returning(|ev| Ok(recorded(ev.provider, &ev.event_id, true, false)));
    db.expect_update_account_status()
        .withf(|p, acct, active, meta| {
            *p == PaymentProvider::Stripe && acct == "acct_9" && *active && meta["stripe_event_id"] == "evt_acct"
        })
        .times(1)
        .returning(|p, acct, active, _| Ok(Some(super::helpers::payment_account(p, acct, active))));
    db.expect_mark_webhook_processed().returning(|_| Ok(()));
    let body = json!({
        "id": "evt_acct",
        "type": "account.updated",
        "data": { "object": { "id": "acct_9", "charges_enabled": true, "payouts_enabled": true } }
    })
    .to_string();
    let (status, body) = send_request(signed_stripe_request(&body), configure_stripe(db)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json_body(&body)["outcome"], "processed");
}

//---------------------------------------------   MercadoPago   ---------------------------------------------------

fn configure_mercadopago(db: MockMarketplaceDb, mercadopago: MockMercadoPago) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = SettlementApi::new(db, EventProducers::default());
        cfg.service(MercadopagoWebhookRoute::<MockMarketplaceDb, MockMercadoPago>::new())
            .app_data(web::Data::new(api))
            .app_data(web::Data::new(mercadopago))
            .app_data(web::Data::new(ServerOptions::default()));
    }
}

fn mp_payment(status: &str) -> MercadoPagoPayment {
    serde_json::from_value(json!({
        "id": 555,
        "status": status,
        "external_reference": "11",
        "transaction_amount": 400.0,
        "marketplace_fee": 40.0,
        "currency_id": "MXN"
    }))
    .unwrap()
}

#[actix_web::test]
async fn mercadopago_approved_payment() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_record_webhook_event()
        .withf(|ev| ev.provider == PaymentProvider::MercadoPago && ev.event_id == "payment:555")
        .times(1)
        .returning(|ev| Ok(recorded(ev.provider, &ev.event_id, true, false)));
    db.expect_fetch_order().returning(|id| Ok(Some(order(id, 400, PaymentStatus::Pending))));
    db.expect_settle_order()
        .withf(|tx| {
            tx.order_id == 11 &&
                tx.provider == PaymentProvider::MercadoPago &&
                tx.payment_intent_id == "555" &&
                tx.split.gross == Money::from_major(400) &&
                tx.split.marketplace_fee == Money::from_major(40)
        })
        .times(1)
        .returning(|tx| {
            Ok(SettlementResult::Settled {
                order: order(tx.order_id, 400, PaymentStatus::Completed),
                transaction: transaction(
                    tx.order_id,
                    tx.provider,
                    &tx.payment_intent_id,
                    tx.split.gross,
                    tx.split.marketplace_fee,
                ),
            })
        });
    db.expect_mark_webhook_processed().times(1).returning(|_| Ok(()));
    let mut mercadopago = MockMercadoPago::new();
    mercadopago.expect_get_payment().withf(|id| id == "555").returning(|_| Ok(mp_payment("approved")));
    let req = TestRequest::post().uri("/webhooks/mercadopago?topic=payment&id=555");
    let (status, body) = send_request(req, configure_mercadopago(db, mercadopago)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json_body(&body)["outcome"], "processed");
}

#[actix_web::test]
async fn mercadopago_notification_in_body() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_record_webhook_event()
        .withf(|ev| ev.event_id == "payment:556")
        .returning(|ev| Ok(recorded(ev.provider, &ev.event_id, true, false)));
    db.expect_fetch_order().returning(|id| Ok(Some(order(id, 400, PaymentStatus::Pending))));
    db.expect_fail_order().times(1).returning(|id| Ok(order(id, 400, PaymentStatus::Failed)));
    db.expect_mark_webhook_processed().returning(|_| Ok(()));
    let mut mercadopago = MockMercadoPago::new();
    mercadopago.expect_get_payment().returning(|_| Ok(mp_payment("rejected")));
    let req = TestRequest::post()
        .uri("/webhooks/mercadopago")
        .set_json(json!({"type": "payment", "data": {"id": "556"}}));
    let (status, body) = send_request(req, configure_mercadopago(db, mercadopago)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json_body(&body)["outcome"], "processed");
}

#[actix_web::test]
async fn mercadopago_missing_id() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_record_webhook_event().never();
    let req = TestRequest::post().uri("/webhooks/mercadopago?topic=payment");
    let (status, _) = send_request(req, configure_mercadopago(db, MockMercadoPago::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn mercadopago_merchant_order_is_ignored() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_record_webhook_event().returning(|ev| Ok(recorded(ev.provider, &ev.event_id, true, false)));
    db.expect_mark_webhook_processed().times(1).returning(|_| Ok(()));
    let mut mercadopago = MockMercadoPago::new();
    mercadopago.expect_get_payment().never();
    let req = TestRequest::post().uri("/webhooks/mercadopago?topic=merchant_order&id=42");
    let (status, body) = send_request(req, configure_mercadopago(db, mercadopago)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json_body(&body)["outcome"], "ignored");
}

#[actix_web::test]
async fn mercadopago_redelivery_skips_lookup() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_record_webhook_event().returning(|ev| Ok(recorded(ev.provider, &ev.event_id, false, true)));
    db.expect_settle_order().never();
    let mut mercadopago = MockMercadoPago::new();
    mercadopago.expect_get_payment().never();
    let req = TestRequest::post().uri("/webhooks/mercadopago?topic=payment&id=555");
    let (status, body) = send_request(req, configure_mercadopago(db, mercadopago)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json_body(&body)["outcome"], "duplicate");
}

#[actix_web::test]
async fn mercadopago_lookup_failure_is_retried() {
    let _ = env_logger::try_init();
    let mut db = MockMarketplaceDb::new();
    db.expect_record_webhook_event().returning(|ev| Ok(recorded(ev.provider, &ev.event_id, true, false)));
    db.expect_mark_webhook_processed().never();
    db.expect_mark_webhook_failed().times(1).returning(|_, _| Ok(()));
    let mut mercadopago = MockMercadoPago::new();
    mercadopago.expect_get_payment().returning(|_| Err(ProviderApiError::RestRequestError("connection reset".into())));
    let req = TestRequest::post().uri("/webhooks/mercadopago?topic=payment&id=555");
    let (status, _) = send_request(req, configure_mercadopago(db, mercadopago)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
