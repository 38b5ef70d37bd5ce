use actix_web::{
    body::to_bytes,
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use chrono::{Duration, TimeZone, Utc};
use log::debug;
use marketplace_engine::db_types::{
    Json,
    Money,
    Order,
    OrderItem,
    OrderStatusType,
    PaymentProvider,
    PaymentStatus,
    Product,
    Role,
    VendorPaymentAccount,
    WebhookEvent,
};
use mkt_common::Secret;
use serde_json::json;

use crate::auth::{SessionClaims, TokenIssuer, SESSION_HEADER};

pub const BUYER_ID: &str = "buyer-ana";
pub const VENDOR_ID: &str = "vendor-luis";
pub const STORE_ID: i64 = 7;

// Signs test tokens only. DO NOT re-use this secret anywhere.
pub fn token_issuer() -> TokenIssuer {
    TokenIssuer::new(Secret::new("a8f9c0d1e2b3a4958677c6d5e4f30211".to_string()))
}

pub fn issue_token(user_id: &str, roles: Vec<Role>, store_ids: Vec<i64>) -> String {
    let claims = SessionClaims { user_id: user_id.to_string(), roles, store_ids };
    token_issuer().issue_token(claims, Some(Duration::days(1))).expect("Failed to sign token")
}

pub fn buyer_token() -> String {
    issue_token(BUYER_ID, vec![Role::Buyer], vec![])
}

pub fn vendor_token() -> String {
    issue_token(VENDOR_ID, vec![Role::Vendor], vec![STORE_ID])
}

/// Sends the request to an app built by `configure` and returns the status and body, whether the response came from
/// a handler or from middleware.
pub async fn send_request(req: TestRequest, configure: impl FnOnce(&mut ServiceConfig)) -> (StatusCode, String) {
    let app = App::new().app_data(web::Data::new(token_issuer())).configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => res.into_parts().1,
        Err(e) => e.error_response(),
    };
    let status = res.status();
    let body = to_bytes(res.into_body()).await.map(|b| String::from_utf8_lossy(&b).into_owned()).unwrap_or_default();
    (status, body)
}

pub async fn get_request(
    token: &str,
    path: &str,
    configure: impl FnOnce(&mut ServiceConfig),
) -> (StatusCode, String) {
    let mut req = TestRequest::get().uri(path);
    if !token.is_empty() {
        req = req.insert_header((SESSION_HEADER, token));
    }
    send_request(req, configure).await
}

pub async fn post_request(
    token: &str,
    path: &str,
    body: serde_json::Value,
    configure: impl FnOnce(&mut ServiceConfig),
) -> (StatusCode, String) {
    let mut req = TestRequest::post().uri(path).set_json(body);
    if !token.is_empty() {
        req = req.insert_header((SESSION_HEADER, token));
    }
    send_request(req, configure).await
}

pub fn json_body(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Response is not JSON ({e}): {body}"))
}

//-----------------------------------------------  Fixtures  -----------------------------------------------------

fn timestamp() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

pub fn product(id: i64, price: i64, stock: i64) -> Product {
    Product {
        id,
        store_id: STORE_ID,
        category_id: None,
        name: format!("Product {id}"),
        price: Money::from_major(price),
        stock_quantity: stock,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

pub fn order(id: i64, total: i64, payment_status: PaymentStatus) -> Order {
    let status = match payment_status {
        PaymentStatus::Pending => OrderStatusType::Processing,
        PaymentStatus::Completed => OrderStatusType::Paid,
        PaymentStatus::Failed => OrderStatusType::Failed,
    };
    Order {
        id,
        user_id: BUYER_ID.to_string(),
        store_id: STORE_ID,
        total_amount: Money::from_major(total),
        shipping_cost: Money::from_major(150),
        shipping_address_id: "addr-1".to_string(),
        status,
        payment_status,
        payment_intent_id: None,
        payment_provider: None,
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

pub fn order_item(order_id: i64, product_id: i64, quantity: i64, price: i64) -> OrderItem {
    OrderItem { id: product_id * 10, order_id, product_id, quantity, price_at_purchase: Money::from_major(price) }
}

pub fn payment_account(provider: PaymentProvider, account_id: &str, is_active: bool) -> VendorPaymentAccount {
    VendorPaymentAccount {
        id: 1,
        store_id: STORE_ID,
        provider,
        account_id: account_id.to_string(),
        is_active,
        access_token: Some("vendor-access-token".to_string()),
        refresh_token: None,
        public_key: None,
        metadata: Json(json!({})),
        created_at: timestamp(),
        updated_at: timestamp(),
    }
}

pub fn webhook_event(id: i64, provider: PaymentProvider, event_id: &str, processed: bool) -> WebhookEvent {
    WebhookEvent {
        id,
        provider,
        event_type: "payment".to_string(),
        event_id: event_id.to_string(),
        payload: "{}".to_string(),
        processed,
        error: None,
        created_at: timestamp(),
        processed_at: None,
    }
}
