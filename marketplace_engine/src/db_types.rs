//! Data types that map onto rows of the marketplace database, along with the `New*` structs used to insert them.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
pub use mkt_common::{CommissionRate, CommissionSplit, Money};
use serde::{Deserialize, Serialize};
use serde_json::Value;
pub use sqlx::types::Json;
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value for {0}: {1}")]
pub struct ConversionError(&'static str, String);

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// The order has been written and is waiting for payment.
    Processing,
    /// The payment provider confirmed the payment.
    Paid,
    /// The payment provider reported that the payment failed.
    Failed,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Processing => write!(f, "processing"),
            OrderStatusType::Paid => write!(f, "paid"),
            OrderStatusType::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(Self::Processing),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            s => Err(ConversionError("order status", s.to_string())),
        }
    }
}

//--------------------------------------    PaymentStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Completed => write!(f, "completed"),
            PaymentStatus::Failed => write!(f, "failed"),
        }
    }
}

//--------------------------------------   PaymentProvider     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    Stripe,
    MercadoPago,
}

impl PaymentProvider {
    /// The order in which providers are tried when a store has more than one connected account.
    pub const PREFERENCE: [PaymentProvider; 2] = [PaymentProvider::Stripe, PaymentProvider::MercadoPago];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::Stripe => "stripe",
            PaymentProvider::MercadoPago => "mercadopago",
        }
    }
}

impl Display for PaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentProvider {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stripe" => Ok(Self::Stripe),
            "mercadopago" => Ok(Self::MercadoPago),
            _ => Err(ConversionError("payment provider", s.to_string())),
        }
    }
}

//--------------------------------------  TransactionStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    Refunded,
}

//--------------------------------------         Role          ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Buyer,
    Vendor,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Buyer => write!(f, "Buyer"),
            Role::Vendor => write!(f, "Vendor"),
            Role::Admin => write!(f, "Admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Buyer" => Ok(Self::Buyer),
            "Vendor" => Ok(Self::Vendor),
            "Admin" => Ok(Self::Admin),
            s => Err(ConversionError("role", s.to_string())),
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid role: {value}. This conversion cannot fail, so defaulting to Buyer");
            Role::Buyer
        })
    }
}

//--------------------------------------        Product        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub store_id: i64,
    pub category_id: Option<i64>,
    pub name: String,
    pub price: Money,
    pub stock_quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub store_id: i64,
    pub category_id: Option<i64>,
    pub name: String,
    pub price: Money,
    pub stock_quantity: i64,
}

impl NewProduct {
    pub fn new<S: Into<String>>(store_id: i64, name: S, price: Money, stock_quantity: i64) -> Self {
        Self { store_id, category_id: None, name: name.into(), price, stock_quantity }
    }

    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: String,
    pub store_id: i64,
    pub total_amount: Money,
    pub shipping_cost: Money,
    pub shipping_address_id: String,
    pub status: OrderStatusType,
    pub payment_status: PaymentStatus,
    pub payment_intent_id: Option<String>,
    pub payment_provider: Option<PaymentProvider>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_settled(&self) -> bool {
        self.payment_status == PaymentStatus::Completed
    }
}

/// A fully priced order, ready to be written. The total has already been computed from the captured item prices and
/// the resolved shipping cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: String,
    pub store_id: i64,
    pub shipping_address_id: String,
    pub shipping_cost: Money,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(NewOrderItem::line_total).sum()
    }

    pub fn total_amount(&self) -> Money {
        self.subtotal() + self.shipping_cost
    }
}

//--------------------------------------       OrderItem       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub price_at_purchase: Money,
}

impl OrderItem {
    pub fn line_total(&self) -> Money {
        self.price_at_purchase * self.quantity
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub quantity: i64,
    pub price_at_purchase: Money,
}

impl NewOrderItem {
    pub fn line_total(&self) -> Money {
        self.price_at_purchase * self.quantity
    }

    /// The line total, or `None` if it does not fit in a [`Money`].
    pub fn checked_line_total(&self) -> Option<Money> {
        self.price_at_purchase.checked_mul(self.quantity)
    }
}

//--------------------------------------  VendorPaymentAccount ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct VendorPaymentAccount {
    pub id: i64,
    pub store_id: i64,
    pub provider: PaymentProvider,
    pub account_id: String,
    pub is_active: bool,
    #[serde(skip_serializing, default)]
    pub access_token: Option<String>,
    #[serde(skip_serializing, default)]
    pub refresh_token: Option<String>,
    pub public_key: Option<String>,
    pub metadata: Json<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewVendorPaymentAccount {
    pub store_id: i64,
    pub provider: PaymentProvider,
    pub account_id: String,
    pub is_active: bool,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub public_key: Option<String>,
    pub metadata: Value,
}

impl NewVendorPaymentAccount {
    pub fn new<S: Into<String>>(store_id: i64, provider: PaymentProvider, account_id: S) -> Self {
        Self {
            store_id,
            provider,
            account_id: account_id.into(),
            is_active: false,
            access_token: None,
            refresh_token: None,
            public_key: None,
            metadata: Value::Object(Default::default()),
        }
    }

    pub fn active(mut self) -> Self {
        self.is_active = true;
        self
    }

    pub fn with_tokens(mut self, access_token: String, refresh_token: Option<String>, public_key: Option<String>) -> Self {
        self.access_token = Some(access_token);
        self.refresh_token = refresh_token;
        self.public_key = public_key;
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

//--------------------------------------      Transaction      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub order_id: i64,
    pub store_id: i64,
    pub buyer_id: String,
    pub provider: PaymentProvider,
    pub payment_intent_id: String,
    pub charge_id: Option<String>,
    pub amount: Money,
    pub marketplace_fee: Money,
    pub vendor_payout: Money,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub order_id: i64,
    pub store_id: i64,
    pub buyer_id: String,
    pub provider: PaymentProvider,
    pub payment_intent_id: String,
    pub charge_id: Option<String>,
    pub split: CommissionSplit,
}

//--------------------------------------     WebhookEvent      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: i64,
    pub provider: PaymentProvider,
    pub event_type: String,
    pub event_id: String,
    pub payload: String,
    pub processed: bool,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// A provider callback, logged verbatim before it is handled. `(provider, event_id)` identifies a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWebhookEvent {
    pub provider: PaymentProvider,
    pub event_type: String,
    pub event_id: String,
    pub payload: String,
}

impl NewWebhookEvent {
    pub fn new<S1, S2, S3>(provider: PaymentProvider, event_type: S1, event_id: S2, payload: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self { provider, event_type: event_type.into(), event_id: event_id.into(), payload: payload.into() }
    }
}

//--------------------------------------    ShippingConfig     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ShippingConfig {
    pub store_id: i64,
    pub local_delivery_enabled: bool,
    pub local_radius_km: i64,
    pub local_base_price: Money,
    pub national_shipping_enabled: bool,
    pub national_flat_rate: Option<Money>,
    pub free_shipping_threshold: Option<Money>,
    pub active_providers: Json<Vec<String>>,
}

impl ShippingConfig {
    /// The settings a store has before its vendor saves anything: national shipping at the marketplace default rate.
    pub fn default_for_store(store_id: i64) -> Self {
        Self {
            store_id,
            local_delivery_enabled: false,
            local_radius_km: 0,
            local_base_price: Money::default(),
            national_shipping_enabled: true,
            national_flat_rate: None,
            free_shipping_threshold: None,
            active_providers: Json(vec![]),
        }
    }
}

//--------------------------------------    CommissionRule     ---------------------------------------------------------
/// A row of `commission_config`. A rule with neither `store_id` nor `category_id` is the platform-wide rate.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CommissionRule {
    pub id: i64,
    pub category_id: Option<i64>,
    pub store_id: Option<i64>,
    pub commission_bps: CommissionRate,
    pub is_active: bool,
}
