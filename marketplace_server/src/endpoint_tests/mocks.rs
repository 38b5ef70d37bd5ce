use marketplace_engine::{
    db_types::{
        CommissionRule,
        NewOrder,
        NewTransaction,
        NewVendorPaymentAccount,
        NewWebhookEvent,
        Order,
        OrderItem,
        PaymentProvider,
        Product,
        ShippingConfig,
        Transaction,
        VendorPaymentAccount,
    },
    traits::{
        MarketplaceDatabase,
        MarketplaceDbError,
        PaymentGateway,
        PaymentProviderError,
        ProviderIntent,
        ProviderIntentRequest,
        RecordedWebhookEvent,
        SettlementManagement,
        SettlementResult,
        ShippingManagement,
        VendorAccountManagement,
    },
};
use mockall::mock;
use provider_tools::{AccountLink, MercadoPagoPayment, OAuthToken, ProviderApiError, StripeAccount};
use serde_json::Value;

use crate::integrations::{MercadoPagoClient, StripeConnect};

mock! {
    pub MarketplaceDb {}
    impl Clone for MarketplaceDb {
        fn clone(&self) -> Self;
    }
    impl MarketplaceDatabase for MarketplaceDb {
        fn url(&self) -> &str;
        async fn fetch_products(&self, ids: &[i64]) -> Result<Vec<Product>, MarketplaceDbError>;
        async fn insert_order_with_items(&self, order: NewOrder) -> Result<(Order, Vec<OrderItem>), MarketplaceDbError>;
        async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, MarketplaceDbError>;
        async fn fetch_order_by_payment_intent(&self, payment_intent_id: &str) -> Result<Option<Order>, MarketplaceDbError>;
        async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, MarketplaceDbError>;
        async fn attach_payment_intent(&self, order_id: i64, provider: PaymentProvider, payment_intent_id: &str) -> Result<Order, MarketplaceDbError>;
        async fn fetch_commission_rules(&self, store_id: i64) -> Result<Vec<CommissionRule>, MarketplaceDbError>;
    }
    impl ShippingManagement for MarketplaceDb {
        async fn fetch_shipping_config(&self, store_id: i64) -> Result<Option<ShippingConfig>, MarketplaceDbError>;
        async fn upsert_shipping_config(&self, config: ShippingConfig) -> Result<ShippingConfig, MarketplaceDbError>;
    }
    impl VendorAccountManagement for MarketplaceDb {
        async fn fetch_payment_accounts(&self, store_id: i64) -> Result<Vec<VendorPaymentAccount>, MarketplaceDbError>;
        async fn fetch_payment_account(&self, store_id: i64, provider: PaymentProvider) -> Result<Option<VendorPaymentAccount>, MarketplaceDbError>;
        async fn upsert_payment_account(&self, account: NewVendorPaymentAccount) -> Result<VendorPaymentAccount, MarketplaceDbError>;
        async fn update_account_status(&self, provider: PaymentProvider, account_id: &str, is_active: bool, metadata: Value) -> Result<Option<VendorPaymentAccount>, MarketplaceDbError>;
    }
    impl SettlementManagement for MarketplaceDb {
        async fn record_webhook_event(&self, event: NewWebhookEvent) -> Result<RecordedWebhookEvent, MarketplaceDbError>;
        async fn mark_webhook_processed(&self, id: i64) -> Result<(), MarketplaceDbError>;
        async fn mark_webhook_failed(&self, id: i64, error: &str) -> Result<(), MarketplaceDbError>;
        async fn settle_order(&self, transaction: NewTransaction) -> Result<SettlementResult, MarketplaceDbError>;
        async fn fail_order(&self, order_id: i64) -> Result<Order, MarketplaceDbError>;
        async fn refund_transaction(&self, charge_id: &str) -> Result<Option<Transaction>, MarketplaceDbError>;
        async fn fetch_transactions_for_order(&self, order_id: i64) -> Result<Vec<Transaction>, MarketplaceDbError>;
    }
}

mock! {
    pub Gateway {}
    impl PaymentGateway for Gateway {
        async fn create_payment_intent(&self, account: &VendorPaymentAccount, request: &ProviderIntentRequest) -> Result<ProviderIntent, PaymentProviderError>;
    }
}

mock! {
    pub Stripe {}
    impl StripeConnect for Stripe {
        async fn create_account(&self, store_id: i64, email: Option<String>) -> Result<StripeAccount, ProviderApiError>;
        async fn create_account_link(&self, account_id: &str, refresh_url: &str, return_url: &str) -> Result<AccountLink, ProviderApiError>;
        async fn get_account(&self, account_id: &str) -> Result<StripeAccount, ProviderApiError>;
    }
}

mock! {
    pub MercadoPago {}
    impl MercadoPagoClient for MercadoPago {
        fn authorization_url(&self, store_id: i64, redirect_uri: &str) -> Result<String, ProviderApiError>;
        async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<OAuthToken, ProviderApiError>;
        async fn get_payment(&self, payment_id: &str) -> Result<MercadoPagoPayment, ProviderApiError>;
    }
}
