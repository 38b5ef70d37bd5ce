use serde_json::Value;

use crate::{
    db_types::{NewVendorPaymentAccount, PaymentProvider, VendorPaymentAccount},
    traits::MarketplaceDbError,
};

/// Tracks the accounts vendors have connected with each payment provider. There is at most one account per
/// `(store, provider)` pair.
#[allow(async_fn_in_trait)]
pub trait VendorAccountManagement {
    /// All accounts for the store, active or not.
    async fn fetch_payment_accounts(&self, store_id: i64) -> Result<Vec<VendorPaymentAccount>, MarketplaceDbError>;

    async fn fetch_payment_account(
        &self,
        store_id: i64,
        provider: PaymentProvider,
    ) -> Result<Option<VendorPaymentAccount>, MarketplaceDbError>;

    /// Inserts the account, or replaces the existing account for the same store and provider.
    async fn upsert_payment_account(
        &self,
        account: NewVendorPaymentAccount,
    ) -> Result<VendorPaymentAccount, MarketplaceDbError>;

    /// Sets the active flag and metadata on the account identified by the provider's own account id. Returns `None`
    /// if no store has connected that account.
    async fn update_account_status(
        &self,
        provider: PaymentProvider,
        account_id: &str,
        is_active: bool,
        metadata: Value,
    ) -> Result<Option<VendorPaymentAccount>, MarketplaceDbError>;
}
