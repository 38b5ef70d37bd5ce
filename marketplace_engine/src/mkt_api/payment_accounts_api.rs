use std::fmt::Debug;

use log::*;
use serde_json::Value;

use crate::{
    db_types::{NewVendorPaymentAccount, PaymentProvider, VendorPaymentAccount},
    mkt_api::errors::MarketplaceError,
    traits::VendorAccountManagement,
};

/// The account a payment for `store_id` should be routed to: the first provider in
/// [`PaymentProvider::PREFERENCE`] for which the store has an active account.
pub async fn select_payment_account<B: VendorAccountManagement>(
    db: &B,
    store_id: i64,
) -> Result<Option<VendorPaymentAccount>, MarketplaceError> {
    let accounts = db.fetch_payment_accounts(store_id).await?;
    let selected = PaymentProvider::PREFERENCE
        .iter()
        .find_map(|provider| accounts.iter().find(|a| a.provider == *provider && a.is_active).cloned());
    Ok(selected)
}

/// Manages the payment accounts vendors connect with each provider.
pub struct PaymentAccountsApi<B> {
    db: B,
}

impl<B> Debug for PaymentAccountsApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentAccountsApi")
    }
}

impl<B> PaymentAccountsApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> PaymentAccountsApi<B>
where B: VendorAccountManagement
{
    pub async fn accounts_for_store(&self, store_id: i64) -> Result<Vec<VendorPaymentAccount>, MarketplaceError> {
        let accounts = self.db.fetch_payment_accounts(store_id).await?;
        Ok(accounts)
    }

    pub async fn account_for_store(
        &self,
        store_id: i64,
        provider: PaymentProvider,
    ) -> Result<Option<VendorPaymentAccount>, MarketplaceError> {
        let account = self.db.fetch_payment_account(store_id, provider).await?;
        Ok(account)
    }

    pub async fn active_account(&self, store_id: i64) -> Result<Option<VendorPaymentAccount>, MarketplaceError> {
        select_payment_account(&self.db, store_id).await
    }

    /// Saves the result of an onboarding step. Tokens that are not supplied keep their stored values.
    pub async fn connect_account(&self, account: NewVendorPaymentAccount) -> Result<VendorPaymentAccount, MarketplaceError> {
        let store_id = account.store_id;
        let provider = account.provider;
        let account = self.db.upsert_payment_account(account).await?;
        info!(
            "💳️ Store {store_id} connected {provider} account {} (active: {})",
            account.account_id, account.is_active
        );
        Ok(account)
    }

    /// Applies a capability report from the provider. An account can take payments only when the provider has
    /// enabled both charges and payouts. Returns `None` if no store owns `account_id`.
    pub async fn refresh_account_status(
        &self,
        provider: PaymentProvider,
        account_id: &str,
        charges_enabled: bool,
        payouts_enabled: bool,
        metadata: Value,
    ) -> Result<Option<VendorPaymentAccount>, MarketplaceError> {
        let is_active = charges_enabled && payouts_enabled;
        let account = self.db.update_account_status(provider, account_id, is_active, metadata).await?;
        match &account {
            Some(acc) => debug!("💳️ {provider} account {account_id} (store {}) is_active={is_active}", acc.store_id),
            None => warn!("💳️ Received a status update for unknown {provider} account {account_id}"),
        }
        Ok(account)
    }
}
