use serde_json::Value;
use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{NewVendorPaymentAccount, PaymentProvider, VendorPaymentAccount},
    traits::MarketplaceDbError,
};

pub async fn fetch_accounts_for_store(
    store_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<VendorPaymentAccount>, MarketplaceDbError> {
    let accounts = sqlx::query_as("SELECT * FROM vendor_payment_accounts WHERE store_id = $1 ORDER BY id ASC")
        .bind(store_id)
        .fetch_all(conn)
        .await?;
    Ok(accounts)
}

pub async fn fetch_account(
    store_id: i64,
    provider: PaymentProvider,
    conn: &mut SqliteConnection,
) -> Result<Option<VendorPaymentAccount>, MarketplaceDbError> {
    let account = sqlx::query_as("SELECT * FROM vendor_payment_accounts WHERE store_id = $1 AND provider = $2")
        .bind(store_id)
        .bind(provider)
        .fetch_optional(conn)
        .await?;
    Ok(account)
}

/// Inserts the account, or overwrites the one already registered for the same store and provider.
pub async fn upsert_account(
    account: NewVendorPaymentAccount,
    conn: &mut SqliteConnection,
) -> Result<VendorPaymentAccount, MarketplaceDbError> {
    let account = sqlx::query_as(
        r#"
            INSERT INTO vendor_payment_accounts (
                store_id,
                provider,
                account_id,
                is_active,
                access_token,
                refresh_token,
                public_key,
                metadata
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (store_id, provider) DO UPDATE SET
                account_id = excluded.account_id,
                is_active = excluded.is_active,
                access_token = COALESCE(excluded.access_token, vendor_payment_accounts.access_token),
                refresh_token = COALESCE(excluded.refresh_token, vendor_payment_accounts.refresh_token),
                public_key = COALESCE(excluded.public_key, vendor_payment_accounts.public_key),
                metadata = excluded.metadata,
                updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(account.store_id)
    .bind(account.provider)
    .bind(account.account_id)
    .bind(account.is_active)
    .bind(account.access_token)
    .bind(account.refresh_token)
    .bind(account.public_key)
    .bind(Json(account.metadata))
    .fetch_all(conn)
    .await?
    .into_iter()
    .next()
    .ok_or(sqlx::Error::RowNotFound)?;
    Ok(account)
}

pub async fn update_status(
    provider: PaymentProvider,
    account_id: &str,
    is_active: bool,
    metadata: Value,
    conn: &mut SqliteConnection,
) -> Result<Option<VendorPaymentAccount>, MarketplaceDbError> {
    let account = sqlx::query_as(
        r#"
            UPDATE vendor_payment_accounts
            SET is_active = $1, metadata = $2, updated_at = CURRENT_TIMESTAMP
            WHERE provider = $3 AND account_id = $4
            RETURNING *;
        "#,
    )
    .bind(is_active)
    .bind(Json(metadata))
    .bind(provider)
    .bind(account_id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    Ok(account)
}
