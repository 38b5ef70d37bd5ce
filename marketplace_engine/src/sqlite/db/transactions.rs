use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewTransaction, Transaction},
    traits::MarketplaceDbError,
};

/// Appends a settlement record. Returns `None` if a transaction for the same provider payment already exists.
pub async fn insert_transaction(
    transaction: NewTransaction,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, MarketplaceDbError> {
    let result = sqlx::query_as(
        r#"
            INSERT INTO transactions (
                order_id,
                store_id,
                buyer_id,
                provider,
                payment_intent_id,
                charge_id,
                amount,
                marketplace_fee,
                vendor_payout,
                status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'completed')
            RETURNING *;
        "#,
    )
    .bind(transaction.order_id)
    .bind(transaction.store_id)
    .bind(&transaction.buyer_id)
    .bind(transaction.provider)
    .bind(&transaction.payment_intent_id)
    .bind(&transaction.charge_id)
    .bind(transaction.split.gross)
    .bind(transaction.split.marketplace_fee)
    .bind(transaction.split.vendor_payout)
    .fetch_all(conn)
    .await;
    match result {
        Ok(rows) => Ok(rows.into_iter().next()),
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            debug!(
                "🗃️ A {} transaction for payment {} already exists",
                transaction.provider, transaction.payment_intent_id
            );
            Ok(None)
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn refund_by_charge_id(
    charge_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, MarketplaceDbError> {
    let tx = sqlx::query_as(
        r#"
            UPDATE transactions SET status = 'refunded', updated_at = CURRENT_TIMESTAMP
            WHERE charge_id = $1
            RETURNING *;
        "#,
    )
    .bind(charge_id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    Ok(tx)
}

pub async fn fetch_transactions_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Transaction>, MarketplaceDbError> {
    let txs = sqlx::query_as("SELECT * FROM transactions WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(txs)
}
