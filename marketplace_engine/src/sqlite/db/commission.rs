use sqlx::SqliteConnection;

use crate::{
    db_types::{CommissionRate, CommissionRule},
    traits::MarketplaceDbError,
};

const RULE_COLUMNS: &str = "id, category_id, store_id, commission_bps, is_active";

/// Active rules scoped to the store, to a category only, or platform-wide.
pub async fn fetch_rules_for_store(
    store_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<CommissionRule>, MarketplaceDbError> {
    let rules = sqlx::query_as(&format!(
        "SELECT {RULE_COLUMNS} FROM commission_config WHERE is_active = TRUE AND (store_id = $1 OR store_id IS NULL) \
         ORDER BY id ASC"
    ))
    .bind(store_id)
    .fetch_all(conn)
    .await?;
    Ok(rules)
}

pub async fn insert_rule(
    store_id: Option<i64>,
    category_id: Option<i64>,
    rate: CommissionRate,
    conn: &mut SqliteConnection,
) -> Result<CommissionRule, MarketplaceDbError> {
    let rule = sqlx::query_as(&format!(
        "INSERT INTO commission_config (store_id, category_id, commission_bps, is_active) VALUES ($1, $2, $3, TRUE) \
         RETURNING {RULE_COLUMNS}"
    ))
    .bind(store_id)
    .bind(category_id)
    .bind(rate)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next()
    .ok_or(sqlx::Error::RowNotFound)?;
    Ok(rule)
}

pub async fn deactivate_rule(id: i64, conn: &mut SqliteConnection) -> Result<(), MarketplaceDbError> {
    sqlx::query("UPDATE commission_config SET is_active = FALSE, updated_at = CURRENT_TIMESTAMP WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}
