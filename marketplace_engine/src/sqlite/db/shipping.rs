use sqlx::SqliteConnection;

use crate::{db_types::ShippingConfig, traits::MarketplaceDbError};

const CONFIG_COLUMNS: &str = "store_id, local_delivery_enabled, local_radius_km, local_base_price, \
                              national_shipping_enabled, national_flat_rate, free_shipping_threshold, active_providers";

pub async fn fetch_config(store_id: i64, conn: &mut SqliteConnection) -> Result<Option<ShippingConfig>, MarketplaceDbError> {
    let config = sqlx::query_as(&format!("SELECT {CONFIG_COLUMNS} FROM shipping_configs WHERE store_id = $1"))
        .bind(store_id)
        .fetch_optional(conn)
        .await?;
    Ok(config)
}

pub async fn upsert_config(config: ShippingConfig, conn: &mut SqliteConnection) -> Result<ShippingConfig, MarketplaceDbError> {
    let config = sqlx::query_as(&format!(
        r#"
            INSERT INTO shipping_configs ({CONFIG_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (store_id) DO UPDATE SET
                local_delivery_enabled = excluded.local_delivery_enabled,
                local_radius_km = excluded.local_radius_km,
                local_base_price = excluded.local_base_price,
                national_shipping_enabled = excluded.national_shipping_enabled,
                national_flat_rate = excluded.national_flat_rate,
                free_shipping_threshold = excluded.free_shipping_threshold,
                active_providers = excluded.active_providers,
                updated_at = CURRENT_TIMESTAMP
            RETURNING {CONFIG_COLUMNS};
        "#
    ))
    .bind(config.store_id)
    .bind(config.local_delivery_enabled)
    .bind(config.local_radius_km)
    .bind(config.local_base_price)
    .bind(config.national_shipping_enabled)
    .bind(config.national_flat_rate)
    .bind(config.free_shipping_threshold)
    .bind(config.active_providers)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next()
    .ok_or(sqlx::Error::RowNotFound)?;
    Ok(config)
}
