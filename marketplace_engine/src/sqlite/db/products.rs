use log::trace;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{NewProduct, Product},
    traits::MarketplaceDbError,
};

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, MarketplaceDbError> {
    let product = sqlx::query_as(
        r#"
            INSERT INTO products (store_id, category_id, name, price, stock_quantity)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(product.store_id)
    .bind(product.category_id)
    .bind(product.name)
    .bind(product.price)
    .bind(product.stock_quantity)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next()
    .ok_or(sqlx::Error::RowNotFound)?;
    Ok(product)
}

/// Fetches all products with the given ids in one round trip.
pub async fn fetch_products(ids: &[i64], conn: &mut SqliteConnection) -> Result<Vec<Product>, MarketplaceDbError> {
    if ids.is_empty() {
        return Ok(vec![]);
    }
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM products WHERE id IN (");
    let mut list = builder.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    builder.push(")");
    trace!("🗃️ Executing query: {}", builder.sql());
    let products = builder.build_query_as::<Product>().fetch_all(conn).await?;
    Ok(products)
}

pub async fn fetch_stock(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<i64>, MarketplaceDbError> {
    let stock: Option<i64> = sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(conn)
        .await?;
    Ok(stock)
}

/// Takes `quantity` units out of stock, but only if at least that many are available. Returns `false` (and changes
/// nothing) otherwise.
pub async fn decrement_stock(
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, MarketplaceDbError> {
    let result = sqlx::query(
        r#"
            UPDATE products
            SET stock_quantity = stock_quantity - $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND stock_quantity >= $1
        "#,
    )
    .bind(quantity)
    .bind(product_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
