use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, NewOrderItem, Order, OrderItem, OrderStatusType, PaymentProvider, PaymentStatus},
    traits::MarketplaceDbError,
};

/// Inserts a new order header using the given connection. This is not atomic. You can embed this call inside a
/// transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
///
/// The stored total is computed from the captured item prices plus the shipping cost, and is never recomputed.
pub async fn insert_order(order: &NewOrder, conn: &mut SqliteConnection) -> Result<Order, MarketplaceDbError> {
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                user_id,
                store_id,
                total_amount,
                shipping_cost,
                shipping_address_id,
                status,
                payment_status
            ) VALUES ($1, $2, $3, $4, $5, 'processing', 'pending')
            RETURNING *;
        "#,
    )
    .bind(&order.user_id)
    .bind(order.store_id)
    .bind(order.total_amount())
    .bind(order.shipping_cost)
    .bind(&order.shipping_address_id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next()
    .ok_or(sqlx::Error::RowNotFound)?;
    debug!("🗃️ Order #{} inserted for {} ({})", order.id, order.user_id, order.total_amount);
    Ok(order)
}

pub async fn insert_order_item(
    order_id: i64,
    item: &NewOrderItem,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, MarketplaceDbError> {
    let item = sqlx::query_as(
        r#"
            INSERT INTO order_items (order_id, product_id, quantity, price_at_purchase)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(item.product_id)
    .bind(item.quantity)
    .bind(item.price_at_purchase)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next()
    .ok_or(sqlx::Error::RowNotFound)?;
    Ok(item)
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, MarketplaceDbError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

/// Returns the most recent order carrying the given provider intent (or preference) id.
pub async fn fetch_order_by_payment_intent(
    payment_intent_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, MarketplaceDbError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE payment_intent_id = $1 ORDER BY id DESC LIMIT 1")
        .bind(payment_intent_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_items(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, MarketplaceDbError> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

pub async fn attach_payment_intent(
    order_id: i64,
    provider: PaymentProvider,
    payment_intent_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Order, MarketplaceDbError> {
    let order: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders
            SET payment_intent_id = $1, payment_provider = $2, payment_status = 'pending',
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
            RETURNING *;
        "#,
    )
    .bind(payment_intent_id)
    .bind(provider)
    .bind(order_id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    order.ok_or(MarketplaceDbError::OrderNotFound(order_id))
}

pub async fn update_order_status(
    order_id: i64,
    status: OrderStatusType,
    payment_status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<Order, MarketplaceDbError> {
    let order: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET status = $1, payment_status = $2, updated_at = CURRENT_TIMESTAMP
            WHERE id = $3
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(payment_status)
    .bind(order_id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    order.ok_or(MarketplaceDbError::OrderNotFound(order_id))
}
