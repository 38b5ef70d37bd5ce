use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewWebhookEvent, PaymentProvider, WebhookEvent},
    traits::{MarketplaceDbError, RecordedWebhookEvent},
};

/// Logs the event, returning `is_new = false` along with the stored row if `(provider, event_id)` already exists.
pub async fn idempotent_insert(
    event: NewWebhookEvent,
    conn: &mut SqliteConnection,
) -> Result<RecordedWebhookEvent, MarketplaceDbError> {
    let inserted: Option<WebhookEvent> = sqlx::query_as(
        r#"
            INSERT INTO webhook_events (provider, event_type, event_id, payload)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (provider, event_id) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(event.provider)
    .bind(&event.event_type)
    .bind(&event.event_id)
    .bind(&event.payload)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .next();
    if let Some(event) = inserted {
        debug!("🗃️ Webhook event {} [{}] logged with id {}", event.event_id, event.event_type, event.id);
        return Ok(RecordedWebhookEvent { event, is_new: true });
    }
    let existing = fetch_by_event_id(event.provider, &event.event_id, conn).await?.ok_or_else(|| {
        MarketplaceDbError::DatabaseError(format!("Webhook event {} vanished after a conflict", event.event_id))
    })?;
    debug!("🗃️ Webhook event {} has been seen before (id {})", existing.event_id, existing.id);
    Ok(RecordedWebhookEvent { event: existing, is_new: false })
}

pub async fn fetch_by_event_id(
    provider: PaymentProvider,
    event_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<WebhookEvent>, MarketplaceDbError> {
    let event = sqlx::query_as("SELECT * FROM webhook_events WHERE provider = $1 AND event_id = $2")
        .bind(provider)
        .bind(event_id)
        .fetch_optional(conn)
        .await?;
    Ok(event)
}

pub async fn mark_processed(id: i64, conn: &mut SqliteConnection) -> Result<(), MarketplaceDbError> {
    let result = sqlx::query(
        "UPDATE webhook_events SET processed = TRUE, error = NULL, processed_at = CURRENT_TIMESTAMP WHERE id = $1",
    )
    .bind(id)
    .execute(conn)
    .await?;
    match result.rows_affected() {
        0 => Err(MarketplaceDbError::WebhookEventNotFound(id)),
        _ => Ok(()),
    }
}

pub async fn mark_failed(id: i64, error: &str, conn: &mut SqliteConnection) -> Result<(), MarketplaceDbError> {
    let result = sqlx::query("UPDATE webhook_events SET processed = FALSE, error = $1 WHERE id = $2")
        .bind(error)
        .bind(id)
        .execute(conn)
        .await?;
    match result.rows_affected() {
        0 => Err(MarketplaceDbError::WebhookEventNotFound(id)),
        _ => Ok(()),
    }
}
