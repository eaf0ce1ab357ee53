//! Append-only trail of account and back-office actions.

use serde_json::Value;
use uuid::Uuid;

use crate::db::DbPool;

/// Write one `audit_logs` row. A failed write is logged and swallowed so an
/// already committed business change is never reported as failed.
pub async fn record(
    pool: &DbPool,
    actor: Option<Uuid>,
    action: &str,
    resource: &str,
    metadata: Value,
) {
    let result = sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(actor)
    .bind(action)
    .bind(resource)
    .bind(metadata)
    .execute(pool)
    .await;

    if let Err(err) = result {
        tracing::warn!(error = %err, action, resource, "audit log failed");
    }
}
