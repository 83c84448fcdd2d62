use chrono::{DateTime, Utc};
use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{PickupStatus, Principal, StatusHistoryEntry};

/// The timestamp of the most recent history entry for the request.
pub async fn last_change_at(
    request_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    let last = sqlx::query_scalar(
        "SELECT changed_at FROM pickup_status_history WHERE request_id = $1 ORDER BY id DESC LIMIT 1",
    )
    .bind(request_id)
    .fetch_optional(conn)
    .await?;
    Ok(last)
}

/// Appends a history entry. `changed_at` is clamped so that it never precedes the previous entry for the same
/// request, even if the wall clock stepped backwards.
pub async fn append_status(
    request_id: i64,
    status: PickupStatus,
    changed_at: DateTime<Utc>,
    changed_by: &Principal,
    conn: &mut SqliteConnection,
) -> Result<StatusHistoryEntry, sqlx::Error> {
    let changed_at = match last_change_at(request_id, &mut *conn).await? {
        Some(last) if last > changed_at => last,
        _ => changed_at,
    };
    let entry: StatusHistoryEntry = sqlx::query_as(
        r#"
            INSERT INTO pickup_status_history (
                request_id,
                status,
                changed_at,
                changed_by_id,
                changed_by_role
            ) VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(request_id)
    .bind(status)
    .bind(changed_at)
    .bind(changed_by.id.as_str())
    .bind(changed_by.role)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ History entry #{} appended for pickup request #{request_id}: {status}", entry.id);
    Ok(entry)
}

pub async fn fetch_history(
    request_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<StatusHistoryEntry>, sqlx::Error> {
    let history = sqlx::query_as("SELECT * FROM pickup_status_history WHERE request_id = $1 ORDER BY id ASC")
        .bind(request_id)
        .fetch_all(conn)
        .await?;
    Ok(history)
}
