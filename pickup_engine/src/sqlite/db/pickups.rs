use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{
        ActualAmountUpdate,
        CollectorGuard,
        NewPickupItem,
        NewPickupRequest,
        PickupRequest,
        PickupRequestItem,
        PickupStatus,
        StatusChange,
        UserId,
    },
    pickup_api::pickup_objects::PickupQueryFilter,
};

/// Inserts a new pickup request in the `waiting_collector` state. This is not atomic. Embed it in a transaction with
/// the items, the first history entry and the cart commit marker.
pub async fn insert_pickup_request(
    request: &NewPickupRequest,
    conn: &mut SqliteConnection,
) -> Result<PickupRequest, sqlx::Error> {
    let pickup = sqlx::query_as(
        r#"
            INSERT INTO pickup_requests (
                shopper_id,
                address_id,
                method,
                notes,
                status,
                cart_id,
                requested_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(request.shopper_id.as_str())
    .bind(request.address_id)
    .bind(request.method)
    .bind(request.notes.as_deref())
    .bind(PickupStatus::WaitingCollector)
    .bind(request.cart_id.as_str())
    .bind(request.requested_at)
    .bind(request.requested_at)
    .fetch_one(conn)
    .await?;
    Ok(pickup)
}

pub async fn insert_items(
    request_id: i64,
    items: &[NewPickupItem],
    conn: &mut SqliteConnection,
) -> Result<Vec<PickupRequestItem>, sqlx::Error> {
    let mut result = Vec::with_capacity(items.len());
    for item in items {
        let item: PickupRequestItem = sqlx::query_as(
            r#"
                INSERT INTO pickup_request_items (
                    request_id,
                    waste_category_id,
                    estimated_amount,
                    estimated_unit_price,
                    estimated_subtotal
                ) VALUES ($1, $2, $3, $4, $5)
                RETURNING *;
            "#,
        )
        .bind(request_id)
        .bind(item.waste_category_id)
        .bind(item.estimated_amount)
        .bind(item.estimated_unit_price)
        .bind(item.estimated_subtotal())
        .fetch_one(&mut *conn)
        .await?;
        result.push(item);
    }
    trace!("🗃️ {} items inserted for pickup request #{request_id}", result.len());
    Ok(result)
}

pub async fn fetch_pickup(id: i64, conn: &mut SqliteConnection) -> Result<Option<PickupRequest>, sqlx::Error> {
    let pickup = sqlx::query_as("SELECT * FROM pickup_requests WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(pickup)
}

pub async fn fetch_items(request_id: i64, conn: &mut SqliteConnection) -> Result<Vec<PickupRequestItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM pickup_request_items WHERE request_id = $1 ORDER BY id ASC")
        .bind(request_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Fetches pickup requests according to the criteria in the `PickupQueryFilter`.
///
/// Results are ordered by `requested_at`, then `id`, in ascending order.
pub async fn search_pickups(
    query: PickupQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<PickupRequest>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM pickup_requests ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(shopper_id) = query.shopper_id {
        where_clause.push("shopper_id = ");
        where_clause.push_bind_unseparated(shopper_id.0);
    }
    if let Some(collector_id) = query.collector_id {
        where_clause.push("collector_id = ");
        where_clause.push_bind_unseparated(collector_id.0);
    }
    if !query.statuses.is_empty() {
        where_clause.push("status IN (");
        let mut first = true;
        for status in query.statuses {
            if !first {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status);
            first = false;
        }
        where_clause.push_unseparated(")");
    }
    builder.push(" ORDER BY requested_at ASC, id ASC");

    trace!("🗃️ Executing query: {}", builder.sql());
    let pickups = builder.build_query_as::<PickupRequest>().fetch_all(conn).await?;
    trace!("🗃️ Result of search_pickups: {}", pickups.len());
    Ok(pickups)
}

/// Sets the collector on a request that is still waiting for one. Returns the updated request, or `None` if the
/// request does not exist or is no longer `waiting_collector`.
pub async fn assign_collector(
    id: i64,
    collector: &UserId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<PickupRequest>, sqlx::Error> {
    let pickup = sqlx::query_as(
        r#"
            UPDATE pickup_requests SET collector_id = $1, updated_at = $2
            WHERE id = $3 AND status = $4
            RETURNING *;
        "#,
    )
    .bind(collector.as_str())
    .bind(now)
    .bind(id)
    .bind(PickupStatus::WaitingCollector)
    .fetch_optional(conn)
    .await?;
    Ok(pickup)
}

/// Compare-and-set on the request status.
///
/// The update only applies while the request is in `change.from` and the collector guard holds. Returns `None`
/// when nothing was updated; the caller decides why.
pub async fn try_transition(
    change: &StatusChange,
    conn: &mut SqliteConnection,
) -> Result<Option<PickupRequest>, sqlx::Error> {
    let mut builder = QueryBuilder::new("UPDATE pickup_requests SET status = ");
    builder.push_bind(change.to);
    builder.push(", updated_at = ");
    builder.push_bind(change.changed_at);
    if let Some(confirmed_at) = change.confirmed_at {
        builder.push(", confirmed_at = ");
        builder.push_bind(confirmed_at);
    }
    if let CollectorGuard::ClaimOrAssignedTo(collector) = &change.guard {
        builder.push(", collector_id = COALESCE(collector_id, ");
        builder.push_bind(collector.as_str());
        builder.push(")");
    }
    builder.push(" WHERE id = ");
    builder.push_bind(change.request_id);
    builder.push(" AND status = ");
    builder.push_bind(change.from);
    match &change.guard {
        CollectorGuard::Any => {},
        CollectorGuard::AssignedTo(collector) => {
            builder.push(" AND collector_id = ");
            builder.push_bind(collector.as_str());
        },
        CollectorGuard::ClaimOrAssignedTo(collector) => {
            builder.push(" AND (collector_id IS NULL OR collector_id = ");
            builder.push_bind(collector.as_str());
            builder.push(")");
        },
    }
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let pickup = builder.build_query_as::<PickupRequest>().fetch_optional(conn).await?;
    if let Some(p) = &pickup {
        debug!("🗃️ Pickup request #{} moved from {} to {}", p.id, change.from, p.status);
    }
    Ok(pickup)
}

/// Writes the actual amount and final price of a single item. Returns `None` if the item does not belong to the
/// request.
pub async fn update_actual_amount(
    request_id: i64,
    update: &ActualAmountUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<PickupRequestItem>, sqlx::Error> {
    let item = sqlx::query_as(
        r#"
            UPDATE pickup_request_items SET actual_amount = $1, final_price = $2
            WHERE id = $3 AND request_id = $4
            RETURNING *;
        "#,
    )
    .bind(update.actual_amount)
    .bind(update.final_price)
    .bind(update.item_id)
    .bind(request_id)
    .fetch_optional(conn)
    .await?;
    Ok(item)
}

/// Marks a request as updated, but only while a collector is confirmed or on the way, which is when amounts may be
/// recorded. Returns `false` if the request does not exist or is in any other state.
pub async fn touch_weighable(id: i64, now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE pickup_requests SET updated_at = $1 WHERE id = $2 AND status IN ($3, $4)")
        .bind(now)
        .bind(id)
        .bind(PickupStatus::ConfirmedByCollector)
        .bind(PickupStatus::CollectorArePickingUp)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
