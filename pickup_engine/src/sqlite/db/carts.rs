use chrono::{DateTime, Utc};
use log::trace;
use sqlx::{FromRow, SqliteConnection};

use crate::db_types::{CartSnapshot, CartSnapshotLine, CommitSource, NewCartSnapshot, UserId};

#[derive(FromRow)]
struct SnapshotRow {
    id: i64,
    cart_id: String,
    owner_id: UserId,
    committed_at: DateTime<Utc>,
}

pub async fn is_committed(cart_id: &str, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cart_commits WHERE cart_id = $1")
        .bind(cart_id)
        .fetch_one(conn)
        .await?;
    Ok(count > 0)
}

/// Records that the cart lineage has been committed. Returns `false`, and changes nothing, if it already was.
///
/// Call this first inside the committing transaction so that the write lock is taken before anything else is written.
pub async fn insert_commit(
    cart_id: &str,
    owner: &UserId,
    source: CommitSource,
    committed_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            INSERT INTO cart_commits (cart_id, owner_id, source, committed_at) VALUES ($1, $2, $3, $4)
            ON CONFLICT (cart_id) DO NOTHING;
        "#,
    )
    .bind(cart_id)
    .bind(owner.as_str())
    .bind(source)
    .bind(committed_at)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Inserts the snapshot header and its lines. This is not atomic. Embed it in a transaction with the commit marker.
pub async fn insert_snapshot(
    snapshot: &NewCartSnapshot,
    conn: &mut SqliteConnection,
) -> Result<CartSnapshot, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO cart_snapshots (cart_id, owner_id, committed_at) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(snapshot.cart_id.as_str())
    .bind(snapshot.owner_id.as_str())
    .bind(snapshot.committed_at)
    .fetch_one(&mut *conn)
    .await?;
    for line in &snapshot.lines {
        sqlx::query(
            r#"
                INSERT INTO cart_snapshot_lines (snapshot_id, waste_category_id, quantity, unit_price, subtotal)
                VALUES ($1, $2, $3, $4, $5);
            "#,
        )
        .bind(id)
        .bind(line.waste_category_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.subtotal)
        .execute(&mut *conn)
        .await?;
    }
    trace!("🗃️ Cart snapshot #{id} written with {} lines", snapshot.lines.len());
    Ok(CartSnapshot {
        id,
        cart_id: snapshot.cart_id.clone(),
        owner_id: snapshot.owner_id.clone(),
        committed_at: snapshot.committed_at,
        lines: snapshot.lines.clone(),
    })
}

async fn fetch_snapshot_lines(snapshot_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CartSnapshotLine>, sqlx::Error> {
    let lines = sqlx::query_as(
        r#"
            SELECT waste_category_id, quantity, unit_price, subtotal FROM cart_snapshot_lines
            WHERE snapshot_id = $1 ORDER BY id ASC
        "#,
    )
    .bind(snapshot_id)
    .fetch_all(conn)
    .await?;
    Ok(lines)
}

pub async fn fetch_snapshots_for_owner(
    owner: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Vec<CartSnapshot>, sqlx::Error> {
    let rows: Vec<SnapshotRow> =
        sqlx::query_as("SELECT id, cart_id, owner_id, committed_at FROM cart_snapshots WHERE owner_id = $1 ORDER BY id")
            .bind(owner.as_str())
            .fetch_all(&mut *conn)
            .await?;
    let mut snapshots = Vec::with_capacity(rows.len());
    for row in rows {
        let lines = fetch_snapshot_lines(row.id, &mut *conn).await?;
        snapshots.push(CartSnapshot {
            id: row.id,
            cart_id: row.cart_id,
            owner_id: row.owner_id,
            committed_at: row.committed_at,
            lines,
        });
    }
    Ok(snapshots)
}
