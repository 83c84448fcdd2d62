//! Catalogue mirrors: waste category rates, collector profiles with their declared prices, and shopper addresses.
use log::debug;
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db_types::{Address, Collector, CollectorPrice, UserId, WasteCategory, WasteCategoryId},
    helpers::geo::Coordinate,
    traits::CatalogError,
};

#[derive(FromRow)]
struct CollectorRow {
    id: UserId,
    name: String,
    latitude: f64,
    longitude: f64,
    active: bool,
}

#[derive(FromRow)]
struct AddressRow {
    id: i64,
    owner_id: UserId,
    label: Option<String>,
    latitude: f64,
    longitude: f64,
}

fn location(latitude: f64, longitude: f64) -> Result<Coordinate, CatalogError> {
    Coordinate::try_new(latitude, longitude).map_err(|e| CatalogError::CorruptData(e.to_string()))
}

pub async fn upsert_waste_category(
    category: &WasteCategory,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO waste_categories (id, name, unit_price, active) VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                unit_price = excluded.unit_price,
                active = excluded.active,
                updated_at = CURRENT_TIMESTAMP;
        "#,
    )
    .bind(category.id)
    .bind(category.name.as_str())
    .bind(category.unit_price)
    .bind(category.active)
    .execute(conn)
    .await?;
    debug!("🗃️ Waste category {} ({}) priced at {}", category.id, category.name, category.unit_price);
    Ok(())
}

/// The unit price of an active waste category.
pub async fn price_of(category: WasteCategoryId, conn: &mut SqliteConnection) -> Result<Option<f64>, sqlx::Error> {
    let price = sqlx::query_scalar("SELECT unit_price FROM waste_categories WHERE id = $1 AND active = TRUE")
        .bind(category)
        .fetch_optional(conn)
        .await?;
    Ok(price)
}

pub async fn fetch_waste_categories(conn: &mut SqliteConnection) -> Result<Vec<WasteCategory>, sqlx::Error> {
    let categories = sqlx::query_as("SELECT id, name, unit_price, active FROM waste_categories ORDER BY id")
        .fetch_all(conn)
        .await?;
    Ok(categories)
}

/// Inserts or replaces the collector profile and its price list. This is not atomic.
pub async fn upsert_collector(collector: &Collector, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO collectors (id, name, latitude, longitude, active) VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                active = excluded.active;
        "#,
    )
    .bind(collector.id.as_str())
    .bind(collector.name.as_str())
    .bind(collector.location.latitude)
    .bind(collector.location.longitude)
    .bind(collector.active)
    .execute(&mut *conn)
    .await?;
    sqlx::query("DELETE FROM collector_prices WHERE collector_id = $1")
        .bind(collector.id.as_str())
        .execute(&mut *conn)
        .await?;
    for price in &collector.prices {
        sqlx::query("INSERT INTO collector_prices (collector_id, waste_category_id, unit_price) VALUES ($1, $2, $3)")
            .bind(collector.id.as_str())
            .bind(price.waste_category_id)
            .bind(price.unit_price)
            .execute(&mut *conn)
            .await?;
    }
    debug!("🗃️ Collector {} saved with {} declared prices", collector.id, collector.prices.len());
    Ok(())
}

async fn collector_prices(id: &UserId, conn: &mut SqliteConnection) -> Result<Vec<CollectorPrice>, sqlx::Error> {
    let prices = sqlx::query_as(
        "SELECT waste_category_id, unit_price FROM collector_prices WHERE collector_id = $1 ORDER BY waste_category_id",
    )
    .bind(id.as_str())
    .fetch_all(conn)
    .await?;
    Ok(prices)
}

async fn into_collector(row: CollectorRow, conn: &mut SqliteConnection) -> Result<Collector, CatalogError> {
    let prices = collector_prices(&row.id, conn).await?;
    Ok(Collector {
        location: location(row.latitude, row.longitude)?,
        id: row.id,
        name: row.name,
        active: row.active,
        prices,
    })
}

pub async fn fetch_collector(id: &UserId, conn: &mut SqliteConnection) -> Result<Option<Collector>, CatalogError> {
    let row: Option<CollectorRow> = sqlx::query_as("SELECT * FROM collectors WHERE id = $1")
        .bind(id.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(row) => Ok(Some(into_collector(row, conn).await?)),
        None => Ok(None),
    }
}

pub async fn fetch_active_collectors(conn: &mut SqliteConnection) -> Result<Vec<Collector>, CatalogError> {
    let rows: Vec<CollectorRow> =
        sqlx::query_as("SELECT * FROM collectors WHERE active = TRUE ORDER BY id").fetch_all(&mut *conn).await?;
    let mut collectors = Vec::with_capacity(rows.len());
    for row in rows {
        collectors.push(into_collector(row, &mut *conn).await?);
    }
    Ok(collectors)
}

pub async fn insert_address(
    owner: &UserId,
    label: Option<&str>,
    location: Coordinate,
    conn: &mut SqliteConnection,
) -> Result<Address, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO addresses (owner_id, label, latitude, longitude) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(owner.as_str())
    .bind(label)
    .bind(location.latitude)
    .bind(location.longitude)
    .fetch_one(conn)
    .await?;
    Ok(Address { id, owner_id: owner.clone(), label: label.map(String::from), location })
}

pub async fn fetch_address(id: i64, conn: &mut SqliteConnection) -> Result<Option<Address>, CatalogError> {
    let row: Option<AddressRow> =
        sqlx::query_as("SELECT * FROM addresses WHERE id = $1").bind(id).fetch_optional(conn).await?;
    row.map(|r| {
        Ok(Address { id: r.id, owner_id: r.owner_id, label: r.label, location: location(r.latitude, r.longitude)? })
    })
    .transpose()
}
