use sqlx::SqliteConnection;

use crate::db_types::{NewRating, PickupRating, RatingSummary, UserId};

/// Inserts the rating, or returns `None` if the shopper has already rated this request.
pub async fn insert_rating(rating: &NewRating, conn: &mut SqliteConnection) -> Result<Option<PickupRating>, sqlx::Error> {
    let rating = sqlx::query_as(
        r#"
            INSERT INTO pickup_ratings (request_id, shopper_id, collector_id, rating, feedback, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (request_id, shopper_id) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(rating.request_id)
    .bind(rating.shopper_id.as_str())
    .bind(rating.collector_id.as_str())
    .bind(i64::from(rating.rating))
    .bind(rating.feedback.as_deref())
    .bind(rating.created_at)
    .fetch_optional(conn)
    .await?;
    Ok(rating)
}

pub async fn ratings_for_collector(
    collector: &UserId,
    conn: &mut SqliteConnection,
) -> Result<Vec<PickupRating>, sqlx::Error> {
    let ratings = sqlx::query_as("SELECT * FROM pickup_ratings WHERE collector_id = $1 ORDER BY id ASC")
        .bind(collector.as_str())
        .fetch_all(conn)
        .await?;
    Ok(ratings)
}

pub async fn rating_summary(collector: &UserId, conn: &mut SqliteConnection) -> Result<RatingSummary, sqlx::Error> {
    let (average, count): (f64, i64) = sqlx::query_as(
        "SELECT CAST(COALESCE(AVG(rating), 0.0) AS REAL), COUNT(*) FROM pickup_ratings WHERE collector_id = $1",
    )
    .bind(collector.as_str())
    .fetch_one(conn)
    .await?;
    Ok(RatingSummary { collector_id: collector.clone(), average, count })
}
