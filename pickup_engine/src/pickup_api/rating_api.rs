use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db_types::{NewRating, PickupRating, Principal, RatingSummary, UserId},
    pickup_api::errors::RatingError,
    traits::RatingStore,
};

const MAX_FEEDBACK_LENGTH: usize = 2000;

/// Collects shopper ratings for collectors and aggregates them.
///
/// Ratings are not checked against the request's completion status or its assigned collector. A shopper can rate a
/// given request at most once.
pub struct RatingApi<R> {
    store: R,
}

impl<R> Debug for RatingApi<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RatingApi")
    }
}

impl<R> RatingApi<R> {
    pub fn new(store: R) -> Self {
        Self { store }
    }
}

impl<R> RatingApi<R>
where R: RatingStore
{
    pub async fn rate(
        &self,
        shopper: &Principal,
        request_id: i64,
        collector_id: &UserId,
        rating: u8,
        feedback: Option<String>,
    ) -> Result<PickupRating, RatingError> {
        if !(1..=5).contains(&rating) {
            return Err(RatingError::Validation(format!("Ratings must be between 1 and 5, not {rating}")));
        }
        if collector_id.is_empty() {
            return Err(RatingError::Validation("collector_id must not be empty".into()));
        }
        let feedback = feedback.map(|f| f.trim().to_string()).filter(|f| !f.is_empty());
        if feedback.as_ref().map(|f| f.len() > MAX_FEEDBACK_LENGTH).unwrap_or(false) {
            return Err(RatingError::Validation(format!("Feedback cannot exceed {MAX_FEEDBACK_LENGTH} characters")));
        }
        let new_rating = NewRating {
            request_id,
            shopper_id: shopper.id.clone(),
            collector_id: collector_id.clone(),
            rating,
            feedback,
            created_at: Utc::now(),
        };
        let saved = self.store.insert_rating(new_rating).await?;
        info!("⭐️ {} rated collector {collector_id} {rating}/5 for pickup request #{request_id}", shopper.id);
        Ok(saved)
    }

    pub async fn ratings_for_collector(&self, collector_id: &UserId) -> Result<Vec<PickupRating>, RatingError> {
        let ratings = self.store.ratings_for_collector(collector_id).await?;
        Ok(ratings)
    }

    /// The mean rating and the number of ratings. A collector with no ratings averages 0.0.
    pub async fn average_rating(&self, collector_id: &UserId) -> Result<RatingSummary, RatingError> {
        let summary = self.store.rating_summary(collector_id).await?;
        trace!("⭐️ Collector {collector_id} averages {:.2} over {} ratings", summary.average, summary.count);
        Ok(summary)
    }
}
