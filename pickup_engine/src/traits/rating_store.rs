use crate::{
    db_types::{NewRating, PickupRating, RatingSummary, UserId},
    traits::PickupStoreError,
};

/// Durable storage for collector ratings.
#[allow(async_fn_in_trait)]
pub trait RatingStore {
    /// Appends a rating. Fails with [`PickupStoreError::RequestNotFound`] if the request does not exist, and with
    /// [`PickupStoreError::DuplicateRating`] if the shopper has already rated this request.
    async fn insert_rating(&self, rating: NewRating) -> Result<PickupRating, PickupStoreError>;

    /// All ratings for the collector, oldest first.
    async fn ratings_for_collector(&self, collector: &UserId) -> Result<Vec<PickupRating>, PickupStoreError>;

    /// The arithmetic mean over all of the collector's ratings. A collector with no ratings has an average of zero
    /// and a count of zero.
    async fn rating_summary(&self, collector: &UserId) -> Result<RatingSummary, PickupStoreError>;
}
