use thiserror::Error;

use crate::db_types::{Address, Collector, UserId, WasteCategoryId};

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Catalogue data is corrupt: {0}")]
    CorruptData(String),
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        CatalogError::DatabaseError(e.to_string())
    }
}

/// Resolves the current unit price of a waste category.
#[allow(async_fn_in_trait)]
pub trait RateLookup {
    /// Returns `None` when the category is unknown or has been retired.
    async fn price_of(&self, category: WasteCategoryId) -> Result<Option<f64>, CatalogError>;
}

/// Read access to collector profiles, including their location and declared prices.
#[allow(async_fn_in_trait)]
pub trait CollectorDirectory {
    async fn active_collectors(&self) -> Result<Vec<Collector>, CatalogError>;

    async fn collector_by_id(&self, id: &UserId) -> Result<Option<Collector>, CatalogError>;
}

/// Read access to shopper pickup addresses.
#[allow(async_fn_in_trait)]
pub trait AddressBook {
    async fn address_by_id(&self, id: i64) -> Result<Option<Address>, CatalogError>;
}
