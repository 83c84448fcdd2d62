//! Pickup Engine
//!
//! The pickup engine turns shoppers' waste-collection carts into pickup requests and drives those requests through
//! collection. This library contains the core logic and is independent of any particular web framework.
//!
//! The library is divided into these main sections:
//! 1. Backend contracts ([`mod@traits`]) and their implementations: a SQLite durable store ([`SqliteDatabase`]) and
//!    cart caches ([`mod@cart_cache`]). The data types shared by all backends live in [`mod@db_types`].
//! 2. The public API ([`mod@pickup_api`]): carts, checkout, cart reconciliation, geo-matching, the pickup status
//!    machine and ratings.
pub mod cart_cache;
pub mod db_types;
pub mod helpers;
pub mod pickup_api;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use cart_cache::{BoundedCartCache, MemoryCartCache};
pub use pickup_api::{
    cart_api::CartApi,
    cart_objects,
    checkout_api::CheckoutApi,
    errors::{CartApiError, CheckoutError, ErrorKind, MatchingError, PickupFlowError, RatingError},
    matching_api::{MatchingApi, MatchingConfig},
    pickup_flow_api::PickupFlowApi,
    pickup_objects,
    rating_api::RatingApi,
    reconciliation_api::{CartReconciler, ReconciliationConfig},
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
