//! # Pickup engine public API
//!
//! The `pickup_api` module exposes the programmatic API of the pickup engine. Each API is generic over the backend
//! traits it needs, so callers can mix and match backends (and mocks).
//!
//! * [`cart_api`] manages shoppers' in-progress carts in the cart cache.
//! * [`checkout_api`] converts a cached cart into a durable pickup request.
//! * [`reconciliation_api`] moves abandoned, nearly expired carts into the durable store.
//! * [`matching_api`] finds collectors near a request, and open requests near a collector.
//! * [`pickup_flow_api`] drives requests through their lifecycle, from collector selection to completion.
//! * [`rating_api`] collects and aggregates collector ratings.
//!
//! # API usage
//!
//! An API instance is created by supplying backends that implement the traits it needs. For example:
//!
//! ```rust,ignore
//! use pickup_engine::{PickupFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // SqliteDatabase implements both PickupStore and CollectorDirectory
//! let api = PickupFlowApi::new(db.clone(), db);
//! let details = api.fetch_pickup(42).await?;
//! ```
pub mod cart_api;
pub mod cart_objects;
pub mod checkout_api;
pub mod errors;
pub mod matching_api;
pub mod pickup_flow_api;
pub mod pickup_objects;
pub mod rating_api;
pub mod reconciliation_api;
