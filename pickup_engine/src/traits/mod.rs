//! # Backend contracts
//!
//! This module defines the behaviour that backends need to expose in order to drive the pickup engine. The public
//! APIs are generic over these traits, so the cache, the durable store and the catalogue collaborators can be swapped
//! independently (and mocked in tests).
//!
//! * [`CartCache`] is the ephemeral, TTL-bounded store that holds carts while shoppers build them.
//! * [`PickupStore`] is the authoritative durable store for pickup requests, their items and status history, and the
//!   cart snapshots written by reconciliation.
//! * [`RatingStore`] persists ratings and computes per-collector aggregates.
//! * [`RateLookup`], [`CollectorDirectory`] and [`AddressBook`] are read-only lookups into data that is owned by other
//!   services (the waste catalogue, collector profiles and shopper addresses).
mod cart_cache;
mod catalog;
mod pickup_store;
mod rating_store;

pub use cart_cache::{CartCache, CartCacheError};
pub use catalog::{AddressBook, CatalogError, CollectorDirectory, RateLookup};
pub use pickup_store::{PickupStore, PickupStoreError};
pub use rating_store::RatingStore;
