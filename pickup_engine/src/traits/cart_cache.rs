use std::time::Duration;

use thiserror::Error;

use crate::{db_types::UserId, pickup_api::cart_objects::Cart};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CartCacheError {
    #[error("The cart cache is unavailable: {0}")]
    Unavailable(String),
    #[error("The cached cart payload is invalid: {0}")]
    Payload(String),
}

/// The ephemeral, sliding-expiry store that holds one cart document per owner.
///
/// Every write resets the key's time-to-live to the full window. Expired keys are indistinguishable from keys that
/// were never written. Implementations must never report a failure to reach the cache as "not found"; that is what
/// [`CartCacheError::Unavailable`] is for.
#[allow(async_fn_in_trait)]
pub trait CartCache {
    /// Fetches the cart for the given owner, or `None` if there is no live cart.
    async fn get(&self, owner: &UserId) -> Result<Option<Cart>, CartCacheError>;

    /// Replaces the owner's cart document and resets its TTL.
    async fn upsert(&self, owner: &UserId, cart: &Cart) -> Result<(), CartCacheError>;

    /// The time left before the owner's cart expires, or `None` if there is no live cart.
    async fn remaining_ttl(&self, owner: &UserId) -> Result<Option<Duration>, CartCacheError>;

    /// Resets the TTL of a live cart without changing it. Returns the new TTL, or `None` if there is no live cart.
    async fn refresh_ttl(&self, owner: &UserId) -> Result<Option<Duration>, CartCacheError>;

    /// Removes the owner's cart. Returns `true` if a live cart was removed. Deleting an absent key is not an error.
    async fn delete(&self, owner: &UserId) -> Result<bool, CartCacheError>;

    /// Returns the live keys matching `pattern`. A trailing `*` matches any suffix.
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, CartCacheError>;
}
