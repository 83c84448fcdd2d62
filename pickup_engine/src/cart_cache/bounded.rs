use std::{fmt::Debug, future::Future, time::Duration};

use log::*;

use crate::{
    db_types::UserId,
    pickup_api::cart_objects::Cart,
    traits::{CartCache, CartCacheError},
};

/// Wraps a [`CartCache`] and bounds every call with `timeout`.
///
/// A call that does not complete in time fails with [`CartCacheError::Unavailable`]. This timeout is unrelated to
/// the cart TTL.
#[derive(Clone)]
pub struct BoundedCartCache<C> {
    inner: C,
    timeout: Duration,
}

impl<C: Debug> Debug for BoundedCartCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BoundedCartCache ({}ms, {:?})", self.timeout.as_millis(), self.inner)
    }
}

impl<C> BoundedCartCache<C> {
    pub fn new(inner: C, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T, CartCacheError>
    where F: Future<Output = Result<T, CartCacheError>> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!("🛒 Cart cache {operation} did not complete within {}ms", self.timeout.as_millis());
                Err(CartCacheError::Unavailable(format!(
                    "{operation} timed out after {}ms",
                    self.timeout.as_millis()
                )))
            },
        }
    }
}

impl<C: CartCache> CartCache for BoundedCartCache<C> {
    async fn get(&self, owner: &UserId) -> Result<Option<Cart>, CartCacheError> {
        self.bounded("get", self.inner.get(owner)).await
    }

    async fn upsert(&self, owner: &UserId, cart: &Cart) -> Result<(), CartCacheError> {
        self.bounded("upsert", self.inner.upsert(owner, cart)).await
    }

    async fn remaining_ttl(&self, owner: &UserId) -> Result<Option<Duration>, CartCacheError> {
        self.bounded("remaining_ttl", self.inner.remaining_ttl(owner)).await
    }

    async fn refresh_ttl(&self, owner: &UserId) -> Result<Option<Duration>, CartCacheError> {
        self.bounded("refresh_ttl", self.inner.refresh_ttl(owner)).await
    }

    async fn delete(&self, owner: &UserId) -> Result<bool, CartCacheError> {
        self.bounded("delete", self.inner.delete(owner)).await
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, CartCacheError> {
        self.bounded("scan_keys", self.inner.scan_keys(pattern)).await
    }
}
