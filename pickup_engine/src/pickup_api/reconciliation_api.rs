use std::{fmt::Debug, time::Duration};

use chrono::Utc;
use log::*;
use thiserror::Error;

use crate::{
    db_types::{CartSnapshotLine, NewCartSnapshot, UserId},
    helpers::price_cart,
    pickup_api::{
        cart_objects::{owner_from_key, CART_KEY_PATTERN},
        pickup_objects::ReconciliationReport,
    },
    traits::{CartCache, CartCacheError, CatalogError, PickupStore, PickupStoreError, RateLookup},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciliationConfig {
    /// Carts with less than this much TTL left are persisted and evicted.
    pub near_expiry: Duration,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self { near_expiry: Duration::from_secs(60) }
    }
}

#[derive(Debug, Error)]
enum ReconcileError {
    #[error("{0}")]
    Cache(#[from] CartCacheError),
    #[error("{0}")]
    Store(#[from] PickupStoreError),
    #[error("{0}")]
    Catalog(#[from] CatalogError),
    #[error("Key {0} is not a cart key")]
    ForeignKey(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Vanished,
    Stale,
    Fresh,
    Unpriceable,
    Committed,
}

/// Sweeps the cart cache and moves carts that are about to expire into the durable store, so that abandoned carts
/// are not silently lost.
///
/// Each call to [`CartReconciler::run_once`] is a single pass; scheduling passes is the caller's business. A failure
/// on one key is logged and counted but never aborts the pass.
///
/// A shopper can still modify a cart between this pass reading it and evicting it. That edit is lost; the persisted
/// snapshot is the version that was read.
pub struct CartReconciler<C, R, S> {
    cache: C,
    rates: R,
    store: S,
    config: ReconciliationConfig,
}

impl<C, R, S> Debug for CartReconciler<C, R, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CartReconciler ({:?})", self.config)
    }
}

impl<C, R, S> CartReconciler<C, R, S> {
    pub fn new(cache: C, rates: R, store: S, config: ReconciliationConfig) -> Self {
        Self { cache, rates, store, config }
    }

    pub fn config(&self) -> &ReconciliationConfig {
        &self.config
    }
}

impl<C, R, S> CartReconciler<C, R, S>
where
    C: CartCache,
    R: RateLookup,
    S: PickupStore,
{
    /// Performs exactly one reconciliation pass over the cart keys that exist when the pass starts.
    ///
    /// Only a failure to list the keys fails the pass as a whole.
    pub async fn run_once(&self) -> Result<ReconciliationReport, CartCacheError> {
        let keys = self.cache.scan_keys(CART_KEY_PATTERN).await?;
        let mut report = ReconciliationReport { scanned: keys.len(), ..Default::default() };
        for key in &keys {
            match self.reconcile_key(key).await {
                Ok(Outcome::Vanished) => report.vanished += 1,
                Ok(Outcome::Stale) => report.discarded_stale += 1,
                Ok(Outcome::Fresh) => report.fresh += 1,
                Ok(Outcome::Unpriceable) => report.unpriceable += 1,
                Ok(Outcome::Committed) => report.committed += 1,
                Err(e) => {
                    error!("🕰️ Could not reconcile {key}. {e}");
                    report.failed += 1;
                },
            }
        }
        if report.scanned > 0 {
            info!("🕰️ Reconciliation pass complete. {report}");
        } else {
            trace!("🕰️ Reconciliation pass complete. No carts in the cache.");
        }
        Ok(report)
    }

    async fn reconcile_key(&self, key: &str) -> Result<Outcome, ReconcileError> {
        let owner = owner_from_key(key).ok_or_else(|| ReconcileError::ForeignKey(key.to_string()))?;
        let Some(cart) = self.cache.get(&owner).await? else {
            return Ok(Outcome::Vanished);
        };
        if self.store.is_cart_committed(&cart.cart_id).await? {
            debug!("🕰️ Cart {} for {owner} was already committed. Discarding it.", cart.cart_id);
            self.cache.delete(&owner).await?;
            return Ok(Outcome::Stale);
        }
        // The cart is already in hand, so a key that expired since the read is saved like one about to expire
        match self.cache.remaining_ttl(&owner).await? {
            Some(remaining) if remaining >= self.config.near_expiry => {
                trace!("🕰️ Cart {} for {owner} has {}s left", cart.cart_id, remaining.as_secs());
                return Ok(Outcome::Fresh);
            },
            Some(_) => {},
            None => {
                debug!("🕰️ Cart {} for {owner} expired during this pass. Saving the copy that was read.", cart.cart_id)
            },
        }
        let priced = price_cart(&self.rates, &cart).await?;
        if priced.is_empty() {
            warn!(
                "🕰️ None of the {} lines in cart {} for {owner} can be priced. Letting it expire without saving it.",
                cart.lines.len(),
                cart.cart_id
            );
            self.cache.delete(&owner).await?;
            return Ok(Outcome::Unpriceable);
        }
        match self.persist(&owner, cart.cart_id, priced.lines).await {
            Ok(()) => {},
            Err(ReconcileError::Store(PickupStoreError::DuplicateCommit(cart_id))) => {
                debug!("🕰️ Cart {cart_id} for {owner} was checked out during this pass. Discarding it.");
                self.cache.delete(&owner).await?;
                return Ok(Outcome::Stale);
            },
            Err(e) => return Err(e),
        }
        self.cache.delete(&owner).await?;
        Ok(Outcome::Committed)
    }

    async fn persist(
        &self,
        owner: &UserId,
        cart_id: String,
        lines: Vec<CartSnapshotLine>,
    ) -> Result<(), ReconcileError> {
        let snapshot = NewCartSnapshot { cart_id, owner_id: owner.clone(), committed_at: Utc::now(), lines };
        let saved = self.store.commit_cart_snapshot(snapshot).await?;
        info!("🕰️ Cart {} for {owner} was about to expire. Saved as snapshot #{}", saved.cart_id, saved.id);
        Ok(())
    }
}
