//! Fault-injecting wrappers around the real backends.
#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use pickup_engine::{
    cart_objects::{Cart, CartLine},
    db_types::{
        ActualAmountUpdate,
        CartSnapshot,
        NewCartSnapshot,
        NewPickupRequest,
        PickupDetails,
        PickupRequest,
        PickupRequestItem,
        Principal,
        StatusChange,
        StatusHistoryEntry,
        UserId,
        WasteCategoryId,
    },
    helpers::geo::Coordinate,
    pickup_objects::CheckoutRequest,
    test_utils::fixtures::seed_address,
    traits::{CartCache, CartCacheError, PickupStore, PickupStoreError},
    CartApi,
    CheckoutApi,
    MemoryCartCache,
    SqliteDatabase,
};

/// Fills a cart for `shopper` and checks it out to an address at `location`.
pub async fn place_pickup(
    db: &SqliteDatabase,
    shopper: &str,
    location: Coordinate,
    lines: &[(WasteCategoryId, f64)],
) -> PickupDetails {
    let address = seed_address(db, shopper, location).await;
    let cache = MemoryCartCache::new(Duration::from_secs(1800));
    let carts = CartApi::new(cache.clone());
    let principal = Principal::shopper(shopper);
    for (category, quantity) in lines {
        carts.add_or_update_line(&principal, CartLine::new(category.value(), *quantity)).await.expect("add line");
    }
    let checkout = CheckoutApi::new(cache, db.clone(), db.clone(), db.clone());
    let request = CheckoutRequest { address_id: address.id, method: Default::default(), notes: None };
    checkout.checkout(&principal, request).await.expect("checkout")
}

/// A cart cache whose deletes can be made to fail, and whose TTL reads can be made to report expired keys.
#[derive(Clone)]
pub struct FlakyCache {
    pub inner: MemoryCartCache,
    pub fail_deletes: Arc<AtomicBool>,
    pub expire_on_ttl_read: Arc<AtomicBool>,
}

impl FlakyCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: MemoryCartCache::new(ttl),
            fail_deletes: Arc::new(AtomicBool::new(false)),
            expire_on_ttl_read: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn expire_on_ttl_read(&self, expire: bool) {
        self.expire_on_ttl_read.store(expire, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

impl CartCache for FlakyCache {
    async fn get(&self, owner: &UserId) -> Result<Option<Cart>, CartCacheError> {
        self.inner.get(owner).await
    }

    async fn upsert(&self, owner: &UserId, cart: &Cart) -> Result<(), CartCacheError> {
        self.inner.upsert(owner, cart).await
    }

    async fn remaining_ttl(&self, owner: &UserId) -> Result<Option<Duration>, CartCacheError> {
        if self.expire_on_ttl_read.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.remaining_ttl(owner).await
    }

    async fn refresh_ttl(&self, owner: &UserId) -> Result<Option<Duration>, CartCacheError> {
        self.inner.refresh_ttl(owner).await
    }

    async fn delete(&self, owner: &UserId) -> Result<bool, CartCacheError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(CartCacheError::Unavailable("injected delete failure".into()));
        }
        self.inner.delete(owner).await
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, CartCacheError> {
        self.inner.scan_keys(pattern).await
    }
}

/// A pickup store whose commits can be made to fail.
#[derive(Clone)]
pub struct FailingStore {
    pub inner: SqliteDatabase,
    pub fail_commits: Arc<AtomicBool>,
}

impl FailingStore {
    pub fn new(inner: SqliteDatabase) -> Self {
        Self { inner, fail_commits: Arc::new(AtomicBool::new(false)) }
    }

    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), PickupStoreError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(PickupStoreError::DatabaseError("injected commit failure".into()));
        }
        Ok(())
    }
}

impl PickupStore for FailingStore {
    async fn is_cart_committed(&self, cart_id: &str) -> Result<bool, PickupStoreError> {
        self.inner.is_cart_committed(cart_id).await
    }

    async fn commit_checkout(&self, request: NewPickupRequest) -> Result<PickupDetails, PickupStoreError> {
        self.check()?;
        self.inner.commit_checkout(request).await
    }

    async fn commit_cart_snapshot(&self, snapshot: NewCartSnapshot) -> Result<CartSnapshot, PickupStoreError> {
        self.check()?;
        self.inner.commit_cart_snapshot(snapshot).await
    }

    async fn cart_snapshots_for_owner(&self, owner: &UserId) -> Result<Vec<CartSnapshot>, PickupStoreError> {
        self.inner.cart_snapshots_for_owner(owner).await
    }

    async fn fetch_pickup(&self, id: i64) -> Result<Option<PickupRequest>, PickupStoreError> {
        self.inner.fetch_pickup(id).await
    }

    async fn fetch_pickup_items(&self, request_id: i64) -> Result<Vec<PickupRequestItem>, PickupStoreError> {
        self.inner.fetch_pickup_items(request_id).await
    }

    async fn fetch_open_pickups(&self) -> Result<Vec<PickupRequest>, PickupStoreError> {
        self.inner.fetch_open_pickups().await
    }

    async fn pickups_for_shopper(&self, shopper: &UserId) -> Result<Vec<PickupRequest>, PickupStoreError> {
        self.inner.pickups_for_shopper(shopper).await
    }

    async fn pickups_for_collector(&self, collector: &UserId) -> Result<Vec<PickupRequest>, PickupStoreError> {
        self.inner.pickups_for_collector(collector).await
    }

    async fn assign_collector(&self, request_id: i64, collector: &UserId) -> Result<PickupRequest, PickupStoreError> {
        self.inner.assign_collector(request_id, collector).await
    }

    async fn change_status(&self, change: StatusChange) -> Result<PickupRequest, PickupStoreError> {
        self.inner.change_status(change).await
    }

    async fn record_actual_amounts(
        &self,
        request_id: i64,
        updates: &[ActualAmountUpdate],
    ) -> Result<Vec<PickupRequestItem>, PickupStoreError> {
        self.inner.record_actual_amounts(request_id, updates).await
    }

    async fn status_history(&self, request_id: i64) -> Result<Vec<StatusHistoryEntry>, PickupStoreError> {
        self.inner.status_history(request_id).await
    }
}
