//! `SqliteDatabase` is a concrete implementation of a pickup engine backend.
//!
//! It implements every trait in the [`crate::traits`] module: the durable pickup store, rating storage and the
//! catalogue lookups.
use std::fmt::Debug;

use chrono::Utc;
use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{carts, catalog, db_url, history, new_pool, pickups, ratings};
use crate::{
    db_types::{
        ActualAmountUpdate,
        Address,
        CartSnapshot,
        Collector,
        CollectorGuard,
        CommitSource,
        NewCartSnapshot,
        NewPickupRequest,
        NewRating,
        PickupDetails,
        PickupRating,
        PickupRequest,
        PickupRequestItem,
        PickupStatus,
        RatingSummary,
        StatusChange,
        StatusHistoryEntry,
        UserId,
        WasteCategory,
        WasteCategoryId,
    },
    helpers::geo::Coordinate,
    pickup_api::pickup_objects::PickupQueryFilter,
    traits::{
        AddressBook,
        CatalogError,
        CollectorDirectory,
        PickupStore,
        PickupStoreError,
        RateLookup,
        RatingStore,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

/// Works out why a compare-and-set transition matched no rows.
fn classify_failed_transition(current: Option<PickupRequest>, change: &StatusChange) -> PickupStoreError {
    let Some(current) = current else {
        return PickupStoreError::RequestNotFound(change.request_id);
    };
    if current.status != change.from {
        return PickupStoreError::InvalidTransition {
            request_id: change.request_id,
            from: current.status,
            to: change.to,
        };
    }
    let actual = match &change.guard {
        CollectorGuard::AssignedTo(c) | CollectorGuard::ClaimOrAssignedTo(c) => c.clone(),
        CollectorGuard::Any => change.changed_by.id.clone(),
    };
    PickupStoreError::CollectorMismatch {
        request_id: change.request_id,
        assigned: current.collector_id.map(|c| c.to_string()).unwrap_or_else(|| "nobody".to_string()),
        actual,
    }
}

impl PickupStore for SqliteDatabase {
    async fn is_cart_committed(&self, cart_id: &str) -> Result<bool, PickupStoreError> {
        let mut conn = self.pool.acquire().await?;
        let committed = carts::is_committed(cart_id, &mut conn).await?;
        Ok(committed)
    }

    /// Takes a checked-out cart, and in a single atomic transaction,
    /// * marks the cart lineage as committed. If it already was, nothing further is done.
    /// * inserts the pickup request and its items,
    /// * appends the initial `waiting_collector` history entry.
    async fn commit_checkout(&self, request: NewPickupRequest) -> Result<PickupDetails, PickupStoreError> {
        if request.items.is_empty() {
            return Err(PickupStoreError::NothingToCommit("pickup request"));
        }
        let mut tx = self.pool.begin().await?;
        let fresh = carts::insert_commit(
            &request.cart_id,
            &request.shopper_id,
            CommitSource::Checkout,
            request.requested_at,
            &mut tx,
        )
        .await?;
        if !fresh {
            return Err(PickupStoreError::DuplicateCommit(request.cart_id));
        }
        let pickup = pickups::insert_pickup_request(&request, &mut tx).await?;
        let items = pickups::insert_items(pickup.id, &request.items, &mut tx).await?;
        history::append_status(
            pickup.id,
            PickupStatus::WaitingCollector,
            request.requested_at,
            &request.requested_by,
            &mut tx,
        )
        .await?;
        tx.commit().await?;
        debug!(
            "🗃️ Cart {} committed as pickup request #{} with {} items",
            request.cart_id,
            pickup.id,
            items.len()
        );
        Ok(PickupDetails { request: pickup, items })
    }

    async fn commit_cart_snapshot(&self, snapshot: NewCartSnapshot) -> Result<CartSnapshot, PickupStoreError> {
        if snapshot.lines.is_empty() {
            return Err(PickupStoreError::NothingToCommit("cart snapshot"));
        }
        let mut tx = self.pool.begin().await?;
        let fresh = carts::insert_commit(
            &snapshot.cart_id,
            &snapshot.owner_id,
            CommitSource::Reconciliation,
            snapshot.committed_at,
            &mut tx,
        )
        .await?;
        if !fresh {
            return Err(PickupStoreError::DuplicateCommit(snapshot.cart_id));
        }
        let saved = carts::insert_snapshot(&snapshot, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Cart {} for {} persisted as snapshot #{}", saved.cart_id, saved.owner_id, saved.id);
        Ok(saved)
    }

    async fn cart_snapshots_for_owner(&self, owner: &UserId) -> Result<Vec<CartSnapshot>, PickupStoreError> {
        let mut conn = self.pool.acquire().await?;
        let snapshots = carts::fetch_snapshots_for_owner(owner, &mut conn).await?;
        Ok(snapshots)
    }

    async fn fetch_pickup(&self, id: i64) -> Result<Option<PickupRequest>, PickupStoreError> {
        let mut conn = self.pool.acquire().await?;
        let pickup = pickups::fetch_pickup(id, &mut conn).await?;
        Ok(pickup)
    }

    async fn fetch_pickup_items(&self, request_id: i64) -> Result<Vec<PickupRequestItem>, PickupStoreError> {
        let mut conn = self.pool.acquire().await?;
        let items = pickups::fetch_items(request_id, &mut conn).await?;
        Ok(items)
    }

    async fn fetch_open_pickups(&self) -> Result<Vec<PickupRequest>, PickupStoreError> {
        let mut conn = self.pool.acquire().await?;
        let query = PickupQueryFilter::default().with_status(PickupStatus::WaitingCollector);
        let open = pickups::search_pickups(query, &mut conn).await?;
        Ok(open)
    }

    async fn pickups_for_shopper(&self, shopper: &UserId) -> Result<Vec<PickupRequest>, PickupStoreError> {
        let mut conn = self.pool.acquire().await?;
        let query = PickupQueryFilter::default().with_shopper_id(shopper.clone());
        let result = pickups::search_pickups(query, &mut conn).await?;
        Ok(result)
    }

    async fn pickups_for_collector(&self, collector: &UserId) -> Result<Vec<PickupRequest>, PickupStoreError> {
        let mut conn = self.pool.acquire().await?;
        let query = PickupQueryFilter::default().with_collector_id(collector.clone());
        let result = pickups::search_pickups(query, &mut conn).await?;
        Ok(result)
    }

    async fn assign_collector(&self, request_id: i64, collector: &UserId) -> Result<PickupRequest, PickupStoreError> {
        let mut tx = self.pool.begin().await?;
        match pickups::assign_collector(request_id, collector, Utc::now(), &mut tx).await? {
            Some(pickup) => {
                tx.commit().await?;
                debug!("🗃️ Collector {collector} assigned to pickup request #{request_id}");
                Ok(pickup)
            },
            None => match pickups::fetch_pickup(request_id, &mut tx).await? {
                Some(p) => Err(PickupStoreError::AssignmentClosed { request_id, status: p.status }),
                None => Err(PickupStoreError::RequestNotFound(request_id)),
            },
        }
    }

    /// The conditional update runs first so the transaction holds the write lock before anything is read. A
    /// concurrent transition on the same request therefore sees the committed status and fails cleanly.
    async fn change_status(&self, change: StatusChange) -> Result<PickupRequest, PickupStoreError> {
        let mut tx = self.pool.begin().await?;
        match pickups::try_transition(&change, &mut tx).await? {
            Some(pickup) => {
                history::append_status(pickup.id, pickup.status, change.changed_at, &change.changed_by, &mut tx)
                    .await?;
                tx.commit().await?;
                Ok(pickup)
            },
            None => {
                let current = pickups::fetch_pickup(change.request_id, &mut tx).await?;
                Err(classify_failed_transition(current, &change))
            },
        }
    }

    async fn record_actual_amounts(
        &self,
        request_id: i64,
        updates: &[ActualAmountUpdate],
    ) -> Result<Vec<PickupRequestItem>, PickupStoreError> {
        let mut tx = self.pool.begin().await?;
        if !pickups::touch_weighable(request_id, Utc::now(), &mut tx).await? {
            return match pickups::fetch_pickup(request_id, &mut tx).await? {
                Some(request) => Err(PickupStoreError::AmountsClosed { request_id, status: request.status }),
                None => Err(PickupStoreError::RequestNotFound(request_id)),
            };
        }
        for update in updates {
            if pickups::update_actual_amount(request_id, update, &mut tx).await?.is_none() {
                // Dropping the transaction rolls back any items already written
                return Err(PickupStoreError::ItemNotFound { request_id, item_id: update.item_id });
            }
        }
        let items = pickups::fetch_items(request_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Actual amounts recorded for {} items of pickup request #{request_id}", updates.len());
        Ok(items)
    }

    async fn status_history(&self, request_id: i64) -> Result<Vec<StatusHistoryEntry>, PickupStoreError> {
        let mut conn = self.pool.acquire().await?;
        let history = history::fetch_history(request_id, &mut conn).await?;
        Ok(history)
    }
}

impl RatingStore for SqliteDatabase {
    async fn insert_rating(&self, rating: NewRating) -> Result<PickupRating, PickupStoreError> {
        let mut conn = self.pool.acquire().await?;
        if pickups::fetch_pickup(rating.request_id, &mut conn).await?.is_none() {
            return Err(PickupStoreError::RequestNotFound(rating.request_id));
        }
        let inserted = ratings::insert_rating(&rating, &mut conn).await?;
        inserted.ok_or(PickupStoreError::DuplicateRating {
            request_id: rating.request_id,
            shopper_id: rating.shopper_id,
        })
    }

    async fn ratings_for_collector(&self, collector: &UserId) -> Result<Vec<PickupRating>, PickupStoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = ratings::ratings_for_collector(collector, &mut conn).await?;
        Ok(result)
    }

    async fn rating_summary(&self, collector: &UserId) -> Result<RatingSummary, PickupStoreError> {
        let mut conn = self.pool.acquire().await?;
        let summary = ratings::rating_summary(collector, &mut conn).await?;
        Ok(summary)
    }
}

impl RateLookup for SqliteDatabase {
    async fn price_of(&self, category: WasteCategoryId) -> Result<Option<f64>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let price = catalog::price_of(category, &mut conn).await?;
        Ok(price)
    }
}

impl CollectorDirectory for SqliteDatabase {
    async fn active_collectors(&self) -> Result<Vec<Collector>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        catalog::fetch_active_collectors(&mut conn).await
    }

    async fn collector_by_id(&self, id: &UserId) -> Result<Option<Collector>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        catalog::fetch_collector(id, &mut conn).await
    }
}

impl AddressBook for SqliteDatabase {
    async fn address_by_id(&self, id: i64) -> Result<Option<Address>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        catalog::fetch_address(id, &mut conn).await
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date with the embedded migrations.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    //------------------------------------  Catalogue seeding  --------------------------------------------------------
    pub async fn upsert_waste_category(&self, category: &WasteCategory) -> Result<(), CatalogError> {
        let mut conn = self.pool.acquire().await?;
        catalog::upsert_waste_category(category, &mut conn).await?;
        Ok(())
    }

    pub async fn waste_categories(&self) -> Result<Vec<WasteCategory>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let categories = catalog::fetch_waste_categories(&mut conn).await?;
        Ok(categories)
    }

    pub async fn upsert_collector(&self, collector: &Collector) -> Result<(), CatalogError> {
        let mut tx = self.pool.begin().await?;
        catalog::upsert_collector(collector, &mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn insert_address(
        &self,
        owner: &UserId,
        label: Option<&str>,
        location: Coordinate,
    ) -> Result<Address, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let address = catalog::insert_address(owner, label, location, &mut conn).await?;
        Ok(address)
    }
}
