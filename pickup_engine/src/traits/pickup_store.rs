use thiserror::Error;

use crate::db_types::{
    ActualAmountUpdate,
    CartSnapshot,
    NewCartSnapshot,
    NewPickupRequest,
    PickupDetails,
    PickupRequest,
    PickupRequestItem,
    PickupStatus,
    StatusChange,
    StatusHistoryEntry,
    UserId,
};

#[derive(Debug, Clone, Error)]
pub enum PickupStoreError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Pickup request {0} does not exist")]
    RequestNotFound(i64),
    #[error("Item {item_id} does not belong to pickup request {request_id}")]
    ItemNotFound { request_id: i64, item_id: i64 },
    #[error("Pickup request {request_id} cannot move from {from} to {to}")]
    InvalidTransition { request_id: i64, from: PickupStatus, to: PickupStatus },
    #[error("A collector can only be selected while a request is waiting for one. Request {request_id} is {status}")]
    AssignmentClosed { request_id: i64, status: PickupStatus },
    #[error("Pickup request {request_id} is assigned to {assigned}, not {actual}")]
    CollectorMismatch { request_id: i64, assigned: String, actual: UserId },
    #[error("Amounts can only be recorded after a collector confirms. Request {request_id} is {status}")]
    AmountsClosed { request_id: i64, status: PickupStatus },
    #[error("Cart {0} has already been committed")]
    DuplicateCommit(String),
    #[error("Shopper {shopper_id} has already rated pickup request {request_id}")]
    DuplicateRating { request_id: i64, shopper_id: UserId },
    #[error("Cannot commit an empty {0}")]
    NothingToCommit(&'static str),
}

impl From<sqlx::Error> for PickupStoreError {
    fn from(e: sqlx::Error) -> Self {
        PickupStoreError::DatabaseError(e.to_string())
    }
}

/// The authoritative, durable store for pickup requests.
///
/// Every method that writes more than one row does so in a single transaction. Status transitions are
/// compare-and-set operations on the current status, so two concurrent transitions on the same request cannot both
/// succeed.
#[allow(async_fn_in_trait)]
pub trait PickupStore {
    /// Returns `true` if the cart lineage `cart_id` has already been committed, by checkout or by reconciliation.
    async fn is_cart_committed(&self, cart_id: &str) -> Result<bool, PickupStoreError>;

    /// Atomically writes the pickup request, its items, the initial `waiting_collector` history entry and the commit
    /// marker for the originating cart. Fails with [`PickupStoreError::DuplicateCommit`] (and writes nothing) if the
    /// cart has already been committed.
    async fn commit_checkout(&self, request: NewPickupRequest) -> Result<PickupDetails, PickupStoreError>;

    /// Atomically writes a durable cart snapshot and its commit marker. Fails with
    /// [`PickupStoreError::DuplicateCommit`] if the cart has already been committed.
    async fn commit_cart_snapshot(&self, snapshot: NewCartSnapshot) -> Result<CartSnapshot, PickupStoreError>;

    /// All snapshots persisted for the owner, oldest first.
    async fn cart_snapshots_for_owner(&self, owner: &UserId) -> Result<Vec<CartSnapshot>, PickupStoreError>;

    async fn fetch_pickup(&self, id: i64) -> Result<Option<PickupRequest>, PickupStoreError>;

    async fn fetch_pickup_items(&self, request_id: i64) -> Result<Vec<PickupRequestItem>, PickupStoreError>;

    /// Requests that are still waiting for a collector, oldest first.
    async fn fetch_open_pickups(&self) -> Result<Vec<PickupRequest>, PickupStoreError>;

    async fn pickups_for_shopper(&self, shopper: &UserId) -> Result<Vec<PickupRequest>, PickupStoreError>;

    async fn pickups_for_collector(&self, collector: &UserId) -> Result<Vec<PickupRequest>, PickupStoreError>;

    /// Assigns the collector, provided the request is still `waiting_collector`. Otherwise fails with
    /// [`PickupStoreError::AssignmentClosed`].
    async fn assign_collector(&self, request_id: i64, collector: &UserId) -> Result<PickupRequest, PickupStoreError>;

    /// Applies a compare-and-set status transition and appends the history entry in the same transaction.
    async fn change_status(&self, change: StatusChange) -> Result<PickupRequest, PickupStoreError>;

    /// Writes the actual amount and final price of every listed item, or none of them.
    ///
    /// The request must be `confirmed_by_collector` or `collector_are_picking_up` when the write happens, otherwise
    /// nothing is written and [`PickupStoreError::AmountsClosed`] is returned.
    async fn record_actual_amounts(
        &self,
        request_id: i64,
        updates: &[ActualAmountUpdate],
    ) -> Result<Vec<PickupRequestItem>, PickupStoreError>;

    /// The status history of the request, in the order it was written.
    async fn status_history(&self, request_id: i64) -> Result<Vec<StatusHistoryEntry>, PickupStoreError>;
}
