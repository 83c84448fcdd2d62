use mockall::mock;
use pickup_engine::{
    db_types::{
        ActualAmountUpdate,
        Address,
        CartSnapshot,
        Collector,
        NewCartSnapshot,
        NewPickupRequest,
        NewRating,
        PickupDetails,
        PickupRating,
        PickupRequest,
        PickupRequestItem,
        RatingSummary,
        StatusChange,
        StatusHistoryEntry,
        UserId,
        WasteCategoryId,
    },
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

mock! {
    pub PickupDb {}
    impl PickupStore for PickupDb {
        async fn is_cart_committed(&self, cart_id: &str) -> Result<bool, PickupStoreError>;
        async fn commit_checkout(&self, request: NewPickupRequest) -> Result<PickupDetails, PickupStoreError>;
        async fn commit_cart_snapshot(&self, snapshot: NewCartSnapshot) -> Result<CartSnapshot, PickupStoreError>;
        async fn cart_snapshots_for_owner(&self, owner: &UserId) -> Result<Vec<CartSnapshot>, PickupStoreError>;
        async fn fetch_pickup(&self, id: i64) -> Result<Option<PickupRequest>, PickupStoreError>;
        async fn fetch_pickup_items(&self, request_id: i64) -> Result<Vec<PickupRequestItem>, PickupStoreError>;
        async fn fetch_open_pickups(&self) -> Result<Vec<PickupRequest>, PickupStoreError>;
        async fn pickups_for_shopper(&self, shopper: &UserId) -> Result<Vec<PickupRequest>, PickupStoreError>;
        async fn pickups_for_collector(&self, collector: &UserId) -> Result<Vec<PickupRequest>, PickupStoreError>;
        async fn assign_collector(&self, request_id: i64, collector: &UserId) -> Result<PickupRequest, PickupStoreError>;
        async fn change_status(&self, change: StatusChange) -> Result<PickupRequest, PickupStoreError>;
        async fn record_actual_amounts(&self, request_id: i64, updates: &[ActualAmountUpdate]) -> Result<Vec<PickupRequestItem>, PickupStoreError>;
        async fn status_history(&self, request_id: i64) -> Result<Vec<StatusHistoryEntry>, PickupStoreError>;
    }
}

mock! {
    pub RatingDb {}
    impl RatingStore for RatingDb {
        async fn insert_rating(&self, rating: NewRating) -> Result<PickupRating, PickupStoreError>;
        async fn ratings_for_collector(&self, collector: &UserId) -> Result<Vec<PickupRating>, PickupStoreError>;
        async fn rating_summary(&self, collector: &UserId) -> Result<RatingSummary, PickupStoreError>;
    }
}

mock! {
    pub Rates {}
    impl RateLookup for Rates {
        async fn price_of(&self, category: WasteCategoryId) -> Result<Option<f64>, CatalogError>;
    }
}

mock! {
    pub Directory {}
    impl CollectorDirectory for Directory {
        async fn active_collectors(&self) -> Result<Vec<Collector>, CatalogError>;
        async fn collector_by_id(&self, id: &UserId) -> Result<Option<Collector>, CatalogError>;
    }
}

mock! {
    pub Addresses {}
    impl AddressBook for Addresses {
        async fn address_by_id(&self, id: i64) -> Result<Option<Address>, CatalogError>;
    }
}
