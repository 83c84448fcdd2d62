use thiserror::Error;

use crate::{
    db_types::{PickupStatus, UserId},
    helpers::geo::GeoError,
    traits::{CartCacheError, CatalogError, PickupStoreError},
};

/// A coarse classification of API failures, so callers can tell "nothing to do" apart from "the system is
/// unavailable" without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Forbidden,
    CacheUnavailable,
    EmptyCart,
    NoValidItems,
    ItemNotFound,
    CorruptData,
    Backend,
}

impl ErrorKind {
    /// Only infrastructure failures are worth retrying unchanged.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::CacheUnavailable | ErrorKind::Backend)
    }
}

//--------------------------------------     CartApiError    ----------------------------------------------------------
#[derive(Debug, Clone, Error)]
pub enum CartApiError {
    #[error("The cart cache is unavailable: {0}")]
    CacheUnavailable(String),
    #[error("The cached cart could not be read: {0}")]
    CorruptCart(String),
    #[error("Invalid cart request: {0}")]
    Validation(String),
}

impl From<CartCacheError> for CartApiError {
    fn from(e: CartCacheError) -> Self {
        match e {
            CartCacheError::Unavailable(s) => CartApiError::CacheUnavailable(s),
            CartCacheError::Payload(s) => CartApiError::CorruptCart(s),
        }
    }
}

impl CartApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CartApiError::CacheUnavailable(_) => ErrorKind::CacheUnavailable,
            CartApiError::CorruptCart(_) => ErrorKind::CorruptData,
            CartApiError::Validation(_) => ErrorKind::Validation,
        }
    }
}

//--------------------------------------    CheckoutError    ----------------------------------------------------------
#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("There is no cart to check out")]
    EmptyCart,
    #[error("None of the items in the cart can currently be priced")]
    NoValidItems,
    #[error("The cart cache is unavailable: {0}")]
    CacheUnavailable(String),
    #[error("The cached cart could not be read and was discarded: {0}")]
    CorruptCart(String),
    #[error("Invalid checkout request: {0}")]
    Validation(String),
    #[error("Address {0} does not exist")]
    AddressNotFound(i64),
    #[error("Cart {0} was committed by another process")]
    AlreadyCommitted(String),
    #[error("Could not read the catalogue: {0}")]
    Catalog(String),
    #[error("Could not save the pickup request: {0}")]
    Store(String),
}

impl From<CartCacheError> for CheckoutError {
    fn from(e: CartCacheError) -> Self {
        match e {
            CartCacheError::Unavailable(s) => CheckoutError::CacheUnavailable(s),
            CartCacheError::Payload(s) => CheckoutError::CorruptCart(s),
        }
    }
}

impl From<CatalogError> for CheckoutError {
    fn from(e: CatalogError) -> Self {
        CheckoutError::Catalog(e.to_string())
    }
}

impl From<PickupStoreError> for CheckoutError {
    fn from(e: PickupStoreError) -> Self {
        match e {
            PickupStoreError::DuplicateCommit(cart_id) => CheckoutError::AlreadyCommitted(cart_id),
            e => CheckoutError::Store(e.to_string()),
        }
    }
}

impl CheckoutError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckoutError::EmptyCart => ErrorKind::EmptyCart,
            CheckoutError::NoValidItems => ErrorKind::NoValidItems,
            CheckoutError::CacheUnavailable(_) => ErrorKind::CacheUnavailable,
            CheckoutError::CorruptCart(_) => ErrorKind::CorruptData,
            CheckoutError::Validation(_) => ErrorKind::Validation,
            CheckoutError::AddressNotFound(_) => ErrorKind::NotFound,
            CheckoutError::AlreadyCommitted(_) => ErrorKind::Conflict,
            CheckoutError::Catalog(_) | CheckoutError::Store(_) => ErrorKind::Backend,
        }
    }
}

//--------------------------------------   PickupFlowError   ----------------------------------------------------------
#[derive(Debug, Clone, Error)]
pub enum PickupFlowError {
    #[error("Pickup request {0} does not exist")]
    RequestNotFound(i64),
    #[error("Collector {0} does not exist or is not accepting pickups")]
    CollectorNotFound(UserId),
    #[error("Pickup request {request_id} cannot move from {from} to {to}")]
    InvalidTransition { request_id: i64, from: PickupStatus, to: PickupStatus },
    #[error("{0}")]
    Conflict(String),
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("Item {item_id} does not belong to pickup request {request_id}")]
    ItemNotFound { request_id: i64, item_id: i64 },
    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<PickupStoreError> for PickupFlowError {
    fn from(e: PickupStoreError) -> Self {
        match e {
            PickupStoreError::RequestNotFound(id) => PickupFlowError::RequestNotFound(id),
            PickupStoreError::ItemNotFound { request_id, item_id } => {
                PickupFlowError::ItemNotFound { request_id, item_id }
            },
            PickupStoreError::InvalidTransition { request_id, from, to } => {
                PickupFlowError::InvalidTransition { request_id, from, to }
            },
            e @ (PickupStoreError::AssignmentClosed { .. } |
            PickupStoreError::AmountsClosed { .. } |
            PickupStoreError::CollectorMismatch { .. }) => PickupFlowError::Conflict(e.to_string()),
            e => PickupFlowError::Backend(e.to_string()),
        }
    }
}

impl From<CatalogError> for PickupFlowError {
    fn from(e: CatalogError) -> Self {
        PickupFlowError::Backend(e.to_string())
    }
}

impl PickupFlowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PickupFlowError::RequestNotFound(_) | PickupFlowError::CollectorNotFound(_) => ErrorKind::NotFound,
            PickupFlowError::InvalidTransition { .. } | PickupFlowError::Conflict(_) => ErrorKind::Conflict,
            PickupFlowError::Validation(_) => ErrorKind::Validation,
            PickupFlowError::Forbidden(_) => ErrorKind::Forbidden,
            PickupFlowError::ItemNotFound { .. } => ErrorKind::ItemNotFound,
            PickupFlowError::Backend(_) => ErrorKind::Backend,
        }
    }
}

//--------------------------------------    MatchingError    ----------------------------------------------------------
#[derive(Debug, Clone, Error)]
pub enum MatchingError {
    #[error("Pickup request {0} does not exist")]
    RequestNotFound(i64),
    #[error("Collector {0} does not exist or is not accepting pickups")]
    CollectorNotFound(UserId),
    #[error("Address {0} does not exist")]
    AddressNotFound(i64),
    #[error("Invalid matching request: {0}")]
    Validation(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<PickupStoreError> for MatchingError {
    fn from(e: PickupStoreError) -> Self {
        match e {
            PickupStoreError::RequestNotFound(id) => MatchingError::RequestNotFound(id),
            e => MatchingError::Backend(e.to_string()),
        }
    }
}

impl From<CatalogError> for MatchingError {
    fn from(e: CatalogError) -> Self {
        MatchingError::Backend(e.to_string())
    }
}

impl From<GeoError> for MatchingError {
    fn from(e: GeoError) -> Self {
        MatchingError::Validation(e.to_string())
    }
}

impl MatchingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MatchingError::RequestNotFound(_) |
            MatchingError::CollectorNotFound(_) |
            MatchingError::AddressNotFound(_) => ErrorKind::NotFound,
            MatchingError::Validation(_) => ErrorKind::Validation,
            MatchingError::Backend(_) => ErrorKind::Backend,
        }
    }
}

//--------------------------------------     RatingError     ----------------------------------------------------------
#[derive(Debug, Clone, Error)]
pub enum RatingError {
    #[error("Pickup request {0} does not exist")]
    RequestNotFound(i64),
    #[error("Invalid rating: {0}")]
    Validation(String),
    #[error("{0}")]
    AlreadyRated(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<PickupStoreError> for RatingError {
    fn from(e: PickupStoreError) -> Self {
        match e {
            PickupStoreError::RequestNotFound(id) => RatingError::RequestNotFound(id),
            e @ PickupStoreError::DuplicateRating { .. } => RatingError::AlreadyRated(e.to_string()),
            e => RatingError::Backend(e.to_string()),
        }
    }
}

impl RatingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RatingError::RequestNotFound(_) => ErrorKind::NotFound,
            RatingError::Validation(_) => ErrorKind::Validation,
            RatingError::AlreadyRated(_) => ErrorKind::Conflict,
            RatingError::Backend(_) => ErrorKind::Backend,
        }
    }
}
