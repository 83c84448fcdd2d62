use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

use crate::helpers::geo::Coordinate;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------        UserId        ---------------------------------------------------------
/// A lightweight wrapper around the identifier the user directory issues for shoppers, collectors and admins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

//--------------------------------------    WasteCategoryId    --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct WasteCategoryId(pub i64);

impl WasteCategoryId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl Display for WasteCategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for WasteCategoryId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

//--------------------------------------        Role         ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Shopper,
    Collector,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Shopper => write!(f, "shopper"),
            Role::Collector => write!(f, "collector"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shopper" => Ok(Self::Shopper),
            "collector" => Ok(Self::Collector),
            "admin" => Ok(Self::Admin),
            _ => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------      Principal      ----------------------------------------------------------
/// The authenticated actor on whose behalf an operation is carried out.
///
/// Authentication happens upstream. Every core operation receives the principal explicitly, and status transitions
/// record it in the history table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn new<S: Into<String>>(id: S, role: Role) -> Self {
        Self { id: UserId::new(id), role }
    }

    pub fn shopper<S: Into<String>>(id: S) -> Self {
        Self::new(id, Role::Shopper)
    }

    pub fn collector<S: Into<String>>(id: S) -> Self {
        Self::new(id, Role::Collector)
    }

    pub fn admin<S: Into<String>>(id: S) -> Self {
        Self::new(id, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is(&self, id: &UserId) -> bool {
        &self.id == id
    }
}

impl Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.id, self.role)
    }
}

//--------------------------------------    PickupStatus     ----------------------------------------------------------
/// The lifecycle of a pickup request.
///
/// | From \ To                  | Confirmed | PickingUp | Completed | Cancelled |
/// |----------------------------|-----------|-----------|-----------|-----------|
/// | `WaitingCollector`         | ✔         |           |           | ✔         |
/// | `ConfirmedByCollector`     |           | ✔         |           | ✔         |
/// | `CollectorArePickingUp`    |           |           | ✔         |           |
/// | `Completed`, `Cancelled`   |           |           |           |           |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PickupStatus {
    WaitingCollector,
    ConfirmedByCollector,
    CollectorArePickingUp,
    Completed,
    Cancelled,
}

impl PickupStatus {
    pub fn can_transition_to(self, next: PickupStatus) -> bool {
        use PickupStatus::*;
        matches!(
            (self, next),
            (WaitingCollector, ConfirmedByCollector) |
                (WaitingCollector, Cancelled) |
                (ConfirmedByCollector, CollectorArePickingUp) |
                (ConfirmedByCollector, Cancelled) |
                (CollectorArePickingUp, Completed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PickupStatus::Completed | PickupStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PickupStatus::WaitingCollector => "waiting_collector",
            PickupStatus::ConfirmedByCollector => "confirmed_by_collector",
            PickupStatus::CollectorArePickingUp => "collector_are_picking_up",
            PickupStatus::Completed => "completed",
            PickupStatus::Cancelled => "cancelled",
        }
    }
}

impl Display for PickupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PickupStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting_collector" => Ok(Self::WaitingCollector),
            "confirmed_by_collector" => Ok(Self::ConfirmedByCollector),
            "collector_are_picking_up" => Ok(Self::CollectorArePickingUp),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ConversionError(format!("Invalid pickup status: {s}"))),
        }
    }
}

//--------------------------------------    PickupMethod     ----------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PickupMethod {
    /// The shopper selects a collector explicitly.
    #[default]
    Manual,
    /// The first collector to confirm the request is assigned to it.
    Automatic,
}

impl Display for PickupMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PickupMethod::Manual => write!(f, "manual"),
            PickupMethod::Automatic => write!(f, "automatic"),
        }
    }
}

impl FromStr for PickupMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "automatic" => Ok(Self::Automatic),
            _ => Err(ConversionError(format!("Invalid pickup method: {s}"))),
        }
    }
}

//--------------------------------------    CommitSource     ----------------------------------------------------------
/// Which path committed a cart lineage to the durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CommitSource {
    Checkout,
    Reconciliation,
}

impl Display for CommitSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommitSource::Checkout => write!(f, "checkout"),
            CommitSource::Reconciliation => write!(f, "reconciliation"),
        }
    }
}

//--------------------------------------    PickupRequest    ----------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct PickupRequest {
    pub id: i64,
    pub shopper_id: UserId,
    pub address_id: i64,
    pub method: PickupMethod,
    pub notes: Option<String>,
    pub status: PickupStatus,
    pub collector_id: Option<UserId>,
    pub cart_id: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct PickupRequestItem {
    pub id: i64,
    pub request_id: i64,
    pub waste_category_id: WasteCategoryId,
    pub estimated_amount: f64,
    pub estimated_unit_price: f64,
    pub estimated_subtotal: f64,
    pub actual_amount: Option<f64>,
    pub final_price: Option<f64>,
}

/// A pickup request together with its line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupDetails {
    pub request: PickupRequest,
    pub items: Vec<PickupRequestItem>,
}

impl PickupDetails {
    pub fn estimated_total(&self) -> f64 {
        self.items.iter().map(|i| i.estimated_subtotal).sum()
    }

    /// The sum of final prices, or `None` until every item has one.
    pub fn final_total(&self) -> Option<f64> {
        self.items.iter().map(|i| i.final_price).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPickupItem {
    pub waste_category_id: WasteCategoryId,
    pub estimated_amount: f64,
    pub estimated_unit_price: f64,
}

impl NewPickupItem {
    pub fn estimated_subtotal(&self) -> f64 {
        self.estimated_amount * self.estimated_unit_price
    }
}

/// Everything the durable store needs to commit a checkout atomically: the request, its items, the first history
/// entry and the commit marker for the originating cart.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPickupRequest {
    pub shopper_id: UserId,
    pub address_id: i64,
    pub method: PickupMethod,
    pub notes: Option<String>,
    pub cart_id: String,
    pub requested_at: DateTime<Utc>,
    pub requested_by: Principal,
    pub items: Vec<NewPickupItem>,
}

//--------------------------------------   Status history    ----------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub id: i64,
    pub request_id: i64,
    pub status: PickupStatus,
    pub changed_at: DateTime<Utc>,
    pub changed_by_id: UserId,
    pub changed_by_role: Role,
}

/// Constrains which collector may perform a status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectorGuard {
    /// No collector constraint (admins and shoppers cancelling their own requests).
    Any,
    /// The request must already be assigned to this collector.
    AssignedTo(UserId),
    /// The request must be unassigned or assigned to this collector. An unassigned request is claimed.
    ClaimOrAssignedTo(UserId),
}

/// A compare-and-set status transition. It succeeds only while the request is still in `from`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub request_id: i64,
    pub from: PickupStatus,
    pub to: PickupStatus,
    pub changed_at: DateTime<Utc>,
    pub changed_by: Principal,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub guard: CollectorGuard,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActualAmountUpdate {
    pub item_id: i64,
    pub actual_amount: f64,
    pub final_price: f64,
}

//--------------------------------------       Ratings       ----------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct PickupRating {
    pub id: i64,
    pub request_id: i64,
    pub shopper_id: UserId,
    pub collector_id: UserId,
    pub rating: i64,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRating {
    pub request_id: i64,
    pub shopper_id: UserId,
    pub collector_id: UserId,
    pub rating: u8,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub collector_id: UserId,
    pub average: f64,
    pub count: i64,
}

//--------------------------------------    Cart snapshots   ----------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct CartSnapshotLine {
    pub waste_category_id: WasteCategoryId,
    pub quantity: f64,
    pub unit_price: f64,
    pub subtotal: f64,
}

/// The durable record of a cart that was about to expire from the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub id: i64,
    pub cart_id: String,
    pub owner_id: UserId,
    pub committed_at: DateTime<Utc>,
    pub lines: Vec<CartSnapshotLine>,
}

impl CartSnapshot {
    pub fn total(&self) -> f64 {
        self.lines.iter().map(|l| l.subtotal).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCartSnapshot {
    pub cart_id: String,
    pub owner_id: UserId,
    pub committed_at: DateTime<Utc>,
    pub lines: Vec<CartSnapshotLine>,
}

//--------------------------------------  Collectors & co.   ----------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct CollectorPrice {
    pub waste_category_id: WasteCategoryId,
    pub unit_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collector {
    pub id: UserId,
    pub name: String,
    pub location: Coordinate,
    pub active: bool,
    pub prices: Vec<CollectorPrice>,
}

impl Collector {
    /// The unit price this collector has declared for the given waste category, if any.
    pub fn price_for(&self, category: WasteCategoryId) -> Option<f64> {
        self.prices.iter().find(|p| p.waste_category_id == category).map(|p| p.unit_price)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub id: i64,
    pub owner_id: UserId,
    pub label: Option<String>,
    pub location: Coordinate,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct WasteCategory {
    pub id: WasteCategoryId,
    pub name: String,
    pub unit_price: f64,
    pub active: bool,
}
