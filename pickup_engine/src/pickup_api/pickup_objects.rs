use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::db_types::{Collector, PickupMethod, PickupRequest, PickupStatus, UserId};

//--------------------------------------  PickupQueryFilter  ----------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct PickupQueryFilter {
    pub shopper_id: Option<UserId>,
    pub collector_id: Option<UserId>,
    pub statuses: Vec<PickupStatus>,
}

impl PickupQueryFilter {
    pub fn with_shopper_id(mut self, shopper_id: UserId) -> Self {
        self.shopper_id = Some(shopper_id);
        self
    }

    pub fn with_collector_id(mut self, collector_id: UserId) -> Self {
        self.collector_id = Some(collector_id);
        self
    }

    pub fn with_status(mut self, status: PickupStatus) -> Self {
        if !self.statuses.contains(&status) {
            self.statuses.push(status);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.shopper_id.is_none() && self.collector_id.is_none() && self.statuses.is_empty()
    }
}

impl Display for PickupQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(shopper_id) = &self.shopper_id {
            write!(f, "shopper_id: {shopper_id}. ")?;
        }
        if let Some(collector_id) = &self.collector_id {
            write!(f, "collector_id: {collector_id}. ")?;
        }
        if !self.statuses.is_empty() {
            let statuses = self.statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "statuses: [{statuses}]. ")?;
        }
        Ok(())
    }
}

//--------------------------------------   Request payloads  ----------------------------------------------------------
/// What a shopper supplies at checkout. The items come from the cached cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub address_id: i64,
    #[serde(default)]
    pub method: PickupMethod,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActualAmount {
    pub item_id: i64,
    pub actual_amount: f64,
}

//--------------------------------------   Matching results  ----------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorMatch {
    pub collector: Collector,
    pub distance_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMatch {
    pub request: PickupRequest,
    pub distance_km: f64,
}

//-------------------------------------- ReconciliationReport ---------------------------------------------------------
/// Tallies for a single reconciliation pass. Every scanned key lands in exactly one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub scanned: usize,
    /// Near-expiry carts persisted to the durable store and evicted.
    pub committed: usize,
    /// Carts whose lineage had already been committed. Evicted without writing.
    pub discarded_stale: usize,
    /// Carts with plenty of TTL left. Left alone.
    pub fresh: usize,
    /// Near-expiry carts with no priceable lines. Evicted without writing.
    pub unpriceable: usize,
    /// Keys that expired or were removed between the scan and the read.
    pub vanished: usize,
    pub failed: usize,
}

impl ReconciliationReport {
    pub fn processed(&self) -> usize {
        self.committed + self.discarded_stale + self.fresh + self.unpriceable + self.vanished + self.failed
    }
}

impl Display for ReconciliationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "scanned: {}, committed: {}, stale: {}, fresh: {}, unpriceable: {}, vanished: {}, failed: {}",
            self.scanned, self.committed, self.discarded_stale, self.fresh, self.unpriceable, self.vanished, self.failed
        )
    }
}
