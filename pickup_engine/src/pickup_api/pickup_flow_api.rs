use std::{collections::HashMap, fmt::Debug};

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    db_types::{
        ActualAmountUpdate,
        CollectorGuard,
        PickupDetails,
        PickupRequest,
        PickupRequestItem,
        PickupStatus,
        Principal,
        Role,
        StatusChange,
        StatusHistoryEntry,
        UserId,
    },
    pickup_api::{errors::PickupFlowError, pickup_objects::ActualAmount},
    traits::{CollectorDirectory, PickupStore},
};

/// `PickupFlowApi` drives a pickup request through its lifecycle once it has been checked out.
///
/// The permitted status changes are those in [`PickupStatus::can_transition_to`]:
///
/// ```text
///  waiting_collector ──confirm──▶ confirmed_by_collector ──pick up──▶ collector_are_picking_up ──complete──▶ completed
///          │                               │
///          └───────────cancel──────────────┴──────────────▶ cancelled
/// ```
///
/// Every transition is a compare-and-set against the status the request was in when it was read, and appends a
/// history entry in the same transaction. Of two concurrent transitions out of the same state, exactly one wins; the
/// other fails with [`PickupFlowError::InvalidTransition`].
pub struct PickupFlowApi<S, D> {
    store: S,
    directory: D,
}

impl<S, D> Debug for PickupFlowApi<S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PickupFlowApi")
    }
}

impl<S, D> PickupFlowApi<S, D> {
    pub fn new(store: S, directory: D) -> Self {
        Self { store, directory }
    }
}

impl<S, D> PickupFlowApi<S, D>
where
    S: PickupStore,
    D: CollectorDirectory,
{
    pub async fn fetch_pickup(&self, request_id: i64) -> Result<PickupDetails, PickupFlowError> {
        let request = self.request(request_id).await?;
        let items = self.store.fetch_pickup_items(request_id).await?;
        Ok(PickupDetails { request, items })
    }

    /// Fetches a request on behalf of `actor`. Shoppers see their own requests, collectors see requests assigned to
    /// them or still open, and admins see everything.
    pub async fn fetch_pickup_for(&self, actor: &Principal, request_id: i64) -> Result<PickupDetails, PickupFlowError> {
        let details = self.fetch_pickup(request_id).await?;
        let request = &details.request;
        let visible = match actor.role {
            Role::Admin => true,
            Role::Shopper => actor.is(&request.shopper_id),
            Role::Collector => match &request.collector_id {
                Some(c) => actor.is(c),
                None => request.status == PickupStatus::WaitingCollector,
            },
        };
        if !visible {
            return Err(PickupFlowError::Forbidden(format!("{actor} may not view pickup request #{request_id}")));
        }
        Ok(details)
    }

    pub async fn pickups_for_shopper(&self, shopper: &UserId) -> Result<Vec<PickupRequest>, PickupFlowError> {
        let pickups = self.store.pickups_for_shopper(shopper).await?;
        Ok(pickups)
    }

    pub async fn pickups_for_collector(&self, collector: &UserId) -> Result<Vec<PickupRequest>, PickupFlowError> {
        let pickups = self.store.pickups_for_collector(collector).await?;
        Ok(pickups)
    }

    /// The status history of the request, oldest entry first.
    pub async fn status_history(&self, request_id: i64) -> Result<Vec<StatusHistoryEntry>, PickupFlowError> {
        self.request(request_id).await?;
        let history = self.store.status_history(request_id).await?;
        Ok(history)
    }

    /// Assigns a collector to a request that is still waiting for one. Only the shopper who placed the request (or an
    /// admin) may choose. This does not change the status and writes no history.
    pub async fn select_collector(
        &self,
        actor: &Principal,
        request_id: i64,
        collector_id: &UserId,
    ) -> Result<PickupRequest, PickupFlowError> {
        if collector_id.is_empty() {
            return Err(PickupFlowError::Validation("collector_id must not be empty".into()));
        }
        let request = self.request(request_id).await?;
        if !(actor.is_admin() || actor.is(&request.shopper_id)) {
            return Err(PickupFlowError::Forbidden(format!(
                "Only the shopper who placed pickup request #{request_id} can choose its collector"
            )));
        }
        let collector = self.directory.collector_by_id(collector_id).await?;
        if !collector.map(|c| c.active).unwrap_or(false) {
            return Err(PickupFlowError::CollectorNotFound(collector_id.clone()));
        }
        let updated = self.store.assign_collector(request_id, collector_id).await?;
        info!("🚚 {actor} selected collector {collector_id} for pickup request #{request_id}");
        Ok(updated)
    }

    /// The collector accepts the request. If no collector was selected, the confirming collector is assigned.
    pub async fn confirm_by_collector(
        &self,
        actor: &Principal,
        request_id: i64,
        confirmed_at: DateTime<Utc>,
    ) -> Result<PickupRequest, PickupFlowError> {
        let collector = require_collector(actor)?;
        let guard = CollectorGuard::ClaimOrAssignedTo(collector.clone());
        self.transition(actor, request_id, PickupStatus::ConfirmedByCollector, guard, Some(confirmed_at)).await
    }

    pub async fn advance_to_picking_up(
        &self,
        actor: &Principal,
        request_id: i64,
    ) -> Result<PickupRequest, PickupFlowError> {
        let guard = self.assigned_collector_guard(actor)?;
        self.transition(actor, request_id, PickupStatus::CollectorArePickingUp, guard, None).await
    }

    pub async fn complete_pickup(&self, actor: &Principal, request_id: i64) -> Result<PickupRequest, PickupFlowError> {
        let guard = self.assigned_collector_guard(actor)?;
        self.transition(actor, request_id, PickupStatus::Completed, guard, None).await
    }

    /// Cancels a request that has not been picked up yet. The shopper who placed it, its assigned collector or an
    /// admin may cancel.
    pub async fn cancel_pickup(&self, actor: &Principal, request_id: i64) -> Result<PickupRequest, PickupFlowError> {
        let request = self.request(request_id).await?;
        let guard = match actor.role {
            Role::Admin => CollectorGuard::Any,
            Role::Shopper if actor.is(&request.shopper_id) => CollectorGuard::Any,
            Role::Collector => CollectorGuard::AssignedTo(actor.id.clone()),
            Role::Shopper => {
                return Err(PickupFlowError::Forbidden(format!(
                    "Only the shopper who placed pickup request #{request_id} can cancel it"
                )))
            },
        };
        self.transition_from(actor, request, PickupStatus::Cancelled, guard, None).await
    }

    /// Records the weighed amounts for some or all of a request's items and prices them with the assigned collector's
    /// declared unit prices, falling back to the estimated unit price where the collector has not declared one.
    ///
    /// The update is all-or-nothing. An item id that does not belong to the request fails the whole call with
    /// [`PickupFlowError::ItemNotFound`].
    pub async fn record_actual_amounts(
        &self,
        actor: &Principal,
        request_id: i64,
        amounts: &[ActualAmount],
    ) -> Result<Vec<PickupRequestItem>, PickupFlowError> {
        validate_amounts(amounts)?;
        let request = self.request(request_id).await?;
        if !matches!(request.status, PickupStatus::ConfirmedByCollector | PickupStatus::CollectorArePickingUp) {
            return Err(PickupFlowError::Conflict(format!(
                "Actual amounts can only be recorded once a collector has confirmed the request. Pickup request \
                 #{request_id} is {}",
                request.status
            )));
        }
        let collector_id = request.collector_id.clone().ok_or_else(|| {
            PickupFlowError::Conflict(format!("Pickup request #{request_id} has no assigned collector"))
        })?;
        if !(actor.is_admin() || actor.is(&collector_id)) {
            return Err(PickupFlowError::Forbidden(format!(
                "Only the assigned collector can record amounts for pickup request #{request_id}"
            )));
        }
        let items = self.store.fetch_pickup_items(request_id).await?;
        let items = items.iter().map(|i| (i.id, i)).collect::<HashMap<_, _>>();
        let collector = self.directory.collector_by_id(&collector_id).await?;
        let updates = amounts
            .iter()
            .map(|a| {
                let item = items.get(&a.item_id).ok_or(PickupFlowError::ItemNotFound { request_id, item_id: a.item_id })?;
                let unit_price = collector
                    .as_ref()
                    .and_then(|c| c.price_for(item.waste_category_id))
                    .unwrap_or(item.estimated_unit_price);
                Ok(ActualAmountUpdate {
                    item_id: a.item_id,
                    actual_amount: a.actual_amount,
                    final_price: a.actual_amount * unit_price,
                })
            })
            .collect::<Result<Vec<_>, PickupFlowError>>()?;
        let result = self.store.record_actual_amounts(request_id, &updates).await?;
        info!("🚚 {actor} recorded actual amounts for {} items of pickup request #{request_id}", updates.len());
        Ok(result)
    }

    async fn request(&self, request_id: i64) -> Result<PickupRequest, PickupFlowError> {
        self.store.fetch_pickup(request_id).await?.ok_or(PickupFlowError::RequestNotFound(request_id))
    }

    fn assigned_collector_guard(&self, actor: &Principal) -> Result<CollectorGuard, PickupFlowError> {
        match actor.role {
            Role::Admin => Ok(CollectorGuard::Any),
            _ => require_collector(actor).map(|c| CollectorGuard::AssignedTo(c.clone())),
        }
    }

    async fn transition(
        &self,
        actor: &Principal,
        request_id: i64,
        to: PickupStatus,
        guard: CollectorGuard,
        confirmed_at: Option<DateTime<Utc>>,
    ) -> Result<PickupRequest, PickupFlowError> {
        let request = self.request(request_id).await?;
        self.transition_from(actor, request, to, guard, confirmed_at).await
    }

    async fn transition_from(
        &self,
        actor: &Principal,
        request: PickupRequest,
        to: PickupStatus,
        guard: CollectorGuard,
        confirmed_at: Option<DateTime<Utc>>,
    ) -> Result<PickupRequest, PickupFlowError> {
        let from = request.status;
        if !from.can_transition_to(to) {
            return Err(PickupFlowError::InvalidTransition { request_id: request.id, from, to });
        }
        let change = StatusChange {
            request_id: request.id,
            from,
            to,
            changed_at: Utc::now(),
            changed_by: actor.clone(),
            confirmed_at,
            guard,
        };
        let updated = self.store.change_status(change).await?;
        info!("🚚 Pickup request #{} moved from {from} to {to} by {actor}", updated.id);
        Ok(updated)
    }
}

fn require_collector(actor: &Principal) -> Result<&UserId, PickupFlowError> {
    match actor.role {
        Role::Collector => Ok(&actor.id),
        _ => Err(PickupFlowError::Forbidden(format!("{actor} is not a collector"))),
    }
}

fn validate_amounts(amounts: &[ActualAmount]) -> Result<(), PickupFlowError> {
    if amounts.is_empty() {
        return Err(PickupFlowError::Validation("At least one item amount is required".into()));
    }
    let mut seen = Vec::with_capacity(amounts.len());
    for a in amounts {
        if !a.actual_amount.is_finite() || a.actual_amount < 0.0 {
            return Err(PickupFlowError::Validation(format!(
                "Actual amount for item {} must be a non-negative number",
                a.item_id
            )));
        }
        if seen.contains(&a.item_id) {
            return Err(PickupFlowError::Validation(format!("Item {} is listed more than once", a.item_id)));
        }
        seen.push(a.item_id);
    }
    Ok(())
}
