use std::fmt::Debug;

use log::*;

use crate::{
    db_types::UserId,
    helpers::geo::{nearby, Coordinate},
    pickup_api::{
        errors::MatchingError,
        pickup_objects::{CollectorMatch, RequestMatch},
    },
    traits::{AddressBook, CollectorDirectory, PickupStore},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchingConfig {
    pub default_radius_km: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self { default_radius_km: 10.0 }
    }
}

/// Matches pickup requests with collectors by great-circle distance.
pub struct MatchingApi<S, D, A> {
    store: S,
    directory: D,
    addresses: A,
    config: MatchingConfig,
}

impl<S, D, A> Debug for MatchingApi<S, D, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MatchingApi ({:?})", self.config)
    }
}

impl<S, D, A> MatchingApi<S, D, A> {
    pub fn new(store: S, directory: D, addresses: A, config: MatchingConfig) -> Self {
        Self { store, directory, addresses, config }
    }
}

impl<S, D, A> MatchingApi<S, D, A>
where
    S: PickupStore,
    D: CollectorDirectory,
    A: AddressBook,
{
    /// Active collectors within `radius_km` (or the default radius) of the request's pickup address, closest first.
    pub async fn nearby_collectors(
        &self,
        request_id: i64,
        radius_km: Option<f64>,
    ) -> Result<Vec<CollectorMatch>, MatchingError> {
        let radius = radius_km.unwrap_or(self.config.default_radius_km);
        let request = self.store.fetch_pickup(request_id).await?.ok_or(MatchingError::RequestNotFound(request_id))?;
        let origin = self.location_of(request.address_id).await?.ok_or(MatchingError::AddressNotFound(request.address_id))?;
        let collectors = self.directory.active_collectors().await?;
        let matches = nearby(&origin, collectors, radius, |c| Some(c.location))?
            .into_iter()
            .map(|n| CollectorMatch { collector: n.item, distance_km: n.distance_km })
            .collect::<Vec<_>>();
        debug!("📍 {} collectors within {radius}km of pickup request #{request_id}", matches.len());
        Ok(matches)
    }

    /// Open requests within `radius_km` (or the default radius) of the collector, closest first. A request is open
    /// while it is waiting for a collector and is either unassigned or assigned to this collector.
    pub async fn nearby_requests(
        &self,
        collector_id: &UserId,
        radius_km: Option<f64>,
    ) -> Result<Vec<RequestMatch>, MatchingError> {
        let radius = radius_km.unwrap_or(self.config.default_radius_km);
        let collector = self
            .directory
            .collector_by_id(collector_id)
            .await?
            .filter(|c| c.active)
            .ok_or_else(|| MatchingError::CollectorNotFound(collector_id.clone()))?;
        let open = self
            .store
            .fetch_open_pickups()
            .await?
            .into_iter()
            .filter(|r| r.collector_id.as_ref().map(|c| c == collector_id).unwrap_or(true))
            .collect::<Vec<_>>();
        let mut located = Vec::with_capacity(open.len());
        for request in open {
            match self.location_of(request.address_id).await? {
                Some(location) => located.push((request, location)),
                None => warn!("📍 Pickup request #{} refers to unknown address {}", request.id, request.address_id),
            }
        }
        let matches = nearby(&collector.location, located, radius, |(_, location)| Some(*location))?
            .into_iter()
            .map(|n| RequestMatch { request: n.item.0, distance_km: n.distance_km })
            .collect::<Vec<_>>();
        debug!("📍 {} open requests within {radius}km of collector {collector_id}", matches.len());
        Ok(matches)
    }

    async fn location_of(&self, address_id: i64) -> Result<Option<Coordinate>, MatchingError> {
        let address = self.addresses.address_by_id(address_id).await?;
        Ok(address.map(|a| a.location))
    }
}
