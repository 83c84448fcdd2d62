//! Great-circle distances and radius filtering for matching shoppers with collectors.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius in kilometres (IUGG).
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GeoError {
    #[error("Latitude {0} is out of range [-90, 90]")]
    InvalidLatitude(f64),
    #[error("Longitude {0} is out of range [-180, 180]")]
    InvalidLongitude(f64),
    #[error("Search radius must be a non-negative number of kilometres, not {0}")]
    InvalidRadius(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn try_new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoError::InvalidLatitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::InvalidLongitude(longitude));
        }
        Ok(Self { latitude, longitude })
    }
}

/// Haversine distance between two points in kilometres.
pub fn distance_km(a: &Coordinate, b: &Coordinate) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let d_lat = lat2 - lat1;
    let d_lon = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push h fractionally above 1 for antipodal points
    let c = 2.0 * h.sqrt().min(1.0).asin();
    EARTH_RADIUS_KM * c
}

/// A candidate that fell within the search radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nearby<T> {
    pub item: T,
    pub distance_km: f64,
}

/// Returns all and only the candidates within `max_km` of `origin`, closest first.
///
/// `locate` extracts the position of a candidate. Candidates without a position are skipped.
pub fn nearby<T, F>(origin: &Coordinate, candidates: Vec<T>, max_km: f64, locate: F) -> Result<Vec<Nearby<T>>, GeoError>
where F: Fn(&T) -> Option<Coordinate> {
    if !max_km.is_finite() || max_km < 0.0 {
        return Err(GeoError::InvalidRadius(max_km));
    }
    let mut result = candidates
        .into_iter()
        .filter_map(|item| {
            let location = locate(&item)?;
            let distance_km = distance_km(origin, &location);
            (distance_km <= max_km).then_some(Nearby { item, distance_km })
        })
        .collect::<Vec<_>>();
    result.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    Ok(result)
}
