use std::{env, fmt::Display, str::FromStr, time::Duration};

use log::*;
use pickup_engine::{MatchingConfig, ReconciliationConfig};

const DEFAULT_PICKUP_HOST: &str = "127.0.0.1";
const DEFAULT_PICKUP_PORT: u16 = 8460;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/pickup_store.db";
const DEFAULT_CART_TTL: Duration = Duration::from_secs(30 * 60);
const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_millis(500);
const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_NEAR_EXPIRY: Duration = Duration::from_secs(60);
const DEFAULT_MATCH_RADIUS_KM: f64 = 10.0;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// How long an untouched cart lives in the cart cache. Every write resets the clock.
    pub cart_ttl: Duration,
    /// The time limit on every call into the cart cache. A call that exceeds it fails as if the cache were down.
    pub cache_timeout: Duration,
    /// The time between reconciliation passes.
    pub reconcile_interval: Duration,
    /// Carts with less than this much TTL left are persisted by the reconciliation worker.
    pub near_expiry: Duration,
    /// The search radius used by the matching routes when the caller does not supply one.
    pub match_radius_km: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_PICKUP_HOST.to_string(),
            port: DEFAULT_PICKUP_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            cart_ttl: DEFAULT_CART_TTL,
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
            reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
            near_expiry: DEFAULT_NEAR_EXPIRY,
            match_radius_km: DEFAULT_MATCH_RADIUS_KM,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("PICKUP_HOST").ok().unwrap_or_else(|| DEFAULT_PICKUP_HOST.into());
        let port = parse_env("PICKUP_PORT", DEFAULT_PICKUP_PORT);
        let database_url = env::var("PICKUP_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ PICKUP_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let cart_ttl = Duration::from_secs(parse_env("PICKUP_CART_TTL_SECS", DEFAULT_CART_TTL.as_secs()));
        let cache_timeout =
            Duration::from_millis(parse_env("PICKUP_CACHE_TIMEOUT_MS", DEFAULT_CACHE_TIMEOUT.as_millis() as u64));
        let reconcile_interval =
            Duration::from_secs(parse_env("PICKUP_RECONCILE_INTERVAL_SECS", DEFAULT_RECONCILE_INTERVAL.as_secs()));
        let near_expiry = Duration::from_secs(parse_env("PICKUP_NEAR_EXPIRY_SECS", DEFAULT_NEAR_EXPIRY.as_secs()));
        let match_radius_km = parse_env("PICKUP_MATCH_RADIUS_KM", DEFAULT_MATCH_RADIUS_KM);
        Self { host, port, database_url, cart_ttl, cache_timeout, reconcile_interval, near_expiry, match_radius_km }
            .sanitized()
    }

    pub fn reconciliation_config(&self) -> ReconciliationConfig {
        ReconciliationConfig { near_expiry: self.near_expiry }
    }

    pub fn matching_config(&self) -> MatchingConfig {
        MatchingConfig { default_radius_km: self.match_radius_km }
    }

    /// Replaces values that would leave the server unable to work with their defaults.
    fn sanitized(mut self) -> Self {
        if self.cart_ttl.is_zero() {
            error!("🪛️ PICKUP_CART_TTL_SECS must be positive. Using the default, {}s.", DEFAULT_CART_TTL.as_secs());
            self.cart_ttl = DEFAULT_CART_TTL;
        }
        if self.cache_timeout.is_zero() {
            error!(
                "🪛️ PICKUP_CACHE_TIMEOUT_MS must be positive. Using the default, {}ms.",
                DEFAULT_CACHE_TIMEOUT.as_millis()
            );
            self.cache_timeout = DEFAULT_CACHE_TIMEOUT;
        }
        if self.reconcile_interval.is_zero() {
            error!(
                "🪛️ PICKUP_RECONCILE_INTERVAL_SECS must be positive. Using the default, {}s.",
                DEFAULT_RECONCILE_INTERVAL.as_secs()
            );
            self.reconcile_interval = DEFAULT_RECONCILE_INTERVAL;
        }
        if self.near_expiry >= self.cart_ttl {
            warn!(
                "🪛️ PICKUP_NEAR_EXPIRY_SECS ({}s) is not less than the cart TTL ({}s). Every cart will be saved on \
                 the first reconciliation pass after it is written.",
                self.near_expiry.as_secs(),
                self.cart_ttl.as_secs()
            );
        }
        if !self.match_radius_km.is_finite() || self.match_radius_km <= 0.0 {
            error!(
                "🪛️ PICKUP_MATCH_RADIUS_KM must be a positive number. Using the default, {DEFAULT_MATCH_RADIUS_KM}km."
            );
            self.match_radius_km = DEFAULT_MATCH_RADIUS_KM;
        }
        self
    }
}

fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => {
            debug!("🪛️ {name} is not set. Using the default value of {default}.");
            default
        },
    }
}
