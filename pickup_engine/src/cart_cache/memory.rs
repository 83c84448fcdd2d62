use std::{collections::HashMap, fmt::Debug, sync::Arc, time::Duration};

use log::*;
use tokio::{sync::RwLock, time::Instant};

use super::key_matches;
use crate::{
    db_types::UserId,
    pickup_api::cart_objects::{cart_key, Cart},
    traits::{CartCache, CartCacheError},
};

struct Entry {
    payload: String,
    expires_at: Instant,
}

impl Entry {
    fn remaining(&self, now: Instant) -> Option<Duration> {
        (self.expires_at > now).then(|| self.expires_at - now)
    }
}

/// A process-local cart cache with sliding expiry.
///
/// Carts are stored as their versioned JSON payloads, exactly as a networked cache would hold them. Expired entries
/// are invisible to readers and are purged lazily on writes and scans. Clones share the same underlying map.
#[derive(Clone)]
pub struct MemoryCartCache {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl Debug for MemoryCartCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MemoryCartCache (ttl: {}s)", self.ttl.as_secs())
    }
}

impl MemoryCartCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.read().await.values().filter(|e| e.expires_at > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Stores a raw payload under the owner's key. Used to simulate documents written by other versions of the
    /// service.
    pub async fn insert_raw(&self, owner: &UserId, payload: String) {
        let expires_at = Instant::now() + self.ttl;
        self.entries.write().await.insert(cart_key(owner), Entry { payload, expires_at });
    }
}

impl CartCache for MemoryCartCache {
    async fn get(&self, owner: &UserId) -> Result<Option<Cart>, CartCacheError> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        match entries.get(&cart_key(owner)) {
            Some(entry) if entry.expires_at > now => Cart::from_payload(&entry.payload).map(Some),
            _ => Ok(None),
        }
    }

    async fn upsert(&self, owner: &UserId, cart: &Cart) -> Result<(), CartCacheError> {
        let payload = cart.to_payload()?;
        let expires_at = Instant::now() + self.ttl;
        let mut entries = self.entries.write().await;
        entries.insert(cart_key(owner), Entry { payload, expires_at });
        trace!("🛒 Cart for {owner} cached for {}s", self.ttl.as_secs());
        Ok(())
    }

    async fn remaining_ttl(&self, owner: &UserId) -> Result<Option<Duration>, CartCacheError> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries.get(&cart_key(owner)).and_then(|e| e.remaining(now)))
    }

    async fn refresh_ttl(&self, owner: &UserId) -> Result<Option<Duration>, CartCacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        match entries.get_mut(&cart_key(owner)) {
            Some(entry) if entry.expires_at > now => {
                entry.expires_at = now + self.ttl;
                Ok(Some(self.ttl))
            },
            _ => Ok(None),
        }
    }

    async fn delete(&self, owner: &UserId) -> Result<bool, CartCacheError> {
        let now = Instant::now();
        let removed = self.entries.write().await.remove(&cart_key(owner));
        Ok(removed.map(|e| e.expires_at > now).unwrap_or(false))
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, CartCacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        let purged = before - entries.len();
        if purged > 0 {
            debug!("🛒 Purged {purged} expired carts");
        }
        let mut keys = entries.keys().filter(|k| key_matches(pattern, k)).cloned().collect::<Vec<_>>();
        keys.sort();
        Ok(keys)
    }
}
