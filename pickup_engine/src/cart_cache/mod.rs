//! Cart cache backends.
//!
//! [`MemoryCartCache`] keeps cart documents in a process-local map with sliding expiry. [`BoundedCartCache`] wraps any
//! [`CartCache`](crate::traits::CartCache) and bounds every call with a short timeout so that a slow cache surfaces as
//! "unavailable" instead of stalling a request.
mod bounded;
mod memory;

pub use bounded::BoundedCartCache;
pub use memory::MemoryCartCache;

/// Glob matching for cache keys. Only a single trailing `*` is supported; any other pattern is an exact match.
pub(crate) fn key_matches(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key == pattern,
    }
}
