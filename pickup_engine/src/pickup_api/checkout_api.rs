use std::fmt::Debug;

use chrono::Utc;
use log::*;

use crate::{
    db_types::{NewPickupRequest, PickupDetails, Principal},
    helpers::price_cart,
    pickup_api::{errors::CheckoutError, pickup_objects::CheckoutRequest},
    traits::{AddressBook, CartCache, CartCacheError, PickupStore, RateLookup},
};

const MAX_NOTES_LENGTH: usize = 2000;

/// `CheckoutApi` converts a shopper's cached cart into a durable pickup request.
///
/// The conversion is committed-then-cleared: the cart is only evicted from the cache once the durable write has
/// succeeded, so a failure at any earlier step leaves the cart in place for a retry. The durable write also records
/// the cart lineage as committed, so a cart can never be converted twice even if the eviction fails.
pub struct CheckoutApi<C, R, S, A> {
    cache: C,
    rates: R,
    store: S,
    addresses: A,
}

impl<C, R, S, A> Debug for CheckoutApi<C, R, S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi")
    }
}

impl<C, R, S, A> CheckoutApi<C, R, S, A> {
    pub fn new(cache: C, rates: R, store: S, addresses: A) -> Self {
        Self { cache, rates, store, addresses }
    }
}

impl<C, R, S, A> CheckoutApi<C, R, S, A>
where
    C: CartCache,
    R: RateLookup,
    S: PickupStore,
    A: AddressBook,
{
    /// Checks out the shopper's cart.
    ///
    /// * [`CheckoutError::AddressNotFound`] if the pickup address does not exist or belongs to someone else.
    /// * [`CheckoutError::EmptyCart`] if there is no live cart, or its lineage was already committed (the stale copy
    ///   is evicted).
    /// * [`CheckoutError::CorruptCart`] if the cached document cannot be read. It is evicted, since no retry can
    ///   succeed.
    /// * [`CheckoutError::NoValidItems`] if none of the lines can currently be priced. Lines without a rate are
    ///   otherwise silently dropped.
    /// * [`CheckoutError::AlreadyCommitted`] if another process committed the same cart while this checkout was in
    ///   flight. Nothing is written or evicted.
    pub async fn checkout(
        &self,
        shopper: &Principal,
        request: CheckoutRequest,
    ) -> Result<PickupDetails, CheckoutError> {
        validate(&request)?;
        self.check_address(shopper, request.address_id).await?;
        let cart = match self.cache.get(&shopper.id).await {
            Ok(Some(cart)) if !cart.is_empty() => cart,
            Ok(_) => return Err(CheckoutError::EmptyCart),
            Err(e @ CartCacheError::Payload(_)) => {
                warn!("🧾 The cached cart for {} is unreadable. Discarding it. {e}", shopper.id);
                self.evict(shopper).await;
                return Err(e.into());
            },
            Err(e) => return Err(e.into()),
        };
        if self.store.is_cart_committed(&cart.cart_id).await? {
            info!("🧾 Cart {} for {} has already been committed. Discarding the cached copy.", cart.cart_id, shopper.id);
            self.evict(shopper).await;
            return Err(CheckoutError::EmptyCart);
        }
        let priced = price_cart(&self.rates, &cart).await?;
        if priced.is_empty() {
            info!("🧾 None of the {} lines in cart {} could be priced", cart.lines.len(), cart.cart_id);
            return Err(CheckoutError::NoValidItems);
        }
        let new_request = NewPickupRequest {
            shopper_id: shopper.id.clone(),
            address_id: request.address_id,
            method: request.method,
            notes: request.notes.filter(|n| !n.trim().is_empty()),
            cart_id: cart.cart_id.clone(),
            requested_at: Utc::now(),
            requested_by: shopper.clone(),
            items: priced.to_pickup_items(),
        };
        let details = self.store.commit_checkout(new_request).await?;
        info!(
            "🧾 Cart {} checked out by {} as pickup request #{} ({} items, estimated total {:.2})",
            cart.cart_id,
            shopper.id,
            details.request.id,
            details.items.len(),
            details.estimated_total()
        );
        self.evict(shopper).await;
        Ok(details)
    }

    async fn check_address(&self, shopper: &Principal, address_id: i64) -> Result<(), CheckoutError> {
        match self.addresses.address_by_id(address_id).await? {
            Some(address) if address.owner_id == shopper.id => Ok(()),
            Some(address) => {
                warn!("🧾 {} tried to check out to address {address_id}, which belongs to {}", shopper.id, address.owner_id);
                Err(CheckoutError::AddressNotFound(address_id))
            },
            None => Err(CheckoutError::AddressNotFound(address_id)),
        }
    }

    /// Best-effort eviction. The lineage is already recorded as committed, so a cart left behind is discarded the
    /// next time anything touches it.
    async fn evict(&self, shopper: &Principal) {
        if let Err(e) = self.cache.delete(&shopper.id).await {
            warn!("🧾 Could not evict the cart for {} after commit. It will be discarded as stale later. {e}", shopper.id);
        }
    }
}

fn validate(request: &CheckoutRequest) -> Result<(), CheckoutError> {
    if request.address_id <= 0 {
        return Err(CheckoutError::Validation("A pickup address is required".into()));
    }
    if request.notes.as_ref().map(|n| n.len() > MAX_NOTES_LENGTH).unwrap_or(false) {
        return Err(CheckoutError::Validation(format!("Notes cannot exceed {MAX_NOTES_LENGTH} characters")));
    }
    Ok(())
}
