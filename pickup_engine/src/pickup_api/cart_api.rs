use std::{fmt::Debug, time::Duration};

use log::*;

use crate::{
    db_types::{Principal, WasteCategoryId},
    pickup_api::{
        cart_objects::{Cart, CartLine},
        errors::CartApiError,
    },
    traits::CartCache,
};

/// `CartApi` manages shoppers' in-progress carts in the cart cache.
///
/// There is no retry logic here. A cache failure surfaces as [`CartApiError::CacheUnavailable`], and a missing cart
/// is simply an empty one.
pub struct CartApi<C> {
    cache: C,
}

impl<C> Debug for CartApi<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CartApi")
    }
}

impl<C> CartApi<C> {
    pub fn new(cache: C) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }
}

impl<C> CartApi<C>
where C: CartCache
{
    pub async fn get_cart(&self, owner: &Principal) -> Result<Option<Cart>, CartApiError> {
        let cart = self.cache.get(&owner.id).await?;
        Ok(cart)
    }

    /// Sets the quantity for the line's waste category, replacing any previous quantity. A non-positive quantity
    /// removes the line. Every write resets the cart's TTL.
    ///
    /// Returns the cart as stored, or `None` if the cart is now empty (in which case it is deleted).
    pub async fn add_or_update_line(&self, owner: &Principal, line: CartLine) -> Result<Option<Cart>, CartApiError> {
        if !line.quantity.is_finite() {
            return Err(CartApiError::Validation(format!("Quantity must be a finite number, not {}", line.quantity)));
        }
        let existing = self.cache.get(&owner.id).await?;
        if existing.is_none() && line.quantity <= 0.0 {
            trace!("🛒 Ignoring removal of category {} from {}'s empty cart", line.waste_category_id, owner.id);
            return Ok(None);
        }
        let mut cart = existing.unwrap_or_else(|| {
            debug!("🛒 Starting a new cart for {}", owner.id);
            Cart::new(owner.id.clone())
        });
        cart.set_line(line);
        self.store(owner, cart).await
    }

    /// Removes the line for `category`. Removing the last line deletes the cart.
    pub async fn remove_line(
        &self,
        owner: &Principal,
        category: WasteCategoryId,
    ) -> Result<Option<Cart>, CartApiError> {
        let Some(mut cart) = self.cache.get(&owner.id).await? else {
            return Ok(None);
        };
        if !cart.remove_line(category) {
            trace!("🛒 Category {category} is not in {}'s cart", owner.id);
            return Ok(Some(cart));
        }
        self.store(owner, cart).await
    }

    /// Deletes the owner's cart. Clearing an absent cart is not an error.
    pub async fn clear(&self, owner: &Principal) -> Result<(), CartApiError> {
        if self.cache.delete(&owner.id).await? {
            debug!("🛒 Cart for {} cleared", owner.id);
        }
        Ok(())
    }

    /// Extends the lifetime of the owner's cart to the full TTL window without changing it.
    pub async fn refresh_ttl(&self, owner: &Principal) -> Result<Option<Duration>, CartApiError> {
        let ttl = self.cache.refresh_ttl(&owner.id).await?;
        Ok(ttl)
    }

    pub async fn remaining_ttl(&self, owner: &Principal) -> Result<Option<Duration>, CartApiError> {
        let ttl = self.cache.remaining_ttl(&owner.id).await?;
        Ok(ttl)
    }

    async fn store(&self, owner: &Principal, cart: Cart) -> Result<Option<Cart>, CartApiError> {
        if cart.is_empty() {
            self.cache.delete(&owner.id).await?;
            debug!("🛒 Last line removed. Cart {} for {} deleted", cart.cart_id, owner.id);
            return Ok(None);
        }
        self.cache.upsert(&owner.id, &cart).await?;
        trace!("🛒 Cart {} for {} now has {} lines", cart.cart_id, owner.id, cart.lines.len());
        Ok(Some(cart))
    }
}
