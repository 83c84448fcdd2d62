use log::*;

use crate::{
    db_types::{CartSnapshotLine, NewPickupItem, WasteCategoryId},
    pickup_api::cart_objects::Cart,
    traits::{CatalogError, RateLookup},
};

/// The result of pricing a cart against the current rates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PricedCart {
    pub lines: Vec<CartSnapshotLine>,
    /// Categories with no current rate. These lines are dropped.
    pub unpriceable: Vec<WasteCategoryId>,
}

impl PricedCart {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.lines.iter().map(|l| l.subtotal).sum()
    }

    pub fn to_pickup_items(&self) -> Vec<NewPickupItem> {
        self.lines
            .iter()
            .map(|l| NewPickupItem {
                waste_category_id: l.waste_category_id,
                estimated_amount: l.quantity,
                estimated_unit_price: l.unit_price,
            })
            .collect()
    }
}

/// Prices every line of the cart. Lines whose category has no current rate are dropped and reported in
/// [`PricedCart::unpriceable`].
pub async fn price_cart<R: RateLookup>(rates: &R, cart: &Cart) -> Result<PricedCart, CatalogError> {
    let mut priced = PricedCart::default();
    for line in &cart.lines {
        match rates.price_of(line.waste_category_id).await? {
            Some(unit_price) => priced.lines.push(CartSnapshotLine {
                waste_category_id: line.waste_category_id,
                quantity: line.quantity,
                unit_price,
                subtotal: line.quantity * unit_price,
            }),
            None => {
                debug!("🧾 Waste category {} has no current rate. Dropping it from cart {}", line.waste_category_id, cart.cart_id);
                priced.unpriceable.push(line.waste_category_id);
            },
        }
    }
    Ok(priced)
}
