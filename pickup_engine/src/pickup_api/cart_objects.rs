use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{UserId, WasteCategoryId},
    traits::CartCacheError,
};

/// Bump this whenever the serialised shape of [`Cart`] changes.
pub const CART_SCHEMA_VERSION: u16 = 1;
pub const CART_KEY_PREFIX: &str = "cart:owner:";
pub const CART_KEY_PATTERN: &str = "cart:owner:*";

pub fn cart_key(owner: &UserId) -> String {
    format!("{CART_KEY_PREFIX}{owner}")
}

/// Recovers the owner from a cache key. Returns `None` for keys outside the cart namespace.
pub fn owner_from_key(key: &str) -> Option<UserId> {
    key.strip_prefix(CART_KEY_PREFIX).filter(|id| !id.is_empty()).map(UserId::from)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub waste_category_id: WasteCategoryId,
    pub quantity: f64,
}

impl CartLine {
    pub fn new(category: i64, quantity: f64) -> Self {
        Self { waste_category_id: WasteCategoryId(category), quantity }
    }
}

/// A shopper's in-progress cart, as held in the cart cache.
///
/// Lines are unique per waste category and always have a positive quantity. `cart_id` is minted when the cart is
/// first created and identifies the lineage for the at-most-once commit check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub schema_version: u16,
    pub cart_id: String,
    pub owner_id: UserId,
    pub lines: Vec<CartLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct VersionHeader {
    schema_version: u16,
}

impl Cart {
    pub fn new(owner_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            schema_version: CART_SCHEMA_VERSION,
            cart_id: new_cart_id(),
            owner_id,
            lines: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, category: WasteCategoryId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.waste_category_id == category)
    }

    /// Last write wins. A non-positive quantity removes the line.
    pub fn set_line(&mut self, line: CartLine) {
        if line.quantity <= 0.0 {
            self.remove_line(line.waste_category_id);
            return;
        }
        match self.lines.iter_mut().find(|l| l.waste_category_id == line.waste_category_id) {
            Some(existing) => existing.quantity = line.quantity,
            None => self.lines.push(line),
        }
        self.updated_at = Utc::now();
    }

    /// Returns `true` if a line was removed.
    pub fn remove_line(&mut self, category: WasteCategoryId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.waste_category_id != category);
        let removed = self.lines.len() != before;
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }

    pub fn to_payload(&self) -> Result<String, CartCacheError> {
        serde_json::to_string(self).map_err(|e| CartCacheError::Payload(e.to_string()))
    }

    /// Decodes a cached payload, rejecting documents written with a different schema version.
    pub fn from_payload(payload: &str) -> Result<Self, CartCacheError> {
        let header = serde_json::from_str::<VersionHeader>(payload)
            .map_err(|e| CartCacheError::Payload(format!("Missing schema version. {e}")))?;
        if header.schema_version != CART_SCHEMA_VERSION {
            return Err(CartCacheError::Payload(format!(
                "Unsupported cart schema version {}. Expected {CART_SCHEMA_VERSION}",
                header.schema_version
            )));
        }
        serde_json::from_str(payload).map_err(|e| CartCacheError::Payload(e.to_string()))
    }
}

fn new_cart_id() -> String {
    format!("{:016x}{:016x}", rand::random::<u64>(), rand::random::<u64>())
}
