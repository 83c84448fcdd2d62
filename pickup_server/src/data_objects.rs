use std::fmt::Display;

use chrono::{DateTime, Utc};
use pickup_engine::{cart_objects::Cart, db_types::UserId, pickup_objects::ActualAmount};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLineParams {
    pub waste_category_id: i64,
    pub quantity: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartResponse {
    pub cart: Option<Cart>,
    pub remaining_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CartTtl {
    /// Seconds until the cart expires, or `None` if there is no cart.
    pub remaining_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectCollectorParams {
    pub collector_id: UserId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfirmParams {
    /// When the collector accepted the job. Defaults to the time the request is received.
    #[serde(default)]
    pub confirmed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActualAmountsParams {
    pub items: Vec<ActualAmount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingParams {
    pub collector_id: UserId,
    pub rating: u8,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RadiusParams {
    #[serde(default)]
    pub radius_km: Option<f64>,
}
