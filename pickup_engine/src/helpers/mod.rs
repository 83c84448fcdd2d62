pub mod geo;
mod pricing;

pub use pricing::{price_cart, PricedCart};
