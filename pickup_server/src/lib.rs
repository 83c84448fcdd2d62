//! # Pickup server
//! This crate hosts the HTTP surface of the waste pickup engine. It is responsible for:
//! * Identifying the principal on whose behalf each request is made. Authentication itself happens upstream; the
//!   gateway asserts the principal in the `x-principal-id` and `x-principal-role` headers.
//! * Routing requests to the cart, checkout, matching, pickup flow and rating APIs.
//! * Running the periodic cart reconciliation worker.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/...`: The pickup API. See [routes](routes/index.html).
pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod reconciliation_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
