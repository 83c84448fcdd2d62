//! SQLite backend for the pickup engine.
//!
//! [`SqliteDatabase`] implements every backend trait in [`crate::traits`], so a single database file can drive the
//! whole pipeline.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
