//! Data layer module
//!
//! Persists the URL of every successfully hosted upload.

mod database;
mod models;

pub use database::{Database, RecordStore, StoreError};
pub use models::*;

#[cfg(test)]
pub use database::MockRecordStore;
