//! # storage-adapters
//!
//! Persistence backends implementing the `domains` repository ports.
//! SQLite is the only backend today; it lives behind the `db-sqlite`
//! feature so the services can be built and tested without a database.

#[cfg(feature = "db-sqlite")]
pub mod sqlite;

#[cfg(feature = "db-sqlite")]
pub use sqlite::{SqliteStore, StorageError};
