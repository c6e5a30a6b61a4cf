//! Storage layer for voice-study
//!
//! PostgreSQL via sqlx for deployments, embedded SQLite (rusqlite + r2d2) for
//! local runs and tests. Both backends implement the async store traits and
//! are selected at runtime through [`StorageBackend`].

pub mod backend;
pub mod error;
#[cfg(feature = "sqlite")]
mod migrations;
#[cfg(feature = "postgres")]
mod pg_migrations;
#[cfg(feature = "postgres")]
pub mod pg_storage;
#[cfg(feature = "sqlite")]
mod sqlite_async;
#[cfg(feature = "sqlite")]
mod storage;
#[cfg(test)]
mod tests;
pub mod traits;
mod types;

pub use backend::StorageBackend;
pub use error::StorageError;
#[cfg(feature = "postgres")]
pub use pg_storage::PgStorage;
#[cfg(feature = "sqlite")]
pub use storage::Storage;
pub use types::{AppendOutcome, Registration};
