//! # thermotwin-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the repository port traits defined in `thermotwin-app::ports::storage`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `thermotwin-app` (for port traits) and `thermotwin-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod current_state_repo;
pub mod error;
pub mod pool;
pub mod target_state_repo;

pub use current_state_repo::SqliteCurrentStateRepository;
pub use error::StorageError;
pub use pool::{Config, Database};
pub use target_state_repo::SqliteTargetStateRepository;
