//! # Snapshot Store
//!
//! Persistence for daily category-count snapshots.
//!
//! ## Public API
//!
//! - `SnapshotStore`: the storage capability the tracker and dashboard depend on
//!   ("get counts for date" / "put counts for date", plus history reads).
//! - `DbRepository`: the PostgreSQL implementation (one row per date and category).
//! - `InMemorySnapshotStore`: a process-local implementation for dry runs and tests.
//! - `connect` / `run_migrations`: pool setup and embedded schema migrations.
//! - `DbError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod repository;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use repository::DbRepository;
pub use store::{InMemorySnapshotStore, SnapshotStore, UpsertOutcome, changed_categories};
