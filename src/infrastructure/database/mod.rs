//! Database infrastructure
//!
//! SQLite metadata sidecar using sqlx with:
//! - WAL mode connection configuration
//! - Schema migrations
//! - Batched repository operations
//! - Filter-to-WHERE rendering

pub mod connection;
pub mod metadata_repo;
pub mod sql;

pub use connection::MetadataDb;
pub use metadata_repo::MetadataRepo;
pub use sql::where_clause;
