//! Partsync Core Library
//!
//! Incrementally mirrors the JLCPCB component catalog into a local SQLite
//! database and enriches the stored parts with structured electrical
//! attributes parsed from their descriptions.
//!
//! # Architecture
//!
//! - [`db`] - Database connection and schema management
//! - [`catalog`] - Category/part models, repository traits and the SQLite adapter
//! - [`vendor`] - Vendor API client, token lifecycle, wire types and retry policy
//! - [`sync`] - Cursor-paginated sync engine with look-ahead fetching
//! - [`evict`] - Removal of parts the vendor stopped listing
//! - [`normalize`] - Quantity normalizers and the batch normalization pipeline

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod db;
pub mod evict;
pub mod normalize;
pub mod sync;
mod user_agent;
pub mod vendor;

// Re-export commonly used types
pub use catalog::{
    CatalogError, CatalogRepository, CatalogStore, Category, CategoryIndex, NewCategory, NewPart,
    Part, SqliteCatalog, UnitOfWork,
};
pub use db::{Database, DatabaseOptions, DbError};
pub use evict::{DEFAULT_RETENTION_DAYS, EvictError, EvictionReport, EvictionSweeper, evict_stale};
pub use normalize::{
    BatchPlan, DEFAULT_BATCH_TARGET, DEFAULT_WORKERS, NormalizationPipeline, NormalizeError,
    NormalizeStats, PartAttributes,
};
pub use sync::{
    DEFAULT_LOOKAHEAD, ExhaustionReason, MAX_LOOKAHEAD, SyncEngine, SyncError, SyncOutcome,
    SyncStats, Termination,
};
pub use vendor::{
    AuthConfig, AuthError, DEFAULT_BASE_URL, DEFAULT_MAX_RETRIES, RetryPolicy, TokenManager,
    VendorClient, VendorConfig, VendorSetupError,
};
