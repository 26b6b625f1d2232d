//! Catalog persistence: categories, parts and the repository seam.
//!
//! # Overview
//!
//! - [`Category`] / [`Part`] - stored records
//! - [`CatalogRepository`] - operations the sync, eviction and normalization
//!   phases rely on
//! - [`CatalogStore`] / [`UnitOfWork`] - isolated, explicitly committed sessions
//! - [`SqliteCatalog`] - the `SQLite` implementation
//! - [`CategoryIndex`] - in-memory subcategory lookup used during sync

mod error;
mod index;
mod model;
mod repository;
mod sqlite;

pub use error::{CatalogDbErrorKind, CatalogError};
pub use index::CategoryIndex;
pub use model::{Category, NewCategory, NewPart, Part};
pub use repository::{CatalogRepository, CatalogStore, UnitOfWork};
pub use sqlite::{SqliteCatalog, SqliteSession};

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;
