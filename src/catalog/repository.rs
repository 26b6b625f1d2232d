//! Repository seam for catalog persistence.
//!
//! The sync engine, eviction sweeper and normalization pipeline depend only
//! on these traits. A repository value is one unit of work: its writes
//! become visible when [`UnitOfWork::commit`] is called and are discarded if
//! it is dropped first.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Category, NewCategory, NewPart, Part, Result};
use crate::normalize::PartAttributes;

/// Data-access contract for categories and parts.
#[async_trait]
pub trait CatalogRepository: Send {
    /// Looks up a category by its identity key.
    async fn find_category_by_subcategory(&mut self, name: &str) -> Result<Option<Category>>;

    /// Inserts the category unless its subcategory already exists, and
    /// returns the stored row either way.
    async fn upsert_category(&mut self, category: &NewCategory) -> Result<Category>;

    async fn find_category_by_id(&mut self, id: i64) -> Result<Option<Category>>;

    /// Inserts or refreshes a part keyed by `lcsc_code`; returns the stored row.
    async fn upsert_part(&mut self, part: &NewPart) -> Result<Part>;

    async fn count_parts(&mut self) -> Result<i64>;

    /// Reads parts ordered by id, so consecutive windows never overlap.
    async fn list_parts(&mut self, offset: i64, limit: i64) -> Result<Vec<Part>>;

    async fn delete_part(&mut self, part: &Part) -> Result<()>;

    async fn list_all_categories(&mut self) -> Result<Vec<Category>>;

    /// Parts whose `last_update` is strictly before `cutoff`.
    async fn list_parts_updated_before(&mut self, cutoff: DateTime<Utc>) -> Result<Vec<Part>>;

    /// Replaces the normalized attributes of one part.
    async fn update_part_attributes(
        &mut self,
        part_id: i64,
        attributes: &PartAttributes,
    ) -> Result<()>;
}

/// A repository whose writes are applied atomically on commit.
#[async_trait]
pub trait UnitOfWork: CatalogRepository {
    async fn commit(self) -> Result<()>;
}

/// Opens isolated units of work. Cheap to clone and share between tasks.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    type Session: UnitOfWork + 'static;

    async fn begin(&self) -> Result<Self::Session>;
}
