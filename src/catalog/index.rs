//! In-memory lookup of known categories, keyed by subcategory name.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::{debug, instrument};

use super::{CatalogRepository, Category, Result};

/// Which subcategories exist, without a repository round trip per record.
///
/// Seeded from storage with [`CategoryIndex::load`] and only ever grown,
/// with categories the repository already holds.
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    by_subcategory: HashMap<String, Category>,
}

impl CategoryIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconciles the index with every category currently stored.
    ///
    /// # Errors
    ///
    /// Returns the repository error if the categories cannot be listed.
    #[instrument(skip(repo))]
    pub async fn load<R>(repo: &mut R) -> Result<Self>
    where
        R: CatalogRepository + ?Sized,
    {
        let categories = repo.list_all_categories().await?;
        let index: Self = categories.into_iter().collect();
        debug!(categories = index.len(), "category index loaded");
        Ok(index)
    }

    #[must_use]
    pub fn get(&self, subcategory_name: &str) -> Option<&Category> {
        self.by_subcategory.get(subcategory_name)
    }

    #[must_use]
    pub fn contains(&self, subcategory_name: &str) -> bool {
        self.by_subcategory.contains_key(subcategory_name)
    }

    /// Records a stored category. Existing entries are kept as they are,
    /// since categories never change once created.
    ///
    /// Returns `true` if the subcategory was not yet known.
    pub fn insert(&mut self, category: Category) -> bool {
        match self.by_subcategory.entry(category.subcategory_name.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(category);
                true
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_subcategory.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_subcategory.is_empty()
    }
}

impl FromIterator<Category> for CategoryIndex {
    fn from_iter<I: IntoIterator<Item = Category>>(iter: I) -> Self {
        let mut index = Self::new();
        index.extend(iter);
        index
    }
}

impl Extend<Category> for CategoryIndex {
    fn extend<I: IntoIterator<Item = Category>>(&mut self, iter: I) {
        for category in iter {
            self.insert(category);
        }
    }
}
