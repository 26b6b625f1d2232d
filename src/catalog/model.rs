//! Catalog records: categories and the parts filed under them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::PartAttributes;

/// A vendor category. Identified by `subcategory_name`; created once and
/// never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    /// Top-level category (`firstCategory`).
    pub name: String,
    /// Leaf category (`secondCategory`), unique across the catalog.
    pub subcategory_name: String,
}

/// A category not yet assigned a storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub subcategory_name: String,
}

impl NewCategory {
    #[must_use]
    pub fn new(name: impl Into<String>, subcategory_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subcategory_name: subcategory_name.into(),
        }
    }
}

/// A stored part, including any attributes added by normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub id: i64,
    /// LCSC code, the identity key (e.g. `C25804`).
    pub lcsc_code: String,
    pub category_id: i64,
    pub manufacturer_part_number: String,
    pub package: String,
    pub joint_count: i64,
    pub manufacturer: String,
    /// `true` for JLCPCB "basic" library parts.
    pub is_basic: bool,
    pub description: String,
    pub datasheet_url: Option<String>,
    pub stock_quantity: i64,
    /// Price of the lowest quantity tier.
    pub unit_price: Option<f64>,
    /// When the part was last carried by a vendor page.
    pub last_update: DateTime<Utc>,
    pub attributes: PartAttributes,
}

/// Ingestion-side view of a part, as built from one vendor record.
///
/// Upserting a `NewPart` never touches [`PartAttributes`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewPart {
    pub lcsc_code: String,
    pub category_id: i64,
    pub manufacturer_part_number: String,
    pub package: String,
    pub joint_count: i64,
    pub manufacturer: String,
    pub is_basic: bool,
    pub description: String,
    pub datasheet_url: Option<String>,
    pub stock_quantity: i64,
    pub unit_price: Option<f64>,
    pub last_update: DateTime<Utc>,
}
