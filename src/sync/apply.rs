//! Turning one page of vendor records into catalog writes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use super::PageStats;
use crate::catalog::{
    CatalogRepository, CatalogStore, Category, CategoryIndex, NewCategory, NewPart, Result,
    UnitOfWork,
};
use crate::vendor::{ComponentRecord, parse_unit_price};

/// Result of writing one page, before commit.
#[derive(Debug, Default)]
pub(crate) struct AppliedPage {
    pub stats: PageStats,
    /// Categories this page found outside the index. They join the index
    /// only once the page has been committed.
    pub new_categories: Vec<Category>,
}

/// Applies `records` in one unit of work, commits, then extends `index`.
pub(crate) async fn apply_page<S: CatalogStore>(
    store: &S,
    index: &mut CategoryIndex,
    records: &[Value],
) -> Result<PageStats> {
    let mut session = store.begin().await?;
    let applied = apply_records(&mut session, index, records, Utc::now()).await?;
    session.commit().await?;

    index.extend(applied.new_categories);
    Ok(applied.stats)
}

/// Upserts the category of every record and the part of every in-stock
/// record with a resolvable subcategory. Nothing is committed here.
pub(crate) async fn apply_records<R>(
    repo: &mut R,
    index: &CategoryIndex,
    records: &[Value],
    seen_at: DateTime<Utc>,
) -> Result<AppliedPage>
where
    R: CatalogRepository + ?Sized,
{
    let mut stats = PageStats::default();
    let mut staged: HashMap<String, Category> = HashMap::new();

    for raw in records {
        let record = match ComponentRecord::from_value(raw) {
            Ok(record) => record,
            Err(error) => {
                warn!(%error, "skipping undecodable component record");
                stats.rejected_malformed += 1;
                continue;
            }
        };

        let Some(lcsc_code) = non_blank(record.lcsc_part.as_deref()) else {
            warn!("skipping component record without lcscPart");
            stats.rejected_malformed += 1;
            continue;
        };

        let category = match non_blank(record.second_category.as_deref()) {
            Some(subcategory) => {
                let name = record.first_category.as_deref().unwrap_or_default().trim();
                Some(resolve_category(repo, index, &mut staged, &mut stats, name, subcategory).await?)
            }
            None => None,
        };

        if record.stock.unwrap_or(0) <= 0 {
            debug!(lcsc = lcsc_code, "out of stock, not ingested");
            stats.skipped_out_of_stock += 1;
            continue;
        }

        let Some(category) = category else {
            warn!(lcsc = lcsc_code, "component has no subcategory, rejected");
            stats.rejected_unknown_category += 1;
            continue;
        };

        let part = new_part(&record, lcsc_code, category.id, seen_at);
        repo.upsert_part(&part).await?;
        stats.parts_upserted += 1;
    }

    Ok(AppliedPage {
        stats,
        new_categories: staged.into_values().collect(),
    })
}

async fn resolve_category<R>(
    repo: &mut R,
    index: &CategoryIndex,
    staged: &mut HashMap<String, Category>,
    stats: &mut PageStats,
    name: &str,
    subcategory: &str,
) -> Result<Category>
where
    R: CatalogRepository + ?Sized,
{
    if let Some(known) = index.get(subcategory).or_else(|| staged.get(subcategory)) {
        return Ok(known.clone());
    }

    let category = if let Some(existing) = repo.find_category_by_subcategory(subcategory).await? {
        existing
    } else {
        let created = repo
            .upsert_category(&NewCategory::new(name, subcategory))
            .await?;
        debug!(id = created.id, subcategory, "new category");
        stats.categories_created += 1;
        created
    };

    staged.insert(subcategory.to_string(), category.clone());
    Ok(category)
}

fn new_part(
    record: &ComponentRecord,
    lcsc_code: &str,
    category_id: i64,
    seen_at: DateTime<Utc>,
) -> NewPart {
    let text = |value: &Option<String>| value.as_deref().unwrap_or_default().trim().to_string();

    NewPart {
        lcsc_code: lcsc_code.to_string(),
        category_id,
        manufacturer_part_number: text(&record.mfr_part),
        package: text(&record.package),
        joint_count: record.solder_joint.unwrap_or(0),
        manufacturer: text(&record.manufacturer),
        is_basic: record.is_basic(),
        description: text(&record.description),
        datasheet_url: non_blank(record.datasheet.as_deref()).map(str::to_string),
        stock_quantity: record.stock.unwrap_or(0),
        unit_price: parse_unit_price(record.price.as_deref()),
        last_update: seen_at,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
