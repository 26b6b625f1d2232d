//! `SQLite` implementation of the catalog repository.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, Sqlite, Transaction};
use tracing::{debug, instrument};

use super::{
    CatalogError, CatalogRepository, CatalogStore, Category, NewCategory, NewPart, Part, Result,
    UnitOfWork,
};
use crate::db::Database;
use crate::normalize::{Dielectric, PartAttributes, Quantity};

const CATEGORY_COLUMNS: &str = "id, name, subcategory_name";

const PART_COLUMNS: &str = "id, lcsc_code, category_id, manufacturer_part_number, package, \
    joint_count, manufacturer, is_basic, description, datasheet_url, stock_quantity, unit_price, \
    last_update, resistance, capacitance, inductance, voltage, current_rating, dielectric";

/// Returns `Ok(())` if at least one row was affected; otherwise [`CatalogError::PartNotFound`].
fn check_affected(id: i64, rows_affected: u64) -> Result<()> {
    if rows_affected == 0 {
        Err(CatalogError::PartNotFound(id))
    } else {
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    subcategory_name: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            subcategory_name: row.subcategory_name,
        }
    }
}

#[derive(Debug, FromRow)]
struct PartRow {
    id: i64,
    lcsc_code: String,
    category_id: i64,
    manufacturer_part_number: String,
    package: String,
    joint_count: i64,
    manufacturer: String,
    is_basic: bool,
    description: String,
    datasheet_url: Option<String>,
    stock_quantity: i64,
    unit_price: Option<f64>,
    last_update: i64,
    resistance: Option<Json<Quantity>>,
    capacitance: Option<Json<Quantity>>,
    inductance: Option<Json<Quantity>>,
    voltage: Option<Json<Quantity>>,
    current_rating: Option<Json<Quantity>>,
    dielectric: Option<String>,
}

impl TryFrom<PartRow> for Part {
    type Error = CatalogError;

    fn try_from(row: PartRow) -> Result<Self> {
        let last_update =
            DateTime::<Utc>::from_timestamp_millis(row.last_update).ok_or_else(|| {
                CatalogError::CorruptRow {
                    table: "parts",
                    id: row.id,
                    reason: format!("last_update {} is out of range", row.last_update),
                }
            })?;

        Ok(Self {
            id: row.id,
            lcsc_code: row.lcsc_code,
            category_id: row.category_id,
            manufacturer_part_number: row.manufacturer_part_number,
            package: row.package,
            joint_count: row.joint_count,
            manufacturer: row.manufacturer,
            is_basic: row.is_basic,
            description: row.description,
            datasheet_url: row.datasheet_url,
            stock_quantity: row.stock_quantity,
            unit_price: row.unit_price,
            last_update,
            attributes: PartAttributes {
                resistance: row.resistance.map(|json| json.0),
                capacitance: row.capacitance.map(|json| json.0),
                inductance: row.inductance.map(|json| json.0),
                voltage: row.voltage.map(|json| json.0),
                current: row.current_rating.map(|json| json.0),
                dielectric: row.dielectric.map(Dielectric::from_code),
            },
        })
    }
}

fn into_parts(rows: Vec<PartRow>) -> Result<Vec<Part>> {
    rows.into_iter().map(Part::try_from).collect()
}

/// Catalog store backed by the shared `SQLite` pool.
#[derive(Debug, Clone)]
pub struct SqliteCatalog {
    db: Database,
}

impl SqliteCatalog {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalog {
    type Session = SqliteSession;

    async fn begin(&self) -> Result<SqliteSession> {
        let tx = self.db.pool().begin().await?;
        Ok(SqliteSession { tx })
    }
}

/// One `SQLite` transaction. Dropping it without [`UnitOfWork::commit`] rolls back.
pub struct SqliteSession {
    tx: Transaction<'static, Sqlite>,
}

impl fmt::Debug for SqliteSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteSession").finish_non_exhaustive()
    }
}

#[async_trait]
impl UnitOfWork for SqliteSession {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for SqliteSession {
    #[instrument(skip(self))]
    async fn find_category_by_subcategory(&mut self, name: &str) -> Result<Option<Category>> {
        let row: Option<CategoryRow> = sqlx::query_as(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE subcategory_name = ?"
        ))
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Category::from))
    }

    #[instrument(skip(self, category), fields(subcategory = %category.subcategory_name))]
    async fn upsert_category(&mut self, category: &NewCategory) -> Result<Category> {
        let inserted = sqlx::query(
            r"INSERT INTO categories (name, subcategory_name) VALUES (?, ?)
              ON CONFLICT(subcategory_name) DO NOTHING",
        )
        .bind(&category.name)
        .bind(&category.subcategory_name)
        .execute(&mut *self.tx)
        .await?;

        let row: CategoryRow = sqlx::query_as(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE subcategory_name = ?"
        ))
        .bind(&category.subcategory_name)
        .fetch_one(&mut *self.tx)
        .await?;

        debug!(
            id = row.id,
            created = inserted.rows_affected() > 0,
            "category upserted"
        );
        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn find_category_by_id(&mut self, id: i64) -> Result<Option<Category>> {
        let row: Option<CategoryRow> = sqlx::query_as(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Category::from))
    }

    #[instrument(skip(self, part), fields(lcsc = %part.lcsc_code))]
    async fn upsert_part(&mut self, part: &NewPart) -> Result<Part> {
        let row: PartRow = sqlx::query_as(&format!(
            r"INSERT INTO parts (
                lcsc_code, category_id, manufacturer_part_number, package, joint_count,
                manufacturer, is_basic, description, datasheet_url, stock_quantity,
                unit_price, last_update
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(lcsc_code) DO UPDATE SET
                category_id = excluded.category_id,
                manufacturer_part_number = excluded.manufacturer_part_number,
                package = excluded.package,
                joint_count = excluded.joint_count,
                manufacturer = excluded.manufacturer,
                is_basic = excluded.is_basic,
                description = excluded.description,
                datasheet_url = excluded.datasheet_url,
                stock_quantity = excluded.stock_quantity,
                unit_price = excluded.unit_price,
                last_update = excluded.last_update
            RETURNING {PART_COLUMNS}"
        ))
        .bind(&part.lcsc_code)
        .bind(part.category_id)
        .bind(&part.manufacturer_part_number)
        .bind(&part.package)
        .bind(part.joint_count)
        .bind(&part.manufacturer)
        .bind(part.is_basic)
        .bind(&part.description)
        .bind(&part.datasheet_url)
        .bind(part.stock_quantity)
        .bind(part.unit_price)
        .bind(part.last_update.timestamp_millis())
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn count_parts(&mut self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM parts")
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count)
    }

    #[instrument(skip(self))]
    async fn list_parts(&mut self, offset: i64, limit: i64) -> Result<Vec<Part>> {
        let rows: Vec<PartRow> = sqlx::query_as(&format!(
            "SELECT {PART_COLUMNS} FROM parts ORDER BY id LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.tx)
        .await?;

        into_parts(rows)
    }

    #[instrument(skip(self, part), fields(id = part.id, lcsc = %part.lcsc_code))]
    async fn delete_part(&mut self, part: &Part) -> Result<()> {
        let result = sqlx::query("DELETE FROM parts WHERE id = ?")
            .bind(part.id)
            .execute(&mut *self.tx)
            .await?;

        check_affected(part.id, result.rows_affected())
    }

    async fn list_all_categories(&mut self) -> Result<Vec<Category>> {
        let rows: Vec<CategoryRow> = sqlx::query_as(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY id"
        ))
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    #[instrument(skip(self), fields(cutoff = %cutoff))]
    async fn list_parts_updated_before(&mut self, cutoff: DateTime<Utc>) -> Result<Vec<Part>> {
        let rows: Vec<PartRow> = sqlx::query_as(&format!(
            "SELECT {PART_COLUMNS} FROM parts WHERE last_update < ? ORDER BY id"
        ))
        .bind(cutoff.timestamp_millis())
        .fetch_all(&mut *self.tx)
        .await?;

        into_parts(rows)
    }

    #[instrument(skip(self, attributes))]
    async fn update_part_attributes(
        &mut self,
        part_id: i64,
        attributes: &PartAttributes,
    ) -> Result<()> {
        let result = sqlx::query(
            r"UPDATE parts SET
                resistance = ?, capacitance = ?, inductance = ?,
                voltage = ?, current_rating = ?, dielectric = ?
              WHERE id = ?",
        )
        .bind(attributes.resistance.map(Json))
        .bind(attributes.capacitance.map(Json))
        .bind(attributes.inductance.map(Json))
        .bind(attributes.voltage.map(Json))
        .bind(attributes.current.map(Json))
        .bind(attributes.dielectric.as_ref().map(Dielectric::as_str))
        .bind(part_id)
        .execute(&mut *self.tx)
        .await?;

        check_affected(part_id, result.rows_affected())
    }
}
