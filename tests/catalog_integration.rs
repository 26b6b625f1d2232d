//! Eviction and normalization against a file-backed catalog.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use partsync_core::catalog::{CatalogDbErrorKind, Result as CatalogResult, SqliteSession};
use partsync_core::normalize::{Dielectric, Unit};
use partsync_core::{
    CatalogError, CatalogRepository, CatalogStore, Category, Database, DatabaseOptions,
    EvictionSweeper, NewCategory, NewPart, NormalizationPipeline, Part, PartAttributes,
    SqliteCatalog, UnitOfWork,
};
use tempfile::TempDir;

async fn file_store(dir: &TempDir) -> SqliteCatalog {
    let db = Database::new(&dir.path().join("catalog.db"), DatabaseOptions::default())
        .await
        .unwrap();
    SqliteCatalog::new(db)
}

fn new_part(lcsc: &str, category_id: i64, description: &str, last_update: DateTime<Utc>) -> NewPart {
    NewPart {
        lcsc_code: lcsc.to_string(),
        category_id,
        manufacturer_part_number: format!("MPN-{lcsc}"),
        package: "0603".to_string(),
        joint_count: 2,
        manufacturer: "YAGEO".to_string(),
        is_basic: false,
        description: description.to_string(),
        datasheet_url: None,
        stock_quantity: 100,
        unit_price: Some(0.001),
        last_update,
    }
}

/// Seeds `count` parts, cycling through a few description shapes.
async fn seed(store: &SqliteCatalog, count: usize, last_update: DateTime<Utc>) {
    let descriptions = [
        "10kΩ ±1% 100mW 0603 Thick Film Resistor",
        "100nF ±10% 50V X7R 0402",
        "4.7uH ±20% 2.1A Power Inductor",
        "USB-C receptacle 16P",
    ];

    let mut session = store.begin().await.unwrap();
    let category = session
        .upsert_category(&NewCategory::new("Passives", "Mixed Passives"))
        .await
        .unwrap();
    for n in 0..count {
        let description = descriptions[n % descriptions.len()];
        session
            .upsert_part(&new_part(&format!("C{}", 10_000 + n), category.id, description, last_update))
            .await
            .unwrap();
    }
    session.commit().await.unwrap();
}

#[tokio::test]
async fn test_eviction_removes_only_parts_past_retention() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir).await;
    let now = Utc::now();

    let mut session = store.begin().await.unwrap();
    let category = session
        .upsert_category(&NewCategory::new("Resistors", "Chip Resistor - Surface Mount"))
        .await
        .unwrap();
    session
        .upsert_part(&new_part("C1", category.id, "1kΩ", now - TimeDelta::days(31)))
        .await
        .unwrap();
    session
        .upsert_part(&new_part("C2", category.id, "2kΩ", now - TimeDelta::days(29)))
        .await
        .unwrap();
    session.commit().await.unwrap();

    let report = EvictionSweeper::default().sweep_at(&store, now).await.unwrap();

    assert_eq!(report.evicted, 1);
    assert_eq!(report.cutoff, now - TimeDelta::days(30));

    let mut session = store.begin().await.unwrap();
    let remaining = session.list_parts(0, 10).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].lcsc_code, "C2");
    // Categories are never evicted.
    assert_eq!(session.list_all_categories().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_refreshed_part_survives_eviction() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir).await;
    let now = Utc::now();
    seed(&store, 1, now - TimeDelta::days(45)).await;

    // A later sync refreshes last_update through the same upsert.
    let mut session = store.begin().await.unwrap();
    let part = session.list_parts(0, 1).await.unwrap().remove(0);
    session
        .upsert_part(&new_part(&part.lcsc_code, part.category_id, &part.description, now))
        .await
        .unwrap();
    session.commit().await.unwrap();

    let report = EvictionSweeper::default().sweep_at(&store, now).await.unwrap();
    assert_eq!(report.evicted, 0);
}

#[tokio::test]
async fn test_normalization_covers_every_part_in_batches() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir).await;
    seed(&store, 250, Utc::now()).await;

    let stats = NormalizationPipeline::new(4)
        .unwrap()
        .run(&store)
        .await
        .unwrap();

    assert_eq!(stats.batches, 3);
    assert_eq!(stats.failed_batches, 0);
    assert_eq!(stats.parts_processed, 250);
    // Every description shape except the connector yields something.
    assert_eq!(stats.parts_with_attributes, 250 - 250 / 4);

    let mut session = store.begin().await.unwrap();
    let parts = session.list_parts(0, 4).await.unwrap();

    let resistor = &parts[0].attributes;
    let ohms = resistor.resistance.as_ref().unwrap();
    assert_eq!(ohms.unit, Unit::Ohm);
    assert!((ohms.value - 10_000.0).abs() < 1e-6);
    assert_eq!(ohms.tolerance_percent, Some(1.0));

    let capacitor = &parts[1].attributes;
    let farads = capacitor.capacitance.as_ref().unwrap();
    assert!((farads.value - 100e-9).abs() < 1e-15);
    assert_eq!(capacitor.voltage.as_ref().unwrap().value, 50.0);
    assert_eq!(capacitor.dielectric, Some(Dielectric::from_code("X7R")));

    let inductor = &parts[2].attributes;
    assert!((inductor.inductance.as_ref().unwrap().value - 4.7e-6).abs() < 1e-12);
    assert!((inductor.current.as_ref().unwrap().value - 2.1).abs() < 1e-9);

    assert!(parts[3].attributes.is_empty());
}

#[tokio::test]
async fn test_normalization_keeps_ingestion_columns() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir).await;
    let seen_at = Utc::now() - TimeDelta::days(3);
    seed(&store, 2, seen_at).await;

    let mut session = store.begin().await.unwrap();
    let before = session.list_parts(0, 2).await.unwrap();
    drop(session);

    NormalizationPipeline::new(1).unwrap().run(&store).await.unwrap();

    let mut session = store.begin().await.unwrap();
    let after = session.list_parts(0, 2).await.unwrap();
    for (old, new) in before.iter().zip(&after) {
        assert_eq!(old.lcsc_code, new.lcsc_code);
        assert_eq!(old.description, new.description);
        assert_eq!(old.stock_quantity, new.stock_quantity);
        assert_eq!(old.last_update, new.last_update);
    }
}

#[tokio::test]
async fn test_normalization_of_empty_catalog_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir).await;

    let stats = NormalizationPipeline::new(10).unwrap().run(&store).await.unwrap();

    assert_eq!(stats.batches, 0);
    assert_eq!(stats.parts_processed, 0);
}

#[tokio::test]
async fn test_resync_after_normalization_keeps_attributes() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir).await;
    let now = Utc::now();
    seed(&store, 1, now).await;
    NormalizationPipeline::new(1).unwrap().run(&store).await.unwrap();

    let mut session = store.begin().await.unwrap();
    let part = session.list_parts(0, 1).await.unwrap().remove(0);
    let mut refreshed = new_part(&part.lcsc_code, part.category_id, &part.description, now);
    refreshed.stock_quantity = 5;
    let stored = session.upsert_part(&refreshed).await.unwrap();
    session.commit().await.unwrap();

    assert_eq!(stored.stock_quantity, 5);
    assert_eq!(stored.attributes, part.attributes);
}

/// `SQLite` store that fails attribute writes for one part and reports the
/// first `busy_commits` commits as lock contention.
#[derive(Clone)]
struct FaultyCatalog {
    inner: SqliteCatalog,
    failing_part: Option<i64>,
    busy_commits: Arc<AtomicUsize>,
}

impl FaultyCatalog {
    fn new(inner: SqliteCatalog) -> Self {
        Self {
            inner,
            failing_part: None,
            busy_commits: Arc::new(AtomicUsize::new(0)),
        }
    }
}

struct FaultySession {
    inner: SqliteSession,
    failing_part: Option<i64>,
    busy_commits: Arc<AtomicUsize>,
}

#[async_trait]
impl CatalogStore for FaultyCatalog {
    type Session = FaultySession;

    async fn begin(&self) -> CatalogResult<FaultySession> {
        Ok(FaultySession {
            inner: self.inner.begin().await?,
            failing_part: self.failing_part,
            busy_commits: Arc::clone(&self.busy_commits),
        })
    }
}

#[async_trait]
impl UnitOfWork for FaultySession {
    async fn commit(self) -> CatalogResult<()> {
        let busy = self
            .busy_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if busy {
            return Err(CatalogError::Database {
                kind: CatalogDbErrorKind::BusyOrLocked,
                message: "database is locked".to_string(),
            });
        }
        self.inner.commit().await
    }
}

#[async_trait]
impl CatalogRepository for FaultySession {
    async fn find_category_by_subcategory(&mut self, name: &str) -> CatalogResult<Option<Category>> {
        self.inner.find_category_by_subcategory(name).await
    }

    async fn upsert_category(&mut self, category: &NewCategory) -> CatalogResult<Category> {
        self.inner.upsert_category(category).await
    }

    async fn find_category_by_id(&mut self, id: i64) -> CatalogResult<Option<Category>> {
        self.inner.find_category_by_id(id).await
    }

    async fn upsert_part(&mut self, part: &NewPart) -> CatalogResult<Part> {
        self.inner.upsert_part(part).await
    }

    async fn count_parts(&mut self) -> CatalogResult<i64> {
        self.inner.count_parts().await
    }

    async fn list_parts(&mut self, offset: i64, limit: i64) -> CatalogResult<Vec<Part>> {
        self.inner.list_parts(offset, limit).await
    }

    async fn delete_part(&mut self, part: &Part) -> CatalogResult<()> {
        self.inner.delete_part(part).await
    }

    async fn list_all_categories(&mut self) -> CatalogResult<Vec<Category>> {
        self.inner.list_all_categories().await
    }

    async fn list_parts_updated_before(&mut self, cutoff: DateTime<Utc>) -> CatalogResult<Vec<Part>> {
        self.inner.list_parts_updated_before(cutoff).await
    }

    async fn update_part_attributes(
        &mut self,
        part_id: i64,
        attributes: &PartAttributes,
    ) -> CatalogResult<()> {
        if self.failing_part == Some(part_id) {
            return Err(CatalogError::Database {
                kind: CatalogDbErrorKind::Other,
                message: format!("injected write failure for part {part_id}"),
            });
        }
        self.inner.update_part_attributes(part_id, attributes).await
    }
}

#[tokio::test]
async fn test_failing_batch_does_not_abort_its_siblings() {
    let dir = TempDir::new().unwrap();
    let sqlite = file_store(&dir).await;
    seed(&sqlite, 250, Utc::now()).await;

    // Offset 100 sits in the middle batch (offsets 84..168).
    let failing_id = {
        let mut session = sqlite.begin().await.unwrap();
        session.list_parts(100, 1).await.unwrap()[0].id
    };
    let store = FaultyCatalog {
        failing_part: Some(failing_id),
        ..FaultyCatalog::new(sqlite.clone())
    };

    let stats = NormalizationPipeline::new(4).unwrap().run(&store).await.unwrap();

    assert_eq!(stats.batches, 3);
    assert_eq!(stats.failed_batches, 1);
    assert_eq!(stats.parts_processed, 84 + 82);
    // Connectors (every fourth part) carry no attributes: 21 in the first
    // batch, 20 in the last.
    assert_eq!(stats.parts_with_attributes, 63 + 62);

    let mut session = sqlite.begin().await.unwrap();
    let first = session.list_parts(0, 84).await.unwrap();
    let middle = session.list_parts(84, 84).await.unwrap();
    let last = session.list_parts(168, 82).await.unwrap();

    assert!(first[0].attributes.resistance.is_some());
    assert!(last[0].attributes.resistance.is_some());
    // The failed batch rolled back as a whole.
    assert!(middle.iter().all(|part| part.attributes.is_empty()));
}

#[tokio::test]
async fn test_busy_batch_write_is_replayed() {
    let dir = TempDir::new().unwrap();
    let sqlite = file_store(&dir).await;
    seed(&sqlite, 8, Utc::now()).await;

    let store = FaultyCatalog::new(sqlite.clone());
    store.busy_commits.store(1, Ordering::SeqCst);

    let stats = NormalizationPipeline::new(1).unwrap().run(&store).await.unwrap();

    assert_eq!(stats.failed_batches, 0);
    assert_eq!(stats.parts_processed, 8);
    assert_eq!(stats.parts_with_attributes, 6);
    assert_eq!(store.busy_commits.load(Ordering::SeqCst), 0);

    let mut session = sqlite.begin().await.unwrap();
    let parts = session.list_parts(0, 1).await.unwrap();
    assert!(parts[0].attributes.resistance.is_some());
}

#[tokio::test]
async fn test_batch_fails_when_catalog_stays_busy() {
    let dir = TempDir::new().unwrap();
    let sqlite = file_store(&dir).await;
    seed(&sqlite, 4, Utc::now()).await;

    let store = FaultyCatalog::new(sqlite.clone());
    store.busy_commits.store(10, Ordering::SeqCst);

    let stats = NormalizationPipeline::new(1).unwrap().run(&store).await.unwrap();

    assert_eq!(stats.batches, 1);
    assert_eq!(stats.failed_batches, 1);
    assert_eq!(stats.parts_processed, 0);
    // Three write attempts, each refused.
    assert_eq!(store.busy_commits.load(Ordering::SeqCst), 7);

    let mut session = sqlite.begin().await.unwrap();
    let parts = session.list_parts(0, 4).await.unwrap();
    assert!(parts.iter().all(|part| part.attributes.is_empty()));
}
