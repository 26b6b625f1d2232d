//! Concurrent, best-effort enrichment of stored parts.
//!
//! The catalog is split into contiguous id-ordered batches. Each batch runs
//! in its own task, reads its slice in one unit of work and writes the
//! attributes back in a second one, so a failing batch rolls back alone.
//! A write that finds the database locked is replayed a few times first.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use super::PartAttributes;
use crate::catalog::{CatalogError, CatalogRepository, CatalogStore, Part, UnitOfWork};

/// Minimum allowed worker count.
const MIN_WORKERS: usize = 1;

/// Maximum allowed worker count.
const MAX_WORKERS: usize = 100;

/// Default number of batches processed at once.
pub const DEFAULT_WORKERS: usize = 10;

/// Parts per batch the plan aims for.
pub const DEFAULT_BATCH_TARGET: i64 = 100;

/// Attempts at a batch's write unit while `SQLite` reports the lock busy.
const BATCH_WRITE_ATTEMPTS: u32 = 3;

/// Wait before replaying a busy write, scaled by the attempt number.
const BUSY_BACKOFF: Duration = Duration::from_millis(50);

/// Errors that stop the pipeline before any batch runs.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("invalid worker count {value}: must be between {MIN_WORKERS} and {MAX_WORKERS}")]
    InvalidWorkers { value: usize },

    #[error("invalid batch target {value}: must be at least 1")]
    InvalidBatchTarget { value: i64 },

    #[error("could not size the catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("worker semaphore closed unexpectedly")]
    SemaphoreClosed,
}

/// Failure inside one batch. Logged and counted, never propagated.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("batch {index}: {source}")]
    Catalog {
        index: i64,
        #[source]
        source: CatalogError,
    },
}

/// One contiguous window of parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRange {
    pub index: i64,
    pub offset: i64,
    pub limit: i64,
}

/// Partition of `total` parts into equally sized batches.
///
/// `batches = ceil(total / target)` and `batch_size = ceil(total / batches)`;
/// an empty catalog has no batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    total: i64,
    batches: i64,
    batch_size: i64,
}

impl BatchPlan {
    #[must_use]
    pub fn for_total(total: i64, target: i64) -> Self {
        let total = total.max(0);
        let target = target.max(1);
        if total == 0 {
            return Self {
                total,
                batches: 0,
                batch_size: 0,
            };
        }

        let batches = div_ceil(total, target);
        Self {
            total,
            batches,
            batch_size: div_ceil(total, batches),
        }
    }

    #[must_use]
    pub fn total(&self) -> i64 {
        self.total
    }

    #[must_use]
    pub fn batches(&self) -> i64 {
        self.batches
    }

    #[must_use]
    pub fn batch_size(&self) -> i64 {
        self.batch_size
    }

    /// Windows covering `0..total` without overlap; only the last may be short.
    pub fn ranges(&self) -> impl Iterator<Item = BatchRange> + use<> {
        let Self {
            total,
            batches,
            batch_size,
        } = *self;
        (0..batches)
            .map(move |index| {
                let offset = index * batch_size;
                BatchRange {
                    index,
                    offset,
                    limit: batch_size.min(total - offset),
                }
            })
            .filter(|range| range.limit > 0)
    }
}

fn div_ceil(numerator: i64, denominator: i64) -> i64 {
    (numerator + denominator - 1) / denominator
}

/// Counts reported by a pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub batches: u64,
    pub failed_batches: u64,
    pub parts_processed: u64,
    /// Parts for which at least one attribute was recognized.
    pub parts_with_attributes: u64,
}

#[derive(Debug, Default)]
struct BatchReport {
    processed: u64,
    with_attributes: u64,
}

/// Runs the six normalizers over every stored part with bounded concurrency.
#[derive(Debug)]
pub struct NormalizationPipeline {
    semaphore: Arc<Semaphore>,
    workers: usize,
    batch_target: i64,
}

impl NormalizationPipeline {
    /// # Errors
    ///
    /// Returns [`NormalizeError::InvalidWorkers`] outside `1..=100`.
    pub fn new(workers: usize) -> Result<Self, NormalizeError> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&workers) {
            return Err(NormalizeError::InvalidWorkers { value: workers });
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(workers)),
            workers,
            batch_target: DEFAULT_BATCH_TARGET,
        })
    }

    /// # Errors
    ///
    /// Returns [`NormalizeError::InvalidBatchTarget`] for values below one.
    pub fn with_batch_target(mut self, batch_target: i64) -> Result<Self, NormalizeError> {
        if batch_target < 1 {
            return Err(NormalizeError::InvalidBatchTarget {
                value: batch_target,
            });
        }
        self.batch_target = batch_target;
        Ok(self)
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Normalizes all parts currently in `store`.
    ///
    /// # Errors
    ///
    /// Only failures before batching starts are returned. Batch failures and
    /// panics are logged and counted in [`NormalizeStats::failed_batches`].
    #[instrument(skip(self, store), fields(workers = self.workers))]
    pub async fn run<S>(&self, store: &S) -> Result<NormalizeStats, NormalizeError>
    where
        S: CatalogStore + Clone + 'static,
    {
        let total = {
            let mut session = store.begin().await?;
            session.count_parts().await?
        };
        let plan = BatchPlan::for_total(total, self.batch_target);
        info!(
            total,
            batches = plan.batches(),
            batch_size = plan.batch_size(),
            "starting normalization"
        );

        let mut running = FuturesUnordered::new();
        for range in plan.ranges() {
            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| NormalizeError::SemaphoreClosed)?;
            let store = store.clone();

            running.push(tokio::spawn(async move {
                let _permit = permit;
                normalize_batch(&store, range).await
            }));
        }

        let mut stats = NormalizeStats::default();
        while let Some(joined) = running.next().await {
            stats.batches += 1;
            match joined {
                Ok(Ok(report)) => {
                    stats.parts_processed += report.processed;
                    stats.parts_with_attributes += report.with_attributes;
                }
                Ok(Err(error)) => {
                    warn!(%error, "normalization batch failed");
                    stats.failed_batches += 1;
                }
                Err(error) => {
                    warn!(%error, "normalization batch panicked");
                    stats.failed_batches += 1;
                }
            }
        }

        info!(
            batches = stats.batches,
            failed = stats.failed_batches,
            parts = stats.parts_processed,
            enriched = stats.parts_with_attributes,
            "normalization finished"
        );
        Ok(stats)
    }
}

async fn normalize_batch<S: CatalogStore>(
    store: &S,
    range: BatchRange,
) -> Result<BatchReport, BatchError> {
    let in_batch = |source| BatchError::Catalog {
        index: range.index,
        source,
    };

    // Separate read and write units: a read transaction upgraded to a write
    // can fail outright when another batch committed in between.
    let parts = {
        let mut session = store.begin().await.map_err(in_batch)?;
        session
            .list_parts(range.offset, range.limit)
            .await
            .map_err(in_batch)?
    };

    let mut attempt = 1;
    let report = loop {
        match write_attributes(store, &parts).await {
            Ok(report) => break report,
            Err(error) if error.is_busy_or_locked() && attempt < BATCH_WRITE_ATTEMPTS => {
                debug!(batch = range.index, attempt, %error, "catalog busy, replaying batch write");
                tokio::time::sleep(BUSY_BACKOFF * attempt).await;
                attempt += 1;
            }
            Err(error) => return Err(in_batch(error)),
        }
    };

    debug!(
        batch = range.index,
        parts = report.processed,
        "batch normalized"
    );
    Ok(report)
}

async fn write_attributes<S: CatalogStore>(
    store: &S,
    parts: &[Part],
) -> Result<BatchReport, CatalogError> {
    let mut report = BatchReport::default();
    let mut session = store.begin().await?;
    for part in parts {
        let attributes = PartAttributes::from_description(&part.description);
        match session.update_part_attributes(part.id, &attributes).await {
            Ok(()) => {}
            Err(CatalogError::PartNotFound(id)) => {
                debug!(id, "part removed before it could be normalized");
                continue;
            }
            Err(error) => return Err(error),
        }
        report.processed += 1;
        if !attributes.is_empty() {
            report.with_attributes += 1;
        }
    }
    session.commit().await?;
    Ok(report)
}
