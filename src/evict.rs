//! Removal of parts the vendor has not listed within the retention window.

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::catalog::{CatalogError, CatalogRepository, CatalogStore, UnitOfWork};

/// Default retention: parts unseen for 30 days are evicted.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Eviction errors.
#[derive(Debug, Error)]
pub enum EvictError {
    #[error("invalid retention of {days} days\n  Suggestion: Use a positive --retention-days value")]
    InvalidRetention { days: i64 },

    #[error("catalog error during eviction: {0}")]
    Catalog(#[from] CatalogError),
}

/// What a sweep deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionReport {
    /// Parts last updated strictly before this instant were removed.
    pub cutoff: DateTime<Utc>,
    pub evicted: u64,
}

/// Deletes stale parts in a single unit of work.
///
/// Run it only after a full sync pass, otherwise parts the current run would
/// have refreshed can be removed.
#[derive(Debug, Clone, Copy)]
pub struct EvictionSweeper {
    retention: TimeDelta,
}

impl Default for EvictionSweeper {
    fn default() -> Self {
        Self {
            retention: TimeDelta::days(DEFAULT_RETENTION_DAYS),
        }
    }
}

impl EvictionSweeper {
    /// # Errors
    ///
    /// Returns [`EvictError::InvalidRetention`] for a zero or negative window.
    pub fn new(retention: TimeDelta) -> Result<Self, EvictError> {
        if retention <= TimeDelta::zero() {
            return Err(EvictError::InvalidRetention {
                days: retention.num_days(),
            });
        }
        Ok(Self { retention })
    }

    /// # Errors
    ///
    /// See [`EvictionSweeper::new`].
    pub fn with_retention_days(days: i64) -> Result<Self, EvictError> {
        let retention =
            TimeDelta::try_days(days).ok_or(EvictError::InvalidRetention { days })?;
        Self::new(retention)
    }

    #[must_use]
    pub fn retention(&self) -> TimeDelta {
        self.retention
    }

    /// Evicts parts whose `last_update` precedes `now - retention`.
    ///
    /// # Errors
    ///
    /// Returns [`EvictError::Catalog`] if listing or deleting fails; nothing
    /// is deleted in that case.
    pub async fn sweep<S: CatalogStore>(&self, store: &S) -> Result<EvictionReport, EvictError> {
        self.sweep_at(store, Utc::now()).await
    }

    /// [`EvictionSweeper::sweep`] with an explicit clock.
    ///
    /// # Errors
    ///
    /// See [`EvictionSweeper::sweep`].
    #[instrument(skip(self, store), fields(retention_days = self.retention.num_days()))]
    pub async fn sweep_at<S: CatalogStore>(
        &self,
        store: &S,
        now: DateTime<Utc>,
    ) -> Result<EvictionReport, EvictError> {
        let cutoff = now
            .checked_sub_signed(self.retention)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut session = store.begin().await?;

        let stale = session.list_parts_updated_before(cutoff).await?;
        for part in &stale {
            debug!(lcsc = %part.lcsc_code, last_update = %part.last_update, "evicting");
            session.delete_part(part).await?;
        }
        session.commit().await?;

        let report = EvictionReport {
            cutoff,
            evicted: stale.len() as u64,
        };
        info!(evicted = report.evicted, cutoff = %cutoff, "eviction finished");
        Ok(report)
    }
}

/// Convenience wrapper: sweep `store` with the given retention window.
///
/// # Errors
///
/// See [`EvictionSweeper::new`] and [`EvictionSweeper::sweep`].
pub async fn evict_stale<S: CatalogStore>(
    store: &S,
    retention: TimeDelta,
) -> Result<EvictionReport, EvictError> {
    EvictionSweeper::new(retention)?.sweep(store).await
}
