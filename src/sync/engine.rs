//! The sync engine: cursor pagination with in-order page application.

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use super::apply::apply_page;
use super::fetcher::{FetchEvent, PageFetcher};
use super::{ExhaustionReason, SequencedBuffer, SyncStats, Termination};
use crate::catalog::{CatalogError, CatalogStore, CategoryIndex};
use crate::vendor::{AuthError, ComponentPage, Cursor, RetryPolicy, TokenManager, VendorClient};

/// Default number of pages fetched ahead of application.
pub const DEFAULT_LOOKAHEAD: usize = 2;

/// Maximum look-ahead depth.
pub const MAX_LOOKAHEAD: usize = 16;

/// Errors that abort a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(
        "invalid look-ahead depth: {0} (must be 1-{MAX_LOOKAHEAD})\n  Suggestion: Use --lookahead with a value between 1 and {MAX_LOOKAHEAD}"
    )]
    InvalidLookahead(usize),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("catalog write failed: {0}")]
    Catalog(#[from] CatalogError),
}

/// What a finished run did and why it stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub stats: SyncStats,
    pub termination: Termination,
    /// Last cursor the vendor handed out, if any.
    pub last_key: Option<Cursor>,
}

/// Drives one pass over the vendor listing.
#[derive(Debug, Clone)]
pub struct SyncEngine {
    lookahead: usize,
    retry_policy: RetryPolicy,
}

impl SyncEngine {
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidLookahead`] unless `1 <= lookahead <= MAX_LOOKAHEAD`.
    pub fn new(lookahead: usize) -> Result<Self, SyncError> {
        if !(1..=MAX_LOOKAHEAD).contains(&lookahead) {
            return Err(SyncError::InvalidLookahead(lookahead));
        }
        Ok(Self {
            lookahead,
            retry_policy: RetryPolicy::default(),
        })
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    #[must_use]
    pub fn lookahead(&self) -> usize {
        self.lookahead
    }

    /// Fetches every page and applies it, one committed unit of work per
    /// page, in cursor order.
    ///
    /// # Errors
    ///
    /// Authentication failures and repository failures abort the run. Page
    /// fetch failures end pagination and are reported in the outcome.
    #[instrument(skip_all, fields(lookahead = self.lookahead, known_categories = index.len()))]
    pub async fn run<S: CatalogStore>(
        &self,
        client: VendorClient,
        tokens: TokenManager,
        store: &S,
        index: &mut CategoryIndex,
    ) -> Result<SyncOutcome, SyncError> {
        let (sender, receiver) = mpsc::channel(self.lookahead);
        let fetcher = PageFetcher::new(client, tokens, self.retry_policy.clone());
        let producer = tokio::spawn(fetcher.run(sender));

        let result = consume(receiver, store, index).await;

        // The fetcher may still be mid-request after an early stop.
        producer.abort();
        if let Err(error) = producer.await {
            if error.is_panic() {
                warn!(%error, "page fetcher panicked");
            }
        }

        if let Ok(outcome) = &result {
            info!(
                pages = outcome.stats.pages,
                parts = outcome.stats.parts_upserted,
                categories = outcome.stats.categories_created,
                termination = %outcome.termination,
                "sync finished"
            );
        }
        result
    }
}

async fn consume<S: CatalogStore>(
    mut events: mpsc::Receiver<FetchEvent>,
    store: &S,
    index: &mut CategoryIndex,
) -> Result<SyncOutcome, SyncError> {
    let mut stats = SyncStats::default();
    let mut pending: SequencedBuffer<ComponentPage> = SequencedBuffer::new();
    let mut last_key = None;

    while let Some(event) = events.recv().await {
        match event {
            FetchEvent::Page { seq, page } => {
                if !pending.push(seq, page) {
                    warn!(seq, "discarding page that was already applied");
                    continue;
                }
                while let Some(page) = pending.pop_ready() {
                    let page_number = pending.next_expected();
                    let page_stats = apply_page(store, index, &page.records).await?;
                    stats.record_page(&page_stats);
                    if page.last_key.is_some() {
                        last_key = page.last_key;
                    }

                    info!(
                        page = page_number,
                        accepted = page_stats.accepted(),
                        rejected = page_stats.rejected(),
                        "page applied"
                    );
                    if page_stats.accepted() == 0 {
                        return Ok(SyncOutcome {
                            stats,
                            termination: Termination::NoProgress {
                                page: page_number,
                                rejected: page_stats.rejected(),
                            },
                            last_key,
                        });
                    }
                }
            }
            FetchEvent::Exhausted { seq, reason } => {
                if pending.buffered() > 0 {
                    warn!(
                        seq,
                        buffered = pending.buffered(),
                        "pagination ended with pages still out of order"
                    );
                }
                return Ok(SyncOutcome {
                    stats,
                    termination: Termination::Exhausted(reason),
                    last_key,
                });
            }
            FetchEvent::Fatal(error) => return Err(SyncError::Auth(error)),
        }
    }

    Ok(SyncOutcome {
        stats,
        termination: Termination::Exhausted(ExhaustionReason::FetcherStopped),
        last_key,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::catalog::{CatalogRepository, SqliteCatalog};
    use crate::db::Database;

    fn page(lcsc: &str, stock: i64, cursor: &str) -> ComponentPage {
        ComponentPage {
            records: vec![json!({
                "lcscPart": lcsc,
                "stock": stock,
                "firstCategory": "Resistors",
                "secondCategory": "Chip Resistor",
            })],
            last_key: Cursor::from_value(json!(cursor)),
        }
    }

    async fn store() -> SqliteCatalog {
        SqliteCatalog::new(Database::new_in_memory().await.unwrap())
    }

    #[test]
    fn test_lookahead_bounds() {
        assert!(matches!(
            SyncEngine::new(0),
            Err(SyncError::InvalidLookahead(0))
        ));
        assert!(SyncEngine::new(MAX_LOOKAHEAD + 1).is_err());
        assert_eq!(SyncEngine::new(DEFAULT_LOOKAHEAD).unwrap().lookahead(), 2);
    }

    #[tokio::test]
    async fn test_consume_applies_out_of_order_pages_in_sequence() {
        let store = store().await;
        let mut index = CategoryIndex::new();
        let (sender, receiver) = mpsc::channel(8);

        sender
            .send(FetchEvent::Page { seq: 1, page: page("C2", 5, "k2") })
            .await
            .unwrap();
        sender
            .send(FetchEvent::Page { seq: 0, page: page("C1", 5, "k1") })
            .await
            .unwrap();
        sender
            .send(FetchEvent::Exhausted {
                seq: 2,
                reason: ExhaustionReason::EmptyPage,
            })
            .await
            .unwrap();
        drop(sender);

        let outcome = consume(receiver, &store, &mut index).await.unwrap();

        assert_eq!(outcome.stats.pages, 2);
        assert_eq!(outcome.stats.parts_upserted, 2);
        assert_eq!(outcome.stats.categories_created, 1);
        assert_eq!(outcome.last_key, Cursor::from_value(json!("k2")));
        assert_eq!(
            outcome.termination,
            Termination::Exhausted(ExhaustionReason::EmptyPage)
        );
    }

    #[tokio::test]
    async fn test_consume_stops_on_page_without_accepted_parts() {
        let store = store().await;
        let mut index = CategoryIndex::new();
        let (sender, receiver) = mpsc::channel(8);

        sender
            .send(FetchEvent::Page { seq: 0, page: page("C1", 5, "k1") })
            .await
            .unwrap();
        sender
            .send(FetchEvent::Page { seq: 1, page: page("C2", 0, "k2") })
            .await
            .unwrap();
        sender
            .send(FetchEvent::Page { seq: 2, page: page("C3", 5, "k3") })
            .await
            .unwrap();
        drop(sender);

        let outcome = consume(receiver, &store, &mut index).await.unwrap();

        assert_eq!(
            outcome.termination,
            Termination::NoProgress {
                page: 2,
                rejected: 1
            }
        );
        assert_eq!(outcome.stats.parts_upserted, 1);
        let mut session = store.begin().await.unwrap();
        assert!(
            session.find_category_by_subcategory("Chip Resistor").await.unwrap().is_some()
        );
        assert_eq!(session.count_parts().await.unwrap(), 1, "page 3 is never applied");
    }

    #[tokio::test]
    async fn test_consume_without_terminal_event_reports_fetcher_stopped() {
        let store = store().await;
        let mut index = CategoryIndex::new();
        let (sender, receiver) = mpsc::channel(1);
        drop(sender);

        let outcome = consume(receiver, &store, &mut index).await.unwrap();

        assert_eq!(
            outcome.termination,
            Termination::Exhausted(ExhaustionReason::FetcherStopped)
        );
        assert_eq!(outcome.stats, SyncStats::default());
    }
}
