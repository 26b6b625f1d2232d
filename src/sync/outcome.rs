//! Counters and termination reasons reported by a sync run.

use std::fmt;

use crate::vendor::PageFetchError;

/// Per-page tallies; summed into [`SyncStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageStats {
    pub parts_upserted: u64,
    pub categories_created: u64,
    pub skipped_out_of_stock: u64,
    pub rejected_unknown_category: u64,
    pub rejected_malformed: u64,
}

impl PageStats {
    /// Parts written by this page.
    #[must_use]
    pub fn accepted(&self) -> u64 {
        self.parts_upserted
    }

    /// Records this page carried but did not write.
    #[must_use]
    pub fn rejected(&self) -> u64 {
        self.skipped_out_of_stock + self.rejected_unknown_category + self.rejected_malformed
    }
}

/// Totals for a whole sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub pages: u64,
    pub parts_upserted: u64,
    pub categories_created: u64,
    pub skipped_out_of_stock: u64,
    pub rejected_unknown_category: u64,
    pub rejected_malformed: u64,
}

impl SyncStats {
    pub(crate) fn record_page(&mut self, page: &PageStats) {
        self.pages += 1;
        self.parts_upserted += page.parts_upserted;
        self.categories_created += page.categories_created;
        self.skipped_out_of_stock += page.skipped_out_of_stock;
        self.rejected_unknown_category += page.rejected_unknown_category;
        self.rejected_malformed += page.rejected_malformed;
    }
}

/// Why the vendor stopped handing out pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExhaustionReason {
    /// A successful page with no component records.
    EmptyPage,
    /// Non-success application code in the payload.
    ApiCode { code: i64, message: String },
    /// Fetching failed and retries were used up or pointless.
    FetchFailed(String),
    /// A page came back without a `lastKey`.
    CursorMissing,
    /// A page echoed the cursor it was requested with.
    CursorRepeated,
    /// The fetch task ended without reporting why.
    FetcherStopped,
}

impl ExhaustionReason {
    pub(crate) fn from_fetch_error(error: &PageFetchError) -> Self {
        match error {
            PageFetchError::ApiCode { code, message } => Self::ApiCode {
                code: *code,
                message: message.clone(),
            },
            other => Self::FetchFailed(other.to_string()),
        }
    }
}

impl fmt::Display for ExhaustionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPage => f.write_str("empty page"),
            Self::ApiCode { code, message } if message.is_empty() => write!(f, "vendor code {code}"),
            Self::ApiCode { code, message } => write!(f, "vendor code {code} ({message})"),
            Self::FetchFailed(error) => write!(f, "fetch failed: {error}"),
            Self::CursorMissing => f.write_str("no cursor returned"),
            Self::CursorRepeated => f.write_str("cursor did not advance"),
            Self::FetcherStopped => f.write_str("fetcher stopped"),
        }
    }
}

/// How pagination ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The vendor signalled the end of its data.
    Exhausted(ExhaustionReason),
    /// A page had records but none were accepted. Reported separately
    /// because it may hide a gap in the feed rather than its end.
    NoProgress { page: u64, rejected: u64 },
}

impl Termination {
    #[must_use]
    pub fn is_no_progress(&self) -> bool {
        matches!(self, Self::NoProgress { .. })
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted(reason) => write!(f, "exhausted: {reason}"),
            Self::NoProgress { page, rejected } => write!(
                f,
                "no progress: page {page} had {rejected} records and none were accepted"
            ),
        }
    }
}
