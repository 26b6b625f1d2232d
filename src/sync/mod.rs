//! Incremental catalog sync against the vendor listing.
//!
//! A fetch task walks the vendor cursor and sends pages over a bounded
//! channel; the engine reorders them by sequence number and applies each
//! page (categories first, then parts) in its own committed unit of work.

mod apply;
mod engine;
mod fetcher;
mod outcome;
mod sequencer;

pub use engine::{DEFAULT_LOOKAHEAD, MAX_LOOKAHEAD, SyncEngine, SyncError, SyncOutcome};
pub use outcome::{ExhaustionReason, PageStats, SyncStats, Termination};
pub use sequencer::SequencedBuffer;
