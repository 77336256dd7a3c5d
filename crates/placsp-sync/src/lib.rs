//! PLACSP Sync Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Turns the public procurement Atom feeds into flat tables of current,
//! cancelled and archived records.
//!
//! # Pipeline
//!
//! - **Accumulation**: monthly archives are staged per channel, stale pages
//!   pruned and the baseline page picked ([`accumulator`], [`archive`])
//! - **Pagination**: each starting page is followed through its `next` links
//!   ([`pagination`])
//! - **Deduplication**: first occurrence of a record id wins, deletion markers
//!   are remembered ([`tracker`])
//! - **Status**: current, cancelled or archived ([`status`])
//! - **Classification**: consultation, own-resource assignment or standard
//!   tender ([`classify`])
//! - **Projection**: typed field catalogue to table rows ([`fields`],
//!   [`projection`], [`sink`])
//!
//! # Example
//!
//! ```no_run
//! use placsp_sync::{FeedSynchronizer, MemorySink, SyncOptions, TombstoneTracker};
//! use std::path::PathBuf;
//! use tokio_util::sync::CancellationToken;
//!
//! fn main() -> anyhow::Result<()> {
//!     let synchronizer = FeedSynchronizer::new(SyncOptions::default());
//!     let mut tracker = TombstoneTracker::new();
//!     let mut sink = MemorySink::new();
//!
//!     let report = synchronizer.run(
//!         &[PathBuf::from("licitacionesPerfilesContratanteCompleto3.atom")],
//!         &mut tracker,
//!         &mut sink,
//!         &CancellationToken::new(),
//!     )?;
//!     println!("{} records processed", report.records_processed);
//!     Ok(())
//! }
//! ```

pub mod accumulator;
pub mod archive;
pub mod classify;
pub mod config;
pub mod error;
pub mod feed;
pub mod fields;
pub mod pagination;
pub mod projection;
pub mod sink;
pub mod status;
pub mod sync;
pub mod tracker;

// Re-export commonly used types
pub use accumulator::{
    synchronize_channels, ChannelOutcome, FileDateKeys, PreparedSource, SourceAccumulator, SourceChannel,
};
pub use classify::{classify, RecordFamily};
pub use config::SyncConfig;
pub use error::{AccumulateError, DecodeError, SinkError, SyncError};
pub use feed::{AtomDecoder, FeedPage, PageDecoder, Record, Tombstone};
pub use pagination::PaginationWalker;
pub use projection::{ProjectionMode, RowProjector, Table};
pub use sink::{CsvSink, MemorySink, SheetSink};
pub use status::{ArchivalPolicy, EffectiveStatus, StatusKind, StatusResolver};
pub use sync::{FailedSource, FeedSynchronizer, SyncOptions, SyncReport};
pub use tracker::TombstoneTracker;
