//! Feed synchronization: walk chains, deduplicate, resolve, classify, project
//!
//! One run processes a list of starting files in order. Each file's chain is
//! walked page by page; a page's tombstones are merged before its records are
//! looked at. A failing chain is recorded in the report and the run moves on to
//! the next file. Only sink failures abort a run.

use crate::classify::{classify, RecordFamily};
use crate::error::SyncError;
use crate::feed::{AtomDecoder, PageDecoder, Record};
use crate::pagination::PaginationWalker;
use crate::projection::{workbook_tables, ProjectionMode, RowProjector, Table};
use crate::sink::SheetSink;
use crate::status::{ArchivalPolicy, StatusKind, StatusResolver};
use crate::tracker::{Admission, TrackerHandle};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn};

/// Knobs of one synchronization run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncOptions {
    pub mode: ProjectionMode,
    pub include_own_resource: bool,
    pub include_consultations: bool,
    pub archival_policy: ArchivalPolicy,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            mode: ProjectionMode::TwoTables,
            include_own_resource: false,
            include_consultations: false,
            archival_policy: ArchivalPolicy::Calendar,
        }
    }
}

impl SyncOptions {
    /// Whether rows of `family` are emitted; excluded ids are still marked seen
    pub fn includes(&self, family: RecordFamily) -> bool {
        match family {
            RecordFamily::StandardTender => true,
            RecordFamily::OwnResourceAssignment => self.include_own_resource,
            RecordFamily::PreliminaryConsultation => self.include_consultations,
        }
    }

    /// Tables a sink must accept for these options
    pub fn tables(&self) -> Vec<Table> {
        workbook_tables(self.mode, self.include_own_resource, self.include_consultations)
    }
}

/// A starting file whose chain could not be synchronized completely
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedSource {
    pub path: PathBuf,
    pub reason: String,
}

/// Counters and failure manifest of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub files: usize,
    pub pages: usize,
    pub records_seen: usize,
    pub records_processed: usize,
    pub duplicates: usize,
    pub excluded: usize,
    pub by_family: BTreeMap<RecordFamily, usize>,
    pub by_status: BTreeMap<StatusKind, usize>,
    pub rows_by_table: BTreeMap<Table, usize>,
    pub failed_sources: Vec<FailedSource>,
    pub cancelled: bool,
}

impl SyncReport {
    pub fn rows(&self, table: Table) -> usize {
        self.rows_by_table.get(&table).copied().unwrap_or(0)
    }

    pub fn family(&self, family: RecordFamily) -> usize {
        self.by_family.get(&family).copied().unwrap_or(0)
    }

    pub fn is_clean(&self) -> bool {
        self.failed_sources.is_empty() && !self.cancelled
    }

    /// Fold another run's counters into this one
    pub fn merge(&mut self, other: SyncReport) {
        self.files += other.files;
        self.pages += other.pages;
        self.records_seen += other.records_seen;
        self.records_processed += other.records_processed;
        self.duplicates += other.duplicates;
        self.excluded += other.excluded;
        for (family, count) in other.by_family {
            *self.by_family.entry(family).or_default() += count;
        }
        for (status, count) in other.by_status {
            *self.by_status.entry(status).or_default() += count;
        }
        for (table, count) in other.rows_by_table {
            *self.rows_by_table.entry(table).or_default() += count;
        }
        self.failed_sources.extend(other.failed_sources);
        self.cancelled |= other.cancelled;
    }
}

enum Flow {
    Continue,
    Cancelled,
}

pub struct FeedSynchronizer<D: PageDecoder = AtomDecoder> {
    decoder: D,
    options: SyncOptions,
    resolver: StatusResolver,
    projector: RowProjector,
}

impl FeedSynchronizer<AtomDecoder> {
    pub fn new(options: SyncOptions) -> Self {
        Self::with_decoder(AtomDecoder::new(), options)
    }
}

impl<D: PageDecoder> FeedSynchronizer<D> {
    pub fn with_decoder(decoder: D, options: SyncOptions) -> Self {
        Self {
            decoder,
            options,
            resolver: StatusResolver::new(options.archival_policy),
            projector: RowProjector::new(options.mode),
        }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Synchronize every starting file into `sink`
    ///
    /// `tracker` must be the run's tracker: ids seen in earlier calls with the
    /// same tracker are treated as duplicates.
    pub fn run<T, S>(
        &self,
        files: &[PathBuf],
        tracker: &mut T,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError>
    where
        T: TrackerHandle,
        S: SheetSink + ?Sized,
    {
        let started = Instant::now();
        let mut report = SyncReport::default();

        for file in files {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            report.files += 1;
            let flow = self.sync_chain(file, tracker, sink, cancel, &mut report)?;
            if let Flow::Cancelled = flow {
                report.cancelled = true;
                break;
            }
        }

        sink.flush()?;

        info!(
            files = report.files,
            pages = report.pages,
            seen = report.records_seen,
            processed = report.records_processed,
            duplicates = report.duplicates,
            failed = report.failed_sources.len(),
            cancelled = report.cancelled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Feed synchronization finished"
        );

        Ok(report)
    }

    fn sync_chain<T, S>(
        &self,
        file: &Path,
        tracker: &mut T,
        sink: &mut S,
        cancel: &CancellationToken,
        report: &mut SyncReport,
    ) -> Result<Flow, SyncError>
    where
        T: TrackerHandle,
        S: SheetSink + ?Sized,
    {
        let span = info_span!("feed_chain", path = %file.display());
        let _entered = span.enter();

        let mut walker = PaginationWalker::new(&self.decoder, file);
        let mut failed = false;

        for item in walker.by_ref() {
            let walked = match item {
                Ok(walked) => walked,
                Err(e) => {
                    warn!(error = %e, "Feed chain aborted");
                    report.failed_sources.push(FailedSource {
                        path: file.to_path_buf(),
                        reason: e.to_string(),
                    });
                    failed = true;
                    break;
                },
            };

            report.pages += 1;
            let added = tracker
                .observe_tombstones(&walked.page.tombstones)
                .map_err(|_| SyncError::TrackerPoisoned)?;
            debug!(
                page = %walked.path.display(),
                records = walked.page.records.len(),
                tombstones = added,
                "Page decoded"
            );

            for record in &walked.page.records {
                if cancel.is_cancelled() {
                    return Ok(Flow::Cancelled);
                }
                self.sync_record(record, tracker, sink, report)?;
            }
        }

        if walker.pages_visited() == 0 && !failed {
            report.failed_sources.push(FailedSource {
                path: file.to_path_buf(),
                reason: "no readable feed page".to_string(),
            });
        }

        Ok(Flow::Continue)
    }

    fn sync_record<T, S>(
        &self,
        record: &Record,
        tracker: &mut T,
        sink: &mut S,
        report: &mut SyncReport,
    ) -> Result<(), SyncError>
    where
        T: TrackerHandle,
        S: SheetSink + ?Sized,
    {
        report.records_seen += 1;

        let deleted_at = match tracker.admit(&record.id).map_err(|_| SyncError::TrackerPoisoned)? {
            Admission::Duplicate => {
                report.duplicates += 1;
                return Ok(());
            },
            Admission::Fresh { deleted_at } => deleted_at,
        };
        report.records_processed += 1;

        let status = self.resolver.resolve(record, deleted_at);
        let family = classify(record);
        *report.by_family.entry(family).or_default() += 1;
        *report.by_status.entry(status.kind).or_default() += 1;

        if !self.options.includes(family) {
            report.excluded += 1;
            return Ok(());
        }

        let rows = self.projector.project(record, &status, family);
        for routed in &rows {
            *report.rows_by_table.entry(routed.table).or_default() += 1;
        }
        sink.append_rows(rows)?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::feed::{FeedLink, FeedPage, Tombstone, XmlNode};
    use crate::sink::MemorySink;
    use crate::tracker::TombstoneTracker;
    use chrono::DateTime;
    use std::collections::HashMap;

    /// Serves pages from memory, keyed by file name
    struct FakeDecoder {
        pages: HashMap<PathBuf, FeedPage>,
    }

    impl PageDecoder for FakeDecoder {
        fn decode(&self, path: &Path) -> Result<FeedPage, DecodeError> {
            self.pages.get(path).cloned().ok_or_else(|| DecodeError::Malformed {
                path: path.to_path_buf(),
                reason: "not a fake page".to_string(),
            })
        }
    }

    fn record(id: &str, updated: &str, payload: Option<XmlNode>) -> Record {
        Record {
            id: format!("https://host/records/{id}"),
            updated: DateTime::parse_from_rfc3339(updated).unwrap(),
            links: vec![format!("https://host/detail/{id}")],
            payload,
        }
    }

    fn own_resource_payload() -> XmlNode {
        XmlNode::new("ContractFolderStatus").with_child(
            XmlNode::new("TenderResult").with_child(XmlNode::new("ResultCode").with_text("11")),
        )
    }

    /// Start files must exist on disk; their content comes from the fake decoder
    fn run_pages(files: &[(PathBuf, FeedPage)], options: SyncOptions) -> (SyncReport, MemorySink) {
        let pages = files.iter().cloned().collect();
        let synchronizer = FeedSynchronizer::with_decoder(FakeDecoder { pages }, options);
        let starts: Vec<PathBuf> = files.iter().map(|(p, _)| p.clone()).collect();
        let mut tracker = TombstoneTracker::new();
        let mut sink = MemorySink::new();

        let report = synchronizer
            .run(&starts, &mut tracker, &mut sink, &CancellationToken::new())
            .unwrap();
        (report, sink)
    }

    #[test]
    fn test_duplicates_across_files_are_processed_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let a = dir.path().join("a.atom");
        let b = dir.path().join("b.atom");
        std::fs::write(&a, "").unwrap();
        std::fs::write(&b, "").unwrap();

        let page_a = FeedPage {
            records: vec![record("1", "2024-02-01T00:00:00Z", None)],
            ..FeedPage::default()
        };
        let page_b = FeedPage {
            records: vec![
                record("1", "2024-01-01T00:00:00Z", None),
                record("2", "2024-01-01T00:00:00Z", None),
            ],
            ..FeedPage::default()
        };

        let (report, sink) = run_pages(&[(a, page_a), (b, page_b)], SyncOptions::default());

        assert_eq!(report.records_seen, 3);
        assert_eq!(report.records_processed, 2);
        assert_eq!(report.duplicates, 1);
        assert_eq!(sink.rows(Table::Tenders).len(), 2);
    }

    #[test]
    fn test_tombstones_apply_to_records_on_same_page() {
        let dir = tempfile::TempDir::new().unwrap();
        let a = dir.path().join("a.atom");
        std::fs::write(&a, "").unwrap();

        let page = FeedPage {
            records: vec![record("1", "2024-01-01T00:00:00Z", None)],
            tombstones: vec![Tombstone {
                reference: "https://host/records/1".to_string(),
                deleted_at: DateTime::parse_from_rfc3339("2024-01-02T00:00:00Z").unwrap(),
            }],
            links: vec![FeedLink {
                rel: "self".into(),
                href: "a.atom".into(),
            }],
        };

        let (report, sink) = run_pages(&[(a, page)], SyncOptions::default());

        assert_eq!(report.by_status.get(&StatusKind::Cancelled), Some(&1));
        assert_eq!(sink.rendered(Table::Tenders)[0][3], "ANULADA");
    }

    #[test]
    fn test_excluded_family_is_seen_but_not_emitted() {
        let dir = tempfile::TempDir::new().unwrap();
        let a = dir.path().join("a.atom");
        std::fs::write(&a, "").unwrap();
        let page = FeedPage {
            records: vec![record("7", "2024-01-01T00:00:00Z", Some(own_resource_payload()))],
            ..FeedPage::default()
        };

        let (report, sink) = run_pages(&[(a.clone(), page.clone())], SyncOptions::default());
        assert_eq!(report.excluded, 1);
        assert_eq!(report.family(RecordFamily::OwnResourceAssignment), 1);
        assert_eq!(sink.row_count(), 0);

        let options = SyncOptions {
            include_own_resource: true,
            ..SyncOptions::default()
        };
        let (_, sink) = run_pages(&[(a, page)], options);
        assert_eq!(sink.rows(Table::OwnResource).len(), 1);
    }

    #[test]
    fn test_failed_source_does_not_stop_run() {
        let dir = tempfile::TempDir::new().unwrap();
        let good = dir.path().join("good.atom");
        let broken = dir.path().join("broken.atom");
        let missing = dir.path().join("missing.atom");
        std::fs::write(&good, "").unwrap();
        std::fs::write(&broken, "").unwrap();

        let mut pages = HashMap::new();
        pages.insert(
            good.clone(),
            FeedPage {
                records: vec![record("1", "2024-01-01T00:00:00Z", None)],
                ..FeedPage::default()
            },
        );
        let synchronizer = FeedSynchronizer::with_decoder(FakeDecoder { pages }, SyncOptions::default());
        let mut tracker = TombstoneTracker::new();
        let mut sink = MemorySink::new();

        let report = synchronizer
            .run(
                &[broken.clone(), missing.clone(), good],
                &mut tracker,
                &mut sink,
                &CancellationToken::new(),
            )
            .unwrap();

        let failed: Vec<&Path> = report.failed_sources.iter().map(|f| f.path.as_path()).collect();
        assert_eq!(failed, vec![broken.as_path(), missing.as_path()]);
        assert_eq!(report.records_processed, 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_cancelled_run_stops_before_records() {
        let dir = tempfile::TempDir::new().unwrap();
        let a = dir.path().join("a.atom");
        std::fs::write(&a, "").unwrap();
        let mut pages = HashMap::new();
        pages.insert(
            a.clone(),
            FeedPage {
                records: vec![record("1", "2024-01-01T00:00:00Z", None)],
                ..FeedPage::default()
            },
        );
        let synchronizer = FeedSynchronizer::with_decoder(FakeDecoder { pages }, SyncOptions::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = synchronizer
            .run(&[a], &mut TombstoneTracker::new(), &mut MemorySink::new(), &cancel)
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.records_seen, 0);
    }

    #[test]
    fn test_report_merge() {
        let mut total = SyncReport {
            files: 1,
            records_processed: 2,
            ..SyncReport::default()
        };
        total.rows_by_table.insert(Table::Tenders, 2);
        let mut other = SyncReport {
            files: 2,
            records_processed: 3,
            cancelled: true,
            ..SyncReport::default()
        };
        other.rows_by_table.insert(Table::Tenders, 1);

        total.merge(other);

        assert_eq!(total.files, 3);
        assert_eq!(total.records_processed, 5);
        assert_eq!(total.rows(Table::Tenders), 3);
        assert!(total.cancelled);
    }
}
