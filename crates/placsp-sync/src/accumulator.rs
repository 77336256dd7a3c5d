//! Historical source accumulation per publication channel
//!
//! Each channel publishes a full baseline page (no date in its name) followed by
//! dated incremental pages, `<base>_<yyyyMMdd>_<HHmmss>.atom`. Staged pages are
//! ordered oldest first by their year-month key, stale incrementals are pruned,
//! and the earliest page becomes the entry point of the channel's chain.

use crate::archive::{self, is_archive_file, is_feed_file, StagingReport};
use crate::error::{AccumulateError, SinkError, SyncError};
use crate::feed::PageDecoder;
use crate::sink::SheetSink;
use crate::sync::{FeedSynchronizer, SyncReport};
use crate::tracker::TombstoneTracker;
use chrono::{Months, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_YEAR_MONTH_PATTERN: &str = r"_(\d{6})(?:\d{2})?[._]";
pub const DEFAULT_FULL_DATE_PATTERN: &str = r"_(\d{8})_";

/// Publication channel, recognised by a marker in the file name
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceChannel {
    ContractingProfiles,
    AggregatedPlatforms,
}

impl SourceChannel {
    pub const ALL: [SourceChannel; 2] = [
        SourceChannel::ContractingProfiles,
        SourceChannel::AggregatedPlatforms,
    ];

    pub fn marker(self) -> &'static str {
        match self {
            SourceChannel::ContractingProfiles => "PerfilesContratante",
            SourceChannel::AggregatedPlatforms => "PlataformasAgregadas",
        }
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|channel| name.contains(channel.marker()))
    }

    pub fn default_output_name(self) -> &'static str {
        match self {
            SourceChannel::ContractingProfiles => "licPerfContratPLACSP",
            SourceChannel::AggregatedPlatforms => "licPlatafAgregadas",
        }
    }
}

impl fmt::Display for SourceChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// Date keys embedded in published file names
#[derive(Debug, Clone)]
pub struct FileDateKeys {
    year_month: Regex,
    full_date: Regex,
}

impl FileDateKeys {
    pub fn new(year_month_pattern: &str, full_date_pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            year_month: Regex::new(year_month_pattern)?,
            full_date: Regex::new(full_date_pattern)?,
        })
    }

    pub fn standard() -> Result<Self, regex::Error> {
        Self::new(DEFAULT_YEAR_MONTH_PATTERN, DEFAULT_FULL_DATE_PATTERN)
    }

    /// `yyyyMM` key, `None` for the undated baseline
    pub fn year_month(&self, name: &str) -> Option<u32> {
        self.year_month
            .captures(name)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    pub fn full_date(&self, name: &str) -> Option<NaiveDate> {
        self.full_date
            .captures(name)
            .and_then(|caps| caps.get(1))
            .and_then(|m| NaiveDate::parse_from_str(m.as_str(), "%Y%m%d").ok())
    }

    /// Oldest first; undated names sort before every dated one
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        let key = |name: &str| (self.year_month(name).unwrap_or(0), self.full_date(name), name.to_string());
        key(a).cmp(&key(b))
    }
}

/// A channel ready for synchronization
#[derive(Debug)]
pub struct PreparedSource {
    pub channel: SourceChannel,
    pub baseline: PathBuf,
    pub members: Vec<PathBuf>,
    pub pruned: Vec<PathBuf>,
    pub staging: StagingReport,
}

pub struct SourceAccumulator {
    keys: FileDateKeys,
    retention_months: u32,
}

impl SourceAccumulator {
    pub fn new(keys: FileDateKeys, retention_months: u32) -> Self {
        Self {
            keys,
            retention_months,
        }
    }

    pub fn keys(&self) -> &FileDateKeys {
        &self.keys
    }

    /// Archives of `dir` grouped by channel, oldest first; unrecognised names are skipped
    pub fn group_archives(&self, dir: &Path) -> Result<BTreeMap<SourceChannel, Vec<PathBuf>>, AccumulateError> {
        let mut groups: BTreeMap<SourceChannel, Vec<PathBuf>> = BTreeMap::new();

        for path in list_files(dir, is_archive_file)? {
            let name = file_name(&path);
            match SourceChannel::from_file_name(&name) {
                Some(channel) => groups.entry(channel).or_default().push(path),
                None => debug!(archive = %name, "Archive belongs to no known channel"),
            }
        }

        for archives in groups.values_mut() {
            self.sort(archives);
        }
        Ok(groups)
    }

    /// Staged feed pages of one channel, oldest first
    pub fn channel_feeds(&self, dir: &Path, channel: SourceChannel) -> Result<Vec<PathBuf>, AccumulateError> {
        let mut feeds: Vec<PathBuf> = list_files(dir, is_feed_file)?
            .into_iter()
            .filter(|path| file_name(path).contains(channel.marker()))
            .collect();
        self.sort(&mut feeds);
        Ok(feeds)
    }

    /// Delete dated pages of `channel` older than `today - retention`
    ///
    /// Pages without a full date are never touched.
    pub fn prune_stale(
        &self,
        dir: &Path,
        channel: SourceChannel,
        today: NaiveDate,
    ) -> Result<Vec<PathBuf>, AccumulateError> {
        let Some(cutoff) = today.checked_sub_months(Months::new(self.retention_months)) else {
            return Ok(Vec::new());
        };

        let mut pruned = Vec::new();
        for path in self.channel_feeds(dir, channel)? {
            let stale = self
                .keys
                .full_date(&file_name(&path))
                .is_some_and(|date| date < cutoff);
            if !stale {
                continue;
            }

            std::fs::remove_file(&path).map_err(|source| AccumulateError::Io {
                path: path.clone(),
                source,
            })?;
            debug!(path = %path.display(), "Pruned stale feed page");
            pruned.push(path);
        }

        if !pruned.is_empty() {
            info!(channel = %channel, pruned = pruned.len(), %cutoff, "Removed stale feed pages");
        }
        Ok(pruned)
    }

    /// Stage `archives`, prune, and pick the channel's baseline
    pub fn prepare(
        &self,
        channel: SourceChannel,
        archives: &[PathBuf],
        staging: &Path,
        today: NaiveDate,
    ) -> Result<PreparedSource, AccumulateError> {
        std::fs::create_dir_all(staging).map_err(|source| AccumulateError::Io {
            path: staging.to_path_buf(),
            source,
        })?;
        let report = archive::stage_archives(archives, staging);
        let pruned = self.prune_stale(staging, channel, today)?;
        let members = self.channel_feeds(staging, channel)?;

        let baseline = members
            .first()
            .cloned()
            .ok_or_else(|| AccumulateError::MissingBaseline {
                channel: channel.to_string(),
                dir: staging.to_path_buf(),
            })?;

        if self.keys.year_month(&file_name(&baseline)).is_some() {
            warn!(
                channel = %channel,
                baseline = %baseline.display(),
                "No undated baseline page; starting from the oldest dated page"
            );
        }
        info!(
            channel = %channel,
            baseline = %baseline.display(),
            pages = members.len(),
            "Channel prepared"
        );

        Ok(PreparedSource {
            channel,
            baseline,
            members,
            pruned,
            staging: report,
        })
    }

    fn sort(&self, paths: &mut [PathBuf]) {
        paths.sort_by(|a, b| self.keys.compare(&file_name(a), &file_name(b)));
    }
}

/// One channel after synchronization, with the sink its rows went to
#[derive(Debug)]
pub struct ChannelOutcome<S> {
    pub prepared: PreparedSource,
    pub report: SyncReport,
    pub sink: S,
}

/// Synchronize prepared channels one after another in [`SourceChannel::ALL`] order
///
/// Channels share `tracker`: a record published on both is emitted by the
/// earlier channel only, and its tombstones are visible to every later one.
/// `open_sink` is called once per channel, right before its run.
pub fn synchronize_channels<D, S, F>(
    synchronizer: &FeedSynchronizer<D>,
    mut prepared: Vec<PreparedSource>,
    tracker: &mut TombstoneTracker,
    mut open_sink: F,
    cancel: &CancellationToken,
) -> Result<Vec<ChannelOutcome<S>>, SyncError>
where
    D: PageDecoder,
    S: SheetSink,
    F: FnMut(SourceChannel) -> Result<S, SinkError>,
{
    prepared.sort_by_key(|source| source.channel);

    let mut outcomes = Vec::with_capacity(prepared.len());
    for source in prepared {
        if cancel.is_cancelled() {
            warn!(channel = %source.channel, "Cancelled before channel synchronization");
            break;
        }

        let mut sink = open_sink(source.channel)?;
        let report = synchronizer.run(std::slice::from_ref(&source.baseline), &mut *tracker, &mut sink, cancel)?;
        info!(
            channel = %source.channel,
            processed = report.records_processed,
            duplicates = report.duplicates,
            "Channel synchronized"
        );
        outcomes.push(ChannelOutcome {
            prepared: source,
            report,
            sink,
        });
    }
    Ok(outcomes)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn list_files(dir: &Path, keep: fn(&str) -> bool) -> Result<Vec<PathBuf>, AccumulateError> {
    let io_err = |source| AccumulateError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && keep(&file_name(&path)) {
            files.push(path);
        }
    }
    Ok(files)
}
