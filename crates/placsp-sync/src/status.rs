//! Lifecycle status of a record
//!
//! A record is current unless a tombstone at or after its last update exists.
//! A tombstoned record counts as archived once the gap between update and
//! deletion exceeds five years, and as cancelled otherwise.

use crate::feed::Record;
use chrono::{DateTime, FixedOffset, Months};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatusKind {
    Current,
    Cancelled,
    Archived,
}

impl StatusKind {
    /// Label written to the status column
    pub fn label(self) -> &'static str {
        match self {
            StatusKind::Current => "VIGENTE",
            StatusKind::Cancelled => "ANULADA",
            StatusKind::Archived => "ARCHIVADA",
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Status plus the timestamp shown next to it
///
/// `display_timestamp` is the update time for current records and the
/// deletion time otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveStatus {
    pub kind: StatusKind,
    pub display_timestamp: DateTime<FixedOffset>,
}

/// Rule deciding when a deletion counts as archival
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchivalPolicy {
    /// Archived when deleted strictly more than five calendar years after the update
    #[default]
    Calendar,
    /// Integer arithmetic of the historical exporter:
    /// `millis / 1000 / 3660 / 24 / 365 > 5`, roughly a 6.1 year threshold
    Legacy,
}

const ARCHIVAL_YEARS: u32 = 5;

impl ArchivalPolicy {
    pub fn is_archived(self, updated: DateTime<FixedOffset>, deleted: DateTime<FixedOffset>) -> bool {
        match self {
            ArchivalPolicy::Calendar => updated
                .checked_add_months(Months::new(ARCHIVAL_YEARS * 12))
                .is_some_and(|threshold| deleted > threshold),
            ArchivalPolicy::Legacy => {
                let millis = (deleted - updated).num_milliseconds();
                millis / 1000 / 3660 / 24 / 365 > i64::from(ARCHIVAL_YEARS)
            },
        }
    }
}

impl std::str::FromStr for ArchivalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "calendar" => Ok(ArchivalPolicy::Calendar),
            "legacy" => Ok(ArchivalPolicy::Legacy),
            other => Err(format!("Invalid archival policy: {other} (expected calendar or legacy)")),
        }
    }
}

impl fmt::Display for ArchivalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchivalPolicy::Calendar => f.write_str("calendar"),
            ArchivalPolicy::Legacy => f.write_str("legacy"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatusResolver {
    policy: ArchivalPolicy,
}

impl StatusResolver {
    pub fn new(policy: ArchivalPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ArchivalPolicy {
        self.policy
    }

    pub fn resolve(&self, record: &Record, deleted_at: Option<DateTime<FixedOffset>>) -> EffectiveStatus {
        self.resolve_times(record.updated, deleted_at)
    }

    pub fn resolve_times(
        &self,
        updated: DateTime<FixedOffset>,
        deleted_at: Option<DateTime<FixedOffset>>,
    ) -> EffectiveStatus {
        match deleted_at {
            Some(deleted) if deleted >= updated => {
                let kind = if self.policy.is_archived(updated, deleted) {
                    StatusKind::Archived
                } else {
                    StatusKind::Cancelled
                };
                EffectiveStatus {
                    kind,
                    display_timestamp: deleted,
                }
            },
            // A deletion older than the update belongs to an earlier snapshot
            _ => EffectiveStatus {
                kind: StatusKind::Current,
                display_timestamp: updated,
            },
        }
    }
}
