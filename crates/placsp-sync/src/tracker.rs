//! Run-scoped deduplication and tombstone bookkeeping
//!
//! The newest snapshot of a record appears first in the feed, so the first
//! occurrence of an id is the one processed and later occurrences are skipped.
//! Tombstones follow the same rule: the first deletion time seen for a
//! reference is kept.

use crate::feed::Tombstone;
use chrono::{DateTime, FixedOffset};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Outcome of asking whether a record should be processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Already processed earlier in this run
    Duplicate,
    /// First sighting; carries the deletion time known at this point, if any
    Fresh {
        deleted_at: Option<DateTime<FixedOffset>>,
    },
}

/// Seen-set plus first-write-wins tombstone map, created per run
#[derive(Debug, Default)]
pub struct TombstoneTracker {
    seen: HashSet<String>,
    tombstones: HashMap<String, DateTime<FixedOffset>>,
}

impl TombstoneTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a page's tombstones; returns how many references were new
    pub fn observe_tombstones(&mut self, tombstones: &[Tombstone]) -> usize {
        let mut added = 0;
        for tombstone in tombstones {
            if !self.tombstones.contains_key(&tombstone.reference) {
                self.tombstones
                    .insert(tombstone.reference.clone(), tombstone.deleted_at);
                added += 1;
            }
        }
        added
    }

    /// True exactly once per id; marks the id as seen
    pub fn should_process(&mut self, id: &str) -> bool {
        if self.seen.contains(id) {
            return false;
        }
        self.seen.insert(id.to_string())
    }

    /// [`should_process`](Self::should_process) plus the tombstone lookup in one step
    pub fn admit(&mut self, id: &str) -> Admission {
        if self.should_process(id) {
            Admission::Fresh {
                deleted_at: self.tombstone(id),
            }
        } else {
            Admission::Duplicate
        }
    }

    pub fn tombstone(&self, id: &str) -> Option<DateTime<FixedOffset>> {
        self.tombstones.get(id).copied()
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn tombstone_count(&self) -> usize {
        self.tombstones.len()
    }
}

/// Access to a tracker that may be owned or shared between channel workers
///
/// The shared form takes the lock once per call, so the merge of a page's
/// tombstones and each admission are atomic with respect to other workers.
pub trait TrackerHandle {
    type Error;

    fn observe_tombstones(&mut self, tombstones: &[Tombstone]) -> Result<usize, Self::Error>;

    fn admit(&mut self, id: &str) -> Result<Admission, Self::Error>;
}

impl TrackerHandle for TombstoneTracker {
    type Error = std::convert::Infallible;

    fn observe_tombstones(&mut self, tombstones: &[Tombstone]) -> Result<usize, Self::Error> {
        Ok(TombstoneTracker::observe_tombstones(self, tombstones))
    }

    fn admit(&mut self, id: &str) -> Result<Admission, Self::Error> {
        Ok(TombstoneTracker::admit(self, id))
    }
}

/// Lock was poisoned by a worker that panicked while holding it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoisonedTracker;

impl TrackerHandle for &Mutex<TombstoneTracker> {
    type Error = PoisonedTracker;

    fn observe_tombstones(&mut self, tombstones: &[Tombstone]) -> Result<usize, Self::Error> {
        let mut tracker = self.lock().map_err(|_| PoisonedTracker)?;
        Ok(tracker.observe_tombstones(tombstones))
    }

    fn admit(&mut self, id: &str) -> Result<Admission, Self::Error> {
        let mut tracker = self.lock().map_err(|_| PoisonedTracker)?;
        Ok(tracker.admit(id))
    }
}
