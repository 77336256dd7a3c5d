//! Lazy walk over a chain of locally stored feed pages
//!
//! Each page names its successor through a `rel="next"` link. Only the final
//! path segment of that href is used, resolved next to the current file, so a
//! chain downloaded from the platform can be replayed offline.

use crate::error::DecodeError;
use crate::feed::{FeedPage, PageDecoder};
use std::collections::HashSet;
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A decoded page together with the file it came from
#[derive(Debug, Clone)]
pub struct WalkedPage {
    pub path: PathBuf,
    pub page: FeedPage,
}

/// Finite, non-restartable sequence of pages starting at one file
///
/// - a missing or unreadable starting file yields no pages at all
/// - the sequence ends at the first page without a resolvable `next` sibling
/// - a malformed page is yielded once as an error, then the walk stops
/// - a `next` link back to an already visited file ends the walk
pub struct PaginationWalker<'d, D: PageDecoder + ?Sized> {
    decoder: &'d D,
    pending: Option<PathBuf>,
    visited: HashSet<PathBuf>,
    pages: usize,
}

impl<'d, D: PageDecoder + ?Sized> PaginationWalker<'d, D> {
    pub fn new(decoder: &'d D, start: impl Into<PathBuf>) -> Self {
        Self {
            decoder,
            pending: Some(start.into()),
            visited: HashSet::new(),
            pages: 0,
        }
    }

    /// Number of pages decoded successfully so far
    pub fn pages_visited(&self) -> usize {
        self.pages
    }
}

impl<D: PageDecoder + ?Sized> Iterator for PaginationWalker<'_, D> {
    type Item = Result<WalkedPage, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.pending.take()?;

        if !self.visited.insert(visit_key(&path)) {
            debug!(path = %path.display(), "Next link points at a visited page, stopping");
            return None;
        }

        if self.pages == 0 && !path.is_file() {
            warn!(path = %path.display(), "Starting feed file does not exist");
            return None;
        }

        match self.decoder.decode(&path) {
            Ok(page) => {
                self.pages += 1;
                self.pending = page
                    .next_href()
                    .and_then(|href| resolve_sibling(&path, href));
                Some(Ok(WalkedPage { path, page }))
            },
            Err(DecodeError::Io { source, .. }) if self.pages == 0 => {
                warn!(path = %path.display(), error = %source, "Starting feed file is unreadable");
                None
            },
            Err(e) => Some(Err(e)),
        }
    }
}

impl<D: PageDecoder + ?Sized> FusedIterator for PaginationWalker<'_, D> {}

/// Resolve the last segment of `href` inside the directory of `current`
///
/// Returns `None` when the href has no file segment or the sibling is absent.
pub fn resolve_sibling(current: &Path, href: &str) -> Option<PathBuf> {
    let without_query = href.split(['?', '#']).next().unwrap_or(href);
    let segment = without_query.rsplit('/').next().filter(|s| !s.is_empty())?;

    let candidate = match current.parent() {
        Some(dir) => dir.join(segment),
        None => PathBuf::from(segment),
    };

    if candidate.is_file() {
        Some(candidate)
    } else {
        debug!(
            from = %current.display(),
            next = %candidate.display(),
            "Next page not present locally, chain ends here"
        );
        None
    }
}

fn visit_key(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
