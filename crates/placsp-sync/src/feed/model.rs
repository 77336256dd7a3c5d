//! Decoded feed page types

use super::xml::XmlNode;
use chrono::{DateTime, FixedOffset};

/// One procurement case entry
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Stable id, unique per feed family (usually a URL)
    pub id: String,
    pub updated: DateTime<FixedOffset>,
    /// Entry links in document order; never empty for decoded records
    pub links: Vec<String>,
    /// Embedded procurement document, if the entry carries one
    pub payload: Option<XmlNode>,
}

impl Record {
    /// Id suffix after the last `/`, as shown in the first output column
    pub fn short_id(&self) -> &str {
        self.id.rsplit('/').next().unwrap_or(&self.id)
    }

    pub fn first_link(&self) -> &str {
        self.links.first().map(String::as_str).unwrap_or_default()
    }
}

/// Deletion marker from a page's `deleted-entry` section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tombstone {
    pub reference: String,
    pub deleted_at: DateTime<FixedOffset>,
}

/// Feed-level navigation link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedLink {
    pub rel: String,
    pub href: String,
}

/// Everything decoded from one feed file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedPage {
    pub records: Vec<Record>,
    pub tombstones: Vec<Tombstone>,
    pub links: Vec<FeedLink>,
}

impl FeedPage {
    /// Href of the first link whose rel is `next`, compared case-insensitively
    pub fn next_href(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|link| link.rel.eq_ignore_ascii_case("next"))
            .map(|link| link.href.as_str())
    }
}
