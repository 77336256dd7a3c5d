//! Atom feed page decoder

use super::model::{FeedLink, FeedPage, Record, Tombstone};
use super::xml::XmlNode;
use crate::error::DecodeError;
use chrono::{DateTime, FixedOffset};
use std::path::Path;

/// Turns one feed file into records, tombstones and navigation links
pub trait PageDecoder {
    fn decode(&self, path: &Path) -> Result<FeedPage, DecodeError>;
}

/// Element names that belong to the Atom envelope rather than the payload
const ATOM_ENTRY_ELEMENTS: &[&str] = &[
    "id",
    "title",
    "summary",
    "updated",
    "published",
    "link",
    "author",
    "contributor",
    "category",
    "content",
    "rights",
    "source",
];

/// Decoder for the Atom 1.0 pages published by the procurement platform,
/// including the `deleted-entry` tombstone extension
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomDecoder;

impl AtomDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode page text; `path` only labels errors
    pub fn decode_str(&self, xml: &str, path: &Path) -> Result<FeedPage, DecodeError> {
        let root = XmlNode::parse_str(xml).map_err(|e| DecodeError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if root.name() != "feed" {
            return Err(DecodeError::Malformed {
                path: path.to_path_buf(),
                reason: format!("expected <feed> root, found <{}>", root.name()),
            });
        }

        let mut page = FeedPage::default();
        for node in root.children() {
            match node.name() {
                "entry" => page.records.push(decode_entry(node, path)?),
                "deleted-entry" => page.tombstones.push(decode_tombstone(node, path)?),
                "link" => {
                    if let Some(href) = node.attr("href") {
                        page.links.push(FeedLink {
                            rel: node.attr("rel").unwrap_or("alternate").to_string(),
                            href: href.to_string(),
                        });
                    }
                },
                _ => {},
            }
        }

        Ok(page)
    }
}

impl PageDecoder for AtomDecoder {
    fn decode(&self, path: &Path) -> Result<FeedPage, DecodeError> {
        let xml = std::fs::read_to_string(path).map_err(|source| DecodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.decode_str(&xml, path)
    }
}

fn decode_entry(entry: &XmlNode, path: &Path) -> Result<Record, DecodeError> {
    let missing = |field| DecodeError::MissingField {
        path: path.to_path_buf(),
        field,
    };

    let id = entry.text_at("id").ok_or_else(|| missing("id"))?.to_string();
    let updated = entry
        .text_at("updated")
        .and_then(parse_timestamp)
        .ok_or_else(|| missing("updated"))?;

    let links: Vec<String> = entry
        .children_named("link")
        .filter_map(|link| link.attr("href"))
        .map(str::to_string)
        .collect();
    if links.is_empty() {
        return Err(missing("link"));
    }

    let payload = entry
        .children()
        .iter()
        .find(|child| !ATOM_ENTRY_ELEMENTS.contains(&child.name()))
        .cloned();

    Ok(Record {
        id,
        updated,
        links,
        payload,
    })
}

fn decode_tombstone(node: &XmlNode, path: &Path) -> Result<Tombstone, DecodeError> {
    let reference = node.attr("ref").ok_or_else(|| DecodeError::MissingField {
        path: path.to_path_buf(),
        field: "ref",
    })?;
    let deleted_at = node
        .attr("when")
        .and_then(parse_timestamp)
        .ok_or_else(|| DecodeError::MissingField {
            path: path.to_path_buf(),
            field: "when",
        })?;

    Ok(Tombstone {
        reference: reference.to_string(),
        deleted_at,
    })
}

fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value.trim()).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const PAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:at="http://purl.org/atompub/tombstones/1.0">
  <id>https://contrataciondelestado.es/sindicacion/licitacionesPerfilContratante.atom</id>
  <link href="https://contrataciondelestado.es/sindicacion/licitacionesPerfilContratante.atom" rel="self"/>
  <link href="https://contrataciondelestado.es/sindicacion/licitacionesPerfilContratante_20240115_101010.atom" rel="next"/>
  <updated>2024-01-15T10:10:10.000+01:00</updated>
  <at:deleted-entry ref="https://contrataciondelestado.es/sindicacion/licitacionesPerfilContratante/111" when="2024-01-14T09:00:00.000+01:00"/>
  <entry>
    <id>https://contrataciondelestado.es/sindicacion/licitacionesPerfilContratante/222</id>
    <link href="https://contrataciondelestado.es/wps/poc?uri=deeplink:detalle_licitacion&amp;idEvl=abc"/>
    <summary type="text">Id licitación: 222</summary>
    <title>Servicio de limpieza</title>
    <updated>2024-01-13T08:30:00.000+01:00</updated>
    <cac-place-ext:ContractFolderStatus xmlns:cac-place-ext="urn:ext" xmlns:cbc="urn:cbc">
      <cbc:ContractFolderID>EXP-1</cbc:ContractFolderID>
    </cac-place-ext:ContractFolderStatus>
  </entry>
</feed>"#;

    fn page_path() -> PathBuf {
        PathBuf::from("licitacionesPerfilContratante.atom")
    }

    #[test]
    fn test_decode_entries_tombstones_and_links() {
        let page = AtomDecoder::new().decode_str(PAGE, &page_path()).unwrap();

        assert_eq!(page.records.len(), 1);
        assert_eq!(page.tombstones.len(), 1);
        assert_eq!(page.links.len(), 2);

        let record = &page.records[0];
        assert_eq!(record.short_id(), "222");
        assert!(record.first_link().contains("idEvl=abc"));
        assert_eq!(record.payload.as_ref().unwrap().name(), "ContractFolderStatus");
        assert_eq!(record.updated.to_rfc3339(), "2024-01-13T08:30:00+01:00");

        assert!(page.tombstones[0].reference.ends_with("/111"));
        assert_eq!(
            page.next_href(),
            Some("https://contrataciondelestado.es/sindicacion/licitacionesPerfilContratante_20240115_101010.atom")
        );
    }

    #[test]
    fn test_entry_without_updated_is_rejected() {
        let xml = r#"<feed><entry><id>x/1</id><link href="l"/></entry></feed>"#;
        let err = AtomDecoder::new().decode_str(xml, &page_path()).unwrap_err();

        assert!(matches!(err, DecodeError::MissingField { field: "updated", .. }));
    }

    #[test]
    fn test_non_feed_root_is_malformed() {
        let err = AtomDecoder::new()
            .decode_str("<rss><channel/></rss>", &page_path())
            .unwrap_err();

        assert!(matches!(err, DecodeError::Malformed { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = AtomDecoder::new()
            .decode(Path::new("/definitely/not/here.atom"))
            .unwrap_err();

        assert!(matches!(err, DecodeError::Io { .. }));
    }
}
