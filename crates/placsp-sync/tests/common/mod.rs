//! Shared helpers for the pipeline integration tests
//!
//! Feed pages are written into a temporary directory so pagination resolves
//! `next` links exactly as it does for staged archives.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use placsp_sync::projection::layout;
use placsp_sync::sync::SyncReport;
use placsp_sync::{FeedSynchronizer, MemorySink, ProjectionMode, SyncOptions, Table, TombstoneTracker};
use std::path::{Path, PathBuf};
use std::sync::Once;
use tokio_util::sync::CancellationToken;

pub const ID_BASE: &str = "https://contrataciondelestado.es/sindicacion/licitacionesPerfilContratante/";

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness; `RUST_LOG` selects the level
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Builder for one Atom page
#[derive(Default)]
pub struct FeedBuilder {
    next: Option<String>,
    tombstones: Vec<(String, String)>,
    entries: Vec<String>,
}

impl FeedBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(mut self, href: &str) -> Self {
        self.next = Some(href.to_string());
        self
    }

    pub fn deleted(mut self, id: &str, when: &str) -> Self {
        self.tombstones.push((format!("{ID_BASE}{id}"), when.to_string()));
        self
    }

    pub fn entry(mut self, id: &str, updated: &str, payload: &str) -> Self {
        self.entries.push(format!(
            r#"  <entry>
    <id>{ID_BASE}{id}</id>
    <link href="https://contrataciondelestado.es/wps/poc?uri=deeplink:detalle_licitacion&amp;idEvl={id}"/>
    <summary type="text">Entrada {id}</summary>
    <title>Entrada {id}</title>
    <updated>{updated}</updated>
    {payload}
  </entry>
"#
        ));
        self
    }

    pub fn render(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:at="http://purl.org/atompub/tombstones/1.0" xmlns:cac-place-ext="urn:dgpe:names:draft:codice-place-ext:schema:xsd:CommonAggregateComponents-2" xmlns:cbc-place-ext="urn:dgpe:names:draft:codice-place-ext:schema:xsd:CommonBasicComponents-2" xmlns:cac="urn:dgpe:names:draft:codice:schema:xsd:CommonAggregateComponents-2" xmlns:cbc="urn:dgpe:names:draft:codice:schema:xsd:CommonBasicComponents-2">
  <id>https://contrataciondelestado.es/sindicacion/licitacionesPerfilContratante.atom</id>
  <title>Licitaciones</title>
  <updated>2024-02-01T00:00:00+01:00</updated>
  <link href="https://contrataciondelestado.es/sindicacion/licitacionesPerfilContratante.atom" rel="self"/>
"#,
        );
        if let Some(next) = &self.next {
            xml.push_str(&format!("  <link href=\"{next}\" rel=\"next\"/>\n"));
        }
        for (reference, when) in &self.tombstones {
            xml.push_str(&format!("  <at:deleted-entry ref=\"{reference}\" when=\"{when}\"/>\n"));
        }
        for entry in &self.entries {
            xml.push_str(entry);
        }
        xml.push_str("</feed>\n");
        xml
    }

    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.render()).unwrap();
        path
    }
}

/// Standard tender payload with one `TenderResult` per result code
pub fn tender(file_number: &str, result_codes: &[&str]) -> String {
    let results: String = result_codes
        .iter()
        .enumerate()
        .map(|(index, code)| {
            format!(
                r#"<cac:TenderResult>
        <cbc:ResultCode listURI="https://contrataciondelestado.es/codice/cl/2.02/TenderResultCode-2.02.gc">{code}</cbc:ResultCode>
        <cac:WinningParty><cac:PartyName><cbc:Name>Adjudicataria {index}</cbc:Name></cac:PartyName></cac:WinningParty>
      </cac:TenderResult>"#
            )
        })
        .collect();

    format!(
        r#"<cac-place-ext:ContractFolderStatus>
      <cbc:ContractFolderID>{file_number}</cbc:ContractFolderID>
      <cbc-place-ext:ContractFolderStatusCode listURI="https://contrataciondelestado.es/codice/cl/2.04/SyndicationContractFolderStatusCode-2.04.gc">ADJ</cbc-place-ext:ContractFolderStatusCode>
      <cac:ProcurementProject><cbc:Name>Objeto {file_number}</cbc:Name><cbc:TypeCode>2</cbc:TypeCode></cac:ProcurementProject>
      {results}
    </cac-place-ext:ContractFolderStatus>"#
    )
}

pub fn consultation(file_number: &str) -> String {
    format!(
        r#"<cac-place-ext:PreliminaryMarketConsultationStatus>
      <cbc:ContractFolderID>{file_number}</cbc:ContractFolderID>
      <cac:ProcurementProject><cbc:Name>Consulta {file_number}</cbc:Name></cac:ProcurementProject>
      <cac:TenderResult><cbc:ResultCode>8</cbc:ResultCode></cac:TenderResult>
    </cac-place-ext:PreliminaryMarketConsultationStatus>"#
    )
}

/// Run the synchronizer over `files` with a fresh tracker and memory sink
pub fn run(files: &[PathBuf], options: SyncOptions) -> (SyncReport, MemorySink) {
    let mut tracker = TombstoneTracker::new();
    let mut sink = MemorySink::new();
    let report = FeedSynchronizer::new(options)
        .run(files, &mut tracker, &mut sink, &CancellationToken::new())
        .expect("synchronization failed");
    (report, sink)
}

pub fn all_families(mode: ProjectionMode) -> SyncOptions {
    SyncOptions {
        mode,
        include_own_resource: true,
        include_consultations: true,
        ..SyncOptions::default()
    }
}

/// Position of the column titled `title` in `table`
pub fn column(table: Table, mode: ProjectionMode, title: &str) -> usize {
    layout(table, mode)
        .iter()
        .position(|column| column.title == title)
        .unwrap_or_else(|| panic!("no column '{title}' in {table}"))
}

/// Rendered value of one column for every row of `table`
pub fn column_values(sink: &MemorySink, table: Table, mode: ProjectionMode, title: &str) -> Vec<String> {
    let index = column(table, mode, title);
    sink.rendered(table)
        .into_iter()
        .map(|row| row[index].clone())
        .collect()
}
