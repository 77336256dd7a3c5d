//! Append-only row sinks
//!
//! The workbook itself is out of scope; a sink only has to keep rows in
//! insertion order per table. [`CsvSink`] writes one delimited file per table,
//! [`MemorySink`] keeps rows for inspection.

use crate::error::SinkError;
use crate::projection::{layout, ProjectedRow, ProjectionMode, RoutedRow, Table};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

pub trait SheetSink {
    fn append_row(&mut self, table: Table, row: ProjectedRow) -> Result<(), SinkError>;

    /// Append every row of one record; shared sinks keep the batch contiguous
    fn append_rows(&mut self, rows: Vec<RoutedRow>) -> Result<(), SinkError> {
        for routed in rows {
            self.append_row(routed.table, routed.row)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Rows kept in memory, grouped by table
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MemorySink {
    tables: BTreeMap<Table, Vec<ProjectedRow>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self, table: Table) -> &[ProjectedRow] {
        self.tables.get(&table).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn row_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    /// Rendered text of every row of `table`
    pub fn rendered(&self, table: Table) -> Vec<Vec<String>> {
        self.rows(table).iter().map(ProjectedRow::render).collect()
    }
}

impl SheetSink for MemorySink {
    fn append_row(&mut self, table: Table, row: ProjectedRow) -> Result<(), SinkError> {
        self.tables.entry(table).or_default().push(row);
        Ok(())
    }
}

/// One CSV file per table, named `<workbook>_<table>.csv`, header row first
pub struct CsvSink {
    dir: PathBuf,
    writers: HashMap<Table, csv::Writer<File>>,
    written: HashMap<Table, usize>,
}

impl CsvSink {
    pub fn create(
        dir: &Path,
        workbook: &str,
        tables: &[Table],
        mode: ProjectionMode,
    ) -> Result<Self, SinkError> {
        std::fs::create_dir_all(dir)?;

        let mut writers = HashMap::new();
        for &table in tables {
            let path = dir.join(table_file_name(workbook, table));
            let mut writer = csv::Writer::from_path(&path)?;
            writer.write_record(layout(table, mode).iter().map(|column| column.title))?;
            debug!(path = %path.display(), table = %table, "Opened table output");
            writers.insert(table, writer);
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            writers,
            written: HashMap::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn rows_written(&self, table: Table) -> usize {
        self.written.get(&table).copied().unwrap_or(0)
    }
}

impl SheetSink for CsvSink {
    fn append_row(&mut self, table: Table, row: ProjectedRow) -> Result<(), SinkError> {
        let writer = self
            .writers
            .get_mut(&table)
            .ok_or_else(|| SinkError::UnknownTable(table.name().to_string()))?;
        writer.write_record(row.render())?;
        *self.written.entry(table).or_default() += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        for writer in self.writers.values_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

/// A sink shared by concurrent channel workers; one lock per call
impl<S: SheetSink + ?Sized> SheetSink for &Mutex<S> {
    fn append_row(&mut self, table: Table, row: ProjectedRow) -> Result<(), SinkError> {
        self.lock().map_err(|_| SinkError::Poisoned)?.append_row(table, row)
    }

    fn append_rows(&mut self, rows: Vec<RoutedRow>) -> Result<(), SinkError> {
        self.lock().map_err(|_| SinkError::Poisoned)?.append_rows(rows)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.lock().map_err(|_| SinkError::Poisoned)?.flush()
    }
}

pub fn table_file_name(workbook: &str, table: Table) -> String {
    format!("{}_{}.csv", workbook, table.name().replace(' ', "_"))
}
