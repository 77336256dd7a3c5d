//! Row projection: record + status + family → rows routed to output tables
//!
//! Every row starts with four fixed columns (short id, link, display timestamp,
//! status label) followed by the family's field columns. Standard tenders fan
//! out over their tender results:
//!
//! | mode       | results | rows                                              |
//! |------------|---------|---------------------------------------------------|
//! | two tables | n       | 1 general row + n rows in the results table       |
//! | combined   | n ≥ 1   | n rows, general columns repeated                  |
//! | combined   | 0       | 1 row with empty result columns                   |

use crate::classify::RecordFamily;
use crate::feed::Record;
use crate::fields::{self, results, Cell, CellValue, FormatKind, ResultScope};
use crate::status::EffectiveStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output table (one sheet of the workbook)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Table {
    Tenders,
    Results,
    OwnResource,
    Consultations,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Tenders => "Licitaciones",
            Table::Results => "Resultados",
            Table::OwnResource => "Encargos a medios propios",
            Table::Consultations => "Consultas Preliminares",
        }
    }

    fn link_title(self) -> &'static str {
        match self {
            Table::Tenders | Table::Results => "Link licitación",
            Table::OwnResource => "Link Encargo",
            Table::Consultations => "Link Consulta",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionMode {
    /// General data and results in separate tables
    #[default]
    TwoTables,
    /// One table, general columns repeated for every result
    Combined,
}

impl std::str::FromStr for ProjectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "two_tables" => Ok(ProjectionMode::TwoTables),
            "combined" => Ok(ProjectionMode::Combined),
            other => Err(format!("Invalid projection mode: {other}")),
        }
    }
}

/// Column header with its format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub title: &'static str,
    pub format: FormatKind,
}

/// Ordered cells matching a table layout
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProjectedRow {
    pub cells: Vec<Cell>,
}

impl ProjectedRow {
    pub fn render(&self) -> Vec<String> {
        self.cells.iter().map(Cell::render).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutedRow {
    pub table: Table,
    pub row: ProjectedRow,
}

/// Tables present in a workbook for the given mode and inclusion flags
pub fn workbook_tables(mode: ProjectionMode, include_own_resource: bool, include_consultations: bool) -> Vec<Table> {
    let mut tables = vec![Table::Tenders];
    if mode == ProjectionMode::TwoTables {
        tables.push(Table::Results);
    }
    if include_own_resource {
        tables.push(Table::OwnResource);
    }
    if include_consultations {
        tables.push(Table::Consultations);
    }
    tables
}

fn fixed_columns(table: Table) -> [Column; 4] {
    [
        Column { title: "Identificador", format: FormatKind::Text },
        Column { title: table.link_title(), format: FormatKind::Text },
        Column { title: "Fecha actualización", format: FormatKind::DateLong },
        Column { title: "Vigente/Anulada/Archivada", format: FormatKind::Text },
    ]
}

/// Header layout of `table` under `mode`
pub fn layout(table: Table, mode: ProjectionMode) -> Vec<Column> {
    let mut columns = fixed_columns(table).to_vec();
    let folder_columns = |family| {
        fields::folder_fields(family)
            .iter()
            .map(|spec| Column { title: spec.title, format: spec.format })
    };
    let result_columns = || {
        fields::result_fields()
            .iter()
            .map(|spec| Column { title: spec.title, format: spec.format })
    };

    match table {
        Table::Tenders => {
            columns.extend(folder_columns(RecordFamily::StandardTender));
            if mode == ProjectionMode::Combined {
                columns.extend(result_columns());
            }
        },
        Table::Results => columns.extend(result_columns()),
        Table::OwnResource => columns.extend(folder_columns(RecordFamily::OwnResourceAssignment)),
        Table::Consultations => columns.extend(folder_columns(RecordFamily::PreliminaryConsultation)),
    }

    columns
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RowProjector {
    mode: ProjectionMode,
}

impl RowProjector {
    pub fn new(mode: ProjectionMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ProjectionMode {
        self.mode
    }

    pub fn project(&self, record: &Record, status: &EffectiveStatus, family: RecordFamily) -> Vec<RoutedRow> {
        match family {
            RecordFamily::PreliminaryConsultation => {
                vec![self.single(record, status, family, Table::Consultations)]
            },
            RecordFamily::OwnResourceAssignment => {
                vec![self.single(record, status, family, Table::OwnResource)]
            },
            RecordFamily::StandardTender => self.project_tender(record, status),
        }
    }

    fn single(&self, record: &Record, status: &EffectiveStatus, family: RecordFamily, table: Table) -> RoutedRow {
        let mut cells = fixed_cells(record, status);
        cells.extend(folder_cells(record, family));
        RoutedRow {
            table,
            row: ProjectedRow { cells },
        }
    }

    fn project_tender(&self, record: &Record, status: &EffectiveStatus) -> Vec<RoutedRow> {
        let scopes: Vec<ResultScope<'_>> = record
            .payload
            .as_ref()
            .map(|folder| {
                results::tender_results(folder)
                    .into_iter()
                    .map(|result| ResultScope { folder, result })
                    .collect()
            })
            .unwrap_or_default();

        let fixed = fixed_cells(record, status);
        let general = folder_cells(record, RecordFamily::StandardTender);

        match self.mode {
            ProjectionMode::TwoTables => {
                let mut rows = Vec::with_capacity(scopes.len() + 1);
                rows.push(RoutedRow {
                    table: Table::Tenders,
                    row: ProjectedRow {
                        cells: fixed.iter().cloned().chain(general).collect(),
                    },
                });
                rows.extend(scopes.iter().map(|scope| RoutedRow {
                    table: Table::Results,
                    row: ProjectedRow {
                        cells: fixed.iter().cloned().chain(result_cells(Some(scope))).collect(),
                    },
                }));
                rows
            },
            ProjectionMode::Combined if scopes.is_empty() => vec![RoutedRow {
                table: Table::Tenders,
                row: ProjectedRow {
                    cells: fixed.into_iter().chain(general).chain(result_cells(None)).collect(),
                },
            }],
            ProjectionMode::Combined => scopes
                .iter()
                .map(|scope| RoutedRow {
                    table: Table::Tenders,
                    row: ProjectedRow {
                        cells: fixed
                            .iter()
                            .cloned()
                            .chain(general.iter().cloned())
                            .chain(result_cells(Some(scope)))
                            .collect(),
                    },
                })
                .collect(),
        }
    }
}

fn fixed_cells(record: &Record, status: &EffectiveStatus) -> Vec<Cell> {
    vec![
        Cell::new(CellValue::text(record.short_id()), FormatKind::Text),
        Cell::new(CellValue::text(record.first_link()), FormatKind::Text),
        Cell::new(
            CellValue::DateTime(status.display_timestamp.naive_local()),
            FormatKind::DateLong,
        ),
        Cell::new(CellValue::text(status.kind.label()), FormatKind::Text),
    ]
}

fn folder_cells(record: &Record, family: RecordFamily) -> Vec<Cell> {
    fields::folder_fields(family)
        .iter()
        .map(|spec| spec.cell(record.payload.as_ref()))
        .collect()
}

fn result_cells(scope: Option<&ResultScope<'_>>) -> Vec<Cell> {
    fields::result_fields()
        .iter()
        .map(|spec| spec.result_cell(scope))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::feed::XmlNode;
    use crate::status::{ArchivalPolicy, StatusResolver};
    use chrono::DateTime;

    fn tender(result_codes: &[&str]) -> Record {
        let mut folder = XmlNode::new("ContractFolderStatus")
            .with_child(XmlNode::new("ContractFolderID").with_text("EXP-42"));
        for (i, code) in result_codes.iter().enumerate() {
            folder = folder.with_child(
                XmlNode::new("TenderResult")
                    .with_child(XmlNode::new("ResultCode").with_text(*code))
                    .with_child(
                        XmlNode::new("WinningParty").with_child(
                            XmlNode::new("PartyName")
                                .with_child(XmlNode::new("Name").with_text(format!("Winner {i}"))),
                        ),
                    ),
            );
        }
        Record {
            id: "https://contrataciondelestado.es/sindicacion/licitacionesPerfilContratante/9001".into(),
            updated: DateTime::parse_from_rfc3339("2024-02-01T10:15:00+01:00").unwrap(),
            links: vec!["https://contrataciondelestado.es/detalle/9001".into()],
            payload: Some(folder),
        }
    }

    fn current(record: &Record) -> EffectiveStatus {
        StatusResolver::new(ArchivalPolicy::Calendar).resolve(record, None)
    }

    fn column_of(table: Table, mode: ProjectionMode, title: &str) -> usize {
        layout(table, mode).iter().position(|c| c.title == title).unwrap()
    }

    #[test]
    fn test_fixed_columns_lead_every_row() {
        let record = tender(&[]);
        let rows = RowProjector::new(ProjectionMode::TwoTables).project(
            &record,
            &current(&record),
            RecordFamily::StandardTender,
        );

        assert_eq!(rows.len(), 1);
        let rendered = rows[0].row.render();
        assert_eq!(rendered[0], "9001");
        assert_eq!(rendered[1], "https://contrataciondelestado.es/detalle/9001");
        assert_eq!(rendered[2], "01/02/2024 10:15");
        assert_eq!(rendered[3], "VIGENTE");
    }

    #[test]
    fn test_two_tables_fan_out() {
        let record = tender(&["8", "9", "3"]);
        let rows = RowProjector::new(ProjectionMode::TwoTables).project(
            &record,
            &current(&record),
            RecordFamily::StandardTender,
        );

        let tables: Vec<Table> = rows.iter().map(|r| r.table).collect();
        assert_eq!(tables, vec![Table::Tenders, Table::Results, Table::Results, Table::Results]);
        assert_eq!(rows[0].row.cells.len(), layout(Table::Tenders, ProjectionMode::TwoTables).len());
        assert_eq!(rows[1].row.cells.len(), layout(Table::Results, ProjectionMode::TwoTables).len());
    }

    #[test]
    fn test_combined_repeats_general_columns_per_result() {
        let record = tender(&["8", "9", "3"]);
        let rows = RowProjector::new(ProjectionMode::Combined).project(
            &record,
            &current(&record),
            RecordFamily::StandardTender,
        );

        assert_eq!(rows.len(), 3);
        let file_col = column_of(Table::Tenders, ProjectionMode::Combined, "Número de expediente");
        let winner_col = column_of(Table::Tenders, ProjectionMode::Combined, "Adjudicatario licitación/lote");

        let rendered: Vec<Vec<String>> = rows.iter().map(|r| r.row.render()).collect();
        assert!(rendered.iter().all(|r| r[file_col] == "EXP-42"));
        let width = layout(Table::Tenders, ProjectionMode::Combined).len();
        assert!(rendered.iter().all(|r| r.len() == width));
        let winners: Vec<&str> = rendered.iter().map(|r| r[winner_col].as_str()).collect();
        assert_eq!(winners, vec!["Winner 0", "Winner 1", "Winner 2"]);
    }

    #[test]
    fn test_combined_without_results_keeps_one_row() {
        let record = tender(&[]);
        let rows = RowProjector::new(ProjectionMode::Combined).project(
            &record,
            &current(&record),
            RecordFamily::StandardTender,
        );

        assert_eq!(rows.len(), 1);
        let layout = layout(Table::Tenders, ProjectionMode::Combined);
        assert_eq!(rows[0].row.cells.len(), layout.len());
        let result_start = layout.len() - fields::result_fields().len();
        assert!(rows[0].row.cells[result_start..].iter().all(|c| c.value.is_null()));
    }

    #[test]
    fn test_other_families_yield_single_row() {
        let record = tender(&["11", "8"]);
        let status = current(&record);
        let projector = RowProjector::new(ProjectionMode::Combined);

        let own = projector.project(&record, &status, RecordFamily::OwnResourceAssignment);
        let cpm = projector.project(&record, &status, RecordFamily::PreliminaryConsultation);

        assert_eq!(own.len(), 1);
        assert_eq!(own[0].table, Table::OwnResource);
        assert_eq!(cpm.len(), 1);
        assert_eq!(cpm[0].table, Table::Consultations);
        assert_eq!(layout(Table::OwnResource, ProjectionMode::Combined)[1].title, "Link Encargo");
    }

    #[test]
    fn test_workbook_tables() {
        assert_eq!(
            workbook_tables(ProjectionMode::TwoTables, false, false),
            vec![Table::Tenders, Table::Results]
        );
        assert_eq!(
            workbook_tables(ProjectionMode::Combined, true, true),
            vec![Table::Tenders, Table::OwnResource, Table::Consultations]
        );
    }
}
