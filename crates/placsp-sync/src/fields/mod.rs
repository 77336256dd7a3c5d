//! Field catalogue: ordered, typed column definitions per record family
//!
//! Every column is a [`FieldSpec`] entry in a static table. Extractors return
//! [`FieldResult`]; [`coerce`] is the only place a fault turns into an empty
//! cell, so extractors never need their own fallback logic.
//!
//! ```rust,ignore
//! use placsp_sync::fields::{general, coerce};
//!
//! for spec in general::FIELDS {
//!     let cell = spec.cell(Some(&payload));
//!     println!("{} = {}", spec.title, cell.render());
//! }
//! ```

/// Static table entry; the extractor is coerced to the table's function pointer type
///
/// `field!(key, title, Format, extractor)` builds a [`FolderField`],
/// `field!(result: key, title, Format, extractor)` a [`ResultField`].
macro_rules! field {
    (result: $key:literal, $title:literal, $format:ident, $extract:expr) => {
        $crate::fields::FieldSpec {
            key: $key,
            title: $title,
            format: $crate::fields::FormatKind::$format,
            extract: $extract as fn(&$crate::fields::ResultScope<'_>) -> $crate::fields::FieldResult,
        }
    };
    ($key:literal, $title:literal, $format:ident, $extract:expr) => {
        $crate::fields::FieldSpec {
            key: $key,
            title: $title,
            format: $crate::fields::FormatKind::$format,
            extract: $extract as fn(&$crate::feed::XmlNode) -> $crate::fields::FieldResult,
        }
    };
}

pub mod codes;
pub mod consultation;
pub mod extract;
pub mod general;
pub mod own_resource;
pub mod results;

use crate::classify::RecordFamily;
use crate::feed::XmlNode;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a cell is rendered in the sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FormatKind {
    Text,
    Number,
    Currency,
    DateShort,
    DateLong,
    Boolean,
}

/// Typed cell content
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Bool(bool),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub format: FormatKind,
}

impl Cell {
    pub fn new(value: CellValue, format: FormatKind) -> Self {
        Self { value, format }
    }

    pub fn empty(format: FormatKind) -> Self {
        Self::new(CellValue::Null, format)
    }

    /// Sheet text for this cell, driven by its format kind
    pub fn render(&self) -> String {
        match (&self.value, self.format) {
            (CellValue::Null, _) => String::new(),
            (CellValue::Number(n), FormatKind::Currency) => format!("{n:.2}"),
            (CellValue::Number(n), _) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{n:.0}"),
            (CellValue::Number(n), _) => n.to_string(),
            (CellValue::Date(d), _) => d.format("%d/%m/%Y").to_string(),
            (CellValue::DateTime(dt), FormatKind::DateShort) => dt.format("%d/%m/%Y").to_string(),
            (CellValue::DateTime(dt), _) => dt.format("%d/%m/%Y %H:%M").to_string(),
            (CellValue::Bool(true), _) => "Sí".to_string(),
            (CellValue::Bool(false), _) => "No".to_string(),
            (CellValue::Text(t), _) => t.clone(),
        }
    }
}

/// Why a field could not be extracted; never reaches the output
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionFault {
    #[error("no payload to extract from")]
    NoPayload,

    #[error("no value at {0}")]
    Missing(&'static str),

    #[error("unparseable value '{value}' at {path}")]
    Invalid { path: &'static str, value: String },
}

pub type FieldResult = Result<CellValue, ExtractionFault>;

/// Turn an extraction outcome into a cell, faults becoming empty cells
pub fn coerce(result: FieldResult, format: FormatKind) -> Cell {
    match result {
        Ok(value) => Cell::new(value, format),
        Err(fault) => {
            tracing::trace!(%fault, "Field left empty");
            Cell::empty(format)
        },
    }
}

/// One column definition; `E` is the extractor signature
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec<E> {
    pub key: &'static str,
    pub title: &'static str,
    pub format: FormatKind,
    pub extract: E,
}

/// Column computed from the whole procurement document
pub type FolderField = FieldSpec<fn(&XmlNode) -> FieldResult>;

/// Column computed from one tender result within its document
pub type ResultField = FieldSpec<fn(&ResultScope<'_>) -> FieldResult>;

/// A tender result together with the document that contains it
#[derive(Debug, Clone, Copy)]
pub struct ResultScope<'a> {
    pub folder: &'a XmlNode,
    pub result: &'a XmlNode,
}

impl FieldSpec<fn(&XmlNode) -> FieldResult> {
    pub fn cell(&self, payload: Option<&XmlNode>) -> Cell {
        let result = payload.ok_or(ExtractionFault::NoPayload).and_then(self.extract);
        coerce(result, self.format)
    }
}

impl FieldSpec<fn(&ResultScope<'_>) -> FieldResult> {
    pub fn result_cell(&self, scope: Option<&ResultScope<'_>>) -> Cell {
        let result = scope.ok_or(ExtractionFault::NoPayload).and_then(self.extract);
        coerce(result, self.format)
    }
}

/// Document-level columns for a family, in output order
pub fn folder_fields(family: RecordFamily) -> &'static [FolderField] {
    match family {
        RecordFamily::StandardTender => general::FIELDS,
        RecordFamily::OwnResourceAssignment => own_resource::FIELDS,
        RecordFamily::PreliminaryConsultation => consultation::FIELDS,
    }
}

/// Per-result columns of standard tenders, in output order
pub fn result_fields() -> &'static [ResultField] {
    results::FIELDS
}

/// Find a document-level column by key within a family
pub fn lookup(family: RecordFamily, key: &str) -> Option<&'static FolderField> {
    folder_fields(family).iter().find(|spec| spec.key == key)
}
