//! Record family classification

use crate::feed::{Record, XmlNode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Root element of preliminary market consultation documents
pub const CONSULTATION_ROOT: &str = "PreliminaryMarketConsultationStatus";

/// Result code used for assignments to an entity's own resources
pub const OWN_RESOURCE_RESULT_CODE: &str = "11";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordFamily {
    PreliminaryConsultation,
    OwnResourceAssignment,
    StandardTender,
}

impl RecordFamily {
    pub const ALL: [RecordFamily; 3] = [
        RecordFamily::StandardTender,
        RecordFamily::OwnResourceAssignment,
        RecordFamily::PreliminaryConsultation,
    ];
}

impl fmt::Display for RecordFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordFamily::PreliminaryConsultation => "preliminary_consultation",
            RecordFamily::OwnResourceAssignment => "own_resource_assignment",
            RecordFamily::StandardTender => "standard_tender",
        };
        f.write_str(name)
    }
}

/// Assign a family from the embedded payload; never fails
///
/// A consultation stays a consultation even when it carries tender results.
pub fn classify(record: &Record) -> RecordFamily {
    record
        .payload
        .as_ref()
        .map_or(RecordFamily::StandardTender, classify_payload)
}

pub fn classify_payload(payload: &XmlNode) -> RecordFamily {
    if payload.name() == CONSULTATION_ROOT {
        return RecordFamily::PreliminaryConsultation;
    }

    let first_result_code = payload
        .child("TenderResult")
        .and_then(|result| result.child("ResultCode"))
        .map(XmlNode::text);

    if first_result_code == Some(OWN_RESOURCE_RESULT_CODE) {
        RecordFamily::OwnResourceAssignment
    } else {
        RecordFamily::StandardTender
    }
}
