//! Columns for preliminary market consultations
//!
//! Consultation documents reuse the contracting party and project blocks of
//! tenders and add their own terms block.

use super::codes;
use super::extract;
use super::general;
use super::{FieldResult, FolderField};
use crate::feed::XmlNode;

pub static FIELDS: &[FolderField] = &[
    field!("first_publication", "Primera publicación", DateShort, general::first_publication),
    field!("consultation_status", "Estado", Text, consultation_status),
    field!("file_number", "Número de expediente", Text, general::file_number),
    field!("consultation_object", "Objeto de la consulta", Text, general::contract_object),
    field!("consultation_type", "Tipo de consulta", Text, consultation_type),
    field!("contract_type", "Tipo de contrato", Text, general::contract_type),
    field!("cpv", "CPV", Text, general::cpv),
    field!("contracting_body", "Órgano de Contratación", Text, general::contracting_body),
    field!("platform_body_id", "ID OC en PLACSP", Text, general::platform_body_id),
    field!("body_nif", "NIF OC", Text, general::body_nif),
    field!("body_dir3", "DIR3", Text, general::body_dir3),
    field!("buyer_profile", "Enlace al Perfil de Contratante del OC", Text, general::buyer_profile),
    field!("administration_type", "Tipo de Administración", Text, general::administration_type),
    field!("start_date", "Fecha de inicio de la consulta", DateShort, start_date),
    field!("response_deadline", "Fecha límite de respuesta", DateLong, response_deadline),
    field!("future_tender_planned", "Licitación futura prevista", Boolean, future_tender_planned),
    field!("consultation_url", "Enlace a la consulta", Text, consultation_url),
];

fn consultation_status(folder: &XmlNode) -> FieldResult {
    extract::coded(
        folder,
        "PreliminaryMarketConsultationStatusCode",
        &codes::CONSULTATION_STATUS,
    )
}

fn consultation_type(folder: &XmlNode) -> FieldResult {
    extract::coded(
        folder,
        "PreliminaryMarketConsultationTerms/TypeCode",
        &codes::CONSULTATION_TYPE,
    )
}

fn start_date(folder: &XmlNode) -> FieldResult {
    extract::date(folder, "PreliminaryMarketConsultationTerms/StartDate")
}

fn response_deadline(folder: &XmlNode) -> FieldResult {
    extract::date_time(
        folder,
        "PreliminaryMarketConsultationTerms/LimitDate",
        "PreliminaryMarketConsultationTerms/LimitTime",
    )
}

fn future_tender_planned(folder: &XmlNode) -> FieldResult {
    extract::indicator(folder, "PreliminaryMarketConsultationTerms/FutureTenderIndicator")
}

fn consultation_url(folder: &XmlNode) -> FieldResult {
    extract::text(folder, "PreliminaryMarketConsultationTerms/ExternalReference/URI")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_consultation_terms() {
        let doc = XmlNode::parse_str(
            r#"<PreliminaryMarketConsultationStatus>
  <ContractFolderID>CPM-2024-3</ContractFolderID>
  <PreliminaryMarketConsultationStatusCode>1</PreliminaryMarketConsultationStatusCode>
  <PreliminaryMarketConsultationTerms>
    <TypeCode>1</TypeCode>
    <StartDate>2024-06-01</StartDate>
    <LimitDate>2024-06-30</LimitDate>
    <LimitTime>23:59:00</LimitTime>
  </PreliminaryMarketConsultationTerms>
</PreliminaryMarketConsultationStatus>"#,
        )
        .unwrap();

        let render = |key: &str| {
            FIELDS
                .iter()
                .find(|spec| spec.key == key)
                .unwrap()
                .cell(Some(&doc))
                .render()
        };

        assert_eq!(render("file_number"), "CPM-2024-3");
        assert_eq!(render("consultation_status"), "Abierta");
        assert_eq!(render("consultation_type"), "Abierta a cualquier interesado");
        assert_eq!(render("start_date"), "01/06/2024");
        assert_eq!(render("response_deadline"), "30/06/2024 23:59");
        assert_eq!(render("consultation_url"), "");
    }
}
