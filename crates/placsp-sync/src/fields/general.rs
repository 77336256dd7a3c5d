//! General tender columns, computed from a `ContractFolderStatus` document

use super::codes;
use super::extract::{self, code_and_name, parse_date, scheme_id};
use super::{CellValue, ExtractionFault, FieldResult, FolderField};
use crate::feed::XmlNode;

/// Prior information notices do not count as a publication of the tender
const PRIOR_INFORMATION_NOTICE: &str = "DOC_PIN";

/// Funding codes naming a concrete European source
const EU_FUNDING_SOURCES: &[&str] = &["REU", "FEDER", "FSE+", "FEADER", "FEMP", "PRTR", "OFE"];

pub static FIELDS: &[FolderField] = &[
    field!("first_publication", "Primera publicación", DateShort, first_publication),
    field!("status", "Estado", Text, status),
    field!("file_number", "Número de expediente", Text, file_number),
    field!("contract_object", "Objeto del Contrato", Text, contract_object),
    field!("ted_id", "Identificador único TED", Text, ted_id),
    field!("estimated_value", "Valor estimado del contrato", Currency, estimated_value),
    field!("budget_without_taxes", "Presupuesto base sin impuestos", Currency, budget_without_taxes),
    field!("budget_with_taxes", "Presupuesto base con impuestos", Currency, budget_with_taxes),
    field!("cpv", "CPV", Text, cpv),
    field!("contract_type", "Tipo de contrato", Text, contract_type),
    field!("mixed_contract", "Contrato mixto", Boolean, mixed_contract),
    field!("place_of_execution", "Lugar de ejecución", Text, place_of_execution),
    field!("contracting_body", "Órgano de Contratación", Text, contracting_body),
    field!("platform_body_id", "ID OC en PLACSP", Text, platform_body_id),
    field!("body_nif", "NIF OC", Text, body_nif),
    field!("body_dir3", "DIR3", Text, body_dir3),
    field!("buyer_profile", "Enlace al Perfil de Contratante del OC", Text, buyer_profile),
    field!("administration_type", "Tipo de Administración", Text, administration_type),
    field!("postal_code", "Código Postal", Text, postal_code),
    field!("procedure", "Tipo de procedimiento", Text, procedure),
    field!("contracting_system", "Sistema de contratación", Text, contracting_system),
    field!("urgency", "Tramitación", Text, urgency),
    field!("submission_method", "Forma de presentación de la oferta", Text, submission_method),
    field!("tender_deadline", "Fecha de presentación de ofertas", DateLong, tender_deadline),
    field!(
        "participation_deadline",
        "Fecha de presentación de solicitudes de participación",
        DateLong,
        participation_deadline
    ),
    field!("directive", "Directiva de aplicación", Text, directive),
    field!("over_threshold", "Contrato SARA/Umbral", Boolean, over_threshold),
    field!("eu_funding", "Financiación Europea y fuente", Text, eu_funding),
    field!("eu_funding_description", "Descripción de la financiación europea", Text, eu_funding_description),
    field!("electronic_auction", "Subasta electrónica", Boolean, electronic_auction),
    field!("subcontracting", "Subcontratación permitida", Text, subcontracting),
    field!("subcontracting_rate", "Subcontratación permitida porcentaje", Number, subcontracting_rate),
];

pub(crate) fn first_publication(folder: &XmlNode) -> FieldResult {
    folder
        .children_named("ValidNoticeInfo")
        .filter(|notice| notice.text_at("NoticeTypeCode") != Some(PRIOR_INFORMATION_NOTICE))
        .flat_map(|notice| {
            notice.find_all("AdditionalPublicationStatus/AdditionalPublicationDocumentReference/IssueDate")
        })
        .filter_map(|issue| parse_date(issue.text()))
        .min()
        .map(CellValue::Date)
        .ok_or(ExtractionFault::Missing("ValidNoticeInfo"))
}

pub(crate) fn status(folder: &XmlNode) -> FieldResult {
    extract::coded(folder, "ContractFolderStatusCode", &codes::FOLDER_STATUS)
}

pub(crate) fn file_number(folder: &XmlNode) -> FieldResult {
    extract::text(folder, "ContractFolderID")
}

pub(crate) fn contract_object(folder: &XmlNode) -> FieldResult {
    extract::text(folder, "ProcurementProject/Name")
}

fn ted_id(folder: &XmlNode) -> FieldResult {
    extract::text(folder, "UUID")
}

fn estimated_value(folder: &XmlNode) -> FieldResult {
    extract::amount(folder, "ProcurementProject/BudgetAmount/EstimatedOverallContractAmount")
}

pub(crate) fn budget_without_taxes(folder: &XmlNode) -> FieldResult {
    extract::amount(folder, "ProcurementProject/BudgetAmount/TaxExclusiveAmount")
}

pub(crate) fn budget_with_taxes(folder: &XmlNode) -> FieldResult {
    extract::amount(folder, "ProcurementProject/BudgetAmount/TotalAmount")
}

pub(crate) fn cpv(folder: &XmlNode) -> FieldResult {
    extract::list(folder, "ProcurementProject/RequiredCommodityClassification/ItemClassificationCode")
}

pub(crate) fn contract_type(folder: &XmlNode) -> FieldResult {
    extract::coded(folder, "ProcurementProject/TypeCode", &codes::CONTRACT_TYPE)
}

fn mixed_contract(folder: &XmlNode) -> FieldResult {
    extract::indicator(folder, "ProcurementProject/MixContractIndicator")
}

/// Place of execution of a `ProcurementProject`, shared with lot columns
pub(crate) fn project_location(project: &XmlNode) -> FieldResult {
    let location = project
        .child("RealizedLocation")
        .ok_or(ExtractionFault::Missing("ProcurementProject/RealizedLocation"))?;

    code_and_name(
        location.text_at("CountrySubentityCode"),
        location.text_at("CountrySubentity"),
    )
    .or_else(|| {
        code_and_name(
            location.text_at("Address/Country/IdentificationCode"),
            location.text_at("Address/Country/Name"),
        )
    })
    .map(CellValue::Text)
    .ok_or(ExtractionFault::Missing("ProcurementProject/RealizedLocation"))
}

pub(crate) fn place_of_execution(folder: &XmlNode) -> FieldResult {
    let project = folder
        .child("ProcurementProject")
        .ok_or(ExtractionFault::Missing("ProcurementProject"))?;
    project_location(project)
}

pub(crate) fn contracting_body(folder: &XmlNode) -> FieldResult {
    extract::text(folder, "LocatedContractingParty/Party/PartyName/Name")
}

fn contracting_party(folder: &XmlNode) -> Result<&XmlNode, ExtractionFault> {
    folder
        .find("LocatedContractingParty/Party")
        .ok_or(ExtractionFault::Missing("LocatedContractingParty/Party"))
}

/// Platform id of the body: `ID_PLATAFORMA` for bodies hosted on the platform,
/// `<agent id>-<ID_OC_PLAT>` for bodies published through an aggregated platform
pub(crate) fn platform_body_id(folder: &XmlNode) -> FieldResult {
    let party = contracting_party(folder)?;

    if let Some(id) = scheme_id(party, "ID_PLATAFORMA") {
        return Ok(CellValue::text(id));
    }

    let local_id = scheme_id(party, "ID_OC_PLAT")
        .ok_or(ExtractionFault::Missing("PartyIdentification/ID[@schemeName]"))?;
    let agent_id = party
        .text_at("AgentParty/PartyIdentification/ID")
        .ok_or(ExtractionFault::Missing("AgentParty/PartyIdentification/ID"))?;

    Ok(CellValue::Text(format!("{agent_id}-{local_id}")))
}

pub(crate) fn body_nif(folder: &XmlNode) -> FieldResult {
    scheme_id(contracting_party(folder)?, "NIF")
        .map(CellValue::text)
        .ok_or(ExtractionFault::Missing("PartyIdentification/ID[@schemeName=NIF]"))
}

pub(crate) fn body_dir3(folder: &XmlNode) -> FieldResult {
    scheme_id(contracting_party(folder)?, "DIR3")
        .map(CellValue::text)
        .ok_or(ExtractionFault::Missing("PartyIdentification/ID[@schemeName=DIR3]"))
}

pub(crate) fn buyer_profile(folder: &XmlNode) -> FieldResult {
    extract::text(folder, "LocatedContractingParty/BuyerProfileURIID")
}

pub(crate) fn administration_type(folder: &XmlNode) -> FieldResult {
    extract::coded(
        folder,
        "LocatedContractingParty/ContractingPartyTypeCode",
        &codes::AUTHORITY_TYPE,
    )
}

pub(crate) fn postal_code(folder: &XmlNode) -> FieldResult {
    extract::text(folder, "LocatedContractingParty/Party/PostalAddress/PostalZone")
}

fn procedure(folder: &XmlNode) -> FieldResult {
    extract::coded(folder, "TenderingProcess/ProcedureCode", &codes::PROCEDURE)
}

fn contracting_system(folder: &XmlNode) -> FieldResult {
    extract::coded(folder, "TenderingProcess/ContractingSystemCode", &codes::CONTRACTING_SYSTEM)
}

fn urgency(folder: &XmlNode) -> FieldResult {
    extract::coded(folder, "TenderingProcess/UrgencyCode", &codes::URGENCY)
}

fn submission_method(folder: &XmlNode) -> FieldResult {
    extract::coded(folder, "TenderingProcess/SubmissionMethodCode", &codes::SUBMISSION_METHOD)
}

fn tender_deadline(folder: &XmlNode) -> FieldResult {
    extract::date_time(
        folder,
        "TenderingProcess/TenderSubmissionDeadlinePeriod/EndDate",
        "TenderingProcess/TenderSubmissionDeadlinePeriod/EndTime",
    )
}

fn participation_deadline(folder: &XmlNode) -> FieldResult {
    extract::date_time(
        folder,
        "TenderingProcess/ParticipationRequestReceptionPeriod/EndDate",
        "TenderingProcess/ParticipationRequestReceptionPeriod/EndTime",
    )
}

fn directive(folder: &XmlNode) -> FieldResult {
    extract::text(folder, "TenderingTerms/ProcurementLegislationDocumentReference/ID")
}

fn over_threshold(folder: &XmlNode) -> FieldResult {
    extract::indicator(folder, "TenderingProcess/OverThresholdIndicator")
}

/// `Sí`/`No` from the EU / NO-EU codes, followed by ` - <source>` when a
/// concrete European fund is named
fn eu_funding(folder: &XmlNode) -> FieldResult {
    let program_codes: Vec<&str> = folder
        .find_all("TenderingTerms/FundingProgramCode")
        .into_iter()
        .map(XmlNode::text)
        .collect();
    if program_codes.is_empty() {
        return Err(ExtractionFault::Missing("TenderingTerms/FundingProgramCode"));
    }

    let mut funded = String::new();
    let mut source = String::new();
    for code in program_codes {
        match code {
            "EU" => funded = "Sí".to_string(),
            "NO-EU" => funded = "No".to_string(),
            _ if EU_FUNDING_SOURCES.contains(&code) => source = codes::FUNDING_PROGRAM.label(code),
            _ => {},
        }
    }

    if !source.is_empty() {
        funded.push_str(" - ");
        funded.push_str(&source);
    }
    Ok(CellValue::Text(funded))
}

fn eu_funding_description(folder: &XmlNode) -> FieldResult {
    extract::text(folder, "TenderingTerms/FundingProgram")
}

fn electronic_auction(folder: &XmlNode) -> FieldResult {
    extract::indicator(folder, "TenderingProcess/AuctionTerms/AuctionConstraintIndicator")
}

fn subcontracting(folder: &XmlNode) -> FieldResult {
    extract::text(folder, "TenderingTerms/AllowedSubcontractTerms/Description")
}

fn subcontracting_rate(folder: &XmlNode) -> FieldResult {
    extract::amount(folder, "TenderingTerms/AllowedSubcontractTerms/Rate")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::fields::{Cell, FormatKind};
    use chrono::NaiveDate;

    const FOLDER: &str = r#"<ContractFolderStatus>
  <ContractFolderID>2024/000123</ContractFolderID>
  <ContractFolderStatusCode>PUB</ContractFolderStatusCode>
  <UUID>2024-512345</UUID>
  <LocatedContractingParty>
    <ContractingPartyTypeCode>3</ContractingPartyTypeCode>
    <BuyerProfileURIID>https://contrataciondelestado.es/perfil/ayto</BuyerProfileURIID>
    <Party>
      <PartyIdentification><ID schemeName="ID_OC_PLAT">77</ID></PartyIdentification>
      <PartyIdentification><ID schemeName="NIF">P2800000A</ID></PartyIdentification>
      <PartyName><Name>Ayuntamiento de Ejemplo</Name></PartyName>
      <PostalAddress><PostalZone>28001</PostalZone></PostalAddress>
      <AgentParty><PartyIdentification><ID>PLAT9</ID></PartyIdentification></AgentParty>
    </Party>
  </LocatedContractingParty>
  <ProcurementProject>
    <Name>Suministro de material escolar</Name>
    <TypeCode>1</TypeCode>
    <MixContractIndicator>false</MixContractIndicator>
    <BudgetAmount>
      <EstimatedOverallContractAmount currencyID="EUR">50000</EstimatedOverallContractAmount>
      <TotalAmount currencyID="EUR">60500</TotalAmount>
      <TaxExclusiveAmount currencyID="EUR">50000</TaxExclusiveAmount>
    </BudgetAmount>
    <RequiredCommodityClassification><ItemClassificationCode>30192000</ItemClassificationCode></RequiredCommodityClassification>
    <RealizedLocation>
      <Address><Country><IdentificationCode>ES</IdentificationCode><Name>España</Name></Country></Address>
    </RealizedLocation>
  </ProcurementProject>
  <TenderingTerms>
    <FundingProgramCode>EU</FundingProgramCode>
    <FundingProgramCode>PRTR</FundingProgramCode>
    <FundingProgram>Componente 19</FundingProgram>
  </TenderingTerms>
  <TenderingProcess>
    <ProcedureCode>1</ProcedureCode>
    <OverThresholdIndicator>true</OverThresholdIndicator>
  </TenderingProcess>
  <ValidNoticeInfo>
    <NoticeTypeCode>DOC_PIN</NoticeTypeCode>
    <AdditionalPublicationStatus><AdditionalPublicationDocumentReference><IssueDate>2023-11-01</IssueDate></AdditionalPublicationDocumentReference></AdditionalPublicationStatus>
  </ValidNoticeInfo>
  <ValidNoticeInfo>
    <NoticeTypeCode>DOC_CN</NoticeTypeCode>
    <AdditionalPublicationStatus><AdditionalPublicationDocumentReference><IssueDate>2024-01-20</IssueDate></AdditionalPublicationDocumentReference></AdditionalPublicationStatus>
    <AdditionalPublicationStatus><AdditionalPublicationDocumentReference><IssueDate>2024-01-18</IssueDate></AdditionalPublicationDocumentReference></AdditionalPublicationStatus>
  </ValidNoticeInfo>
</ContractFolderStatus>"#;

    fn cell(key: &str) -> Cell {
        let folder = XmlNode::parse_str(FOLDER).unwrap();
        let spec = FIELDS.iter().find(|spec| spec.key == key).unwrap();
        spec.cell(Some(&folder))
    }

    #[test]
    fn test_first_publication_skips_prior_information_notices() {
        assert_eq!(
            cell("first_publication").value,
            CellValue::Date(NaiveDate::from_ymd_opt(2024, 1, 18).unwrap())
        );
    }

    #[test]
    fn test_coded_and_plain_columns() {
        assert_eq!(cell("status").render(), "En plazo");
        assert_eq!(cell("contract_type").render(), "Suministros");
        assert_eq!(cell("administration_type").render(), "Administración Local");
        assert_eq!(cell("file_number").render(), "2024/000123");
        assert_eq!(cell("cpv").render(), "30192000;");
    }

    #[test]
    fn test_aggregated_platform_body_id() {
        assert_eq!(cell("platform_body_id").render(), "PLAT9-77");
        assert_eq!(cell("body_nif").render(), "P2800000A");
        assert!(cell("body_dir3").value.is_null());
    }

    #[test]
    fn test_place_falls_back_to_country() {
        assert_eq!(cell("place_of_execution").render(), "ES - España");
    }

    #[test]
    fn test_eu_funding_with_source() {
        assert_eq!(
            cell("eu_funding").render(),
            "Sí - Plan de Recuperación, Transformación y Resiliencia"
        );
    }

    #[test]
    fn test_amounts_and_indicators() {
        assert_eq!(cell("budget_with_taxes").render(), "60500.00");
        assert_eq!(cell("mixed_contract").render(), "No");
        assert_eq!(cell("over_threshold").render(), "Sí");
        assert!(cell("electronic_auction").value.is_null());
    }

    #[test]
    fn test_missing_values_are_empty_cells() {
        assert!(cell("directive").value.is_null());
        assert!(cell("tender_deadline").value.is_null());
        assert_eq!(cell("tender_deadline").format, FormatKind::DateLong);
    }
}
