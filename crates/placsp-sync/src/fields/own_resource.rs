//! Columns for assignments to an entity's own resources
//!
//! These documents share the tender layout; the award of the first result
//! names the own resource that receives the assignment.

use super::extract;
use super::general;
use super::{FieldResult, FolderField};
use crate::feed::XmlNode;

pub static FIELDS: &[FolderField] = &[
    field!("first_publication", "Primera publicación", DateShort, general::first_publication),
    field!("status", "Estado", Text, general::status),
    field!("file_number", "Número de expediente", Text, general::file_number),
    field!("assignment_object", "Objeto del encargo", Text, general::contract_object),
    field!("contract_type", "Tipo de contrato", Text, general::contract_type),
    field!("cpv", "CPV", Text, general::cpv),
    field!("budget_without_taxes", "Presupuesto base sin impuestos", Currency, general::budget_without_taxes),
    field!("budget_with_taxes", "Presupuesto base con impuestos", Currency, general::budget_with_taxes),
    field!("place_of_execution", "Lugar de ejecución", Text, general::place_of_execution),
    field!("contracting_body", "Órgano de Contratación", Text, general::contracting_body),
    field!("platform_body_id", "ID OC en PLACSP", Text, general::platform_body_id),
    field!("body_nif", "NIF OC", Text, general::body_nif),
    field!("body_dir3", "DIR3", Text, general::body_dir3),
    field!("buyer_profile", "Enlace al Perfil de Contratante del OC", Text, general::buyer_profile),
    field!("administration_type", "Tipo de Administración", Text, general::administration_type),
    field!("postal_code", "Código Postal", Text, general::postal_code),
    field!("own_resource", "Medio propio", Text, own_resource),
    field!("own_resource_id", "Identificador del medio propio", Text, own_resource_id),
    field!("assignment_date", "Fecha del encargo", DateShort, assignment_date),
    field!(
        "assignment_without_taxes",
        "Importe del encargo sin impuestos",
        Currency,
        assignment_without_taxes
    ),
    field!(
        "assignment_with_taxes",
        "Importe del encargo con impuestos",
        Currency,
        assignment_with_taxes
    ),
];

fn own_resource(folder: &XmlNode) -> FieldResult {
    extract::text(folder, "TenderResult/WinningParty/PartyName/Name")
}

fn own_resource_id(folder: &XmlNode) -> FieldResult {
    extract::text(folder, "TenderResult/WinningParty/PartyIdentification/ID")
}

fn assignment_date(folder: &XmlNode) -> FieldResult {
    extract::date(folder, "TenderResult/AwardDate")
}

fn assignment_without_taxes(folder: &XmlNode) -> FieldResult {
    extract::amount(
        folder,
        "TenderResult/AwardedTenderedProject/LegalMonetaryTotal/TaxExclusiveAmount",
    )
}

fn assignment_with_taxes(folder: &XmlNode) -> FieldResult {
    extract::amount(
        folder,
        "TenderResult/AwardedTenderedProject/LegalMonetaryTotal/PayableAmount",
    )
}
