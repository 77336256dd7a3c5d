//! Result and lot columns, one set per `TenderResult` of a standard tender
//!
//! Lot-level columns (object, budget, CPV, place) come from the
//! `ProcurementProjectLot` the result was awarded for, falling back to the
//! document's own `ProcurementProject` when the tender is not split in lots.

use super::codes;
use super::extract;
use super::general::project_location;
use super::{CellValue, ExtractionFault, FieldResult, ResultField, ResultScope};
use crate::feed::XmlNode;

pub static FIELDS: &[ResultField] = &[
    field!(result: "lot", "Lote", Text, lot),
    field!(result: "lot_object", "Objeto licitación/lote", Text, lot_object),
    field!(
        result: "lot_budget_without_taxes",
        "Presupuesto base sin impuestos licitación/lote",
        Currency,
        lot_budget_without_taxes
    ),
    field!(
        result: "lot_budget_with_taxes",
        "Presupuesto base con impuestos licitación/lote",
        Currency,
        lot_budget_with_taxes
    ),
    field!(result: "lot_cpv", "CPV licitación/lote", Text, lot_cpv),
    field!(result: "lot_place", "Lugar ejecución licitación/lote", Text, lot_place),
    field!(result: "result", "Resultado licitación/lote", Text, result_code),
    field!(result: "award_date", "Fecha del acuerdo licitación/lote", DateShort, award_date),
    field!(
        result: "offers_received",
        "Número de ofertas recibidas por licitación/lote",
        Number,
        offers_received
    ),
    field!(
        result: "lowest_offer",
        "Precio de la oferta más baja por licitación/lote",
        Currency,
        lowest_offer
    ),
    field!(
        result: "highest_offer",
        "Precio de la oferta más alta por licitación/lote",
        Currency,
        highest_offer
    ),
    field!(
        result: "abnormally_low_excluded",
        "Ofertas excluidas por anormalmente bajas por licitación/lote",
        Boolean,
        abnormally_low_excluded
    ),
    field!(result: "contract_number", "Número del contrato licitación/lote", Text, contract_number),
    field!(
        result: "formalisation_date",
        "Fecha formalización del contrato licitación/lote",
        DateShort,
        formalisation_date
    ),
    field!(
        result: "entry_into_force",
        "Fecha entrada en vigor del contrato de licitación/lote",
        DateShort,
        entry_into_force
    ),
    field!(result: "winner", "Adjudicatario licitación/lote", Text, winner),
    field!(
        result: "winner_id_type",
        "Tipo de identificador de adjudicatario por licitación/lote",
        Text,
        winner_id_type
    ),
    field!(result: "winner_id", "Identificador Adjudicatario de la licitación/lote", Text, winner_id),
    field!(result: "sme_winner", "El adjudicatario es o no PYME de la licitación/lote", Boolean, sme_winner),
    field!(
        result: "award_without_taxes",
        "Importe adjudicación sin impuestos licitación/lote",
        Currency,
        award_without_taxes
    ),
    field!(
        result: "award_with_taxes",
        "Importe adjudicación con impuestos licitación/lote",
        Currency,
        award_with_taxes
    ),
];

/// Every `TenderResult` of a document, in document order
pub fn tender_results(folder: &XmlNode) -> Vec<&XmlNode> {
    folder.children_named("TenderResult").collect()
}

fn lot_id<'a>(scope: &ResultScope<'a>) -> Option<&'a str> {
    scope
        .result
        .text_at("AwardedTenderedProject/ProcurementProjectLotID")
}

fn lot_project<'a>(scope: &ResultScope<'a>) -> Result<&'a XmlNode, ExtractionFault> {
    let from_lot = lot_id(scope).and_then(|id| {
        scope
            .folder
            .children_named("ProcurementProjectLot")
            .find(|lot| lot.text_at("ID") == Some(id))
            .and_then(|lot| lot.child("ProcurementProject"))
    });

    from_lot
        .or_else(|| scope.folder.child("ProcurementProject"))
        .ok_or(ExtractionFault::Missing("ProcurementProject"))
}

fn lot(scope: &ResultScope<'_>) -> FieldResult {
    lot_id(scope)
        .map(CellValue::text)
        .ok_or(ExtractionFault::Missing("AwardedTenderedProject/ProcurementProjectLotID"))
}

fn lot_object(scope: &ResultScope<'_>) -> FieldResult {
    extract::text(lot_project(scope)?, "Name")
}

fn lot_budget_without_taxes(scope: &ResultScope<'_>) -> FieldResult {
    extract::amount(lot_project(scope)?, "BudgetAmount/TaxExclusiveAmount")
}

fn lot_budget_with_taxes(scope: &ResultScope<'_>) -> FieldResult {
    extract::amount(lot_project(scope)?, "BudgetAmount/TotalAmount")
}

fn lot_cpv(scope: &ResultScope<'_>) -> FieldResult {
    extract::list(
        lot_project(scope)?,
        "RequiredCommodityClassification/ItemClassificationCode",
    )
}

fn lot_place(scope: &ResultScope<'_>) -> FieldResult {
    project_location(lot_project(scope)?)
}

fn result_code(scope: &ResultScope<'_>) -> FieldResult {
    extract::coded(scope.result, "ResultCode", &codes::TENDER_RESULT)
}

fn award_date(scope: &ResultScope<'_>) -> FieldResult {
    extract::date(scope.result, "AwardDate")
}

fn offers_received(scope: &ResultScope<'_>) -> FieldResult {
    extract::amount(scope.result, "ReceivedTenderQuantity")
}

fn lowest_offer(scope: &ResultScope<'_>) -> FieldResult {
    extract::amount(scope.result, "LowerTenderAmount")
}

fn highest_offer(scope: &ResultScope<'_>) -> FieldResult {
    extract::amount(scope.result, "HigherTenderAmount")
}

fn abnormally_low_excluded(scope: &ResultScope<'_>) -> FieldResult {
    extract::indicator(scope.result, "AbnormallyLowTendersIndicator")
}

fn contract_number(scope: &ResultScope<'_>) -> FieldResult {
    extract::text(scope.result, "Contract/ID")
}

fn formalisation_date(scope: &ResultScope<'_>) -> FieldResult {
    extract::date(scope.result, "Contract/IssueDate")
}

fn entry_into_force(scope: &ResultScope<'_>) -> FieldResult {
    extract::date(scope.result, "StartDate")
}

fn winner(scope: &ResultScope<'_>) -> FieldResult {
    extract::text(scope.result, "WinningParty/PartyName/Name")
}

fn winner_id_type(scope: &ResultScope<'_>) -> FieldResult {
    scope
        .result
        .find("WinningParty/PartyIdentification/ID")
        .and_then(|id| id.attr("schemeName"))
        .map(CellValue::text)
        .ok_or(ExtractionFault::Missing("WinningParty/PartyIdentification/ID/@schemeName"))
}

fn winner_id(scope: &ResultScope<'_>) -> FieldResult {
    extract::text(scope.result, "WinningParty/PartyIdentification/ID")
}

fn sme_winner(scope: &ResultScope<'_>) -> FieldResult {
    extract::indicator(scope.result, "SMEAwardedIndicator")
}

fn award_without_taxes(scope: &ResultScope<'_>) -> FieldResult {
    extract::amount(
        scope.result,
        "AwardedTenderedProject/LegalMonetaryTotal/TaxExclusiveAmount",
    )
}

fn award_with_taxes(scope: &ResultScope<'_>) -> FieldResult {
    extract::amount(scope.result, "AwardedTenderedProject/LegalMonetaryTotal/PayableAmount")
}
