//! Extraction primitives shared by the field tables

use super::codes::CodeList;
use super::{CellValue, ExtractionFault, FieldResult};
use crate::feed::XmlNode;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

pub fn text(node: &XmlNode, path: &'static str) -> FieldResult {
    node.text_at(path)
        .map(CellValue::text)
        .ok_or(ExtractionFault::Missing(path))
}

pub fn coded(node: &XmlNode, path: &'static str, list: &CodeList) -> FieldResult {
    node.text_at(path)
        .map(|code| CellValue::Text(list.label(code)))
        .ok_or(ExtractionFault::Missing(path))
}

/// Decimal amount; currency attributes are ignored
pub fn amount(node: &XmlNode, path: &'static str) -> FieldResult {
    let raw = node.text_at(path).ok_or(ExtractionFault::Missing(path))?;
    raw.parse::<f64>()
        .map(CellValue::Number)
        .map_err(|_| ExtractionFault::Invalid {
            path,
            value: raw.to_string(),
        })
}

pub fn date(node: &XmlNode, path: &'static str) -> FieldResult {
    let raw = node.text_at(path).ok_or(ExtractionFault::Missing(path))?;
    parse_date(raw)
        .map(CellValue::Date)
        .ok_or_else(|| ExtractionFault::Invalid {
            path,
            value: raw.to_string(),
        })
}

/// Date plus optional time-of-day sibling; a missing time means midnight
pub fn date_time(node: &XmlNode, date_path: &'static str, time_path: &'static str) -> FieldResult {
    let raw = node.text_at(date_path).ok_or(ExtractionFault::Missing(date_path))?;
    let day = parse_date(raw).ok_or_else(|| ExtractionFault::Invalid {
        path: date_path,
        value: raw.to_string(),
    })?;
    let time = node
        .text_at(time_path)
        .and_then(parse_time)
        .unwrap_or(NaiveTime::MIN);

    Ok(CellValue::DateTime(NaiveDateTime::new(day, time)))
}

/// `true`/`false` indicator
pub fn indicator(node: &XmlNode, path: &'static str) -> FieldResult {
    let raw = node.text_at(path).ok_or(ExtractionFault::Missing(path))?;
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(CellValue::Bool(true)),
        "false" | "0" => Ok(CellValue::Bool(false)),
        _ => Err(ExtractionFault::Invalid {
            path,
            value: raw.to_string(),
        }),
    }
}

/// Every value on `path`, each followed by `;`
pub fn list(node: &XmlNode, path: &'static str) -> FieldResult {
    let joined: String = node
        .find_all(path)
        .into_iter()
        .map(XmlNode::text)
        .filter(|value| !value.is_empty())
        .map(|value| format!("{value};"))
        .collect();

    if joined.is_empty() {
        Err(ExtractionFault::Missing(path))
    } else {
        Ok(CellValue::Text(joined))
    }
}

/// `ID` of the first identification under `parent` with the given `schemeName`
pub fn scheme_id<'a>(parent: &'a XmlNode, scheme: &str) -> Option<&'a str> {
    parent
        .children_named("PartyIdentification")
        .filter_map(|ident| ident.child("ID"))
        .find(|id| id.attr("schemeName") == Some(scheme))
        .map(XmlNode::text)
        .filter(|value| !value.is_empty())
}

/// `code - name`, or whichever half is present
pub fn code_and_name(code: Option<&str>, name: Option<&str>) -> Option<String> {
    match (code, name) {
        (Some(code), Some(name)) => Some(format!("{code} - {name}")),
        (Some(one), None) | (None, Some(one)) => Some(one.to_string()),
        (None, None) => None,
    }
}

/// Dates arrive as `yyyy-mm-dd`, sometimes followed by an offset
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok()
}

/// Times arrive as `hh:mm:ss`, sometimes with fractions or an offset
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw.get(..8)?, "%H:%M:%S").ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::fields::codes::URGENCY;

    fn folder() -> XmlNode {
        XmlNode::parse_str(
            r#"<ContractFolderStatus>
  <TenderingProcess>
    <UrgencyCode>2</UrgencyCode>
    <TenderSubmissionDeadlinePeriod>
      <EndDate>2024-02-15+01:00</EndDate>
      <EndTime>14:30:00.000+01:00</EndTime>
    </TenderSubmissionDeadlinePeriod>
    <ParticipationRequestReceptionPeriod><EndDate>2024-02-10</EndDate></ParticipationRequestReceptionPeriod>
    <OverThresholdIndicator>true</OverThresholdIndicator>
  </TenderingProcess>
  <ProcurementProject>
    <BudgetAmount><TotalAmount currencyID="EUR">1210.00</TotalAmount><TaxExclusiveAmount>mil</TaxExclusiveAmount></BudgetAmount>
    <RequiredCommodityClassification><ItemClassificationCode>45000000</ItemClassificationCode></RequiredCommodityClassification>
    <RequiredCommodityClassification><ItemClassificationCode>45200000</ItemClassificationCode></RequiredCommodityClassification>
  </ProcurementProject>
  <Party>
    <PartyIdentification><ID schemeName="DIR3">L01</ID></PartyIdentification>
    <PartyIdentification><ID schemeName="NIF">P1234567A</ID></PartyIdentification>
  </Party>
</ContractFolderStatus>"#,
        )
        .unwrap()
    }

    #[test]
    fn test_coded_maps_through_list() {
        assert_eq!(
            coded(&folder(), "TenderingProcess/UrgencyCode", &URGENCY).unwrap(),
            CellValue::text("Urgente")
        );
    }

    #[test]
    fn test_amount_parses_and_reports_garbage() {
        assert_eq!(
            amount(&folder(), "ProcurementProject/BudgetAmount/TotalAmount").unwrap(),
            CellValue::Number(1210.0)
        );
        assert!(matches!(
            amount(&folder(), "ProcurementProject/BudgetAmount/TaxExclusiveAmount"),
            Err(ExtractionFault::Invalid { .. })
        ));
    }

    #[test]
    fn test_date_time_tolerates_offsets_and_missing_time() {
        let with_time = date_time(
            &folder(),
            "TenderingProcess/TenderSubmissionDeadlinePeriod/EndDate",
            "TenderingProcess/TenderSubmissionDeadlinePeriod/EndTime",
        )
        .unwrap();
        let without_time = date_time(
            &folder(),
            "TenderingProcess/ParticipationRequestReceptionPeriod/EndDate",
            "TenderingProcess/ParticipationRequestReceptionPeriod/EndTime",
        )
        .unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap();
        assert_eq!(with_time, CellValue::DateTime(day.and_hms_opt(14, 30, 0).unwrap()));
        let day = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        assert_eq!(without_time, CellValue::DateTime(day.and_hms_opt(0, 0, 0).unwrap()));
    }

    #[test]
    fn test_list_joins_with_trailing_separator() {
        assert_eq!(
            list(&folder(), "ProcurementProject/RequiredCommodityClassification/ItemClassificationCode").unwrap(),
            CellValue::text("45000000;45200000;")
        );
    }

    #[test]
    fn test_scheme_id_picks_matching_scheme() {
        let root = folder();
        let party = root.child("Party").unwrap();

        assert_eq!(scheme_id(party, "NIF"), Some("P1234567A"));
        assert_eq!(scheme_id(party, "ID_PLATAFORMA"), None);
    }

    #[test]
    fn test_indicator() {
        assert_eq!(
            indicator(&folder(), "TenderingProcess/OverThresholdIndicator").unwrap(),
            CellValue::Bool(true)
        );
        assert!(indicator(&folder(), "TenderingProcess/AuctionTerms/AuctionConstraintIndicator").is_err());
    }

    #[test]
    fn test_code_and_name() {
        assert_eq!(code_and_name(Some("ES300"), Some("Madrid")).as_deref(), Some("ES300 - Madrid"));
        assert_eq!(code_and_name(None, Some("España")).as_deref(), Some("España"));
        assert_eq!(code_and_name(None, None), None);
    }
}
