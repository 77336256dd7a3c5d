//! Built-in code lists for coded CODICE values
//!
//! Unknown codes render as the code itself.

/// A named code → label table
#[derive(Debug, Clone, Copy)]
pub struct CodeList {
    pub name: &'static str,
    entries: &'static [(&'static str, &'static str)],
}

impl CodeList {
    pub const fn new(name: &'static str, entries: &'static [(&'static str, &'static str)]) -> Self {
        Self { name, entries }
    }

    /// Label for `code`, or the trimmed code when the list does not know it
    pub fn label(&self, code: &str) -> String {
        let code = code.trim();
        self.entries
            .iter()
            .find(|(key, _)| *key == code)
            .map_or_else(|| code.to_string(), |(_, label)| (*label).to_string())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub const FOLDER_STATUS: CodeList = CodeList::new(
    "SyndicationContractFolderStatusCode",
    &[
        ("PRE", "Anuncio Previo"),
        ("PUB", "En plazo"),
        ("EV", "Pendiente de adjudicación"),
        ("ADJ", "Adjudicada"),
        ("RES", "Resuelta"),
        ("ANUL", "Anulada"),
    ],
);

pub const CONTRACT_TYPE: CodeList = CodeList::new(
    "ContractCode",
    &[
        ("1", "Suministros"),
        ("2", "Servicios"),
        ("3", "Obras"),
        ("7", "Administrativo especial"),
        ("8", "Privado"),
        ("21", "Gestión de Servicios Públicos"),
        ("22", "Concesión de Servicios"),
        ("31", "Concesión de Obras Públicas"),
        ("32", "Concesión de Obras"),
        ("40", "Colaboración entre el sector público y sector privado"),
        ("50", "Patrimonial"),
        ("999", "Otros"),
    ],
);

pub const PROCEDURE: CodeList = CodeList::new(
    "SyndicationTenderingProcessCode",
    &[
        ("1", "Abierto"),
        ("2", "Restringido"),
        ("3", "Negociado sin publicidad"),
        ("4", "Negociado con publicidad"),
        ("5", "Diálogo competitivo"),
        ("6", "Contrato menor"),
        ("7", "Derivado de acuerdo marco"),
        ("8", "Concurso de proyectos"),
        ("9", "Abierto simplificado"),
        ("10", "Asociación para la innovación"),
        ("11", "Derivado de asociación para la innovación"),
        ("12", "Basado en un sistema dinámico de adquisición"),
        ("13", "Licitación con negociación"),
        ("100", "Normas internas"),
        ("999", "Otros"),
    ],
);

pub const CONTRACTING_SYSTEM: CodeList = CodeList::new(
    "ContractingSystemTypeCode",
    &[
        ("0", "No aplica"),
        ("1", "Establecimiento del Acuerdo Marco"),
        ("2", "Establecimiento del Sistema Dinámico de Adquisición"),
        ("3", "Contrato basado en un Acuerdo Marco"),
        ("4", "Contrato basado en un Sistema Dinámico de Adquisición"),
    ],
);

pub const URGENCY: CodeList = CodeList::new(
    "DiligenceTypeCode",
    &[("1", "Ordinaria"), ("2", "Urgente"), ("3", "Emergencia")],
);

pub const SUBMISSION_METHOD: CodeList = CodeList::new(
    "TenderDeliveryCode",
    &[
        ("1", "Electrónica"),
        ("2", "Manual"),
        ("3", "Manual y/o Electrónica"),
    ],
);

pub const TENDER_RESULT: CodeList = CodeList::new(
    "TenderResultCode",
    &[
        ("1", "Adjudicado Provisionalmente"),
        ("2", "Adjudicado Definitivamente"),
        ("3", "Desierto"),
        ("4", "Desistimiento"),
        ("5", "Renuncia"),
        ("6", "Desierto Provisionalmente"),
        ("7", "Desierto Definitivamente"),
        ("8", "Adjudicado"),
        ("9", "Formalizado"),
        ("10", "Licitador mejor valorado: Requerimiento de documentación"),
        ("11", "Encargo a medio propio"),
    ],
);

pub const AUTHORITY_TYPE: CodeList = CodeList::new(
    "ContractingAuthorityCode",
    &[
        ("1", "Administración General del Estado"),
        ("2", "Comunidad Autónoma"),
        ("3", "Administración Local"),
        ("4", "Entidad de Derecho Público"),
        ("5", "Otras Entidades del Sector Público"),
    ],
);

pub const FUNDING_PROGRAM: CodeList = CodeList::new(
    "FundingProgramCode",
    &[
        ("EU", "Financiación con fondos UE"),
        ("NO-EU", "Sin financiación con fondos UE"),
        ("REU", "Fondos REACT-EU"),
        ("FEDER", "Fondo Europeo de Desarrollo Regional"),
        ("FSE+", "Fondo Social Europeo Plus"),
        ("FEADER", "Fondo Europeo Agrícola de Desarrollo Rural"),
        ("FEMP", "Fondo Europeo Marítimo y de Pesca"),
        ("PRTR", "Plan de Recuperación, Transformación y Resiliencia"),
        ("OFE", "Otros fondos europeos"),
    ],
);

pub const CONSULTATION_STATUS: CodeList = CodeList::new(
    "PreliminaryMarketConsultationStatusCode",
    &[
        ("1", "Abierta"),
        ("2", "Cerrada"),
        ("3", "Anulada"),
    ],
);

pub const CONSULTATION_TYPE: CodeList = CodeList::new(
    "PreliminaryMarketConsultationTypeCode",
    &[
        ("1", "Abierta a cualquier interesado"),
        ("2", "Dirigida a operadores seleccionados"),
    ],
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_code_maps_to_label() {
        assert_eq!(FOLDER_STATUS.label("ADJ"), "Adjudicada");
        assert_eq!(CONTRACT_TYPE.label(" 3 "), "Obras");
        assert_eq!(TENDER_RESULT.label("11"), "Encargo a medio propio");
    }

    #[test]
    fn test_unknown_code_falls_back_to_code() {
        assert_eq!(PROCEDURE.label("4242"), "4242");
        assert_eq!(URGENCY.label(""), "");
    }
}
