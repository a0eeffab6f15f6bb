//! The tabular input side: a structured, in-memory representation of an EBD
//! table as published in the EDI@Energy documents.
//!
//! How the table is scraped out of a document is not this crate's concern;
//! loaders hand over an [`EbdTable`] and the conversion pipeline takes it
//! from there.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{EbdError, Result};

/// Matches step numbers like `1`, `2` or `6*` (trailing `*` marks a repeated
/// or variant step).
pub(crate) static STEP_NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\*?$").unwrap());

/// Matches result codes like `A01` or `A55`.
pub(crate) static RESULT_CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]\d+$").unwrap());

/// Metadata of an EBD table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EbdTableMetaData {
    /// ID of the EBD, e.g. `E_0003`.
    pub ebd_code: String,
    /// Chapter from the EDI@Energy document.
    pub chapter: String,
    /// Sub-chapter from the EDI@Energy document.
    pub sub_chapter: String,
    /// The checking role, e.g. `BIKO` for "Prüfende Rolle: 'BIKO'".
    pub role: String,
}

/// Where a decision branch leads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchTarget {
    /// Continue with the decision step carrying this step number.
    Step(String),
    /// Terminate with the outcome carrying this result code.
    Outcome(String),
    /// End of the procedure ("Ende").
    End,
}

impl BranchTarget {
    /// The node key this target resolves to.
    pub fn key(&self) -> &str {
        match self {
            BranchTarget::Step(step_number) => step_number,
            BranchTarget::Outcome(result_code) => result_code,
            BranchTarget::End => "Ende",
        }
    }
}

/// One row of an EBD table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EbdTableRow {
    /// A check step: a question answered with yes ("ja") or no ("nein").
    Decision {
        /// Number of the Prüfschritt, e.g. `1`, `2` or `6*`.
        step_number: String,
        /// The question asked at this step.
        question: String,
        /// Where to continue when the answer is yes.
        yes: BranchTarget,
        /// Where to continue when the answer is no.
        no: BranchTarget,
    },
    /// A terminal outcome of the procedure.
    Outcome {
        /// The coded result, e.g. `A55`.
        result_code: String,
        /// Optional free-text note, e.g. `Cluster: Ablehnung\nFristüberschreitung`.
        note: Option<String>,
    },
}

impl EbdTableRow {
    /// The key under which this row's node is stored in the graph:
    /// the step number for decision rows, the result code for outcome rows.
    pub fn key(&self) -> &str {
        match self {
            EbdTableRow::Decision { step_number, .. } => step_number,
            EbdTableRow::Outcome { result_code, .. } => result_code,
        }
    }
}

/// The structured representation of a scraped EBD table: ordered rows plus
/// document metadata.
///
/// Row order does not influence graph construction (rows are linked by key),
/// but it determines node ordering in the output and keeps error messages
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EbdTable {
    pub metadata: EbdTableMetaData,
    pub rows: Vec<EbdTableRow>,
}

impl EbdTable {
    /// Deserializes a table from its JSON representation.
    pub fn from_json(s: &str) -> Result<Self> {
        let table = serde_json::from_str::<EbdTable>(s);
        match table {
            Ok(v) => Ok(v),
            Err(e) => Err(EbdError::InvalidTable {
                reason: format!("{}", e),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_number_pattern() {
        assert!(STEP_NUMBER_PATTERN.is_match("1"));
        assert!(STEP_NUMBER_PATTERN.is_match("42"));
        assert!(STEP_NUMBER_PATTERN.is_match("6*"));
        assert!(!STEP_NUMBER_PATTERN.is_match("A01"));
        assert!(!STEP_NUMBER_PATTERN.is_match("*6"));
        assert!(!STEP_NUMBER_PATTERN.is_match(""));
    }

    #[test]
    fn test_result_code_pattern() {
        assert!(RESULT_CODE_PATTERN.is_match("A01"));
        assert!(RESULT_CODE_PATTERN.is_match("B55"));
        assert!(!RESULT_CODE_PATTERN.is_match("a01"));
        assert!(!RESULT_CODE_PATTERN.is_match("1"));
        assert!(!RESULT_CODE_PATTERN.is_match("A"));
    }

    #[test]
    fn test_branch_target_key() {
        assert_eq!(BranchTarget::Step("2".to_string()).key(), "2");
        assert_eq!(BranchTarget::Outcome("A01".to_string()).key(), "A01");
        assert_eq!(BranchTarget::End.key(), "Ende");
    }

    #[test]
    fn test_table_from_json() {
        let json = r#"{
            "metadata": {
                "ebd_code": "E_0003",
                "chapter": "7.39 AD: Bestellung der Aggregationsebene RZ",
                "sub_chapter": "7.39.1 Prüfen, ob Bestellung fristgerecht",
                "role": "ÜNB"
            },
            "rows": [
                {
                    "decision": {
                        "step_number": "1",
                        "question": "Erfolgt der Eingang der Bestellung fristgerecht?",
                        "yes": { "step": "2" },
                        "no": { "outcome": "A01" }
                    }
                },
                { "outcome": { "result_code": "A01", "note": "Fristüberschreitung" } },
                {
                    "decision": {
                        "step_number": "2",
                        "question": "Erfolgt die Bestellung zum Monatsersten 00:00 Uhr?",
                        "yes": "end",
                        "no": { "outcome": "A02" }
                    }
                },
                { "outcome": { "result_code": "A02", "note": null } }
            ]
        }"#;

        let table = EbdTable::from_json(json).unwrap();
        assert_eq!(table.metadata.ebd_code, "E_0003");
        assert_eq!(table.rows.len(), 4);
        assert_eq!(table.rows[0].key(), "1");
        assert_eq!(
            table.rows[2],
            EbdTableRow::Decision {
                step_number: "2".to_string(),
                question: "Erfolgt die Bestellung zum Monatsersten 00:00 Uhr?".to_string(),
                yes: BranchTarget::End,
                no: BranchTarget::Outcome("A02".to_string()),
            }
        );
    }

    #[test]
    fn test_table_from_invalid_json() {
        let result = EbdTable::from_json("{ not json");
        assert!(matches!(result, Err(EbdError::InvalidTable { .. })));
    }
}
