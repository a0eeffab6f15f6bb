//! # ebdgraph
//!
//! ebdgraph converts tabular representations of regulatory decision
//! procedures — "Entscheidungsbaumdiagramme" (EBD) from the German
//! EDI@Energy documents — into directed graphs suitable for diagram
//! rendering.
//!
//! An EBD table is a sequence of numbered yes/no checks ("Prüfschritte")
//! leading to coded outcomes. The conversion pipeline turns such a table
//! into a typed graph, rejects structurally broken tables with precise
//! errors, and marks the points where sibling branches reconverge so a
//! renderer can draw the shared subgraph only once.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ebdgraph::{EbdTable, convert_table_to_graph, mark_last_common_ancestors, validate_graph};
//!
//! let table = EbdTable::from_json(json_str)?;
//! let mut graph = convert_table_to_graph(&table)?;
//! validate_graph(&graph)?;
//! mark_last_common_ancestors(&mut graph);
//! // hand the graph to a renderer
//! ```
//!
//! Rendering (dot/PlantUML templating, remote image services, watermarking)
//! is out of scope; consumers of the validated graph may rely on all
//! structural invariants without re-checking them.

mod convergence;
mod conversion;
mod error;
mod model;
mod validation;

pub use convergence::mark_last_common_ancestors;
pub use conversion::{convert_table_to_graph, get_all_edges, get_all_nodes};
pub use error::EbdError;
pub use model::*;
pub use validation::validate_graph;

/// Result type alias for ebdgraph operations.
pub type Result<T> = std::result::Result<T, EbdError>;

#[cfg(test)]
mod tests {
    use super::*;

    /// End-to-end run of the pipeline on the E_0003 table.
    #[test]
    fn test_pipeline_e0003() {
        let json = r#"{
            "metadata": {
                "ebd_code": "E_0003",
                "chapter": "7.39 AD: Bestellung der Aggregationsebene RZ",
                "sub_chapter": "7.39.1 Prüfen, ob Bestellung fristgerecht",
                "role": "BIKO"
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
                { "outcome": { "result_code": "A02", "note": "Gewählter Zeitpunkt nicht zulässig" } }
            ]
        }"#;

        let table = EbdTable::from_json(json).unwrap();
        let mut graph = convert_table_to_graph(&table).unwrap();
        validate_graph(&graph).unwrap();
        mark_last_common_ancestors(&mut graph);

        assert_eq!(graph.node_count(), 6);
        assert_eq!(graph.edge_count(), 5);
        assert!(graph.merge_points().is_empty());
        assert_eq!(graph.metadata().role, "BIKO");
    }
}
