//! Error types for ebdgraph.
//!
//! All errors are represented by the `EbdError` enum. Every variant points at
//! data in the source table: there is no transient failure mode in a pure
//! in-memory transformation, so none of these are retryable — the only
//! sensible response is to fix the table.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all ebdgraph operations.
///
/// Each variant carries the row/node keys needed to point a human at the
/// offending source-table row.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq, Eq)]
pub enum EbdError {
    /// The input table is missing required structure (no rows, malformed
    /// keys, no recognizable first step).
    #[error("invalid table: {reason}")]
    InvalidTable {
        reason: String,
    },

    /// A row references a step number or result code that does not exist in
    /// the table.
    #[error("row '{row_key}' references '{target}' which is not part of the table")]
    DanglingReference {
        row_key: String,
        target: String,
    },

    /// A decision node's branching does not conform to the binary yes/no
    /// model. N-ary branching would require a multigraph and is deliberately
    /// unsupported.
    #[error(
        "decision node '{decision_node_key}' does not have exactly one yes and one no edge to \
         distinct targets; found outgoing edges: [{}]", .outgoing_edges.join(", ")
    )]
    NotExactlyTwoOutgoingEdges {
        decision_node_key: String,
        outgoing_edges: Vec<String>,
    },

    /// Some node has no path to the end node, i.e. the procedure can never
    /// conclude from there.
    #[error("the end node is unreachable from: [{}]", .unreachable.join(", "))]
    UnreachableEndNode {
        unreachable: Vec<String>,
    },

    /// Graph construction errors (duplicate keys, unknown edge endpoints).
    #[error("{0}")]
    Graph(String),
}

impl From<EbdError> for String {
    fn from(val: EbdError) -> Self {
        val.to_string()
    }
}
