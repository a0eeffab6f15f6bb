//! Conversion of an [`EbdTable`] into an [`EbdGraph`].
//!
//! The conversion is total: it either returns a fully built graph or fails
//! with a typed error. It never drops rows and never returns a partially
//! constructed graph, because a partially valid decision graph is actively
//! misleading.

use std::collections::HashSet;

use tracing::debug;

use crate::{
    EbdError, Result,
    model::{
        BranchTarget, EbdGraph, EbdGraphEdge, EbdGraphMetaData, EbdGraphNode, EbdTable,
        EbdTableRow, END_NODE_KEY, RESULT_CODE_PATTERN, START_NODE_KEY, STEP_NUMBER_PATTERN,
    },
};

/// Step number of the entry step the start node links to.
const FIRST_STEP: &str = "1";

/// Checks the table for the structure every conversion relies on and returns
/// the set of node keys defined by its rows.
fn collect_row_keys(table: &EbdTable) -> Result<HashSet<String>> {
    if table.metadata.ebd_code.is_empty() {
        return Err(EbdError::InvalidTable {
            reason: "metadata is missing an ebd_code".to_string(),
        });
    }
    if table.rows.is_empty() {
        return Err(EbdError::InvalidTable {
            reason: "table contains no rows".to_string(),
        });
    }

    let mut keys = HashSet::new();
    let mut has_decision_row = false;
    for row in &table.rows {
        match row {
            EbdTableRow::Decision { step_number, .. } => {
                has_decision_row = true;
                if !STEP_NUMBER_PATTERN.is_match(step_number) {
                    return Err(EbdError::InvalidTable {
                        reason: format!("malformed step number '{}'", step_number),
                    });
                }
            }
            EbdTableRow::Outcome { result_code, .. } => {
                if !RESULT_CODE_PATTERN.is_match(result_code) {
                    return Err(EbdError::InvalidTable {
                        reason: format!("malformed result code '{}'", result_code),
                    });
                }
            }
        }
        if !keys.insert(row.key().to_string()) {
            return Err(EbdError::InvalidTable {
                reason: format!("duplicate row key '{}'", row.key()),
            });
        }
    }

    if !has_decision_row {
        return Err(EbdError::InvalidTable {
            reason: "table contains no decision rows".to_string(),
        });
    }
    if !keys.contains(FIRST_STEP) {
        return Err(EbdError::InvalidTable {
            reason: format!("table has no entry step '{}'", FIRST_STEP),
        });
    }
    Ok(keys)
}

/// Whether any branch of any decision row leads to "end of procedure".
fn ends_somewhere(table: &EbdTable) -> bool {
    table.rows.iter().any(|row| match row {
        EbdTableRow::Decision { yes, no, .. } => {
            matches!(yes, BranchTarget::End) || matches!(no, BranchTarget::End)
        }
        EbdTableRow::Outcome { .. } => false,
    })
}

/// Returns all nodes of the graph described by the table: the implicit start
/// node, one node per row in table order, and the end node iff some branch
/// leads there.
pub fn get_all_nodes(table: &EbdTable) -> Result<Vec<EbdGraphNode>> {
    collect_row_keys(table)?;

    let mut nodes = vec![EbdGraphNode::Start];
    for row in &table.rows {
        match row {
            EbdTableRow::Decision {
                step_number,
                question,
                ..
            } => nodes.push(EbdGraphNode::Decision {
                step_number: step_number.clone(),
                question: question.clone(),
            }),
            EbdTableRow::Outcome { result_code, note } => nodes.push(EbdGraphNode::Outcome {
                result_code: result_code.clone(),
                note: note.clone(),
            }),
        }
    }
    if ends_somewhere(table) {
        nodes.push(EbdGraphNode::End);
    }
    Ok(nodes)
}

/// Returns all edges of the graph described by the table as
/// `(source_key, target_key, edge)` triples: one unconditional edge from the
/// start node to the entry step, plus one yes and one no edge per decision
/// row.
///
/// A branch target that does not resolve to any row (or to the end node)
/// fails with [`EbdError::DanglingReference`].
pub fn get_all_edges(table: &EbdTable) -> Result<Vec<(String, String, EbdGraphEdge)>> {
    let mut keys = collect_row_keys(table)?;
    if ends_somewhere(table) {
        keys.insert(END_NODE_KEY.to_string());
    }

    let resolve = |row_key: &str, target: &BranchTarget| -> Result<String> {
        let target_key = target.key();
        if !keys.contains(target_key) {
            return Err(EbdError::DanglingReference {
                row_key: row_key.to_string(),
                target: target_key.to_string(),
            });
        }
        Ok(target_key.to_string())
    };

    let mut edges = vec![(
        START_NODE_KEY.to_string(),
        FIRST_STEP.to_string(),
        EbdGraphEdge::Plain,
    )];
    for row in &table.rows {
        if let EbdTableRow::Decision {
            step_number,
            yes,
            no,
            ..
        } = row
        {
            edges.push((
                step_number.clone(),
                resolve(step_number, yes)?,
                EbdGraphEdge::ToYes,
            ));
            edges.push((
                step_number.clone(),
                resolve(step_number, no)?,
                EbdGraphEdge::ToNo,
            ));
        }
    }
    Ok(edges)
}

/// Converts a table into the corresponding directed graph.
///
/// The input is read-only; the returned graph is freshly built on every
/// call. Conversion stops at the first error.
pub fn convert_table_to_graph(table: &EbdTable) -> Result<EbdGraph> {
    debug!(ebd_code = %table.metadata.ebd_code, rows = table.rows.len(), "converting table");

    let nodes = get_all_nodes(table)?;
    let edges = get_all_edges(table)?;

    let mut graph = EbdGraph::new(EbdGraphMetaData {
        ebd_code: table.metadata.ebd_code.clone(),
        chapter: table.metadata.chapter.clone(),
        sub_chapter: table.metadata.sub_chapter.clone(),
        role: table.metadata.role.clone(),
    });
    for node in nodes {
        graph.add_node(node)?;
    }
    for (source, target, edge) in edges {
        graph.add_edge(&source, &target, edge)?;
    }

    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "conversion finished"
    );
    Ok(graph)
}
