//! Structural validation of a converted [`EbdGraph`].
//!
//! Fails with a typed error instead of returning a boolean so that the
//! caller gets a precise diagnosis. Validation is read-only and stops at the
//! first violated invariant.

use std::collections::HashSet;

use petgraph::{
    graph::NodeIndex,
    visit::{Bfs, Reversed},
};
use tracing::trace;

use crate::{
    EbdError, Result,
    model::{EbdGraph, EbdGraphEdge, EbdGraphNode, END_NODE_KEY, START_NODE_KEY},
};

/// Checks all structural invariants of the graph, in this order:
///
/// 1. exactly one start node with a single unconditional outgoing edge
/// 2. exactly one end node, reachable from every start and decision node
/// 3. every decision node has exactly one yes and one no edge to distinct
///    targets (binary branching only; a deliberate limitation)
/// 4. every outcome node is a leaf
/// 5. no orphan nodes (in-degree 0 anywhere but the start node)
/// 6. node keys are unique (enforced structurally at construction time,
///    re-checked defensively)
pub fn validate_graph(graph: &EbdGraph) -> Result<()> {
    check_start_node(graph)?;
    check_end_node_reachability(graph)?;
    check_decision_out_degrees(graph)?;
    check_outcome_leaves(graph)?;
    check_orphans(graph)?;
    check_key_uniqueness(graph)?;
    trace!(ebd_code = %graph.metadata().ebd_code, "graph validated");
    Ok(())
}

fn check_start_node(graph: &EbdGraph) -> Result<()> {
    let start_count = graph
        .nodes()
        .filter(|node| matches!(node, EbdGraphNode::Start))
        .count();
    if start_count != 1 {
        return Err(EbdError::InvalidTable {
            reason: format!("graph has {} start nodes instead of exactly one", start_count),
        });
    }

    let outgoing = graph.outgoing(START_NODE_KEY);
    match outgoing.as_slice() {
        [(_, EbdGraphEdge::Plain)] => Ok(()),
        _ => Err(EbdError::InvalidTable {
            reason: format!(
                "start node must have exactly one unconditional outgoing edge, found [{}]",
                outgoing
                    .iter()
                    .map(|(_, edge)| edge.label())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }),
    }
}

/// Indices of all nodes from which the end node can be reached, the end node
/// itself included.
fn nodes_reaching_end(graph: &EbdGraph, end_idx: NodeIndex) -> HashSet<NodeIndex> {
    let reversed = Reversed(graph.digraph());
    let mut reaching = HashSet::new();
    let mut bfs = Bfs::new(reversed, end_idx);
    while let Some(idx) = bfs.next(reversed) {
        reaching.insert(idx);
    }
    reaching
}

fn check_end_node_reachability(graph: &EbdGraph) -> Result<()> {
    let end_count = graph
        .nodes()
        .filter(|node| matches!(node, EbdGraphNode::End))
        .count();
    if end_count > 1 {
        return Err(EbdError::InvalidTable {
            reason: format!("graph has {} end nodes instead of exactly one", end_count),
        });
    }

    // Outcome nodes terminate the procedure on their own and are exempt;
    // every start and decision node must have a path to "Ende".
    let must_reach_end = |node: &EbdGraphNode| {
        matches!(node, EbdGraphNode::Start | EbdGraphNode::Decision { .. })
    };

    let reaching = match graph.node_index(END_NODE_KEY) {
        Some(end_idx) => nodes_reaching_end(graph, end_idx),
        None => HashSet::new(),
    };

    let mut unreachable: Vec<String> = graph
        .digraph()
        .node_indices()
        .filter(|idx| must_reach_end(&graph.digraph()[*idx]) && !reaching.contains(idx))
        .map(|idx| graph.digraph()[idx].key().to_string())
        .collect();
    if !unreachable.is_empty() {
        unreachable.sort();
        return Err(EbdError::UnreachableEndNode { unreachable });
    }
    Ok(())
}

fn check_decision_out_degrees(graph: &EbdGraph) -> Result<()> {
    for node in graph.nodes() {
        let EbdGraphNode::Decision { step_number, .. } = node else {
            continue;
        };

        let outgoing = graph.outgoing(step_number);
        let mut labels: Vec<String> = outgoing.iter().map(|(_, edge)| edge.label().to_string()).collect();
        labels.sort();

        let conforms = match outgoing.as_slice() {
            [(first_target, first_edge), (second_target, second_edge)] => {
                let yes_and_no = matches!(
                    (*first_edge, *second_edge),
                    (EbdGraphEdge::ToYes, EbdGraphEdge::ToNo)
                        | (EbdGraphEdge::ToNo, EbdGraphEdge::ToYes)
                );
                yes_and_no && first_target != second_target
            }
            _ => false,
        };

        if !conforms {
            return Err(EbdError::NotExactlyTwoOutgoingEdges {
                decision_node_key: step_number.clone(),
                outgoing_edges: labels,
            });
        }
    }
    Ok(())
}

fn check_outcome_leaves(graph: &EbdGraph) -> Result<()> {
    for node in graph.nodes() {
        if let EbdGraphNode::Outcome { result_code, .. } = node
            && graph.out_degree(result_code) != 0
        {
            return Err(EbdError::InvalidTable {
                reason: format!("outcome node '{}' has outgoing edges", result_code),
            });
        }
    }
    Ok(())
}

fn check_orphans(graph: &EbdGraph) -> Result<()> {
    let mut orphans: Vec<String> = graph
        .nodes()
        .filter(|node| !matches!(node, EbdGraphNode::Start) && graph.in_degree(node.key()) == 0)
        .map(|node| node.key().to_string())
        .collect();
    if !orphans.is_empty() {
        orphans.sort();
        return Err(EbdError::InvalidTable {
            reason: format!("orphan nodes without incoming edges: [{}]", orphans.join(", ")),
        });
    }
    Ok(())
}

fn check_key_uniqueness(graph: &EbdGraph) -> Result<()> {
    let mut seen = HashSet::new();
    for node in graph.nodes() {
        if !seen.insert(node.key()) {
            return Err(EbdError::Graph(format!("duplicate node key '{}'", node.key())));
        }
    }
    Ok(())
}
