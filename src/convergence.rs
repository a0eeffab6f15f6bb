//! Convergence annotation: find the points where the sibling branches of a
//! decision node reconverge.
//!
//! Renderers use these markers to draw a single shared downstream subgraph
//! instead of duplicating it under both branches. The pass only attaches
//! metadata; the graph structure is never touched.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::{Bfs, EdgeRef},
};
use tracing::trace;

use crate::model::{EbdGraph, EbdGraphEdge, EbdGraphNode};

/// All nodes reachable from `start`, `start` itself included.
fn reachable_from(
    graph: &DiGraph<EbdGraphNode, EbdGraphEdge>,
    start: NodeIndex,
) -> HashSet<NodeIndex> {
    let mut reachable = HashSet::new();
    let mut bfs = Bfs::new(graph, start);
    while let Some(idx) = bfs.next(graph) {
        reachable.insert(idx);
    }
    reachable
}

/// Hop distances from `start` to every reachable node.
fn hop_distances(
    graph: &DiGraph<EbdGraphNode, EbdGraphEdge>,
    start: NodeIndex,
) -> HashMap<NodeIndex, usize> {
    let mut distances = HashMap::from([(start, 0)]);
    let mut queue = VecDeque::from([start]);
    while let Some(idx) = queue.pop_front() {
        let next_distance = distances[&idx] + 1;
        for neighbor in graph.neighbors_directed(idx, Direction::Outgoing) {
            if !distances.contains_key(&neighbor) {
                distances.insert(neighbor, next_distance);
                queue.push_back(neighbor);
            }
        }
    }
    distances
}

/// For every decision node, finds the nearest node at which its yes and no
/// branches reconverge and marks it as a merge point carrying the decision
/// node's key.
///
/// The end node never counts as a merge point; sibling branches that only
/// meet at "Ende" produce no annotation. Ties between equidistant candidates
/// go to the lexicographically smallest key, so repeated runs over the same
/// graph always produce the same annotation set (the map is rebuilt from
/// scratch on every call).
pub fn mark_last_common_ancestors(graph: &mut EbdGraph) {
    let digraph = graph.digraph();
    let mut merge_points: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for decision_idx in digraph.node_indices() {
        let EbdGraphNode::Decision { step_number, .. } = &digraph[decision_idx] else {
            continue;
        };

        let mut yes_target = None;
        let mut no_target = None;
        for edge_ref in digraph.edges_directed(decision_idx, Direction::Outgoing) {
            match edge_ref.weight() {
                EbdGraphEdge::ToYes => yes_target = Some(edge_ref.target()),
                EbdGraphEdge::ToNo => no_target = Some(edge_ref.target()),
                EbdGraphEdge::Plain => {}
            }
        }
        let (Some(yes_idx), Some(no_idx)) = (yes_target, no_target) else {
            continue;
        };

        let from_yes = reachable_from(digraph, yes_idx);
        let from_no = reachable_from(digraph, no_idx);
        let distances = hop_distances(digraph, decision_idx);

        // the decision node itself can show up in both sets when a branch
        // loops back to it; a loop head is not a merge point below the node
        let candidate = from_yes
            .intersection(&from_no)
            .filter(|idx| {
                **idx != decision_idx && !matches!(digraph[**idx], EbdGraphNode::End)
            })
            .min_by_key(|idx| (distances[*idx], digraph[**idx].key()));

        if let Some(merge_idx) = candidate {
            let merge_key = digraph[*merge_idx].key().to_string();
            trace!(decision = %step_number, merge_point = %merge_key, "branches reconverge");
            merge_points
                .entry(merge_key)
                .or_default()
                .insert(step_number.clone());
        }
    }

    graph.set_merge_points(merge_points);
}
