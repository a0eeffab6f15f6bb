//! The graph side: typed nodes and edges plus the [`EbdGraph`] container.
//!
//! Nodes are stored arena-style in a petgraph `DiGraph` and indexed by a
//! string key that is unique within the graph. Edges reference their
//! endpoints through the graph rather than owning them, so shared targets
//! (several branches ending in the same outcome) never get duplicated.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};
use serde::{Deserialize, Serialize};

use crate::{EbdError, Result};

/// Key of the implicit start node.
pub const START_NODE_KEY: &str = "Start";

/// Key of the single end node ("Ende").
pub const END_NODE_KEY: &str = "Ende";

/// Metadata of an EBD graph.
///
/// Field-wise identical to `EbdTableMetaData`, but deliberately decoupled:
/// the graph side must not depend on how the table side evolves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EbdGraphMetaData {
    /// ID of the EBD, e.g. `E_0003`.
    pub ebd_code: String,
    /// Chapter from the EDI@Energy document.
    pub chapter: String,
    /// Sub-chapter from the EDI@Energy document.
    pub sub_chapter: String,
    /// The checking role, e.g. `BIKO`.
    pub role: String,
}

/// A node in the EBD graph.
///
/// Closed set of variants; exhaustive matches are intended to break when a
/// new kind of node is introduced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EbdGraphNode {
    /// The single entry point of the diagram.
    Start,
    /// The single exit point of the diagram.
    End,
    /// A question answered with yes ("ja") or no ("nein").
    Decision {
        /// Number of the Prüfschritt, e.g. `1`, `2` or `6*`.
        step_number: String,
        /// The question asked at this node.
        question: String,
    },
    /// A leaf of the decision process, carrying a coded result.
    Outcome {
        /// The coded result, e.g. `A55`.
        result_code: String,
        /// Optional free-text note for this outcome.
        note: Option<String>,
    },
}

impl EbdGraphNode {
    /// Returns the key that is unique for this node in the entire graph.
    pub fn key(&self) -> &str {
        match self {
            EbdGraphNode::Start => START_NODE_KEY,
            EbdGraphNode::End => END_NODE_KEY,
            EbdGraphNode::Decision { step_number, .. } => step_number,
            EbdGraphNode::Outcome { result_code, .. } => result_code,
        }
    }
}

/// An edge in the EBD graph. Yes/no edges are only valid with a decision
/// node as their source; this is enforced by the validator, not the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, strum::AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EbdGraphEdge {
    /// An unconditional edge (start node → first step).
    Plain,
    /// The edge taken when the question is answered with yes.
    ToYes,
    /// The edge taken when the question is answered with no.
    ToNo,
}

impl EbdGraphEdge {
    /// Short label used in error messages and debug output.
    pub fn label(&self) -> &'static str {
        match self {
            EbdGraphEdge::Plain => "plain",
            EbdGraphEdge::ToYes => "yes",
            EbdGraphEdge::ToNo => "no",
        }
    }
}

/// The structured representation of an Entscheidungsbaumdiagramm.
///
/// Owns all nodes and edges. Nodes are unique by key; edges connect keys.
/// After conversion, validation and annotation the graph is treated as
/// immutable by all downstream consumers.
#[derive(Debug, Clone)]
pub struct EbdGraph {
    metadata: EbdGraphMetaData,
    graph: DiGraph<EbdGraphNode, EbdGraphEdge>,
    /// key → index lookup; the single source of truth for key uniqueness.
    key_index: HashMap<String, NodeIndex>,
    /// Convergence annotations: key of a merge point → keys of the decision
    /// nodes whose sibling branches reconverge there. Additive metadata,
    /// never a structural change.
    merge_points: BTreeMap<String, BTreeSet<String>>,
}

impl EbdGraph {
    /// Creates an empty graph carrying the given metadata.
    pub fn new(metadata: EbdGraphMetaData) -> Self {
        Self {
            metadata,
            graph: DiGraph::new(),
            key_index: HashMap::new(),
            merge_points: BTreeMap::new(),
        }
    }

    /// The metadata copied over from the source table.
    pub fn metadata(&self) -> &EbdGraphMetaData {
        &self.metadata
    }

    /// Adds a node. Fails if a node with the same key already exists.
    pub fn add_node(&mut self, node: EbdGraphNode) -> Result<NodeIndex> {
        let key = node.key().to_string();
        if self.key_index.contains_key(&key) {
            return Err(EbdError::Graph(format!("duplicate node key '{}'", key)));
        }
        let idx = self.graph.add_node(node);
        self.key_index.insert(key, idx);
        Ok(idx)
    }

    /// Adds an edge between two nodes identified by key.
    pub fn add_edge(&mut self, source: &str, target: &str, edge: EbdGraphEdge) -> Result<()> {
        let source_idx = self
            .node_index(source)
            .ok_or_else(|| EbdError::Graph(format!("edge source '{}' not found", source)))?;
        let target_idx = self
            .node_index(target)
            .ok_or_else(|| EbdError::Graph(format!("edge target '{}' not found", target)))?;
        self.graph.add_edge(source_idx, target_idx, edge);
        Ok(())
    }

    /// Looks up a node index by key.
    pub fn node_index(&self, key: &str) -> Option<NodeIndex> {
        self.key_index.get(key).copied()
    }

    /// Looks up a node by key.
    pub fn node(&self, key: &str) -> Option<&EbdGraphNode> {
        self.node_index(key).map(|idx| &self.graph[idx])
    }

    /// Whether a node with this key exists.
    pub fn contains(&self, key: &str) -> bool {
        self.key_index.contains_key(key)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &EbdGraphNode> {
        self.graph.node_indices().map(|idx| &self.graph[idx])
    }

    /// All edges as `(source_key, target_key, edge)` triples, in insertion
    /// order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, EbdGraphEdge)> {
        self.graph.edge_references().map(|edge_ref| {
            (
                self.graph[edge_ref.source()].key(),
                self.graph[edge_ref.target()].key(),
                *edge_ref.weight(),
            )
        })
    }

    /// Outgoing edges of the node with the given key, as
    /// `(target_key, edge)` pairs.
    pub fn outgoing(&self, key: &str) -> Vec<(&str, EbdGraphEdge)> {
        self.node_index(key)
            .map(|idx| {
                self.graph
                    .edges_directed(idx, Direction::Outgoing)
                    .map(|edge_ref| (self.graph[edge_ref.target()].key(), *edge_ref.weight()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn out_degree(&self, key: &str) -> usize {
        self.node_index(key)
            .map(|idx| self.graph.edges_directed(idx, Direction::Outgoing).count())
            .unwrap_or(0)
    }

    pub fn in_degree(&self, key: &str) -> usize {
        self.node_index(key)
            .map(|idx| self.graph.edges_directed(idx, Direction::Incoming).count())
            .unwrap_or(0)
    }

    /// Read access to the underlying petgraph graph for traversals.
    pub(crate) fn digraph(&self) -> &DiGraph<EbdGraphNode, EbdGraphEdge> {
        &self.graph
    }

    /// The convergence annotations: merge-point key → keys of the decision
    /// nodes whose branches reconverge there.
    pub fn merge_points(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.merge_points
    }

    /// Whether the node with this key has been marked as a merge point.
    pub fn is_merge_point(&self, key: &str) -> bool {
        self.merge_points.contains_key(key)
    }

    /// Replaces the convergence annotations. Only the annotator writes here.
    pub(crate) fn set_merge_points(&mut self, merge_points: BTreeMap<String, BTreeSet<String>>) {
        self.merge_points = merge_points;
    }

    /// Output a human-readable representation of the graph.
    pub fn schema(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("=== EBD Graph {} ===", self.metadata.ebd_code));
        lines.push(format!(
            "Nodes: {}, Edges: {}",
            self.node_count(),
            self.edge_count()
        ));
        lines.push(String::new());

        lines.push("--- Nodes ---".to_string());
        for node in self.nodes() {
            let marker = if self.is_merge_point(node.key()) { " [merge point]" } else { "" };
            lines.push(format!("[{}] (type: {}){}", node.key(), node.as_ref(), marker));
        }
        lines.push(String::new());

        lines.push("--- Edges ---".to_string());
        for (source, target, edge) in self.edges() {
            lines.push(format!("{} --[{}]--> {}", source, edge.label(), target));
        }
        lines.push(String::new());

        lines.push("--- Graph Structure ---".to_string());
        for node in self.nodes() {
            let outgoing: Vec<String> = self
                .outgoing(node.key())
                .iter()
                .map(|(target, edge)| format!("{}({})", target, edge.label()))
                .collect();

            if outgoing.is_empty() {
                lines.push(format!("{} -> (leaf)", node.key()));
            } else {
                lines.push(format!("{} -> {}", node.key(), outgoing.join(", ")));
            }
        }

        lines.join("\n")
    }
}

/// Structural equality: same metadata, same keyed nodes, same edge triples,
/// same annotations. Node indices are an implementation detail and never
/// take part in the comparison.
impl PartialEq for EbdGraph {
    fn eq(&self, other: &Self) -> bool {
        if self.metadata != other.metadata || self.merge_points != other.merge_points {
            return false;
        }

        let node_set = |g: &Self| -> BTreeMap<String, EbdGraphNode> {
            g.nodes().map(|n| (n.key().to_string(), n.clone())).collect()
        };
        if node_set(self) != node_set(other) {
            return false;
        }

        let edge_set = |g: &Self| -> BTreeSet<(String, String, EbdGraphEdge)> {
            g.edges()
                .map(|(s, t, e)| (s.to_string(), t.to_string(), e))
                .collect()
        };
        edge_set(self) == edge_set(other)
    }
}

impl Eq for EbdGraph {}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> EbdGraphMetaData {
        EbdGraphMetaData {
            ebd_code: "E_0003".to_string(),
            chapter: "7.39 AD: Bestellung der Aggregationsebene RZ".to_string(),
            sub_chapter: "7.39.1 Prüfen, ob Bestellung fristgerecht".to_string(),
            role: "ÜNB".to_string(),
        }
    }

    fn decision(step_number: &str, question: &str) -> EbdGraphNode {
        EbdGraphNode::Decision {
            step_number: step_number.to_string(),
            question: question.to_string(),
        }
    }

    #[test]
    fn test_node_keys() {
        assert_eq!(EbdGraphNode::Start.key(), "Start");
        assert_eq!(EbdGraphNode::End.key(), "Ende");
        assert_eq!(decision("6*", "Wiederholung?").key(), "6*");
        assert_eq!(
            EbdGraphNode::Outcome {
                result_code: "A55".to_string(),
                note: None,
            }
            .key(),
            "A55"
        );
    }

    #[test]
    fn test_keyed_insertion_rejects_duplicates() {
        let mut graph = EbdGraph::new(metadata());
        graph.add_node(decision("1", "Frage?")).unwrap();
        let err = graph.add_node(decision("1", "Andere Frage?")).unwrap_err();
        assert_eq!(err, EbdError::Graph("duplicate node key '1'".to_string()));
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_add_edge_requires_known_endpoints() {
        let mut graph = EbdGraph::new(metadata());
        graph.add_node(EbdGraphNode::Start).unwrap();
        let err = graph.add_edge("Start", "1", EbdGraphEdge::Plain).unwrap_err();
        assert!(matches!(err, EbdError::Graph(_)));
    }

    #[test]
    fn test_outgoing_and_degrees() {
        let mut graph = EbdGraph::new(metadata());
        graph.add_node(EbdGraphNode::Start).unwrap();
        graph.add_node(decision("1", "Frage?")).unwrap();
        graph.add_node(EbdGraphNode::End).unwrap();
        graph.add_edge("Start", "1", EbdGraphEdge::Plain).unwrap();
        graph.add_edge("1", "Ende", EbdGraphEdge::ToYes).unwrap();
        graph.add_edge("1", "Ende", EbdGraphEdge::ToNo).unwrap();

        assert_eq!(graph.out_degree("Start"), 1);
        assert_eq!(graph.out_degree("1"), 2);
        assert_eq!(graph.in_degree("Ende"), 2);

        let mut outgoing = graph.outgoing("1");
        outgoing.sort_by_key(|(_, edge)| *edge);
        assert_eq!(
            outgoing,
            vec![("Ende", EbdGraphEdge::ToYes), ("Ende", EbdGraphEdge::ToNo)]
        );
    }

    #[test]
    fn test_structural_equality_ignores_insertion_order() {
        let mut a = EbdGraph::new(metadata());
        a.add_node(EbdGraphNode::Start).unwrap();
        a.add_node(decision("1", "Frage?")).unwrap();
        a.add_edge("Start", "1", EbdGraphEdge::Plain).unwrap();

        let mut b = EbdGraph::new(metadata());
        b.add_node(decision("1", "Frage?")).unwrap();
        b.add_node(EbdGraphNode::Start).unwrap();
        b.add_edge("Start", "1", EbdGraphEdge::Plain).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_structural_inequality_on_different_payload() {
        let mut a = EbdGraph::new(metadata());
        a.add_node(decision("1", "Frage?")).unwrap();

        let mut b = EbdGraph::new(metadata());
        b.add_node(decision("1", "Andere Frage?")).unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn test_schema_lists_nodes_and_edges() {
        let mut graph = EbdGraph::new(metadata());
        graph.add_node(EbdGraphNode::Start).unwrap();
        graph.add_node(decision("1", "Frage?")).unwrap();
        graph.add_edge("Start", "1", EbdGraphEdge::Plain).unwrap();

        let schema = graph.schema();
        assert!(schema.contains("Nodes: 2, Edges: 1"));
        assert!(schema.contains("Start --[plain]--> 1"));
        assert!(schema.contains("1 -> (leaf)"));
    }
}
