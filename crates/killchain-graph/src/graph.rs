use killchain_core::{EdgeKind, NodeCategory, TechniqueId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::{Add, AddAssign, Index, IndexMut, Mul, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeIndex(pub usize);

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeIndex(pub usize);

impl fmt::Display for EdgeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn length_sq(self) -> f32 {
        self.x * self.x + self.y * self.y
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

/// A node of the attack-path graph.
///
/// `position` is owned by the force simulation while the node is unpinned;
/// `pin` overrides it for the duration of a drag gesture. `velocity` is
/// internal integration state and never leaves this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: TechniqueId,
    pub label: String,
    pub category: NodeCategory,
    /// In `[0, 1]`; 1.0 for observed techniques, the prediction probability
    /// for predicted ones.
    pub confidence: f32,
    pub position: Vec2,
    pub pin: Option<Vec2>,
    pub(crate) velocity: Vec2,
}

impl GraphNode {
    pub fn is_pinned(&self) -> bool {
        self.pin.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: TechniqueId,
    pub target: TechniqueId,
    pub kind: EdgeKind,
    /// Prediction probability for `Predicted` edges, a constant 1.0 for
    /// `Confirmed` ones.
    pub weight: f32,
    pub source_idx: NodeIndex,
    pub target_idx: NodeIndex,
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        let idx = NodeIndex(self.nodes.len());
        self.nodes.push(node);
        idx
    }

    pub fn add_edge(
        &mut self,
        source_idx: NodeIndex,
        target_idx: NodeIndex,
        edge: GraphEdge,
    ) -> EdgeIndex {
        let idx = EdgeIndex(self.edges.len());
        // Ensure edge has correct indices
        let mut edge = edge;
        edge.source_idx = source_idx;
        edge.target_idx = target_idx;
        self.edges.push(edge);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        (0..self.nodes.len()).map(NodeIndex)
    }

    pub fn edge_indices(&self) -> impl Iterator<Item = EdgeIndex> {
        (0..self.edges.len()).map(EdgeIndex)
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn edge_endpoints(&self, index: EdgeIndex) -> Option<(NodeIndex, NodeIndex)> {
        self.edges
            .get(index.0)
            .map(|e| (e.source_idx, e.target_idx))
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [GraphNode] {
        &mut self.nodes
    }
}

impl Index<NodeIndex> for Graph {
    type Output = GraphNode;
    fn index(&self, index: NodeIndex) -> &Self::Output {
        &self.nodes[index.0]
    }
}

impl IndexMut<NodeIndex> for Graph {
    fn index_mut(&mut self, index: NodeIndex) -> &mut Self::Output {
        &mut self.nodes[index.0]
    }
}

impl Index<EdgeIndex> for Graph {
    type Output = GraphEdge;
    fn index(&self, index: EdgeIndex) -> &Self::Output {
        &self.edges[index.0]
    }
}

impl IndexMut<EdgeIndex> for Graph {
    fn index_mut(&mut self, index: EdgeIndex) -> &mut Self::Output {
        &mut self.edges[index.0]
    }
}

/// The deduplicated graph of one incident-state snapshot.
///
/// Nodes are identified by technique id; inserting an id twice is a no-op
/// apart from the single sanctioned `History` -> `Current` category upgrade.
/// Edges whose endpoints are missing are dropped rather than inserted
/// dangling.
#[derive(Debug, Default)]
pub struct GraphModel {
    pub graph: Graph,
    pub node_map: HashMap<TechniqueId, NodeIndex>,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node unless its id is already present.
    ///
    /// On a duplicate insert the existing node wins; the only mutation applied
    /// is the `History` -> `Current` upgrade (plus taking the richer display
    /// label), so the most recently visited technique is always the one
    /// marked current and a prediction can never displace an observed node.
    pub fn add_node(
        &mut self,
        id: TechniqueId,
        label: String,
        category: NodeCategory,
        confidence: f32,
    ) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&id) {
            let node = &mut self.graph[idx];
            if node.category.can_upgrade_to(category) {
                node.category = category;
                node.label = label;
            }
            return idx;
        }

        let node = GraphNode {
            id: id.clone(),
            label,
            category,
            confidence: confidence.clamp(0.0, 1.0),
            position: Vec2::ZERO,
            pin: None,
            velocity: Vec2::ZERO,
        };
        let idx = self.graph.add_node(node);
        self.node_map.insert(id, idx);
        idx
    }

    /// Insert an edge between two existing nodes.
    ///
    /// A missing endpoint indicates a contract violation upstream; the edge is
    /// dropped and logged instead of halting layout.
    pub fn add_edge(&mut self, source: TechniqueId, target: TechniqueId, kind: EdgeKind, weight: f32) {
        if let (Some(&src), Some(&tgt)) = (self.node_map.get(&source), self.node_map.get(&target)) {
            let edge = GraphEdge {
                source,
                target,
                kind,
                weight,
                source_idx: src,
                target_idx: tgt,
            };
            self.graph.add_edge(src, tgt, edge);
        } else {
            if !self.node_map.contains_key(&source) {
                tracing::warn!(
                    "Dropping {:?} edge because source node {} is missing from graph model",
                    kind,
                    source
                );
            }
            if !self.node_map.contains_key(&target) {
                tracing::warn!(
                    "Dropping {:?} edge because target node {} is missing from graph model",
                    kind,
                    target
                );
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_map.contains_key(id)
    }

    pub fn get_node(&self, id: &str) -> Option<&GraphNode> {
        self.node_map.get(id).map(|&idx| &self.graph[idx])
    }

    pub fn get_node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        self.node_map.get(id).map(|&idx| &mut self.graph[idx])
    }

    /// The single node marked current, if the snapshot declared one.
    pub fn current_node(&self) -> Option<&GraphNode> {
        self.graph
            .nodes()
            .iter()
            .find(|n| n.category == NodeCategory::Current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(model: &mut GraphModel, id: &str, category: NodeCategory, confidence: f32) {
        model.add_node(TechniqueId::from(id), id.to_string(), category, confidence);
    }

    #[test]
    fn test_duplicate_insert_is_noop() {
        let mut model = GraphModel::new();
        add(&mut model, "T1566", NodeCategory::History, 1.0);
        add(&mut model, "T1566", NodeCategory::Predicted, 0.4);

        assert_eq!(model.node_count(), 1);
        let node = model.get_node("T1566").unwrap();
        assert_eq!(node.category, NodeCategory::History);
        assert_eq!(node.confidence, 1.0);
    }

    #[test]
    fn test_history_upgrades_to_current() {
        let mut model = GraphModel::new();
        add(&mut model, "T1059", NodeCategory::History, 1.0);
        model.add_node(
            TechniqueId::from("T1059"),
            "Command and Scripting Interpreter".to_string(),
            NodeCategory::Current,
            1.0,
        );

        assert_eq!(model.node_count(), 1);
        let node = model.get_node("T1059").unwrap();
        assert_eq!(node.category, NodeCategory::Current);
        assert_eq!(node.label, "Command and Scripting Interpreter");
    }

    #[test]
    fn test_dangling_edge_is_dropped() {
        let mut model = GraphModel::new();
        add(&mut model, "T1566", NodeCategory::Current, 1.0);
        model.add_edge(
            TechniqueId::from("T1566"),
            TechniqueId::from("T9999"),
            EdgeKind::Predicted,
            0.5,
        );

        assert_eq!(model.edge_count(), 0);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let mut model = GraphModel::new();
        add(&mut model, "A", NodeCategory::Predicted, 1.7);
        add(&mut model, "B", NodeCategory::Predicted, -0.2);

        assert_eq!(model.get_node("A").unwrap().confidence, 1.0);
        assert_eq!(model.get_node("B").unwrap().confidence, 0.0);
    }
}
