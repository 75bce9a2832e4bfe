//! Property tests for graph construction: whatever the backend sends, the
//! resulting model stays internally consistent.

use killchain_core::{IncidentSnapshot, NodeCategory, StagePrediction, Technique, TechniqueId};
use killchain_graph::GraphBuilder;
use proptest::prelude::*;
use std::collections::HashSet;

const ID_POOL: &[&str] = &["T1", "T2", "T3", "T4", "T5", "T6", "T7", "T8"];

fn arb_id() -> impl Strategy<Value = TechniqueId> {
    (0..ID_POOL.len()).prop_map(|i| TechniqueId::from(ID_POOL[i]))
}

fn arb_snapshot() -> impl Strategy<Value = IncidentSnapshot> {
    (
        prop::collection::vec(arb_id(), 0..6),
        prop::option::of(arb_id()),
        prop::collection::vec((arb_id(), -0.5f32..1.5f32), 0..5),
    )
        .prop_map(|(history, current, predictions)| IncidentSnapshot {
            incident_id: None,
            history,
            current: current.map(|id| Technique::new(id.as_str(), format!("{id} stage"))),
            predictions: predictions
                .into_iter()
                .map(|(id, p)| StagePrediction::new(id.as_str(), format!("{id} stage"), p))
                .collect(),
        })
}

proptest! {
    #[test]
    fn node_ids_are_unique(snapshot in arb_snapshot()) {
        let model = GraphBuilder::build(&snapshot);
        let mut seen = HashSet::new();
        for node in model.graph.nodes() {
            prop_assert!(seen.insert(node.id.clone()), "duplicate node id {}", node.id);
        }
    }

    #[test]
    fn every_edge_endpoint_exists(snapshot in arb_snapshot()) {
        let model = GraphBuilder::build(&snapshot);
        for edge in model.graph.edges() {
            prop_assert!(model.contains(edge.source.as_str()));
            prop_assert!(model.contains(edge.target.as_str()));
            prop_assert!(edge.source_idx.0 < model.node_count());
            prop_assert!(edge.target_idx.0 < model.node_count());
        }
    }

    #[test]
    fn confidence_stays_in_unit_interval(snapshot in arb_snapshot()) {
        let model = GraphBuilder::build(&snapshot);
        for node in model.graph.nodes() {
            prop_assert!((0.0..=1.0).contains(&node.confidence));
        }
    }

    #[test]
    fn at_most_one_current_node(snapshot in arb_snapshot()) {
        let model = GraphBuilder::build(&snapshot);
        let current_count = model
            .graph
            .nodes()
            .iter()
            .filter(|n| n.category == NodeCategory::Current)
            .count();
        prop_assert!(current_count <= 1);
        if snapshot.current.is_some() {
            prop_assert_eq!(current_count, 1);
        }
    }

    #[test]
    fn predictions_never_displace_observed_nodes(snapshot in arb_snapshot()) {
        let model = GraphBuilder::build(&snapshot);
        let observed: HashSet<&TechniqueId> = snapshot.history.iter().collect();
        for node in model.graph.nodes() {
            if observed.contains(&node.id) {
                prop_assert_ne!(node.category, NodeCategory::Predicted);
            }
        }
    }

    #[test]
    fn build_twice_yields_identical_structure(snapshot in arb_snapshot()) {
        let a = GraphBuilder::build(&snapshot);
        let b = GraphBuilder::build(&snapshot);
        prop_assert_eq!(a.node_count(), b.node_count());
        prop_assert_eq!(a.edge_count(), b.edge_count());
        for (na, nb) in a.graph.nodes().iter().zip(b.graph.nodes()) {
            prop_assert_eq!(&na.id, &nb.id);
            prop_assert_eq!(na.category, nb.category);
        }
    }
}
