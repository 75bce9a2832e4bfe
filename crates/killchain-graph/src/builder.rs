use crate::graph::GraphModel;
use killchain_core::{EdgeKind, IncidentSnapshot, NodeCategory};

/// Weight carried by every confirmed edge; only predicted edges are scaled by
/// probability.
pub const CONFIRMED_EDGE_WEIGHT: f32 = 1.0;

/// Pure translation of an incident-state snapshot into a deduplicated
/// [`GraphModel`]. Deterministic: the same snapshot always yields the same
/// node set and edge list.
pub struct GraphBuilder;

impl GraphBuilder {
    pub fn build(snapshot: &IncidentSnapshot) -> GraphModel {
        let mut model = GraphModel::new();

        // 1. History chain. History entries carry ids only, so the id doubles
        // as the display label.
        for (i, tech_id) in snapshot.history.iter().enumerate() {
            model.add_node(
                tech_id.clone(),
                tech_id.to_string(),
                NodeCategory::History,
                1.0,
            );
            if i > 0 {
                model.add_edge(
                    snapshot.history[i - 1].clone(),
                    tech_id.clone(),
                    EdgeKind::Confirmed,
                    CONFIRMED_EDGE_WEIGHT,
                );
            }
        }

        // 2. Current technique. The upstream history includes the current id
        // as its last entry, so this usually upgrades an existing history
        // node rather than inserting a new one.
        if let Some(current) = &snapshot.current {
            model.add_node(
                current.id.clone(),
                current.name.clone(),
                NodeCategory::Current,
                1.0,
            );
            // Link the current technique to its predecessor in the observed
            // chain. When history already ends with the current id the history
            // loop above produced that edge, so only the earlier entry counts
            // as predecessor here.
            let predecessor = match snapshot.history.last() {
                Some(last) if *last == current.id => None,
                other => other,
            };
            if let Some(prev) = predecessor {
                model.add_edge(
                    prev.clone(),
                    current.id.clone(),
                    EdgeKind::Confirmed,
                    CONFIRMED_EDGE_WEIGHT,
                );
            }
        }

        // 3. Predictions. First write wins: a predicted id that collides with
        // an observed node keeps its history/current category, but the
        // predicted edge is still added.
        for prediction in &snapshot.predictions {
            let probability = prediction.probability.clamp(0.0, 1.0);
            model.add_node(
                prediction.technique_id.clone(),
                prediction.technique_name.clone(),
                NodeCategory::Predicted,
                probability,
            );
            if let Some(current) = &snapshot.current {
                model.add_edge(
                    current.id.clone(),
                    prediction.technique_id.clone(),
                    EdgeKind::Predicted,
                    probability,
                );
            }
        }

        model
    }
}
