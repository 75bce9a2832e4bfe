use crate::graph::Vec2;
use crate::simulation::{ForceSimulation, DRAG_ALPHA_TARGET};
use killchain_core::TechniqueId;
use std::collections::HashSet;

/// Translates pointer drag gestures into simulator pins and re-heats.
///
/// Each gesture is keyed by the node id it grabbed, so independent gestures
/// (multi-touch) can pin several nodes at once while a single gesture only
/// ever pins one. Unknown node ids are silently ignored; pointer callbacks
/// only write the pin and the alpha target, so they are safe to call from the
/// same thread that ticks the simulation.
#[derive(Debug, Default)]
pub struct DragController {
    active: HashSet<TechniqueId>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        !self.active.is_empty()
    }

    pub fn is_node_dragged(&self, id: &str) -> bool {
        self.active.contains(id)
    }

    /// Begin a drag: pin the node at its current position and re-heat the
    /// layout so unpinned neighbors respond live. Returns false for unknown
    /// node ids.
    pub fn on_drag_start(&mut self, sim: &mut ForceSimulation, id: &TechniqueId) -> bool {
        let Some(node) = sim.model().get_node(id.as_str()) else {
            tracing::debug!("Ignoring drag start for unknown node {id}");
            return false;
        };
        let position = node.position;
        sim.pin_node(id.as_str(), position);
        sim.set_alpha_target(DRAG_ALPHA_TARGET);
        self.active.insert(id.clone());
        true
    }

    /// Track the pointer: the pin follows every move event, so the dragged
    /// node renders at the pointer with zero lag.
    pub fn on_drag_move(&mut self, sim: &mut ForceSimulation, id: &str, pointer: Vec2) {
        if !self.active.contains(id) {
            return;
        }
        sim.pin_node(id, pointer);
    }

    /// End a drag: release the pin and, once no gesture remains active, let
    /// the simulation cool back down.
    pub fn on_drag_end(&mut self, sim: &mut ForceSimulation, id: &str) {
        if self.active.take(id).is_none() {
            return;
        }
        sim.unpin_node(id);
        if self.active.is_empty() {
            sim.set_alpha_target(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use crate::simulation::SimulationParams;
    use killchain_core::{IncidentSnapshot, StagePrediction, Technique};

    fn sim() -> ForceSimulation {
        let snapshot = IncidentSnapshot {
            incident_id: None,
            history: vec!["T1".into(), "T2".into()],
            current: Some(Technique::new("T2", "Stage 2")),
            predictions: vec![StagePrediction::new("T3", "Stage 3", 0.6)],
        };
        ForceSimulation::new(GraphBuilder::build(&snapshot), SimulationParams::default())
    }

    #[test]
    fn test_drag_pins_and_reheats() {
        let mut sim = sim();
        let mut drag = DragController::new();
        let start = sim.model().get_node("T2").unwrap().position;

        assert!(drag.on_drag_start(&mut sim, &TechniqueId::from("T2")));
        assert!(drag.is_dragging());
        assert_eq!(sim.alpha_target(), DRAG_ALPHA_TARGET);
        assert_eq!(sim.model().get_node("T2").unwrap().pin, Some(start));

        let pointer = Vec2::new(300.0, 111.0);
        drag.on_drag_move(&mut sim, "T2", pointer);
        sim.step();
        assert_eq!(sim.model().get_node("T2").unwrap().position, pointer);
    }

    #[test]
    fn test_drag_end_releases_and_cools() {
        let mut sim = sim();
        let mut drag = DragController::new();
        drag.on_drag_start(&mut sim, &TechniqueId::from("T1"));
        drag.on_drag_end(&mut sim, "T1");

        assert!(!drag.is_dragging());
        assert_eq!(sim.alpha_target(), 0.0);
        assert!(sim.model().get_node("T1").unwrap().pin.is_none());
    }

    #[test]
    fn test_unknown_node_is_noop() {
        let mut sim = sim();
        let mut drag = DragController::new();

        assert!(!drag.on_drag_start(&mut sim, &TechniqueId::from("T9999")));
        assert!(!drag.is_dragging());
        assert_eq!(sim.alpha_target(), 0.0);

        // Move/end without a matching start are ignored too.
        drag.on_drag_move(&mut sim, "T1", Vec2::new(5.0, 5.0));
        drag.on_drag_end(&mut sim, "T1");
        assert!(sim.model().get_node("T1").unwrap().pin.is_none());
        assert_eq!(sim.alpha_target(), 0.0);
    }

    #[test]
    fn test_concurrent_gestures_cool_only_after_last_release() {
        let mut sim = sim();
        let mut drag = DragController::new();
        drag.on_drag_start(&mut sim, &TechniqueId::from("T1"));
        drag.on_drag_start(&mut sim, &TechniqueId::from("T3"));
        assert!(drag.is_node_dragged("T1"));
        assert!(drag.is_node_dragged("T3"));

        drag.on_drag_end(&mut sim, "T1");
        // One gesture still active: stay hot.
        assert_eq!(sim.alpha_target(), DRAG_ALPHA_TARGET);
        assert!(sim.model().get_node("T3").unwrap().is_pinned());

        drag.on_drag_end(&mut sim, "T3");
        assert_eq!(sim.alpha_target(), 0.0);
    }
}
