use crate::graph::{GraphModel, Vec2};
use killchain_core::{NodeCategory, TechniqueId};
use std::collections::HashMap;
use std::f32::consts::TAU;

/// Tunable constants of the relaxation process. Defaults mirror the layout
/// the incident view has always shipped with.
#[derive(Debug, Clone, Copy)]
pub struct SimulationParams {
    /// Logical canvas size; lane anchors and the centering force derive from it.
    pub width: f32,
    pub height: f32,
    /// Target separation of linked nodes.
    pub link_distance: f32,
    /// Magnitude of the pairwise repulsion charge.
    pub charge_strength: f32,
    /// Fraction of the centroid-to-center offset corrected per tick.
    pub center_strength: f32,
    /// Pull toward the per-category lane anchor.
    pub lane_strength: f32,
    /// Velocity multiplier applied each tick (damping).
    pub velocity_decay: f32,
    /// Geometric relaxation rate of alpha toward its target.
    pub alpha_decay: f32,
    /// Below this alpha the simulation counts as settled.
    pub alpha_min: f32,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 500.0,
            link_distance: 120.0,
            charge_strength: 400.0,
            center_strength: 1.0,
            lane_strength: 0.8,
            velocity_decay: 0.6,
            alpha_decay: 0.0228,
            alpha_min: 0.001,
        }
    }
}

impl SimulationParams {
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Target x-coordinate of a node, determined solely by its category:
    /// history to the left, current in the middle, predictions to the right.
    pub fn lane_x(&self, category: NodeCategory) -> f32 {
        match category {
            NodeCategory::History => self.width * 0.2,
            NodeCategory::Current => self.width * 0.5,
            NodeCategory::Predicted => self.width * 0.8,
        }
    }
}

/// Alpha target applied while a drag gesture is active (re-heat level).
pub const DRAG_ALPHA_TARGET: f32 = 0.3;

const SEED_RADIUS: f32 = 60.0;
const NEIGHBOR_SEED_OFFSET: f32 = 24.0;
// Floor for squared distances so coincident nodes cannot produce infinite forces.
const MIN_DISTANCE_SQ: f32 = 1.0;

/// Iterative force-directed layout over one [`GraphModel`].
///
/// The simulation owns the model for its whole lifetime; a new snapshot means
/// a new `ForceSimulation` (positions can be carried over via
/// [`ForceSimulation::seed_from`]). `step()` advances exactly one tick so a
/// render loop can interleave drawing with relaxation, and drag gestures
/// re-heat the process through [`ForceSimulation::set_alpha_target`].
pub struct ForceSimulation {
    model: GraphModel,
    params: SimulationParams,
    /// Edge-incidence count per node, used to soften link forces on
    /// high-degree nodes.
    degrees: Vec<usize>,
    alpha: f32,
    alpha_target: f32,
}

impl ForceSimulation {
    pub fn new(model: GraphModel, params: SimulationParams) -> Self {
        let mut degrees = vec![0usize; model.node_count()];
        for edge in model.graph.edges() {
            degrees[edge.source_idx.0] += 1;
            degrees[edge.target_idx.0] += 1;
        }

        let mut sim = Self {
            model,
            params,
            degrees,
            alpha: 1.0,
            alpha_target: 0.0,
        };
        sim.seed_default();
        sim
    }

    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut GraphModel {
        &mut self.model
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn alpha_target(&self) -> f32 {
        self.alpha_target
    }

    /// Raise or lower the energy the process relaxes toward. Raising it above
    /// `alpha_min` keeps the layout live (used during drags); lowering it to
    /// zero lets the simulation decay back to rest.
    pub fn set_alpha_target(&mut self, target: f32) {
        self.alpha_target = target.clamp(0.0, 1.0);
    }

    /// Restart relaxation from full energy without touching positions.
    pub fn reheat(&mut self) {
        self.alpha = 1.0;
    }

    /// Swap in new tuning constants and reheat so the layout re-forms
    /// under them. Positions and pins are kept.
    pub fn set_params(&mut self, params: SimulationParams) {
        self.params = params;
        self.reheat();
    }

    pub fn is_settled(&self) -> bool {
        self.alpha < self.params.alpha_min && self.alpha_target < self.params.alpha_min
    }

    /// Fix a node at `position` until [`ForceSimulation::unpin_node`] is
    /// called. Returns false (and does nothing) for unknown ids.
    pub fn pin_node(&mut self, id: &str, position: Vec2) -> bool {
        match self.model.get_node_mut(id) {
            Some(node) => {
                node.pin = Some(position);
                node.position = position;
                node.velocity = Vec2::ZERO;
                true
            }
            None => false,
        }
    }

    /// Release a pinned node back to force-driven motion.
    pub fn unpin_node(&mut self, id: &str) -> bool {
        match self.model.get_node_mut(id) {
            Some(node) => {
                node.pin = None;
                true
            }
            None => false,
        }
    }

    /// Deterministic initial placement: nodes fan out on a small circle
    /// around their lane anchor, so the relaxation starts roughly
    /// pre-separated into lanes.
    fn seed_default(&mut self) {
        let count = self.model.node_count().max(1) as f32;
        let cy = self.params.height / 2.0;
        let lane = |category| self.params.lane_x(category);
        for (i, node) in self.model.graph.nodes_mut().iter_mut().enumerate() {
            let angle = i as f32 * TAU / count;
            node.position = Vec2::new(
                lane(node.category) + SEED_RADIUS * angle.cos(),
                cy + SEED_RADIUS * angle.sin(),
            );
            node.velocity = Vec2::ZERO;
        }
    }

    /// Re-seed from positions retained across a snapshot rebuild, keyed by
    /// technique id. Known nodes resume exactly where they settled; new nodes
    /// start near the retained position of a graph neighbor so they grow out
    /// of the existing picture instead of jumping in from the seed circle.
    pub fn seed_from(&mut self, prior: &HashMap<TechniqueId, Vec2>) {
        let mut seeded = Vec::with_capacity(self.model.node_count());
        for node in self.model.graph.nodes() {
            seeded.push(prior.get(node.id.as_str()).copied());
        }

        // Neighbor anchors for nodes the prior layout has never seen.
        let mut anchors: Vec<Option<Vec2>> = vec![None; self.model.node_count()];
        for edge in self.model.graph.edges() {
            let (s, t) = (edge.source_idx.0, edge.target_idx.0);
            if anchors[t].is_none() {
                anchors[t] = seeded[s];
            }
            if anchors[s].is_none() {
                anchors[s] = seeded[t];
            }
        }

        for (i, node) in self.model.graph.nodes_mut().iter_mut().enumerate() {
            match (seeded[i], anchors[i]) {
                (Some(position), _) => {
                    node.position = position;
                    node.velocity = Vec2::ZERO;
                }
                (None, Some(anchor)) => {
                    let angle = i as f32 * TAU / 8.0;
                    node.position = anchor
                        + Vec2::new(
                            NEIGHBOR_SEED_OFFSET * angle.cos(),
                            NEIGHBOR_SEED_OFFSET * angle.sin(),
                        );
                    node.velocity = Vec2::ZERO;
                }
                // Keep the default seed position.
                (None, None) => {}
            }
        }
    }

    /// Snapshot of current positions, for carrying layout across rebuilds.
    pub fn positions_by_id(&self) -> HashMap<TechniqueId, Vec2> {
        self.model
            .graph
            .nodes()
            .iter()
            .map(|n| (n.id.clone(), n.position))
            .collect()
    }

    /// Advance the relaxation by one tick. Returns false once the process has
    /// settled (alpha under its floor with no re-heat target), in which case
    /// positions are left untouched.
    pub fn step(&mut self) -> bool {
        if self.model.node_count() == 0 {
            return false;
        }
        if self.is_settled() {
            return false;
        }

        self.alpha += (self.alpha_target - self.alpha) * self.params.alpha_decay;

        self.apply_link_force();
        self.apply_repulsion();
        self.apply_lane_bias();
        self.apply_centering();
        self.integrate();
        true
    }

    /// Spring each edge toward `link_distance`. Strength scales with the
    /// inverse of the smaller endpoint degree, and the correction is split
    /// between the endpoints biased toward the less constrained one, so
    /// high-degree nodes are not yanked around by every incident link.
    fn apply_link_force(&mut self) {
        let alpha = self.alpha;
        let distance = self.params.link_distance;
        let edges: Vec<(usize, usize)> = self
            .model
            .graph
            .edges()
            .iter()
            .map(|e| (e.source_idx.0, e.target_idx.0))
            .collect();

        let nodes = self.model.graph.nodes_mut();
        for (s, t) in edges {
            if s == t {
                continue;
            }
            let delta = (nodes[t].position + nodes[t].velocity)
                - (nodes[s].position + nodes[s].velocity);
            let len = delta.length().max(MIN_DISTANCE_SQ.sqrt());
            let deg_s = self.degrees[s] as f32;
            let deg_t = self.degrees[t] as f32;
            let strength = 1.0 / deg_s.min(deg_t).max(1.0);
            let l = (len - distance) / len * alpha * strength;
            let bias = deg_s / (deg_s + deg_t).max(1.0);

            nodes[t].velocity += delta * (-l * bias);
            nodes[s].velocity += delta * (l * (1.0 - bias));
        }
    }

    /// All-pairs inverse-distance repulsion. O(n²), which is fine for the
    /// tens of nodes an incident graph holds; a spatial index would only pay
    /// off far beyond that.
    fn apply_repulsion(&mut self) {
        let alpha = self.alpha;
        let charge = self.params.charge_strength;
        let nodes = self.model.graph.nodes_mut();
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                let mut delta = nodes[j].position - nodes[i].position;
                if delta.length_sq() < f32::EPSILON {
                    // Coincident nodes: nudge apart along a deterministic axis.
                    delta = Vec2::new(0.1, 0.1 * (j as f32 - i as f32));
                }
                let d2 = delta.length_sq().max(MIN_DISTANCE_SQ);
                let w = charge * alpha / d2;
                nodes[j].velocity += delta * w;
                nodes[i].velocity += delta * (-w);
            }
        }
    }

    /// Pull every node toward the x band of its category.
    fn apply_lane_bias(&mut self) {
        let alpha = self.alpha;
        let strength = self.params.lane_strength;
        let params = self.params;
        for node in self.model.graph.nodes_mut() {
            let target_x = params.lane_x(node.category);
            node.velocity.x += (target_x - node.position.x) * strength * alpha;
        }
    }

    /// Translate the whole layout so its centroid drifts toward the canvas
    /// center. Positional, not velocity-based, so it cannot add energy.
    fn apply_centering(&mut self) {
        let count = self.model.node_count();
        if count == 0 {
            return;
        }
        let mut centroid = Vec2::ZERO;
        for node in self.model.graph.nodes() {
            centroid += node.position;
        }
        let centroid = centroid * (1.0 / count as f32);
        let shift = (centroid - self.params.center()) * self.params.center_strength;
        for node in self.model.graph.nodes_mut() {
            node.position = node.position - shift;
        }
    }

    /// Damped Euler step. Pinned nodes are snapped to their pin last, so the
    /// pin override holds exactly no matter what the force passes computed.
    fn integrate(&mut self) {
        let decay = self.params.velocity_decay;
        for node in self.model.graph.nodes_mut() {
            if let Some(pin) = node.pin {
                node.position = pin;
                node.velocity = Vec2::ZERO;
                continue;
            }
            node.velocity = node.velocity * decay;
            node.position += node.velocity;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use killchain_core::{IncidentSnapshot, StagePrediction, Technique};

    fn demo_snapshot() -> IncidentSnapshot {
        IncidentSnapshot {
            incident_id: None,
            history: vec!["T1".into(), "T2".into(), "T3".into()],
            current: Some(Technique::new("T3", "Stage 3")),
            predictions: vec![
                StagePrediction::new("T4", "Stage 4", 0.7),
                StagePrediction::new("T5", "Stage 5", 0.2),
            ],
        }
    }

    fn demo_sim() -> ForceSimulation {
        ForceSimulation::new(
            GraphBuilder::build(&demo_snapshot()),
            SimulationParams::default(),
        )
    }

    #[test]
    fn test_pinned_node_does_not_drift() {
        let mut sim = demo_sim();
        let pin = Vec2::new(123.0, 45.0);
        assert!(sim.pin_node("T3", pin));
        sim.set_alpha_target(DRAG_ALPHA_TARGET);

        for _ in 0..200 {
            sim.step();
            let node = sim.model().get_node("T3").unwrap();
            assert_eq!(node.position, pin);
            assert!(node.is_pinned());
        }
    }

    #[test]
    fn test_unpinned_node_resumes_motion() {
        let mut sim = demo_sim();
        let pin = Vec2::new(700.0, 20.0);
        sim.pin_node("T1", pin);
        sim.set_alpha_target(DRAG_ALPHA_TARGET);
        for _ in 0..10 {
            sim.step();
        }
        sim.unpin_node("T1");
        for _ in 0..50 {
            sim.step();
        }
        let node = sim.model().get_node("T1").unwrap();
        assert!(!node.is_pinned());
        assert_ne!(node.position, pin);
    }

    #[test]
    fn test_alpha_decays_monotonically_after_drag_end() {
        let mut sim = demo_sim();
        sim.set_alpha_target(DRAG_ALPHA_TARGET);
        for _ in 0..20 {
            sim.step();
        }
        sim.set_alpha_target(0.0);

        let mut prev = sim.alpha();
        for _ in 0..500 {
            if !sim.step() {
                break;
            }
            assert!(sim.alpha() <= prev);
            prev = sim.alpha();
        }
        assert!(sim.is_settled());
    }

    #[test]
    fn test_alpha_rises_toward_raised_target() {
        let mut sim = demo_sim();
        // Burn down close to rest first.
        while sim.step() {}
        let cold = sim.alpha();
        sim.set_alpha_target(DRAG_ALPHA_TARGET);
        sim.step();
        assert!(sim.alpha() > cold);
    }

    #[test]
    fn test_categories_separate_into_lanes() {
        let mut sim = demo_sim();
        for _ in 0..300 {
            sim.step();
        }

        let x_of = |id: &str| sim.model().get_node(id).unwrap().position.x;
        let history_x = (x_of("T1") + x_of("T2")) / 2.0;
        let current_x = x_of("T3");
        let predicted_x = (x_of("T4") + x_of("T5")) / 2.0;

        assert!(history_x < current_x, "{history_x} !< {current_x}");
        assert!(current_x < predicted_x, "{current_x} !< {predicted_x}");
    }

    #[test]
    fn test_centroid_settles_near_canvas_center() {
        let mut sim = demo_sim();
        for _ in 0..300 {
            sim.step();
        }
        let nodes = sim.model().graph.nodes();
        let mut centroid = Vec2::ZERO;
        for node in nodes {
            centroid += node.position;
        }
        let centroid = centroid * (1.0 / nodes.len() as f32);
        let center = sim.params().center();
        assert!((centroid.x - center.x).abs() < 1.0);
        assert!((centroid.y - center.y).abs() < 1.0);
    }

    #[test]
    fn test_empty_graph_step_is_inert() {
        let mut sim = ForceSimulation::new(GraphModel::default(), SimulationParams::default());
        assert!(!sim.step());
    }

    #[test]
    fn test_seed_from_retains_prior_positions() {
        let sim = demo_sim();
        let prior = sim.positions_by_id();

        // Next snapshot: T4 got confirmed, T6 is newly predicted off T4.
        let next = IncidentSnapshot {
            incident_id: None,
            history: vec!["T1".into(), "T2".into(), "T3".into(), "T4".into()],
            current: Some(Technique::new("T4", "Stage 4")),
            predictions: vec![StagePrediction::new("T6", "Stage 6", 0.5)],
        };
        let mut rebuilt = ForceSimulation::new(GraphBuilder::build(&next), SimulationParams::default());
        rebuilt.seed_from(&prior);

        // Known nodes resume exactly where they settled.
        for id in ["T1", "T2", "T3", "T4"] {
            assert_eq!(
                rebuilt.model().get_node(id).unwrap().position,
                prior[id],
                "{id} should reuse its retained position"
            );
        }

        // The new node starts near its neighbor T4, not on the seed circle.
        let t6 = rebuilt.model().get_node("T6").unwrap().position;
        let t4 = prior["T4"];
        assert!((t6 - t4).length() <= NEIGHBOR_SEED_OFFSET + 0.001);
    }

    #[test]
    fn test_linked_pair_approaches_link_distance() {
        let snapshot = IncidentSnapshot {
            incident_id: None,
            history: vec!["A".into(), "B".into()],
            current: Some(Technique::new("B", "B")),
            predictions: vec![],
        };
        let mut sim = ForceSimulation::new(GraphBuilder::build(&snapshot), SimulationParams::default());
        for _ in 0..300 {
            sim.step();
        }
        let a = sim.model().get_node("A").unwrap().position;
        let b = sim.model().get_node("B").unwrap().position;
        let separation = (a - b).length();
        // Link pulls toward 120 while charge and lane bias push back; the
        // settled separation stays in the same ballpark.
        assert!(separation > 40.0, "collapsed: {separation}");
        assert!(separation < 400.0, "flew apart: {separation}");
    }
}
