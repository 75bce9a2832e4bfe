use killchain_graph::SimulationParams;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub show_labels: bool,
    pub show_probabilities: bool,
    /// Replay the built-in scenario on a timer instead of manual stepping.
    pub auto_advance: bool,
    pub auto_advance_interval_secs: f32,
    #[serde(default)]
    pub physics: PhysicsSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            show_labels: true,
            show_probabilities: true,
            auto_advance: false,
            auto_advance_interval_secs: default_advance_interval(),
            physics: PhysicsSettings::default(),
        }
    }
}

/// User-tunable subset of the layout constants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    pub link_distance: f32,
    pub charge_strength: f32,
    pub lane_strength: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        let params = SimulationParams::default();
        Self {
            link_distance: params.link_distance,
            charge_strength: params.charge_strength,
            lane_strength: params.lane_strength,
        }
    }
}

impl PhysicsSettings {
    pub fn to_params(self) -> SimulationParams {
        SimulationParams {
            link_distance: self.link_distance,
            charge_strength: self.charge_strength,
            lane_strength: self.lane_strength,
            ..SimulationParams::default()
        }
    }
}

fn default_advance_interval() -> f32 {
    6.0
}
