use crate::TechniqueId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named step in an attack progression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technique {
    pub id: TechniqueId,
    pub name: String,
    #[serde(default)]
    pub tactic: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Technique {
    pub fn new(id: impl Into<TechniqueId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tactic: None,
            description: None,
        }
    }
}

/// One predicted next stage, with the model's probability estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagePrediction {
    pub technique_id: TechniqueId,
    pub technique_name: String,
    pub probability: f32,
}

impl StagePrediction {
    pub fn new(
        id: impl Into<TechniqueId>,
        name: impl Into<String>,
        probability: f32,
    ) -> Self {
        Self {
            technique_id: id.into(),
            technique_name: name.into(),
            probability,
        }
    }
}

/// A snapshot of incident state as delivered by the simulation backend.
///
/// `history` is ordered oldest first; by upstream construction its last entry
/// equals the current technique's id. Empty `history` and empty `predictions`
/// are both valid, as is a missing `current` technique (a degraded snapshot
/// that still yields a renderable graph).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentSnapshot {
    #[serde(default)]
    pub incident_id: Option<String>,
    #[serde(default)]
    pub history: Vec<TechniqueId>,
    #[serde(default, alias = "current_technique")]
    pub current: Option<Technique>,
    #[serde(default, alias = "next_possible_stages")]
    pub predictions: Vec<StagePrediction>,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed snapshot json: {0}")]
    Parse(#[from] serde_json::Error),
}

impl IncidentSnapshot {
    /// Parse a snapshot from the backend's JSON wire format.
    ///
    /// Accepts both the compact field names and the backend's verbose ones
    /// (`current_technique`, `next_possible_stages`).
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }
}
