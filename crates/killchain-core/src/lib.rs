use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

pub mod snapshot;

pub use snapshot::{IncidentSnapshot, SnapshotError, StagePrediction, Technique};

/// Identifier of an attack technique, e.g. an ATT&CK id like `"T1566"`.
///
/// Opaque and stable: node identity in the graph model is keyed by this value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TechniqueId(pub String);

impl TechniqueId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TechniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TechniqueId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Borrow<str> for TechniqueId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Category of a graph node within the attack progression.
///
/// `History` and `Current` outrank `Predicted`: once a technique has been
/// observed it is never downgraded back to a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeCategory {
    History,
    Current,
    Predicted,
}

impl NodeCategory {
    /// Whether a node of this category may be replaced by `other`.
    ///
    /// The only permitted transition is `History` -> `Current`, which happens
    /// when the current technique also appears as the last history entry.
    pub fn can_upgrade_to(self, other: NodeCategory) -> bool {
        matches!((self, other), (NodeCategory::History, NodeCategory::Current))
    }
}

impl fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeCategory::History => write!(f, "history"),
            NodeCategory::Current => write!(f, "current"),
            NodeCategory::Predicted => write!(f, "predicted"),
        }
    }
}

/// Kind of a graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Connects consecutive observed techniques (history chain, or the last
    /// history entry to the current technique).
    Confirmed,
    /// Connects the current technique to a predicted next technique.
    Predicted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_technique_id_display_and_borrow() {
        let id = TechniqueId::from("T1566");
        assert_eq!(id.to_string(), "T1566");

        let mut map = std::collections::HashMap::new();
        map.insert(id.clone(), 1);
        // Borrow<str> lets callers look up without allocating
        assert_eq!(map.get("T1566"), Some(&1));
    }

    #[test]
    fn test_category_upgrade_rules() {
        assert!(NodeCategory::History.can_upgrade_to(NodeCategory::Current));
        assert!(!NodeCategory::History.can_upgrade_to(NodeCategory::Predicted));
        assert!(!NodeCategory::Current.can_upgrade_to(NodeCategory::Predicted));
        assert!(!NodeCategory::Predicted.can_upgrade_to(NodeCategory::Current));
    }
}
