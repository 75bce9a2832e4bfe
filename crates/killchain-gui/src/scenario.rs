//! Built-in ransomware kill-chain scenario.
//!
//! Stands in for the external simulation backend so the app runs standalone:
//! a fixed technique catalog plus a sector-tuned Markov transition table,
//! stepped by weighted random choice.

use killchain_core::{IncidentSnapshot, StagePrediction, Technique, TechniqueId};
use rand::Rng;

struct CatalogEntry {
    id: &'static str,
    name: &'static str,
    tactic: &'static str,
    description: &'static str,
}

struct TransitionEntry {
    from: &'static str,
    to: &'static str,
    probability: f32,
}

const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        id: "T1566",
        name: "Phishing",
        tactic: "Initial Access",
        description: "Adversaries send phishing messages to gain access to victim systems.",
    },
    CatalogEntry {
        id: "T1059",
        name: "Command and Scripting Interpreter",
        tactic: "Execution",
        description: "Adversaries may abuse command and scripting interpreters to execute commands.",
    },
    CatalogEntry {
        id: "T1098",
        name: "Account Manipulation",
        tactic: "Persistence",
        description: "Adversaries may manipulate accounts to maintain access.",
    },
    CatalogEntry {
        id: "T1083",
        name: "File and Directory Discovery",
        tactic: "Discovery",
        description: "Adversaries may enumerate files and directories or query the file system.",
    },
    CatalogEntry {
        id: "T1057",
        name: "Process Discovery",
        tactic: "Discovery",
        description: "Adversaries may attempt to get information about running processes.",
    },
    CatalogEntry {
        id: "T1021",
        name: "Remote Services",
        tactic: "Lateral Movement",
        description: "Adversaries may use Valid Accounts to log into a service accepting remote connections.",
    },
    CatalogEntry {
        id: "T1005",
        name: "Data from Local System",
        tactic: "Collection",
        description: "Adversaries may search for and copy sensitive data from local systems.",
    },
    CatalogEntry {
        id: "T1486",
        name: "Data Encrypted for Impact",
        tactic: "Impact",
        description: "Adversaries may encrypt data on target systems to interrupt availability.",
    },
];

const TRANSITIONS: &[TransitionEntry] = &[
    TransitionEntry { from: "T1566", to: "T1059", probability: 0.85 },
    TransitionEntry { from: "T1566", to: "T1098", probability: 0.15 },
    TransitionEntry { from: "T1059", to: "T1083", probability: 0.70 },
    TransitionEntry { from: "T1059", to: "T1057", probability: 0.30 },
    TransitionEntry { from: "T1083", to: "T1021", probability: 0.90 },
    TransitionEntry { from: "T1083", to: "T1005", probability: 0.10 },
    TransitionEntry { from: "T1021", to: "T1486", probability: 0.95 },
];

const INITIAL_TECHNIQUE: &str = "T1566";

/// Catalog lookup by technique id, for detail rendering outside the engine.
pub fn lookup(id: &str) -> Option<Technique> {
    CATALOG.iter().find(|e| e.id == id).map(|e| Technique {
        id: TechniqueId::from(e.id),
        name: e.name.to_string(),
        tactic: Some(e.tactic.to_string()),
        description: Some(e.description.to_string()),
    })
}

fn transitions_from(id: &str) -> Vec<&'static TransitionEntry> {
    TRANSITIONS.iter().filter(|t| t.from == id).collect()
}

/// Replays the hardcoded kill chain one stage at a time.
pub struct ScenarioEngine {
    history: Vec<TechniqueId>,
    current: TechniqueId,
}

impl Default for ScenarioEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioEngine {
    pub fn new() -> Self {
        Self {
            history: vec![TechniqueId::from(INITIAL_TECHNIQUE)],
            current: TechniqueId::from(INITIAL_TECHNIQUE),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// True once the chain has reached a technique with no outgoing
    /// transitions (the simulated incident has played out).
    pub fn at_end(&self) -> bool {
        transitions_from(self.current.as_str()).is_empty()
    }

    /// Move one stage forward by weighted random choice over the outgoing
    /// transitions. Returns false at the end of the chain.
    pub fn advance<R: Rng>(&mut self, rng: &mut R) -> bool {
        let transitions = transitions_from(self.current.as_str());
        if transitions.is_empty() {
            return false;
        }

        let roll: f32 = rng.r#gen();
        let mut cumulative = 0.0;
        let mut chosen = None;
        for t in &transitions {
            cumulative += t.probability;
            if roll <= cumulative {
                chosen = Some(*t);
                break;
            }
        }
        // Probabilities may not sum to exactly 1; fall back to the likeliest.
        let chosen = chosen.unwrap_or_else(|| {
            transitions
                .iter()
                .max_by(|a, b| a.probability.total_cmp(&b.probability))
                .copied()
                .expect("non-empty transitions")
        });

        self.current = TechniqueId::from(chosen.to);
        self.history.push(self.current.clone());
        true
    }

    /// The incident-state snapshot for the engine's current position,
    /// predictions sorted most likely first.
    pub fn snapshot(&self) -> IncidentSnapshot {
        let mut predictions: Vec<StagePrediction> = transitions_from(self.current.as_str())
            .into_iter()
            .filter_map(|t| {
                lookup(t.to).map(|tech| StagePrediction {
                    technique_id: tech.id,
                    technique_name: tech.name,
                    probability: t.probability,
                })
            })
            .collect();
        predictions.sort_by(|a, b| b.probability.total_cmp(&a.probability));

        IncidentSnapshot {
            incident_id: Some("INC-DEMO".to_string()),
            history: self.history.clone(),
            current: lookup(self.current.as_str()),
            predictions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_initial_snapshot_shape() {
        let engine = ScenarioEngine::new();
        let snapshot = engine.snapshot();

        assert_eq!(snapshot.history.len(), 1);
        let current = snapshot.current.unwrap();
        assert_eq!(current.id.as_str(), "T1566");
        assert_eq!(snapshot.predictions.len(), 2);
        // Sorted most likely first
        assert!(snapshot.predictions[0].probability >= snapshot.predictions[1].probability);
    }

    #[test]
    fn test_advance_appends_history_and_tracks_current() {
        let mut engine = ScenarioEngine::new();
        let mut rng = StdRng::seed_from_u64(7);

        assert!(engine.advance(&mut rng));
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.history.len(), 2);
        assert_eq!(
            snapshot.history.last().unwrap(),
            &snapshot.current.unwrap().id
        );
    }

    #[test]
    fn test_chain_terminates() {
        let mut engine = ScenarioEngine::new();
        let mut rng = StdRng::seed_from_u64(42);
        let mut steps = 0;
        while engine.advance(&mut rng) {
            steps += 1;
            assert!(steps < 32, "scenario never terminated");
        }
        assert!(engine.at_end());
        assert!(engine.snapshot().predictions.is_empty());
        assert!(!engine.advance(&mut rng));
    }

    #[test]
    fn test_all_transition_targets_are_cataloged() {
        for t in TRANSITIONS {
            assert!(lookup(t.to).is_some(), "unknown target {}", t.to);
            assert!(lookup(t.from).is_some(), "unknown source {}", t.from);
            assert!((0.0..=1.0).contains(&t.probability));
        }
    }
}
