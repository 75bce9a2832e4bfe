use crossbeam_channel::{unbounded, Receiver, Sender};
use killchain_core::{IncidentSnapshot, TechniqueId};
use serde::{Deserialize, Serialize};

/// Where a node activation originated from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActivationOrigin {
    Graph,
    DetailPanel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Incident state
    /// A fresh incident-state snapshot arrived; graph model and layout are
    /// rebuilt wholesale in response.
    SnapshotLoaded(IncidentSnapshot),
    /// Advance the built-in scenario by one stage.
    ScenarioAdvance,
    /// Restart the built-in scenario from its initial alert.
    ScenarioReset,

    // Graph
    ActivateNode {
        id: TechniqueId,
        origin: ActivationOrigin,
    },
    ZoomToFit,

    // Notifications
    ShowError {
        message: String,
    },
    StatusUpdate {
        message: String,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }

    pub fn receiver(&self) -> Receiver<Event> {
        self.rx.clone()
    }

    pub fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    /// Dispatch all pending events to a listener.
    /// This is useful for processing events in the UI loop.
    pub fn dispatch_to<L: EventListener>(&self, listener: &mut L) {
        while let Ok(event) = self.rx.try_recv() {
            listener.handle_event(&event);
        }
    }
}

/// Trait for components that respond to events.
/// Implement this to receive events from the EventBus.
pub trait EventListener {
    fn handle_event(&mut self, event: &Event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bus_publish_receive() {
        let bus = EventBus::new();
        let sender = bus.sender();
        let receiver = bus.receiver();

        let event = Event::ActivateNode {
            id: TechniqueId::from("T1566"),
            origin: ActivationOrigin::Graph,
        };

        sender.send(event.clone()).unwrap();

        let received = receiver.recv().unwrap();
        match received {
            Event::ActivateNode { id, origin } => {
                assert_eq!(id.as_str(), "T1566");
                assert!(matches!(origin, ActivationOrigin::Graph));
            }
            _ => panic!("Expected ActivateNode event"),
        }
    }

    #[test]
    fn test_dispatch_drains_pending_events() {
        struct Counter(usize);
        impl EventListener for Counter {
            fn handle_event(&mut self, _event: &Event) {
                self.0 += 1;
            }
        }

        let bus = EventBus::new();
        bus.publish(Event::ScenarioAdvance);
        bus.publish(Event::ScenarioReset);
        bus.publish(Event::StatusUpdate {
            message: "ok".to_string(),
        });

        let mut counter = Counter(0);
        bus.dispatch_to(&mut counter);
        assert_eq!(counter.0, 3);

        // Nothing left queued
        bus.dispatch_to(&mut counter);
        assert_eq!(counter.0, 3);
    }
}
