use std::time::{Duration, Instant};

use eframe::egui;
use rand::rngs::StdRng;
use rand::SeedableRng;

use killchain_core::{IncidentSnapshot, NodeCategory, TechniqueId};
use killchain_events::{ActivationOrigin, Event, EventBus, EventListener};
use killchain_graph::{DragController, ForceSimulation, GraphBuilder};

use crate::components::graph_canvas::GraphCanvas;
use crate::scenario::{self, ScenarioEngine};
use crate::settings::AppSettings;
use crate::theme;

const FRAME_INTERVAL: Duration = Duration::from_millis(33);

pub struct KillchainApp {
    event_bus: EventBus,
    settings: AppSettings,

    // Incident state
    scenario: ScenarioEngine,
    snapshot: IncidentSnapshot,
    rng: StdRng,

    // Layout
    sim: ForceSimulation,
    drag: DragController,
    canvas: GraphCanvas,

    // UI state
    selected_node: Option<TechniqueId>,
    hovered_node: Option<TechniqueId>,
    status_message: String,
    error_message: Option<String>,
    last_advance: Instant,
}

impl KillchainApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings: AppSettings = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, eframe::APP_KEY))
            .unwrap_or_default();

        theme::apply(&cc.egui_ctx);

        let scenario = ScenarioEngine::new();
        let snapshot = scenario.snapshot();
        let model = GraphBuilder::build(&snapshot);
        let sim = ForceSimulation::new(model, settings.physics.to_params());

        tracing::info!(
            nodes = sim.model().graph.node_count(),
            edges = sim.model().graph.edge_count(),
            "initial incident graph built"
        );

        Self {
            event_bus: EventBus::new(),
            settings,
            scenario,
            snapshot,
            rng: StdRng::from_entropy(),
            sim,
            drag: DragController::new(),
            canvas: GraphCanvas::new(),
            selected_node: None,
            hovered_node: None,
            status_message: "Incident scenario loaded.".to_string(),
            error_message: None,
            last_advance: Instant::now(),
        }
    }

    /// Rebuild the graph model from a snapshot, carrying surviving node
    /// positions over so the layout shifts instead of re-forming from scratch.
    fn rebuild_graph(&mut self, snapshot: &IncidentSnapshot) {
        let prior = self.sim.positions_by_id();
        let model = GraphBuilder::build(snapshot);
        let mut sim = ForceSimulation::new(model, self.settings.physics.to_params());
        sim.seed_from(&prior);

        tracing::debug!(
            nodes = sim.model().graph.node_count(),
            edges = sim.model().graph.edge_count(),
            retained = prior.len(),
            "graph model rebuilt"
        );

        self.sim = sim;
        self.drag = DragController::new();
        self.snapshot = snapshot.clone();
        if let Some(selected) = &self.selected_node {
            if !self.sim.model().contains(selected.as_str()) {
                self.selected_node = None;
            }
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        for file in dropped {
            let content = if let Some(bytes) = &file.bytes {
                String::from_utf8(bytes.to_vec()).ok()
            } else if let Some(path) = &file.path {
                std::fs::read_to_string(path).ok()
            } else {
                None
            };

            let Some(content) = content else {
                self.event_bus.publish(Event::ShowError {
                    message: format!("Could not read dropped file {}", file.name),
                });
                continue;
            };

            match IncidentSnapshot::from_json(&content) {
                Ok(snapshot) => {
                    self.event_bus.publish(Event::SnapshotLoaded(snapshot));
                    self.event_bus.publish(Event::StatusUpdate {
                        message: format!("Loaded snapshot from {}", file.name),
                    });
                }
                Err(err) => {
                    self.event_bus.publish(Event::ShowError {
                        message: format!("Invalid snapshot in {}: {}", file.name, err),
                    });
                }
            }
        }
    }

    fn advance_scenario(&mut self) {
        if self.scenario.at_end() {
            self.event_bus.publish(Event::StatusUpdate {
                message: "Kill chain complete. Reset to replay.".to_string(),
            });
            return;
        }
        self.scenario.advance(&mut self.rng);
        let snapshot = self.scenario.snapshot();
        let stage = snapshot
            .current
            .as_ref()
            .map(|t| t.name.clone())
            .unwrap_or_default();
        self.event_bus.publish(Event::SnapshotLoaded(snapshot));
        self.event_bus.publish(Event::StatusUpdate {
            message: format!("Attack advanced to {stage}."),
        });
    }

    fn side_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("incident_panel")
            .default_width(300.0)
            .show(ctx, |ui| {
                ui.add_space(theme::spacing::PANEL_PADDING);
                ui.heading("Incident");
                if let Some(id) = &self.snapshot.incident_id {
                    ui.label(egui::RichText::new(id).monospace().weak());
                }
                ui.add_space(theme::spacing::SECTION_SPACING);

                self.current_section(ui);
                self.history_section(ui);
                self.predictions_section(ui);
                self.selected_section(ui);
                self.controls_section(ui);
            });
    }

    fn current_section(&self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new("CURRENT STAGE").small().weak());
        match &self.snapshot.current {
            Some(technique) => {
                ui.label(
                    egui::RichText::new(format!("{}  {}", technique.id, technique.name))
                        .color(theme::accent())
                        .strong(),
                );
                if let Some(tactic) = &technique.tactic {
                    ui.label(egui::RichText::new(tactic).italics().weak());
                }
                if let Some(description) = &technique.description {
                    ui.label(egui::RichText::new(description).small());
                }
            }
            None => {
                ui.label(egui::RichText::new("No active technique").weak());
            }
        }
        ui.add_space(theme::spacing::SECTION_SPACING);
    }

    fn history_section(&self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new("OBSERVED HISTORY").small().weak());
        if self.snapshot.history.is_empty() {
            ui.label(egui::RichText::new("(none)").weak());
        }
        for id in &self.snapshot.history {
            let label = scenario::lookup(id.as_str())
                .map(|t| format!("{}  {}", t.id, t.name))
                .unwrap_or_else(|| id.to_string());
            ui.label(egui::RichText::new(label).monospace());
        }
        ui.add_space(theme::spacing::SECTION_SPACING);
    }

    fn predictions_section(&self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new("PREDICTED NEXT").small().weak());
        if self.snapshot.predictions.is_empty() {
            ui.label(egui::RichText::new("(none)").weak());
        }
        for prediction in &self.snapshot.predictions {
            ui.horizontal(|ui| {
                ui.label(
                    egui::RichText::new(format!(
                        "{}  {}",
                        prediction.technique_id, prediction.technique_name
                    ))
                    .monospace(),
                );
            });
            ui.add(
                egui::ProgressBar::new(prediction.probability.clamp(0.0, 1.0))
                    .text(format!("{:.0}%", prediction.probability * 100.0))
                    .desired_height(12.0),
            );
        }
        ui.add_space(theme::spacing::SECTION_SPACING);
    }

    fn selected_section(&self, ui: &mut egui::Ui) {
        let Some(id) = &self.selected_node else {
            return;
        };
        ui.label(egui::RichText::new("SELECTED").small().weak());
        match scenario::lookup(id.as_str()) {
            Some(technique) => {
                ui.label(egui::RichText::new(format!("{}  {}", technique.id, technique.name)));
                if let Some(tactic) = &technique.tactic {
                    ui.label(egui::RichText::new(tactic).italics().weak());
                }
                if let Some(description) = &technique.description {
                    ui.label(egui::RichText::new(description).small());
                }
            }
            None => {
                ui.label(egui::RichText::new(id.to_string()).monospace());
            }
        }
        if let Some(node) = self.sim.model().get_node(id.as_str()) {
            let category = match node.category {
                NodeCategory::History => "observed",
                NodeCategory::Current => "active",
                NodeCategory::Predicted => "predicted",
            };
            ui.label(
                egui::RichText::new(format!(
                    "{category}, confidence {:.0}%",
                    node.confidence * 100.0
                ))
                .small()
                .weak(),
            );
        }
        ui.add_space(theme::spacing::SECTION_SPACING);
    }

    fn controls_section(&mut self, ui: &mut egui::Ui) {
        ui.separator();
        ui.horizontal(|ui| {
            if ui.button("Advance").clicked() {
                self.event_bus.publish(Event::ScenarioAdvance);
            }
            if ui.button("Reset").clicked() {
                self.event_bus.publish(Event::ScenarioReset);
            }
            if ui.button("Fit view").clicked() {
                self.event_bus.publish(Event::ZoomToFit);
            }
        });
        ui.add_space(theme::spacing::ITEM_SPACING);

        ui.checkbox(&mut self.settings.show_labels, "Show labels");
        ui.checkbox(&mut self.settings.show_probabilities, "Show probabilities");
        ui.checkbox(&mut self.settings.auto_advance, "Auto-advance");
        if self.settings.auto_advance {
            ui.add(
                egui::Slider::new(&mut self.settings.auto_advance_interval_secs, 1.0..=30.0)
                    .text("interval (s)"),
            );
        }
        ui.add_space(theme::spacing::ITEM_SPACING);

        ui.collapsing("Physics", |ui| {
            let physics = &mut self.settings.physics;
            let mut changed = false;
            changed |= ui
                .add(egui::Slider::new(&mut physics.link_distance, 40.0..=300.0).text("link"))
                .changed();
            changed |= ui
                .add(egui::Slider::new(&mut physics.charge_strength, 50.0..=1000.0).text("charge"))
                .changed();
            changed |= ui
                .add(egui::Slider::new(&mut physics.lane_strength, 0.0..=1.0).text("lanes"))
                .changed();
            if changed {
                self.sim.set_params(physics.to_params());
            }
        });
    }

    fn status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status_message);
                if let Some(id) = &self.hovered_node {
                    let label = scenario::lookup(id.as_str())
                        .map(|t| format!("{}  {}", t.id, t.name))
                        .unwrap_or_else(|| id.to_string());
                    ui.separator();
                    ui.label(egui::RichText::new(label).monospace().weak());
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let state = if self.sim.is_settled() {
                        "settled".to_string()
                    } else {
                        format!("alpha {:.3}", self.sim.alpha())
                    };
                    ui.label(egui::RichText::new(state).monospace().weak());
                });
            });
        });
    }

    fn error_window(&mut self, ctx: &egui::Context) {
        let Some(message) = self.error_message.clone() else {
            return;
        };
        let mut open = true;
        egui::Window::new("Error")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(message);
                if ui.button("Dismiss").clicked() {
                    self.error_message = None;
                }
            });
        if !open {
            self.error_message = None;
        }
    }
}

impl EventListener for KillchainApp {
    fn handle_event(&mut self, event: &Event) {
        match event {
            Event::SnapshotLoaded(snapshot) => {
                self.rebuild_graph(snapshot);
            }
            Event::ScenarioAdvance => {
                self.advance_scenario();
            }
            Event::ScenarioReset => {
                self.scenario.reset();
                let snapshot = self.scenario.snapshot();
                self.event_bus.publish(Event::SnapshotLoaded(snapshot));
                self.event_bus.publish(Event::StatusUpdate {
                    message: "Scenario reset to initial alert.".to_string(),
                });
                self.canvas.request_zoom_to_fit();
            }
            Event::ActivateNode { id, origin } => {
                tracing::debug!(id = %id, ?origin, "node activated");
                self.selected_node = Some(id.clone());
            }
            Event::ZoomToFit => {
                self.canvas.request_zoom_to_fit();
            }
            Event::ShowError { message } => {
                tracing::error!("{message}");
                self.error_message = Some(message.clone());
            }
            Event::StatusUpdate { message } => {
                self.status_message = message.clone();
            }
        }
    }
}

impl eframe::App for KillchainApp {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, &self.settings);
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_dropped_files(ctx);

        // Keyboard shortcuts
        if ctx.input(|i| i.key_pressed(egui::Key::Space)) {
            self.event_bus.publish(Event::ScenarioAdvance);
        }
        if ctx.input(|i| i.key_pressed(egui::Key::R)) {
            self.event_bus.publish(Event::ScenarioReset);
        }
        if ctx.input(|i| i.key_pressed(egui::Key::F)) {
            self.event_bus.publish(Event::ZoomToFit);
        }

        if self.settings.auto_advance
            && !self.scenario.at_end()
            && self.last_advance.elapsed().as_secs_f32() >= self.settings.auto_advance_interval_secs
        {
            self.last_advance = Instant::now();
            self.event_bus.publish(Event::ScenarioAdvance);
        }

        // Drain pending events
        let bus = self.event_bus.clone();
        bus.dispatch_to(self);

        self.sim.step();

        self.side_panel(ctx);
        self.status_bar(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                let rect = ui.available_rect_before_wrap();
                let time = ui.input(|i| i.time);
                let output = self.canvas.show(
                    ui,
                    rect,
                    &mut self.sim,
                    &mut self.drag,
                    &self.settings,
                    time,
                );
                if let Some(id) = output.clicked_node {
                    self.event_bus.publish(Event::ActivateNode {
                        id,
                        origin: ActivationOrigin::Graph,
                    });
                }
                // Shown in the status bar on the next frame.
                self.hovered_node = output.hovered_node;
                if self.hovered_node.is_some() {
                    ctx.set_cursor_icon(egui::CursorIcon::PointingHand);
                }
            });

        self.error_window(ctx);

        // The current-node halo animates continuously, so keep frames coming
        // even when the layout is settled.
        ctx.request_repaint_after(FRAME_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemStorage(HashMap<String, String>);

    impl eframe::Storage for MemStorage {
        fn get_string(&self, key: &str) -> Option<String> {
            self.0.get(key).cloned()
        }

        fn set_string(&mut self, key: &str, value: String) {
            self.0.insert(key.to_string(), value);
        }

        fn flush(&mut self) {}
    }

    #[test]
    fn test_settings_round_trip_through_eframe_storage() {
        let mut storage = MemStorage::default();
        let mut settings = AppSettings::default();
        settings.show_labels = false;
        settings.physics.link_distance = 150.0;

        eframe::set_value(&mut storage, eframe::APP_KEY, &settings);
        let restored: AppSettings = eframe::get_value(&storage, eframe::APP_KEY).unwrap();

        assert!(!restored.show_labels);
        assert_eq!(restored.physics.link_distance, 150.0);
    }

    #[test]
    fn test_missing_storage_key_yields_none() {
        let storage = MemStorage::default();
        let restored: Option<AppSettings> = eframe::get_value(&storage, eframe::APP_KEY);
        assert!(restored.is_none());
    }
}
