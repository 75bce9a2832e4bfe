use eframe::egui;
use killchain_core::{NodeCategory, TechniqueId};
use killchain_graph::{
    edge_stroke_width, get_edge_style, get_node_style, DragController, ForceSimulation, Vec2,
};

use crate::settings::AppSettings;
use crate::theme;

// Responsibility checklist for the canvas:
// - Edge strokes (solid confirmed, dashed probability-scaled predicted)
// - Node discs, current-node halo pulse, pin indicators, labels
// - Hover and click hit-testing
// - Node drags forwarded to the DragController, background drags panning
// - View state (pan/zoom), zoom-to-fit

pub struct CanvasOutput {
    pub clicked_node: Option<TechniqueId>,
    pub hovered_node: Option<TechniqueId>,
}

#[derive(Clone, Copy)]
struct PanDrag {
    start_pan: egui::Vec2,
    start_pos: egui::Pos2,
}

pub struct GraphCanvas {
    zoom: f32,
    pan: egui::Vec2,
    pan_drag: Option<PanDrag>,
    dragging_node: Option<TechniqueId>,
    fit_requested: bool,
}

impl Default for GraphCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphCanvas {
    pub fn new() -> Self {
        Self {
            zoom: 1.0,
            pan: egui::Vec2::ZERO,
            pan_drag: None,
            dragging_node: None,
            fit_requested: true,
        }
    }

    pub fn request_zoom_to_fit(&mut self) {
        self.fit_requested = true;
    }

    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        rect: egui::Rect,
        sim: &mut ForceSimulation,
        drag: &mut DragController,
        settings: &AppSettings,
        time: f64,
    ) -> CanvasOutput {
        let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, theme::background());

        let viewport_center = rect.center();
        let sim_center = sim.params().center();
        let sim_center = egui::pos2(sim_center.x, sim_center.y);

        if self.fit_requested {
            self.zoom_to_fit(sim, rect, sim_center);
            self.fit_requested = false;
        }

        // Scroll / pinch zoom anchored on the pointer.
        let zoom_delta = ui.input(|i| i.zoom_delta());
        if response.hovered() && (zoom_delta - 1.0).abs() > f32::EPSILON {
            let prev_zoom = self.zoom;
            let new_zoom = (self.zoom * zoom_delta).clamp(0.2, 4.0);
            if (new_zoom - prev_zoom).abs() > f32::EPSILON {
                self.zoom = new_zoom;
                if let Some(pointer) = response.hover_pos() {
                    let graph_pos =
                        self.screen_to_graph(pointer, viewport_center, sim_center, prev_zoom);
                    let new_screen = self.graph_to_screen(graph_pos, viewport_center, sim_center);
                    self.pan += pointer - new_screen;
                }
            }
        }

        let hovered_node = self.hit_test(sim, response.hover_pos(), viewport_center, sim_center);
        let clicked_node = if response.clicked() {
            hovered_node.clone()
        } else {
            None
        };

        // Node drag takes precedence over panning.
        if response.drag_started() {
            if let Some(id) = &hovered_node {
                self.dragging_node = Some(id.clone());
                drag.on_drag_start(sim, id);
            } else if let Some(pointer) = response.interact_pointer_pos() {
                self.pan_drag = Some(PanDrag {
                    start_pan: self.pan,
                    start_pos: pointer,
                });
            }
        }

        if let Some(id) = self.dragging_node.clone() {
            if let Some(pointer) = response.interact_pointer_pos() {
                let graph_pos = self.screen_to_graph(pointer, viewport_center, sim_center, self.zoom);
                drag.on_drag_move(sim, id.as_str(), Vec2::new(graph_pos.x, graph_pos.y));
            }
            if ui.input(|i| !i.pointer.primary_down()) {
                drag.on_drag_end(sim, id.as_str());
                self.dragging_node = None;
            }
        } else if response.dragged() {
            if let (Some(state), Some(pointer)) = (self.pan_drag, response.interact_pointer_pos()) {
                self.pan = state.start_pan + (pointer - state.start_pos);
            }
        }
        if self.pan_drag.is_some() && ui.input(|i| !i.pointer.primary_down()) {
            self.pan_drag = None;
        }

        self.draw_edges(&painter, sim, viewport_center, sim_center);
        self.draw_nodes(
            &painter,
            sim,
            settings,
            hovered_node.as_ref(),
            viewport_center,
            sim_center,
            time,
        );

        CanvasOutput {
            clicked_node,
            hovered_node,
        }
    }

    fn zoom_to_fit(&mut self, sim: &ForceSimulation, viewport: egui::Rect, sim_center: egui::Pos2) {
        let nodes = sim.model().graph.nodes();
        if nodes.is_empty() {
            self.zoom = 1.0;
            self.pan = egui::Vec2::ZERO;
            return;
        }
        let mut bounds = egui::Rect::NOTHING;
        for node in nodes {
            bounds.extend_with(egui::pos2(node.position.x, node.position.y));
        }
        let padded = bounds.expand(80.0);
        let available = viewport.shrink(16.0);
        let scale = (available.width() / padded.width().max(1.0))
            .min(available.height() / padded.height().max(1.0))
            .clamp(0.2, 2.0);
        self.zoom = scale;
        self.pan = (sim_center - padded.center()) * self.zoom;
    }

    fn hit_test(
        &self,
        sim: &ForceSimulation,
        pointer: Option<egui::Pos2>,
        viewport_center: egui::Pos2,
        sim_center: egui::Pos2,
    ) -> Option<TechniqueId> {
        let pointer = pointer?;
        let mut best_dist = f32::INFINITY;
        let mut best = None;
        for node in sim.model().graph.nodes() {
            let style = get_node_style(node.category);
            let screen = self.graph_to_screen(
                egui::pos2(node.position.x, node.position.y),
                viewport_center,
                sim_center,
            );
            let radius = style.radius * self.zoom + 6.0;
            let dist = screen.distance(pointer);
            if dist <= radius && dist < best_dist {
                best_dist = dist;
                best = Some(node.id.clone());
            }
        }
        best
    }

    fn draw_edges(
        &self,
        painter: &egui::Painter,
        sim: &ForceSimulation,
        viewport_center: egui::Pos2,
        sim_center: egui::Pos2,
    ) {
        for edge in sim.model().graph.edges() {
            let model = sim.model();
            let source = &model.graph[edge.source_idx];
            let target = &model.graph[edge.target_idx];
            let a = self.graph_to_screen(
                egui::pos2(source.position.x, source.position.y),
                viewport_center,
                sim_center,
            );
            let b = self.graph_to_screen(
                egui::pos2(target.position.x, target.position.y),
                viewport_center,
                sim_center,
            );

            let style = get_edge_style(edge.kind);
            let alpha = (style.opacity * 255.0) as u8;
            let color = theme::color32(style.color.with_alpha(alpha));
            let width = edge_stroke_width(edge.kind, edge.weight) * self.zoom;
            let stroke = egui::Stroke::new(width, color);

            if style.dashed {
                painter.extend(egui::Shape::dashed_line(
                    &[a, b],
                    stroke,
                    5.0 * self.zoom,
                    5.0 * self.zoom,
                ));
            } else {
                painter.line_segment([a, b], stroke);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_nodes(
        &self,
        painter: &egui::Painter,
        sim: &ForceSimulation,
        settings: &AppSettings,
        hovered: Option<&TechniqueId>,
        viewport_center: egui::Pos2,
        sim_center: egui::Pos2,
        time: f64,
    ) {
        let label_font = egui::FontId::monospace(10.0 * self.zoom);
        for node in sim.model().graph.nodes() {
            let style = get_node_style(node.category);
            let screen = self.graph_to_screen(
                egui::pos2(node.position.x, node.position.y),
                viewport_center,
                sim_center,
            );

            // Pulsing halo around the current technique (period 2s).
            if let Some(halo) = style.halo {
                let pulse = 30.0 + 5.0 * (time * std::f64::consts::PI).sin() as f32;
                painter.circle_stroke(
                    screen,
                    pulse * self.zoom,
                    egui::Stroke::new(2.0 * self.zoom, theme::color32(halo)),
                );
            }

            let radius = style.radius * self.zoom;
            painter.circle_filled(screen, radius, theme::color32(style.fill));
            if let Some(stroke_color) = style.stroke {
                painter.circle_stroke(
                    screen,
                    radius,
                    egui::Stroke::new(2.0 * self.zoom, theme::color32(stroke_color)),
                );
            }

            if node.is_pinned() {
                painter.circle_stroke(
                    screen,
                    radius + 4.0 * self.zoom,
                    egui::Stroke::new(1.0, egui::Color32::from_white_alpha(160)),
                );
            }
            if hovered == Some(&node.id) {
                painter.circle_stroke(
                    screen,
                    radius + 3.0 * self.zoom,
                    egui::Stroke::new(1.5, theme::label_text()),
                );
            }

            if settings.show_labels {
                let mut label = node.label.clone();
                if settings.show_probabilities && node.category == NodeCategory::Predicted {
                    label = format!("{} ({:.0}%)", label, node.confidence * 100.0);
                }
                painter.text(
                    screen + egui::vec2(radius + 8.0 * self.zoom, 0.0),
                    egui::Align2::LEFT_CENTER,
                    label,
                    label_font.clone(),
                    theme::label_text(),
                );
            }
        }
    }

    fn graph_to_screen(
        &self,
        graph_pos: egui::Pos2,
        viewport_center: egui::Pos2,
        sim_center: egui::Pos2,
    ) -> egui::Pos2 {
        viewport_center + self.pan + (graph_pos - sim_center) * self.zoom
    }

    fn screen_to_graph(
        &self,
        screen_pos: egui::Pos2,
        viewport_center: egui::Pos2,
        sim_center: egui::Pos2,
        zoom: f32,
    ) -> egui::Pos2 {
        let offset = screen_pos - viewport_center - self.pan;
        sim_center + offset / zoom
    }
}
