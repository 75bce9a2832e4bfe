pub mod builder;
pub mod graph;
pub mod interaction;
pub mod simulation;
pub mod style;

pub use builder::{GraphBuilder, CONFIRMED_EDGE_WEIGHT};
pub use graph::{EdgeIndex, Graph, GraphEdge, GraphModel, GraphNode, NodeIndex, Vec2};
pub use interaction::DragController;
pub use simulation::{ForceSimulation, SimulationParams, DRAG_ALPHA_TARGET};
pub use style::{edge_stroke_width, get_edge_style, get_node_style, Color, EdgeStyle, NodeStyle};
