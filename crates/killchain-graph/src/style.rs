//! Attack-Path View Style System
//!
//! Maps node categories and edge kinds to the incident view's neon-on-dark
//! palette. Kept free of any GUI toolkit types so the render surface decides
//! how to interpret the raw colors.

use killchain_core::{EdgeKind, NodeCategory};

/// RGB color representation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_tuple(&self) -> (u8, u8, u8, u8) {
        (self.r, self.g, self.b, self.a)
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

// Palette constants
pub const BACKGROUND: Color = Color::rgb(0x0b, 0x10, 0x21);
pub const LABEL_TEXT: Color = Color::rgb(0xe2, 0xe8, 0xf0);

const HISTORY_GREEN: Color = Color::rgb(0x05, 0xff, 0xa1);
const CURRENT_MAGENTA: Color = Color::rgb(0xff, 0x2a, 0x6d);
const PREDICTED_CYAN: Color = Color::rgb(0x00, 0xf0, 0xff);
const PREDICTED_FILL: Color = Color::rgb(0x0f, 0x17, 0x2a);
const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);

/// Fill, stroke and accent colors for one node category.
#[derive(Debug, Clone, Copy)]
pub struct NodeStyle {
    pub fill: Color,
    pub stroke: Option<Color>,
    pub radius: f32,
    /// Pulsing halo drawn around the current node.
    pub halo: Option<Color>,
}

/// Stroke styling for one edge kind.
#[derive(Debug, Clone, Copy)]
pub struct EdgeStyle {
    pub color: Color,
    /// Base stroke width; predicted edges scale it by their weight.
    pub width: f32,
    pub dashed: bool,
    pub opacity: f32,
}

pub fn get_node_style(category: NodeCategory) -> NodeStyle {
    match category {
        NodeCategory::History => NodeStyle {
            fill: HISTORY_GREEN,
            stroke: None,
            radius: 8.0,
            halo: None,
        },
        NodeCategory::Current => NodeStyle {
            fill: CURRENT_MAGENTA,
            stroke: Some(WHITE),
            radius: 12.0,
            halo: Some(CURRENT_MAGENTA.with_alpha(128)),
        },
        NodeCategory::Predicted => NodeStyle {
            fill: PREDICTED_FILL,
            stroke: Some(PREDICTED_CYAN),
            radius: 8.0,
            halo: None,
        },
    }
}

pub fn get_edge_style(kind: EdgeKind) -> EdgeStyle {
    match kind {
        EdgeKind::Confirmed => EdgeStyle {
            color: HISTORY_GREEN,
            width: 2.0,
            dashed: false,
            opacity: 0.8,
        },
        EdgeKind::Predicted => EdgeStyle {
            color: PREDICTED_CYAN,
            width: 3.0,
            dashed: true,
            opacity: 0.4,
        },
    }
}

/// Effective stroke width of an edge: predicted edges thin out with lower
/// probability, confirmed edges keep the base width.
pub fn edge_stroke_width(kind: EdgeKind, weight: f32) -> f32 {
    let style = get_edge_style(kind);
    match kind {
        EdgeKind::Confirmed => style.width,
        EdgeKind::Predicted => (style.width * weight).max(0.5),
    }
}
