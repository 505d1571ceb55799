//! Node vertex layouts and per-node UI records
//!
//! - PointVertex: one vertex per node, drawn as a sized point (20 bytes)
//! - directed nodes reuse the shared `DepthVertex`, three per node

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::core::{AttributeFormat, PackedColor, VertexAttribute, VertexLayout};

// ============================================================================
// GPU vertices
// ============================================================================

/// Point-primitive node vertex: position, depth, size, packed color.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PointVertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub size: f32,
    pub color: u32,
}

impl PointVertex {
    pub const LAYOUT: VertexLayout = VertexLayout {
        stride: 20,
        attributes: &[
            VertexAttribute {
                offset: 0,
                location: 0,
                format: AttributeFormat::Float32x3, // x, y, depth
            },
            VertexAttribute {
                offset: 12,
                location: 1,
                format: AttributeFormat::Float32, // size
            },
            VertexAttribute {
                offset: 16,
                location: 2,
                format: AttributeFormat::Unorm8x4, // color
            },
        ],
    };
}

// ============================================================================
// UI records
// ============================================================================

/// Visual properties of a point node.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeUi {
    pub color: PackedColor,
    /// Diameter in layout units; also the clipping distance for incoming links
    pub size: f32,
    pub depth: f32,
}

impl Default for NodeUi {
    fn default() -> Self {
        Self {
            color: PackedColor::NODE_DEFAULT,
            size: 10.0,
            depth: 0.0,
        }
    }
}

/// Direction the triangle of a directed node points to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gradient {
    /// Unit vector in layout space
    pub direction: Vec2,
}

impl Gradient {
    /// Gradient pointing along `direction`, normalized. A zero vector keeps
    /// the default direction.
    pub fn towards(direction: Vec2) -> Self {
        Self {
            direction: direction.try_normalize().unwrap_or(Vec2::X),
        }
    }
}

impl Default for Gradient {
    fn default() -> Self {
        Self { direction: Vec2::X }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DirectedNodeUi {
    pub node: NodeUi,
    pub gradient: Gradient,
}
