//! Vertex types shared by more than one renderer
//!
//! - DepthVertex: x, y, depth + color (16 bytes) - straight links, directed nodes
//! - FlatVertex: x, y + color (12 bytes) - curved links, arrowheads

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use super::color::PackedColor;
use super::sink::{AttributeFormat, VertexAttribute, VertexLayout};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct DepthVertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub color: u32,
}

impl DepthVertex {
    pub const LAYOUT: VertexLayout = VertexLayout {
        stride: 16,
        attributes: &[
            VertexAttribute {
                offset: 0,
                location: 0,
                format: AttributeFormat::Float32x3,
            },
            VertexAttribute {
                offset: 12,
                location: 1,
                format: AttributeFormat::Unorm8x4,
            },
        ],
    };

    #[inline]
    pub fn new(pos: Vec2, z: f32, color: PackedColor) -> Self {
        Self {
            x: pos.x,
            y: pos.y,
            z,
            color: color.0,
        }
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct FlatVertex {
    pub x: f32,
    pub y: f32,
    pub color: u32,
}

impl FlatVertex {
    pub const LAYOUT: VertexLayout = VertexLayout {
        stride: 12,
        attributes: &[
            VertexAttribute {
                offset: 0,
                location: 0,
                format: AttributeFormat::Float32x2,
            },
            VertexAttribute {
                offset: 8,
                location: 1,
                format: AttributeFormat::Unorm8x4,
            },
        ],
    };

    #[inline]
    pub fn new(pos: Vec2, color: PackedColor) -> Self {
        Self {
            x: pos.x,
            y: pos.y,
            color: color.0,
        }
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}
