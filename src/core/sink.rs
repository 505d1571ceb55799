//! Draw submission boundary between renderers and a GPU backend
//!
//! Renderers never talk to a graphics API directly. Each `render()` call
//! produces one [`DrawCall`] holding the live bytes of its store, sized by the
//! live record count, and hands it to a [`DrawSink`]. The wgpu backend is one
//! sink; [`RecordingSink`] is another, used by tests and the headless CLI.

use super::config::NodeShape;
use super::error::Result;
use super::transform::Uniforms;

/// Which precompiled program a draw targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    Nodes(NodeShape),
    DirectedNodes,
    StraightLinks,
    CurvedLinks,
    Arrows,
}

impl ProgramKind {
    pub fn label(self) -> &'static str {
        match self {
            ProgramKind::Nodes(_) => "nodes",
            ProgramKind::DirectedNodes => "directed_nodes",
            ProgramKind::StraightLinks => "straight_links",
            ProgramKind::CurvedLinks => "curved_links",
            ProgramKind::Arrows => "arrows",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Topology {
    Points,
    Lines,
    Triangles,
}

/// Component format of one vertex attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeFormat {
    Float32,
    Float32x2,
    Float32x3,
    /// Packed color, four normalized bytes
    Unorm8x4,
}

impl AttributeFormat {
    pub const fn size(self) -> usize {
        match self {
            AttributeFormat::Float32 | AttributeFormat::Unorm8x4 => 4,
            AttributeFormat::Float32x2 => 8,
            AttributeFormat::Float32x3 => 12,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexAttribute {
    pub offset: usize,
    pub location: u32,
    pub format: AttributeFormat,
}

/// Attribute layout of a vertex type. `stride` must equal the Rust struct
/// size; every renderer's vertex type has a test asserting it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexLayout {
    pub stride: usize,
    pub attributes: &'static [VertexAttribute],
}

impl VertexLayout {
    /// True when attributes are packed back to back and fill the stride.
    pub fn is_tightly_packed(&self) -> bool {
        let mut offset = 0;
        for attr in self.attributes {
            if attr.offset != offset {
                return false;
            }
            offset += attr.format.size();
        }
        offset == self.stride
    }
}

/// One draw submission.
#[derive(Clone, Debug)]
pub struct DrawCall<'a> {
    pub program: ProgramKind,
    pub topology: Topology,
    pub layout: VertexLayout,
    /// Live vertex bytes only (`count` records)
    pub vertices: &'a [u8],
    /// Present for indexed draws
    pub indices: Option<&'a [u32]>,
    /// Vertices (non-indexed) or indices (indexed) to draw
    pub element_count: u32,
    /// Set only when the renderer's transform or screen size changed
    pub uniforms: Option<Uniforms>,
}

pub trait DrawSink {
    fn submit(&mut self, call: DrawCall<'_>) -> Result<()>;
}

/// Owned copy of a [`DrawCall`].
#[derive(Clone, Debug)]
pub struct RecordedDraw {
    pub program: ProgramKind,
    pub topology: Topology,
    pub vertices: Vec<u8>,
    pub indices: Option<Vec<u32>>,
    pub element_count: u32,
    pub uniforms: Option<Uniforms>,
}

/// Sink that keeps every submission in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub draws: Vec<RecordedDraw>,
    /// Total vertex + index bytes seen since construction
    pub bytes_submitted: u64,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget recorded draws, keep byte statistics.
    pub fn clear(&mut self) {
        self.draws.clear();
    }

    pub fn find(&self, program: ProgramKind) -> Option<&RecordedDraw> {
        self.draws.iter().find(|d| d.program == program)
    }
}

impl DrawSink for RecordingSink {
    fn submit(&mut self, call: DrawCall<'_>) -> Result<()> {
        let index_bytes = call.indices.map_or(0, |i| std::mem::size_of_val(i));
        self.bytes_submitted += (call.vertices.len() + index_bytes) as u64;
        self.draws.push(RecordedDraw {
            program: call.program,
            topology: call.topology,
            vertices: call.vertices.to_vec(),
            indices: call.indices.map(<[u32]>::to_vec),
            element_count: call.element_count,
            uniforms: call.uniforms,
        });
        Ok(())
    }
}
