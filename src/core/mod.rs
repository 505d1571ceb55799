//! Platform-agnostic core - shared by every renderer, the CLI and the
//! wasm bindings

pub mod color;
pub mod config;
pub mod error;
pub mod front;
pub mod geometry;
pub mod sink;
pub mod store;
pub mod transform;
pub mod vertex;

pub use color::PackedColor;
pub use config::{GraphicsOptions, NodeShape};
pub use error::{RenderError, Result};
pub use front::{FrontTracker, SlotSwap};
pub use sink::{
    AttributeFormat, DrawCall, DrawSink, ProgramKind, RecordedDraw, RecordingSink, Topology,
    VertexAttribute, VertexLayout,
};
pub use store::{DenseBufferStore, Relocation, INITIAL_RECORD_CAPACITY};
pub use transform::{Transform, UniformState, Uniforms, Viewport};
pub use vertex::{DepthVertex, FlatVertex};
