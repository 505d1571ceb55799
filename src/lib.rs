//! nodelink-gpu - GPU buffer management for node-link graph rendering
//!
//! Nodes, straight links, curved links and arrowheads are packed into dense,
//! swap-compacted vertex stores and handed to a [`core::DrawSink`] once per
//! frame. The stores and geometry are platform-agnostic; the wgpu backend
//! (`gpu` feature) and browser bindings (`wasm` feature) sit on top.

pub mod arrow;
pub mod core;
pub mod layout;
pub mod link;
pub mod node;
pub mod scene;

#[cfg(feature = "gpu")]
pub mod gpu;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use crate::core::{GraphicsOptions, PackedColor, RenderError, Result};
pub use layout::{FixedLayout, LayoutProvider};
pub use scene::{GraphScene, UiBuilder};
