//! wgpu rendering backend
//!
//! Implements [`DrawSink`](crate::core::DrawSink) on top of wgpu. Nothing
//! else in the crate depends on a GPU being present.

mod backend;

pub use backend::{request_device, GpuBackend};
