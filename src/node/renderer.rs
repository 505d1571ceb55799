//! Point node renderer
//!
//! One [`PointVertex`] per node. The layout y axis points down while clip
//! space points up, so `position()` stores `-y`.

use glam::Vec2;
use tracing::debug;

use super::data::{NodeUi, PointVertex};
use crate::core::{
    DenseBufferStore, DrawCall, DrawSink, NodeShape, ProgramKind, Relocation, Result, Topology,
    Transform, UniformState,
};

pub struct NodeRenderer {
    shape: NodeShape,
    store: DenseBufferStore<PointVertex>,
    uis: Vec<NodeUi>,
    uniforms: UniformState,
}

impl NodeRenderer {
    pub fn new(shape: NodeShape) -> Self {
        debug!(?shape, "Node renderer created");
        Self {
            shape,
            store: DenseBufferStore::new(1),
            uis: Vec::new(),
            uniforms: UniformState::default(),
        }
    }

    #[inline]
    pub fn shape(&self) -> NodeShape {
        self.shape
    }

    pub fn create_node(&mut self, ui: NodeUi) -> usize {
        let id = self.store.create();
        self.uis.push(ui);
        id
    }

    /// Remove a node. See [`DenseBufferStore::remove`] for the relocation
    /// contract.
    pub fn remove_node(&mut self, id: usize) -> Result<Option<Relocation>> {
        if self.store.is_empty() {
            return Ok(None);
        }
        let moved = self.store.remove(id)?;
        self.uis.swap_remove(id);
        Ok(moved)
    }

    /// Write the node's vertex from its layout position.
    pub fn position(&mut self, id: usize, pos: Vec2) -> Result<()> {
        let ui = self.uis.get(id).copied().unwrap_or_default();
        let record = self.store.record_mut(id)?;
        record[0] = PointVertex {
            x: pos.x,
            y: -pos.y,
            z: ui.depth,
            size: ui.size,
            color: ui.color.0,
        };
        Ok(())
    }

    /// Zero a node's vertex; a zero-sized point draws nothing.
    pub fn clear_geometry(&mut self, id: usize) -> Result<()> {
        self.store.clear_record(id)
    }

    pub fn ui(&self, id: usize) -> Option<&NodeUi> {
        self.uis.get(id)
    }

    /// Replace a node's visual properties; takes effect on the next
    /// `position()`.
    pub fn set_ui(&mut self, id: usize, ui: NodeUi) -> Option<NodeUi> {
        self.uis.get_mut(id).map(|slot| std::mem::replace(slot, ui))
    }

    pub fn update_transform(&mut self, transform: Transform) {
        self.uniforms.update_transform(transform);
    }

    pub fn update_size(&mut self, half_size: [f32; 2]) {
        self.uniforms.update_size(half_size);
    }

    /// Submit one point draw covering every live node.
    pub fn render(&mut self, sink: &mut dyn DrawSink) -> Result<()> {
        if self.store.is_empty() {
            return Ok(());
        }
        sink.submit(DrawCall {
            program: ProgramKind::Nodes(self.shape),
            topology: Topology::Points,
            layout: PointVertex::LAYOUT,
            vertices: self.store.live_bytes(),
            indices: None,
            element_count: self.store.len() as u32,
            uniforms: self.uniforms.take_dirty(),
        })
    }

    pub fn reset(&mut self) {
        self.store.reset();
        self.uis.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn vertices(&self) -> &[PointVertex] {
        self.store.live_vertices()
    }
}
