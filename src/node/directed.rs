//! Directed node renderer - one triangle per node, pointing along the
//! node's gradient

use glam::Vec2;
use tracing::debug;

use super::data::{DirectedNodeUi, Gradient, NodeUi};
use crate::core::{
    DenseBufferStore, DepthVertex, DrawCall, DrawSink, ProgramKind, Relocation, Result, Topology,
    Transform, UniformState,
};

const VERTICES_PER_NODE: usize = 3;

pub struct DirectedNodeRenderer {
    store: DenseBufferStore<DepthVertex>,
    uis: Vec<DirectedNodeUi>,
    uniforms: UniformState,
}

impl Default for DirectedNodeRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectedNodeRenderer {
    pub fn new() -> Self {
        debug!("Directed node renderer created");
        Self {
            store: DenseBufferStore::new(VERTICES_PER_NODE),
            uis: Vec::new(),
            uniforms: UniformState::default(),
        }
    }

    pub fn create_node(&mut self, ui: DirectedNodeUi) -> usize {
        let id = self.store.create();
        self.uis.push(ui);
        id
    }

    pub fn remove_node(&mut self, id: usize) -> Result<Option<Relocation>> {
        if self.store.is_empty() {
            return Ok(None);
        }
        let moved = self.store.remove(id)?;
        self.uis.swap_remove(id);
        Ok(moved)
    }

    pub fn set_gradient(&mut self, id: usize, gradient: Gradient) -> Result<()> {
        // validates the slot
        self.store.record(id)?;
        self.uis[id].gradient = gradient;
        Ok(())
    }

    /// Replace the node part of a UI record, keeping its gradient.
    pub fn set_ui(&mut self, id: usize, ui: NodeUi) -> Option<NodeUi> {
        self.uis
            .get_mut(id)
            .map(|slot| std::mem::replace(&mut slot.node, ui))
    }

    /// Write the triangle: apex half a node size ahead of `pos` along the
    /// gradient, base half a size behind, base width half the node size.
    pub fn position(&mut self, id: usize, pos: Vec2) -> Result<()> {
        let ui = self.uis.get(id).copied().unwrap_or_default();
        let record = self.store.record_mut(id)?;

        let size = ui.node.size;
        let dir = ui.gradient.direction;
        let parallel = dir * (size / 2.0);
        let perpendicular = Vec2::new(dir.y, -dir.x) * (size / 4.0);

        let apex = pos + parallel;
        let right = pos - parallel + perpendicular;
        let left = pos - parallel - perpendicular;

        let flip = |p: Vec2| Vec2::new(p.x, -p.y);
        record[0] = DepthVertex::new(flip(apex), ui.node.depth, ui.node.color);
        record[1] = DepthVertex::new(flip(right), ui.node.depth, ui.node.color);
        record[2] = DepthVertex::new(flip(left), ui.node.depth, ui.node.color);
        Ok(())
    }

    pub fn clear_geometry(&mut self, id: usize) -> Result<()> {
        self.store.clear_record(id)
    }

    pub fn ui(&self, id: usize) -> Option<&DirectedNodeUi> {
        self.uis.get(id)
    }

    pub fn update_transform(&mut self, transform: Transform) {
        self.uniforms.update_transform(transform);
    }

    pub fn update_size(&mut self, half_size: [f32; 2]) {
        self.uniforms.update_size(half_size);
    }

    pub fn render(&mut self, sink: &mut dyn DrawSink) -> Result<()> {
        if self.store.is_empty() {
            return Ok(());
        }
        sink.submit(DrawCall {
            program: ProgramKind::DirectedNodes,
            topology: Topology::Triangles,
            layout: DepthVertex::LAYOUT,
            vertices: self.store.live_bytes(),
            indices: None,
            element_count: (self.store.len() * VERTICES_PER_NODE) as u32,
            uniforms: self.uniforms.take_dirty(),
        })
    }

    /// Drop all nodes and return the store to its minimal size.
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

    pub fn vertices(&self) -> &[DepthVertex] {
        self.store.live_vertices()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RecordingSink;

    #[test]
    fn triangle_points_along_gradient() {
        let mut nodes = DirectedNodeRenderer::new();
        let id = nodes.create_node(DirectedNodeUi {
            node: NodeUi {
                size: 8.0,
                depth: 1.0,
                ..NodeUi::default()
            },
            gradient: Gradient::towards(Vec2::new(3.0, 0.0)),
        });
        nodes.position(id, Vec2::new(10.0, 10.0)).unwrap();

        let v = nodes.vertices();
        // apex: +x by size/2, y flipped
        assert_eq!((v[0].x, v[0].y, v[0].z), (14.0, -10.0, 1.0));
        // base: -x by size/2, +-size/4 across
        assert_eq!((v[1].x, v[1].y), (6.0, -8.0));
        assert_eq!((v[2].x, v[2].y), (6.0, -12.0));
    }

    #[test]
    fn gradient_update_and_removal() {
        let mut nodes = DirectedNodeRenderer::new();
        let a = nodes.create_node(DirectedNodeUi::default());
        let b = nodes.create_node(DirectedNodeUi::default());
        nodes
            .set_gradient(b, Gradient::towards(Vec2::Y))
            .unwrap();

        assert_eq!(nodes.remove_node(a).unwrap(), Some(Relocation { from: 1, to: 0 }));
        assert_eq!(nodes.ui(0).unwrap().gradient.direction, Vec2::Y);
        assert!(nodes.set_gradient(1, Gradient::default()).is_err());

        let old = nodes.set_ui(0, NodeUi { size: 3.0, ..NodeUi::default() }).unwrap();
        assert_eq!(old.size, NodeUi::default().size);
        assert_eq!(nodes.ui(0).unwrap().node.size, 3.0);
        assert_eq!(nodes.ui(0).unwrap().gradient.direction, Vec2::Y);
    }

    #[test]
    fn zero_gradient_keeps_default_direction() {
        assert_eq!(Gradient::towards(Vec2::ZERO).direction, Vec2::X);
        assert_eq!(Gradient::towards(Vec2::new(0.0, -2.0)).direction, Vec2::NEG_Y);
    }

    #[test]
    fn render_emits_three_vertices_per_node() {
        let mut nodes = DirectedNodeRenderer::new();
        for _ in 0..5 {
            let id = nodes.create_node(DirectedNodeUi::default());
            nodes.position(id, Vec2::ONE).unwrap();
        }
        let mut sink = RecordingSink::new();
        nodes.render(&mut sink).unwrap();
        let draw = &sink.draws[0];
        assert_eq!(draw.topology, Topology::Triangles);
        assert_eq!(draw.element_count, 15);
        assert_eq!(draw.vertices.len(), 15 * 16);
    }
}
