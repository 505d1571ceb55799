//! Straight link renderer - two vertices per link, drawn as a line list

use glam::Vec2;
use tracing::debug;

use super::data::LinkUi;
use crate::core::geometry::{normalized_direction, pull_back};
use crate::core::{
    DenseBufferStore, DepthVertex, DrawCall, DrawSink, FrontTracker, ProgramKind, Relocation,
    Result, SlotSwap, Topology, Transform, UniformState,
};

const VERTICES_PER_LINK: usize = 2;

pub struct StraightLinkRenderer {
    store: DenseBufferStore<DepthVertex>,
    uis: Vec<LinkUi>,
    front: FrontTracker,
    uniforms: UniformState,
}

impl Default for StraightLinkRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl StraightLinkRenderer {
    pub fn new() -> Self {
        debug!("Straight link renderer created");
        Self {
            store: DenseBufferStore::new(VERTICES_PER_LINK),
            uis: Vec::new(),
            front: FrontTracker::default(),
            uniforms: UniformState::default(),
        }
    }

    pub fn create_link(&mut self, ui: LinkUi) -> usize {
        let id = self.store.create();
        self.uis.push(ui);
        self.front.on_create(id);
        id
    }

    pub fn remove_link(&mut self, id: usize) -> Result<Option<Relocation>> {
        if self.store.is_empty() {
            return Ok(None);
        }
        let moved = self.store.remove(id)?;
        self.uis.swap_remove(id);
        self.front.on_remove(self.store.len());
        Ok(moved)
    }

    /// Write the link's two vertices. The destination end is pulled back by
    /// half the destination node's size so the line stops at its boundary.
    pub fn position(&mut self, id: usize, from: Vec2, to: Vec2, node_size: f32) -> Result<()> {
        let ui = self.uis.get(id).copied().unwrap_or_default();
        let record = self.store.record_mut(id)?;

        let dir = normalized_direction(from, to);
        let end = pull_back(to, dir, node_size / 2.0);

        record[0] = DepthVertex::new(from, ui.depth, ui.color);
        record[1] = DepthVertex::new(end, ui.depth, ui.color);
        Ok(())
    }

    /// Move link `id` on top of the others. Both swapped slots change owner;
    /// the returned swap tells the caller which.
    /// Collapse a link to zero length, e.g. while an endpoint is unplaced.
    pub fn clear_geometry(&mut self, id: usize) -> Result<()> {
        self.store.clear_record(id)
    }

    pub fn bring_to_front(&mut self, id: usize) -> Result<Option<SlotSwap>> {
        self.store.record(id)?;
        let swap = self.front.bring_to_front(id);
        if let Some(SlotSwap { a, b }) = swap {
            self.store.swap(a, b)?;
            self.uis.swap(a, b);
        }
        Ok(swap)
    }

    pub fn front_link_id(&self) -> Option<usize> {
        self.front.front()
    }

    pub fn ui(&self, id: usize) -> Option<&LinkUi> {
        self.uis.get(id)
    }

    pub fn update_transform(&mut self, transform: Transform) {
        self.uniforms.update_transform(transform);
    }

    pub fn update_size(&mut self, half_size: [f32; 2]) {
        self.uniforms.update_size(half_size);
    }

    pub fn render(&mut self, sink: &mut dyn DrawSink) -> Result<()> {
        let count = self.store.len();
        if count > 0 {
            sink.submit(DrawCall {
                program: ProgramKind::StraightLinks,
                topology: Topology::Lines,
                layout: DepthVertex::LAYOUT,
                vertices: self.store.live_bytes(),
                indices: None,
                element_count: (count * VERTICES_PER_LINK) as u32,
                uniforms: self.uniforms.take_dirty(),
            })?;
        }
        self.front.on_render(count);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.store.reset();
        self.uis.clear();
        self.front.reset();
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
    use crate::core::{PackedColor, RecordingSink};

    fn link(color: u32) -> LinkUi {
        LinkUi::new(PackedColor(color), 0, false)
    }

    #[test]
    fn destination_is_clipped_to_node_boundary() {
        let mut links = StraightLinkRenderer::new();
        let id = links.create_link(link(7));
        links
            .position(id, Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), 4.0)
            .unwrap();

        let v = links.vertices();
        assert_eq!(v[0].position(), Vec2::new(0.0, 0.0));
        assert_eq!(v[1].position(), Vec2::new(8.0, 0.0));
        assert_eq!(v[1].color, 7);
    }

    #[test]
    fn coincident_endpoints_produce_nan_not_panic() {
        let mut links = StraightLinkRenderer::new();
        let id = links.create_link(link(1));
        let p = Vec2::new(2.0, 2.0);
        links.position(id, p, p, 4.0).unwrap();
        assert_eq!(links.vertices()[0].position(), p);
        assert!(links.vertices()[1].x.is_nan());
    }

    #[test]
    fn bring_to_front_swaps_with_front_slot() {
        let mut links = StraightLinkRenderer::new();
        for c in 0..4 {
            let id = links.create_link(link(c));
            links
                .position(id, Vec2::ZERO, Vec2::new(1.0 + c as f32, 0.0), 0.0)
                .unwrap();
        }

        let swap = links.bring_to_front(0).unwrap();
        assert_eq!(swap, Some(SlotSwap { a: 0, b: 3 }));
        assert_eq!(links.ui(3).unwrap().color, PackedColor(0));
        assert_eq!(links.vertices()[3 * 2].color, 0);
        assert_eq!(links.vertices()[0].color, 3);
        assert_eq!(links.front_link_id(), Some(2));

        let mut sink = RecordingSink::new();
        links.render(&mut sink).unwrap();
        assert_eq!(links.front_link_id(), Some(3));
    }

    #[test]
    fn render_uses_two_vertices_per_link() {
        let mut links = StraightLinkRenderer::new();
        for c in 0..3 {
            let id = links.create_link(link(c));
            links.position(id, Vec2::ZERO, Vec2::ONE, 0.0).unwrap();
        }
        links.remove_link(1).unwrap();

        let mut sink = RecordingSink::new();
        links.render(&mut sink).unwrap();
        let draw = sink.find(ProgramKind::StraightLinks).unwrap();
        assert_eq!(draw.topology, Topology::Lines);
        assert_eq!(draw.element_count, 4);
        assert_eq!(draw.vertices.len(), 4 * std::mem::size_of::<DepthVertex>());
    }

    #[test]
    fn out_of_range_removal_is_an_error() {
        let mut links = StraightLinkRenderer::new();
        links.create_link(link(0));
        assert!(links.remove_link(5).is_err());
        assert_eq!(links.len(), 1);
    }
}
