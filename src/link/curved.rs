//! Curved link renderer
//!
//! Each link is a quadratic Bezier sampled into `segments + 1` points and
//! drawn as an indexed line list. The index buffer only depends on slot
//! positions, so it is extended when the live range grows and never touched
//! on removal or promotion.

use glam::Vec2;
use tracing::debug;

use super::data::LinkUi;
use crate::core::geometry::{
    compute_control_point, curve_end_tangent, curve_parameters, pull_back,
    sample_quadratic_bezier,
};
use crate::core::{
    DenseBufferStore, DrawCall, DrawSink, FlatVertex, FrontTracker, ProgramKind, Relocation,
    Result, SlotSwap, Topology, Transform, UniformState,
};

pub struct CurvedLinkRenderer {
    segments: u32,
    curviness: f32,
    params: Vec<f32>,
    store: DenseBufferStore<FlatVertex>,
    uis: Vec<LinkUi>,
    /// Line-list indices for slots `0..indexed_links`
    indices: Vec<u32>,
    indexed_links: usize,
    front: FrontTracker,
    uniforms: UniformState,
}

impl CurvedLinkRenderer {
    /// `segments` is clamped to at least one.
    pub fn new(segments: u32, curviness: f32) -> Self {
        let segments = segments.max(1);
        debug!(segments, curviness, "Curved link renderer created");
        Self {
            segments,
            curviness,
            params: curve_parameters(segments),
            store: DenseBufferStore::new(segments as usize + 1),
            uis: Vec::new(),
            indices: Vec::new(),
            indexed_links: 0,
            front: FrontTracker::default(),
            uniforms: UniformState::default(),
        }
    }

    #[inline]
    pub fn segments(&self) -> u32 {
        self.segments
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

    /// Sample the full curve from `from` to `to`.
    pub fn position(&mut self, id: usize, from: Vec2, to: Vec2) -> Result<()> {
        let ui = self.uis.get(id).copied().unwrap_or_default();
        let control = compute_control_point(from, to, ui.level, self.curviness);
        self.write_curve(id, from, control, to, ui)
    }

    /// Sample the curve with its end pulled back along the arrival tangent
    /// by half the destination node's size. The control point is computed
    /// from the unclipped endpoints so the bend does not change.
    pub fn position_clipped(
        &mut self,
        id: usize,
        from: Vec2,
        to: Vec2,
        node_size: f32,
    ) -> Result<()> {
        let ui = self.uis.get(id).copied().unwrap_or_default();
        let control = compute_control_point(from, to, ui.level, self.curviness);
        let end = pull_back(to, curve_end_tangent(control, to), node_size / 2.0);
        self.write_curve(id, from, control, end, ui)
    }

    fn write_curve(
        &mut self,
        id: usize,
        from: Vec2,
        control: Vec2,
        to: Vec2,
        ui: LinkUi,
    ) -> Result<()> {
        let record = self.store.record_mut(id)?;
        for (vertex, &t) in record.iter_mut().zip(&self.params) {
            let point = sample_quadratic_bezier(from, control, to, t);
            *vertex = FlatVertex::new(point, ui.color);
        }
        Ok(())
    }

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

    /// Extend the index buffer so it covers `count` links.
    fn ensure_indices(&mut self, count: usize) {
        if count <= self.indexed_links {
            return;
        }
        let stride = self.segments + 1;
        for link in self.indexed_links..count {
            let base = link as u32 * stride;
            for k in 0..self.segments {
                self.indices.push(base + k);
                self.indices.push(base + k + 1);
            }
        }
        debug!(from = self.indexed_links, to = count, "Curved link indices extended");
        self.indexed_links = count;
    }

    pub fn render(&mut self, sink: &mut dyn DrawSink) -> Result<()> {
        let count = self.store.len();
        if count > 0 {
            self.ensure_indices(count);
            let index_count = count * self.segments as usize * 2;
            sink.submit(DrawCall {
                program: ProgramKind::CurvedLinks,
                topology: Topology::Lines,
                layout: FlatVertex::LAYOUT,
                vertices: self.store.live_bytes(),
                indices: Some(&self.indices[..index_count]),
                element_count: index_count as u32,
                uniforms: self.uniforms.take_dirty(),
            })?;
        }
        self.front.on_render(count);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.store.reset();
        self.uis.clear();
        self.indices.clear();
        self.indexed_links = 0;
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

    pub fn vertices(&self) -> &[FlatVertex] {
        self.store.live_vertices()
    }

    /// Sampled points of one link.
    pub fn link_vertices(&self, id: usize) -> Result<&[FlatVertex]> {
        self.store.record(id)
    }
}
