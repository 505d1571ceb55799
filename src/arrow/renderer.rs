use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::geometry::{
    compute_control_point, curve_end_tangent, normalized_direction, perpendicular, pull_back,
};
use crate::core::{
    DenseBufferStore, DrawCall, DrawSink, FlatVertex, FrontTracker, PackedColor, ProgramKind,
    Relocation, Result, SlotSwap, Topology, Transform, UniformState,
};

const VERTICES_PER_ARROW: usize = 3;

/// What an arrowhead needs to know about its link.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrowUi {
    pub color: PackedColor,
    /// Level of the owning link; decides the approach direction
    pub level: u32,
}

pub struct ArrowRenderer {
    curviness: f32,
    arrow_size: f32,
    /// Half-width of the base, `arrow_size * tan(pitch)`
    half_width: f32,
    store: DenseBufferStore<FlatVertex>,
    uis: Vec<ArrowUi>,
    front: FrontTracker,
    uniforms: UniformState,
}

impl ArrowRenderer {
    /// `pitch` is the half-angle at the tip in radians.
    pub fn new(curviness: f32, arrow_size: f32, pitch: f32) -> Self {
        debug!(arrow_size, pitch, "Arrow renderer created");
        Self {
            curviness,
            arrow_size,
            half_width: arrow_size * pitch.tan(),
            store: DenseBufferStore::new(VERTICES_PER_ARROW),
            uis: Vec::new(),
            front: FrontTracker::default(),
            uniforms: UniformState::default(),
        }
    }

    pub fn create_arrow(&mut self, ui: ArrowUi) -> usize {
        let id = self.store.create();
        self.uis.push(ui);
        self.front.on_create(id);
        id
    }

    pub fn remove_arrow(&mut self, id: usize) -> Result<Option<Relocation>> {
        if self.store.is_empty() {
            return Ok(None);
        }
        let moved = self.store.remove(id)?;
        self.uis.swap_remove(id);
        self.front.on_remove(self.store.len());
        Ok(moved)
    }

    /// Direction in which the link arrives at `to`: the chord for straight
    /// links, the curve's end tangent otherwise.
    fn approach(&self, ui: &ArrowUi, from: Vec2, to: Vec2) -> Vec2 {
        if ui.level == 0 {
            normalized_direction(from, to)
        } else {
            let control = compute_control_point(from, to, ui.level, self.curviness);
            curve_end_tangent(control, to)
        }
    }

    /// Write the triangle: tip on the destination node's boundary, base
    /// `arrow_size` behind it.
    pub fn position(&mut self, id: usize, from: Vec2, to: Vec2, node_size: f32) -> Result<()> {
        let ui = self.uis.get(id).copied().unwrap_or_default();
        let dir = self.approach(&ui, from, to);
        let (arrow_size, half_width) = (self.arrow_size, self.half_width);
        let record = self.store.record_mut(id)?;

        let tip = pull_back(to, dir, node_size / 2.0);
        let base = pull_back(tip, dir, arrow_size);
        let across = perpendicular(dir) * half_width;

        record[0] = FlatVertex::new(tip, ui.color);
        record[1] = FlatVertex::new(base + across, ui.color);
        record[2] = FlatVertex::new(base - across, ui.color);
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

    pub fn front_arrow_id(&self) -> Option<usize> {
        self.front.front()
    }

    pub fn ui(&self, id: usize) -> Option<&ArrowUi> {
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
                program: ProgramKind::Arrows,
                topology: Topology::Triangles,
                layout: FlatVertex::LAYOUT,
                vertices: self.store.live_bytes(),
                indices: None,
                element_count: (count * VERTICES_PER_ARROW) as u32,
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

    pub fn vertices(&self) -> &[FlatVertex] {
        self.store.live_vertices()
    }
}
