//! View transform, viewport and the per-renderer uniform copy
//!
//! The scene owns the authoritative [`Transform`] and broadcasts a copy to
//! every renderer when it changes. Each renderer keeps its own
//! [`UniformState`] with a dirty flag, so uniforms are re-uploaded only after
//! a change instead of every frame.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2};

/// Canvas size in pixels. Never zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
        }
    }

    /// Half extents, the unit the vertex shaders divide layout positions by
    #[inline]
    pub fn half_size(&self) -> [f32; 2] {
        [self.width / 2.0, self.height / 2.0]
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

/// Pan/zoom transform applied to every vertex after the screen-size divide.
///
/// Only uniform scale (`x_axis.x`, `y_axis.y`) and translation
/// (`w_axis.x`, `w_axis.y`) are ever touched.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    matrix: Mat4,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            matrix: Mat4::IDENTITY,
        }
    }
}

impl Transform {
    #[inline]
    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    /// Current zoom factor
    #[inline]
    pub fn scale_factor(&self) -> f32 {
        self.matrix.x_axis.x
    }

    pub fn reset(&mut self) {
        self.matrix = Mat4::IDENTITY;
    }

    /// Put client point `(x, y)` at the center of the clip space.
    pub fn graph_center_changed(&mut self, x: f32, y: f32, viewport: Viewport) {
        self.matrix.w_axis.x = 2.0 * x / viewport.width - 1.0;
        self.matrix.w_axis.y = 1.0 - 2.0 * y / viewport.height;
    }

    /// Pan by a client-space delta in pixels.
    pub fn translate_rel(&mut self, dx: f32, dy: f32, viewport: Viewport) {
        self.matrix.w_axis.x += 2.0 * dx / viewport.width;
        self.matrix.w_axis.y -= 2.0 * dy / viewport.height;
    }

    /// Zoom by `factor` around `scroll_point` (client pixels). Returns the new
    /// zoom factor.
    pub fn scale(&mut self, factor: f32, scroll_point: Vec2, viewport: Viewport) -> f32 {
        let mut cx = 2.0 * scroll_point.x / viewport.width - 1.0;
        let mut cy = 1.0 - 2.0 * scroll_point.y / viewport.height;

        cx -= self.matrix.w_axis.x;
        cy -= self.matrix.w_axis.y;

        self.matrix.w_axis.x += cx * (1.0 - factor);
        self.matrix.w_axis.y += cy * (1.0 - factor);

        self.matrix.x_axis.x *= factor;
        self.matrix.y_axis.y *= factor;

        self.matrix.x_axis.x
    }

    /// Client (DOM/window pixel) coordinates to layout coordinates.
    pub fn client_to_graph(&self, p: Vec2, viewport: Viewport) -> Vec2 {
        let m = &self.matrix;
        let nx = 2.0 * p.x / viewport.width - 1.0;
        let ny = 1.0 - 2.0 * p.y / viewport.height;

        let x = (nx - m.w_axis.x) / m.x_axis.x;
        let y = (ny - m.w_axis.y) / m.y_axis.y;

        Vec2::new(x * (viewport.width / 2.0), y * (-viewport.height / 2.0))
    }

    /// Layout coordinates to client coordinates. Inverse of
    /// [`Self::client_to_graph`].
    pub fn graph_to_client(&self, p: Vec2, viewport: Viewport) -> Vec2 {
        let m = &self.matrix;
        let x = p.x / (viewport.width / 2.0);
        let y = p.y / (-viewport.height / 2.0);

        let x = x * m.x_axis.x + m.w_axis.x;
        let y = y * m.y_axis.y + m.w_axis.y;

        Vec2::new((x + 1.0) * viewport.width / 2.0, (1.0 - y) * viewport.height / 2.0)
    }
}

/// Uniform block shared by every program (80 bytes, WGSL-compatible layout)
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Uniforms {
    pub transform: [[f32; 4]; 4],
    pub screen_size: [f32; 2],
    pub _pad: [f32; 2],
}

impl Default for Uniforms {
    fn default() -> Self {
        Self {
            transform: Mat4::IDENTITY.to_cols_array_2d(),
            screen_size: [0.5, 0.5],
            _pad: [0.0; 2],
        }
    }
}

/// A renderer's private copy of the transform and screen size.
#[derive(Clone, Debug)]
pub struct UniformState {
    transform: Transform,
    screen_size: [f32; 2],
    dirty: bool,
}

impl Default for UniformState {
    fn default() -> Self {
        Self {
            transform: Transform::default(),
            screen_size: Viewport::default().half_size(),
            dirty: true,
        }
    }
}

impl UniformState {
    pub fn update_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.dirty = true;
    }

    /// `half_size` is the viewport's half extents.
    pub fn update_size(&mut self, half_size: [f32; 2]) {
        self.screen_size = half_size;
        self.dirty = true;
    }

    pub fn uniforms(&self) -> Uniforms {
        Uniforms {
            transform: self.transform.matrix().to_cols_array_2d(),
            screen_size: self.screen_size,
            _pad: [0.0; 2],
        }
    }

    /// Uniforms to upload, once per change.
    pub fn take_dirty(&mut self) -> Option<Uniforms> {
        if std::mem::take(&mut self.dirty) {
            Some(self.uniforms())
        } else {
            None
        }
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}
