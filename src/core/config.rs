//! Graphics options, fixed at renderer construction
//!
//! Options deserialize from camelCase JSON; every field has a default so a
//! partial document (or `{}`) is valid.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::color::PackedColor;
use super::error::{RenderError, Result};

/// Fragment variant used for point nodes.
///
/// Each variant maps to a precompiled fragment entry point; nothing is
/// assembled at runtime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeShape {
    Square,
    #[default]
    Circle,
    AntialiasedCircle,
    Texture,
}

impl NodeShape {
    pub const ALL: &'static [NodeShape] = &[
        NodeShape::Square,
        NodeShape::Circle,
        NodeShape::AntialiasedCircle,
        NodeShape::Texture,
    ];

    /// Fragment shader entry point implementing this shape
    pub fn fragment_entry(self) -> &'static str {
        match self {
            NodeShape::Square => "fs_square",
            NodeShape::Circle => "fs_circle",
            NodeShape::AntialiasedCircle => "fs_antialiased_circle",
            NodeShape::Texture => "fs_texture",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphicsOptions {
    /// Alpha blending for node/link colors
    pub enable_blending: bool,
    /// Clear the target before drawing
    pub clear_color: bool,
    pub clear_color_value: PackedColor,
    /// Line segments per curved link
    pub curve_resolution: u32,
    /// Control-point offset per curve shell, relative to link length
    pub curviness: f32,
    /// Arrowhead length along the link, in layout units
    pub arrow_size: f32,
    /// Half opening angle of the arrowhead, in radians
    pub arrow_pitch: f32,
    pub node_shape: NodeShape,
    /// Draw nodes as triangles pointing along their gradient instead of
    /// shaped points
    pub directed_nodes: bool,
}

impl Default for GraphicsOptions {
    fn default() -> Self {
        Self {
            enable_blending: true,
            clear_color: false,
            clear_color_value: PackedColor::WHITE,
            curve_resolution: 10,
            curviness: 0.1,
            arrow_size: 20.0,
            arrow_pitch: std::f32::consts::PI / 8.0,
            node_shape: NodeShape::Circle,
            directed_nodes: false,
        }
    }
}

impl GraphicsOptions {
    /// Parse and validate options from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: GraphicsOptions = serde_json::from_str(json)?;
        options.validate()?;
        debug!(?options, "Graphics options loaded");
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.curve_resolution == 0 {
            return Err(RenderError::InvalidOptions(
                "curveResolution must be at least 1".into(),
            ));
        }
        if !self.arrow_size.is_finite() || self.arrow_size < 0.0 {
            return Err(RenderError::InvalidOptions(format!(
                "arrowSize must be a non-negative number, got {}",
                self.arrow_size
            )));
        }
        if !self.curviness.is_finite() {
            return Err(RenderError::InvalidOptions("curviness must be finite".into()));
        }
        Ok(())
    }
}
