//! Per-link UI records

use serde::{Deserialize, Serialize};

use crate::core::PackedColor;

/// Visual properties of a link.
///
/// `level` 0 is a straight line; higher levels are curves bending to
/// alternating sides, farther out every two levels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkUi {
    pub color: PackedColor,
    pub level: u32,
    /// Draw an arrowhead at the destination end
    pub arrow: bool,
    pub depth: f32,
}

impl Default for LinkUi {
    fn default() -> Self {
        Self {
            color: PackedColor::LINK_DEFAULT,
            level: 0,
            arrow: false,
            depth: 0.0,
        }
    }
}

impl LinkUi {
    pub fn new(color: PackedColor, level: u32, arrow: bool) -> Self {
        Self {
            color,
            level,
            arrow,
            depth: 0.0,
        }
    }

    #[inline]
    pub fn is_curved(&self) -> bool {
        self.level > 0
    }
}
