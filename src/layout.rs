//! Layout providers
//!
//! Positions are computed elsewhere; the renderers only consume them. The
//! scene asks a [`LayoutProvider`] for every node and link position once per
//! frame. [`FixedLayout`] serves positions supplied up front.

use std::collections::HashMap;

use glam::Vec2;
use tracing::debug;

/// Axis-aligned bounds of all laid-out nodes, layout coordinates.
///
/// `(x1, y1)` is the top-left, `(x2, y2)` the bottom-right corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GraphRect {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Default for GraphRect {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl GraphRect {
    /// Inverted bounds that any point expands.
    pub const EMPTY: GraphRect = GraphRect {
        x1: f32::INFINITY,
        y1: f32::INFINITY,
        x2: f32::NEG_INFINITY,
        y2: f32::NEG_INFINITY,
    };

    pub fn include(&mut self, p: Vec2) {
        self.x1 = self.x1.min(p.x);
        self.y1 = self.y1.min(p.y);
        self.x2 = self.x2.max(p.x);
        self.y2 = self.y2.max(p.y);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x1 > self.x2 || self.y1 > self.y2
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }
}

/// Endpoints of a link, layout coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinkPosition {
    pub from: Vec2,
    pub to: Vec2,
}

/// Source of node and link positions.
pub trait LayoutProvider {
    fn node_position(&self, node: u64) -> Option<Vec2>;

    fn link_position(&self, link: u64) -> Option<LinkPosition>;

    fn graph_rect(&self) -> GraphRect;
}

/// Layout built from precomputed, normalized node positions.
///
/// Positions are multiplied by `sqrt(n * width)`, `n` being the number of
/// nodes at construction, so larger graphs spread over a larger area.
#[derive(Debug, Default)]
pub struct FixedLayout {
    scale: f32,
    nodes: HashMap<u64, Vec2>,
    links: HashMap<u64, (u64, u64)>,
    rect: GraphRect,
}

impl FixedLayout {
    pub fn new(positions: impl IntoIterator<Item = (u64, Vec2)>, width: f32) -> Self {
        let normalized: Vec<(u64, Vec2)> = positions.into_iter().collect();
        let scale = (normalized.len() as f32 * width).sqrt();
        let mut layout = Self {
            scale,
            ..Self::default()
        };
        layout.set_new_positions(normalized);
        debug!(nodes = layout.nodes.len(), scale, "Fixed layout created");
        layout
    }

    /// Register a link so [`LayoutProvider::link_position`] can resolve it.
    pub fn add_link(&mut self, link: u64, from: u64, to: u64) {
        self.links.insert(link, (from, to));
    }

    pub fn remove_link(&mut self, link: u64) {
        self.links.remove(&link);
    }

    /// Replace every node position and recompute the bounds from scratch.
    /// Nodes absent from `positions` are dropped.
    pub fn set_new_positions(&mut self, positions: impl IntoIterator<Item = (u64, Vec2)>) {
        let scale = self.scale;
        self.nodes = positions
            .into_iter()
            .map(|(id, p)| (id, p * scale))
            .collect();

        self.rect = GraphRect::EMPTY;
        for p in self.nodes.values() {
            self.rect.include(*p);
        }
    }

    #[inline]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl LayoutProvider for FixedLayout {
    fn node_position(&self, node: u64) -> Option<Vec2> {
        self.nodes.get(&node).copied()
    }

    fn link_position(&self, link: u64) -> Option<LinkPosition> {
        let (from, to) = self.links.get(&link)?;
        Some(LinkPosition {
            from: self.node_position(*from)?,
            to: self.node_position(*to)?,
        })
    }

    fn graph_rect(&self) -> GraphRect {
        self.rect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> FixedLayout {
        // 4 nodes * width 25 -> scale 10
        FixedLayout::new(
            [
                (1, Vec2::new(-1.0, -1.0)),
                (2, Vec2::new(1.0, -1.0)),
                (3, Vec2::new(1.0, 1.0)),
                (4, Vec2::new(-0.5, 0.5)),
            ],
            25.0,
        )
    }

    #[test]
    fn positions_are_scaled() {
        let layout = square();
        assert_eq!(layout.scale(), 10.0);
        assert_eq!(layout.node_position(3), Some(Vec2::new(10.0, 10.0)));
        assert_eq!(layout.node_position(9), None);
    }

    #[test]
    fn rect_covers_all_nodes() {
        let layout = square();
        let rect = layout.graph_rect();
        assert_eq!((rect.x1, rect.y1, rect.x2, rect.y2), (-10.0, -10.0, 10.0, 10.0));
        assert_eq!(rect.center(), Vec2::ZERO);
    }

    #[test]
    fn new_positions_recompute_rect() {
        let mut layout = square();
        layout.set_new_positions([(1, Vec2::new(0.0, 0.0)), (2, Vec2::new(0.5, 0.2))]);
        let rect = layout.graph_rect();
        assert_eq!((rect.x1, rect.y1, rect.x2, rect.y2), (0.0, 0.0, 5.0, 2.0));
        assert_eq!(layout.node_position(3), None);
        assert_eq!(layout.len(), 2);
    }

    #[test]
    fn link_position_resolves_endpoints() {
        let mut layout = square();
        layout.add_link(100, 1, 3);
        layout.add_link(101, 1, 42);
        let pos = layout.link_position(100).unwrap();
        assert_eq!(pos.from, Vec2::new(-10.0, -10.0));
        assert_eq!(pos.to, Vec2::new(10.0, 10.0));
        assert_eq!(layout.link_position(101), None);
        layout.remove_link(100);
        assert_eq!(layout.link_position(100), None);
    }

    #[test]
    fn empty_layout_has_empty_rect() {
        let layout = FixedLayout::new(std::iter::empty(), 10.0);
        assert!(layout.graph_rect().is_empty());
        assert!(layout.is_empty());
    }
}
