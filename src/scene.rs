//! Scene coordinator
//!
//! Owns one renderer per primitive and the mapping between caller-visible
//! node/link ids and renderer slots. Renderers compact their stores on
//! removal and report which record moved; the scene applies that relocation
//! to its id tables so every id keeps pointing at the right slot.
//!
//! A link is only drawn while both endpoints are registered nodes with a
//! layout position; otherwise its records are collapsed to zero length.

use std::collections::HashMap;

use glam::Vec2;
use tracing::{debug, trace};

use crate::arrow::{ArrowRenderer, ArrowUi};
use crate::core::{
    DrawSink, GraphicsOptions, Relocation, RenderError, Result, SlotSwap, Transform, Viewport,
};
use crate::layout::{LayoutProvider, LinkPosition};
use crate::link::{CurvedLinkRenderer, LinkUi, StraightLinkRenderer};
use crate::node::{DirectedNodeRenderer, DirectedNodeUi, Gradient, NodeRenderer, NodeUi};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkKind {
    Straight,
    Curved,
}

#[derive(Clone, Copy, Debug)]
struct LinkEntry {
    from: u64,
    to: u64,
    kind: LinkKind,
    slot: usize,
    arrow: Option<usize>,
}

/// Entity counts, for logging and the CLI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SceneStats {
    pub nodes: usize,
    pub straight_links: usize,
    pub curved_links: usize,
    pub arrows: usize,
}

/// Maps domain ids to visual records for [`GraphScene::build_node`] and
/// [`GraphScene::build_link`]. Fixed when the scene is constructed.
pub trait UiBuilder {
    fn node_ui(&self, _node: u64) -> NodeUi {
        NodeUi::default()
    }

    fn link_ui(&self, _link: u64, _from: u64, _to: u64) -> LinkUi {
        LinkUi::default()
    }
}

/// Default colors and sizes for everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultUiBuilder;

impl UiBuilder for DefaultUiBuilder {}

/// Adjusts a node's layout position before it is written.
pub type PlaceNode = Box<dyn FnMut(u64, &NodeUi, Vec2) -> Vec2>;
/// Adjusts a link's endpoints (layout coordinates) before they are written.
pub type PlaceLink = Box<dyn FnMut(u64, &LinkUi, LinkPosition) -> LinkPosition>;

/// Node renderer picked by [`GraphicsOptions::directed_nodes`].
enum NodeLayer {
    Points(NodeRenderer),
    Directed(DirectedNodeRenderer),
}

impl NodeLayer {
    fn new(options: &GraphicsOptions) -> Self {
        if options.directed_nodes {
            Self::Directed(DirectedNodeRenderer::new())
        } else {
            Self::Points(NodeRenderer::new(options.node_shape))
        }
    }

    fn create(&mut self, ui: NodeUi) -> usize {
        match self {
            Self::Points(nodes) => nodes.create_node(ui),
            Self::Directed(nodes) => nodes.create_node(DirectedNodeUi {
                node: ui,
                gradient: Gradient::default(),
            }),
        }
    }

    fn remove(&mut self, slot: usize) -> Result<Option<Relocation>> {
        match self {
            Self::Points(nodes) => nodes.remove_node(slot),
            Self::Directed(nodes) => nodes.remove_node(slot),
        }
    }

    fn ui(&self, slot: usize) -> Option<&NodeUi> {
        match self {
            Self::Points(nodes) => nodes.ui(slot),
            Self::Directed(nodes) => nodes.ui(slot).map(|ui| &ui.node),
        }
    }

    fn set_ui(&mut self, slot: usize, ui: NodeUi) -> Option<NodeUi> {
        match self {
            Self::Points(nodes) => nodes.set_ui(slot, ui),
            Self::Directed(nodes) => nodes.set_ui(slot, ui),
        }
    }

    fn position(&mut self, slot: usize, pos: Vec2) -> Result<()> {
        match self {
            Self::Points(nodes) => nodes.position(slot, pos),
            Self::Directed(nodes) => nodes.position(slot, pos),
        }
    }

    fn clear_geometry(&mut self, slot: usize) -> Result<()> {
        match self {
            Self::Points(nodes) => nodes.clear_geometry(slot),
            Self::Directed(nodes) => nodes.clear_geometry(slot),
        }
    }

    fn update_transform(&mut self, transform: Transform) {
        match self {
            Self::Points(nodes) => nodes.update_transform(transform),
            Self::Directed(nodes) => nodes.update_transform(transform),
        }
    }

    fn update_size(&mut self, half_size: [f32; 2]) {
        match self {
            Self::Points(nodes) => nodes.update_size(half_size),
            Self::Directed(nodes) => nodes.update_size(half_size),
        }
    }

    fn render(&mut self, sink: &mut dyn DrawSink) -> Result<()> {
        match self {
            Self::Points(nodes) => nodes.render(sink),
            Self::Directed(nodes) => nodes.render(sink),
        }
    }

    fn reset(&mut self) {
        match self {
            Self::Points(nodes) => nodes.reset(),
            Self::Directed(nodes) => nodes.reset(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Points(nodes) => nodes.len(),
            Self::Directed(nodes) => nodes.len(),
        }
    }
}

pub struct GraphScene {
    options: GraphicsOptions,
    viewport: Viewport,
    transform: Transform,

    nodes: NodeLayer,
    straight: StraightLinkRenderer,
    curved: CurvedLinkRenderer,
    arrows: ArrowRenderer,

    builder: Box<dyn UiBuilder>,
    place_node: Option<PlaceNode>,
    place_link: Option<PlaceLink>,

    node_slots: HashMap<u64, usize>,
    /// slot -> node id, kept in step with the node store
    node_ids: Vec<u64>,
    /// slot -> last written layout position, `None` while unplaced
    node_positions: Vec<Option<Vec2>>,
    links: HashMap<u64, LinkEntry>,
    straight_ids: Vec<u64>,
    curved_ids: Vec<u64>,
    arrow_ids: Vec<u64>,
}

impl GraphScene {
    pub fn new(options: GraphicsOptions) -> Result<Self> {
        Self::with_ui_builder(options, DefaultUiBuilder)
    }

    /// Scene whose [`Self::build_node`] / [`Self::build_link`] take their
    /// visuals from `builder`.
    pub fn with_ui_builder(
        options: GraphicsOptions,
        builder: impl UiBuilder + 'static,
    ) -> Result<Self> {
        options.validate()?;
        debug!(?options, "Graph scene created");
        Ok(Self {
            nodes: NodeLayer::new(&options),
            straight: StraightLinkRenderer::new(),
            curved: CurvedLinkRenderer::new(options.curve_resolution, options.curviness),
            arrows: ArrowRenderer::new(options.curviness, options.arrow_size, options.arrow_pitch),
            options,
            viewport: Viewport::default(),
            transform: Transform::default(),
            builder: Box::new(builder),
            place_node: None,
            place_link: None,
            node_slots: HashMap::new(),
            node_ids: Vec::new(),
            node_positions: Vec::new(),
            links: HashMap::new(),
            straight_ids: Vec::new(),
            curved_ids: Vec::new(),
            arrow_ids: Vec::new(),
        })
    }

    pub fn options(&self) -> &GraphicsOptions {
        &self.options
    }

    /// Hook run on every node position in [`Self::update_positions`].
    pub fn set_place_node(&mut self, hook: impl FnMut(u64, &NodeUi, Vec2) -> Vec2 + 'static) {
        self.place_node = Some(Box::new(hook));
    }

    /// Hook run on every link position in [`Self::update_positions`].
    pub fn set_place_link(
        &mut self,
        hook: impl FnMut(u64, &LinkUi, LinkPosition) -> LinkPosition + 'static,
    ) {
        self.place_link = Some(Box::new(hook));
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    pub fn add_node(&mut self, id: u64, ui: NodeUi) -> Result<usize> {
        if self.node_slots.contains_key(&id) {
            return Err(RenderError::DuplicateNode(id));
        }
        let slot = self.nodes.create(ui);
        self.node_slots.insert(id, slot);
        self.node_ids.push(id);
        self.node_positions.push(None);
        trace!(id, slot, "Node added");
        Ok(slot)
    }

    /// Add a node styled by the scene's [`UiBuilder`].
    pub fn build_node(&mut self, id: u64) -> Result<usize> {
        let ui = self.builder.node_ui(id);
        self.add_node(id, ui)
    }

    /// Remove a node. Links touching it stay registered but collapse to zero
    /// length until a node with the same id is placed again.
    pub fn remove_node(&mut self, id: u64) -> Result<()> {
        let slot = self
            .node_slots
            .remove(&id)
            .ok_or(RenderError::UnknownNode(id))?;
        let moved = self.nodes.remove(slot)?;
        if slot < self.node_positions.len() {
            self.node_positions.swap_remove(slot);
        }
        relocate(&mut self.node_ids, slot, moved, |moved_id, to| {
            self.node_slots.insert(moved_id, to);
        });

        for entry in self.links.values().filter(|e| e.from == id || e.to == id) {
            clear_link(&mut self.straight, &mut self.curved, &mut self.arrows, entry)?;
        }
        trace!(id, slot, "Node removed");
        Ok(())
    }

    pub fn node_ui(&self, id: u64) -> Option<&NodeUi> {
        self.node_slots.get(&id).and_then(|&slot| self.nodes.ui(slot))
    }

    pub fn set_node_ui(&mut self, id: u64, ui: NodeUi) -> Result<()> {
        let slot = *self
            .node_slots
            .get(&id)
            .ok_or(RenderError::UnknownNode(id))?;
        self.nodes.set_ui(slot, ui);
        Ok(())
    }

    /// Point a directed node's triangle along `gradient`. Takes effect on
    /// the next [`Self::update_positions`].
    pub fn set_node_gradient(&mut self, id: u64, gradient: Gradient) -> Result<()> {
        let slot = *self
            .node_slots
            .get(&id)
            .ok_or(RenderError::UnknownNode(id))?;
        match &mut self.nodes {
            NodeLayer::Directed(nodes) => nodes.set_gradient(slot, gradient),
            NodeLayer::Points(_) => Err(RenderError::NotDirected(id)),
        }
    }

    pub fn node_slot(&self, id: u64) -> Option<usize> {
        self.node_slots.get(&id).copied()
    }

    // ------------------------------------------------------------------
    // Links
    // ------------------------------------------------------------------

    /// Register a link. Level 0 goes to the straight renderer, anything
    /// higher to the curved one; `ui.arrow` adds an arrowhead.
    pub fn add_link(&mut self, id: u64, from: u64, to: u64, ui: LinkUi) -> Result<LinkKind> {
        if self.links.contains_key(&id) {
            return Err(RenderError::DuplicateLink(id));
        }

        let arrow = ui.arrow.then(|| {
            let slot = self.arrows.create_arrow(ArrowUi {
                color: ui.color,
                level: ui.level,
            });
            self.arrow_ids.push(id);
            slot
        });

        let (kind, slot) = if ui.is_curved() {
            self.curved_ids.push(id);
            (LinkKind::Curved, self.curved.create_link(ui))
        } else {
            self.straight_ids.push(id);
            (LinkKind::Straight, self.straight.create_link(ui))
        };

        self.links.insert(
            id,
            LinkEntry {
                from,
                to,
                kind,
                slot,
                arrow,
            },
        );
        trace!(id, from, to, ?kind, slot, ?arrow, "Link added");
        Ok(kind)
    }

    /// Add a link styled by the scene's [`UiBuilder`].
    pub fn build_link(&mut self, id: u64, from: u64, to: u64) -> Result<LinkKind> {
        let ui = self.builder.link_ui(id, from, to);
        self.add_link(id, from, to, ui)
    }

    pub fn remove_link(&mut self, id: u64) -> Result<()> {
        let entry = self
            .links
            .remove(&id)
            .ok_or(RenderError::UnknownLink(id))?;
        let links = &mut self.links;

        if let Some(arrow_slot) = entry.arrow {
            let moved = self.arrows.remove_arrow(arrow_slot)?;
            relocate(&mut self.arrow_ids, arrow_slot, moved, |moved_id, to| {
                if let Some(link) = links.get_mut(&moved_id) {
                    link.arrow = Some(to);
                }
            });
        }

        let (moved, ids) = match entry.kind {
            LinkKind::Straight => (self.straight.remove_link(entry.slot)?, &mut self.straight_ids),
            LinkKind::Curved => (self.curved.remove_link(entry.slot)?, &mut self.curved_ids),
        };
        relocate(ids, entry.slot, moved, |moved_id, to| {
            if let Some(link) = links.get_mut(&moved_id) {
                link.slot = to;
            }
        });
        trace!(id, slot = entry.slot, "Link removed");
        Ok(())
    }

    /// Draw link `id` (and its arrowhead) on top of the other links of the
    /// same kind.
    pub fn bring_link_to_front(&mut self, id: u64) -> Result<()> {
        let entry = *self.links.get(&id).ok_or(RenderError::UnknownLink(id))?;

        let (swap, ids) = match entry.kind {
            LinkKind::Straight => (
                self.straight.bring_to_front(entry.slot)?,
                &mut self.straight_ids,
            ),
            LinkKind::Curved => (self.curved.bring_to_front(entry.slot)?, &mut self.curved_ids),
        };
        let links = &mut self.links;
        apply_swap(ids, swap, |link_id, slot| {
            if let Some(link) = links.get_mut(&link_id) {
                link.slot = slot;
            }
        });

        if let Some(arrow_slot) = entry.arrow {
            let swap = self.arrows.bring_to_front(arrow_slot)?;
            apply_swap(&mut self.arrow_ids, swap, |link_id, slot| {
                if let Some(link) = links.get_mut(&link_id) {
                    link.arrow = Some(slot);
                }
            });
        }
        Ok(())
    }

    pub fn link_ui(&self, id: u64) -> Option<&LinkUi> {
        let entry = self.links.get(&id)?;
        match entry.kind {
            LinkKind::Straight => self.straight.ui(entry.slot),
            LinkKind::Curved => self.curved.ui(entry.slot),
        }
    }

    /// Renderer kind and slot currently holding link `id`.
    pub fn link_slot(&self, id: u64) -> Option<(LinkKind, usize)> {
        self.links.get(&id).map(|e| (e.kind, e.slot))
    }

    pub fn arrow_slot(&self, id: u64) -> Option<usize> {
        self.links.get(&id).and_then(|e| e.arrow)
    }

    // ------------------------------------------------------------------
    // Frame
    // ------------------------------------------------------------------

    /// Rewrite every record from the layout.
    ///
    /// Place hooks run on layout coordinates. Link coordinates are then
    /// y-flipped here (nodes flip their own) and links stop at the boundary
    /// of their destination node. Unplaced nodes, and links with an
    /// unregistered or unplaced endpoint, are collapsed.
    pub fn update_positions<L: LayoutProvider + ?Sized>(&mut self, layout: &L) -> Result<()> {
        for (slot, &id) in self.node_ids.iter().enumerate() {
            let placed = match (layout.node_position(id), self.nodes.ui(slot).copied()) {
                (Some(pos), Some(ui)) => Some(match self.place_node.as_mut() {
                    Some(hook) => hook(id, &ui, pos),
                    None => pos,
                }),
                _ => None,
            };
            match placed {
                Some(pos) => self.nodes.position(slot, pos)?,
                None => self.nodes.clear_geometry(slot)?,
            }
            self.node_positions[slot] = placed;
        }

        let flip = |p: Vec2| Vec2::new(p.x, -p.y);
        for (&id, entry) in &self.links {
            let Some(pos) = resolve_link(layout, &self.node_slots, id, entry) else {
                trace!(id, "Link endpoint not placed, collapsed");
                clear_link(&mut self.straight, &mut self.curved, &mut self.arrows, entry)?;
                continue;
            };

            let ui = match entry.kind {
                LinkKind::Straight => self.straight.ui(entry.slot),
                LinkKind::Curved => self.curved.ui(entry.slot),
            }
            .copied()
            .unwrap_or_default();
            let pos = match self.place_link.as_mut() {
                Some(hook) => hook(id, &ui, pos),
                None => pos,
            };

            let (from, to) = (flip(pos.from), flip(pos.to));
            let node_size = self
                .node_slots
                .get(&entry.to)
                .and_then(|&slot| self.nodes.ui(slot))
                .map_or(0.0, |ui| ui.size);

            if let Some(arrow_slot) = entry.arrow {
                self.arrows.position(arrow_slot, from, to, node_size)?;
            }
            match entry.kind {
                LinkKind::Straight => self.straight.position(entry.slot, from, to, node_size)?,
                LinkKind::Curved => {
                    self.curved
                        .position_clipped(entry.slot, from, to, node_size)?
                }
            }
        }
        Ok(())
    }

    /// Submit this frame's draws: arrows, curved links, straight links, then
    /// nodes on top. Empty renderers submit nothing.
    pub fn render(&mut self, sink: &mut dyn DrawSink) -> Result<()> {
        self.arrows.render(sink)?;
        self.curved.render(sink)?;
        self.straight.render(sink)?;
        self.nodes.render(sink)
    }

    /// Drop every node and link.
    pub fn clear(&mut self) {
        self.nodes.reset();
        self.straight.reset();
        self.curved.reset();
        self.arrows.reset();
        self.node_slots.clear();
        self.node_ids.clear();
        self.node_positions.clear();
        self.links.clear();
        self.straight_ids.clear();
        self.curved_ids.clear();
        self.arrow_ids.clear();
        debug!("Graph scene cleared");
    }

    pub fn stats(&self) -> SceneStats {
        SceneStats {
            nodes: self.nodes.len(),
            straight_links: self.straight.len(),
            curved_links: self.curved.len(),
            arrows: self.arrows.len(),
        }
    }

    // ------------------------------------------------------------------
    // View
    // ------------------------------------------------------------------

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Resize the drawing surface without touching pan or zoom.
    pub fn update_size(&mut self, width: f32, height: f32) {
        self.viewport = Viewport::new(width, height);
        let half = self.viewport.half_size();
        self.nodes.update_size(half);
        self.straight.update_size(half);
        self.curved.update_size(half);
        self.arrows.update_size(half);
        debug!(width = self.viewport.width, height = self.viewport.height, "Viewport resized");
    }

    pub fn reset_scale(&mut self) {
        self.transform.reset();
        self.update_size(self.viewport.width, self.viewport.height);
        self.broadcast_transform();
    }

    /// Zoom around a client point; returns the new zoom factor.
    pub fn scale(&mut self, factor: f32, scroll_point: Vec2) -> f32 {
        let zoom = self.transform.scale(factor, scroll_point, self.viewport);
        self.broadcast_transform();
        zoom
    }

    pub fn translate_rel(&mut self, dx: f32, dy: f32) {
        self.transform.translate_rel(dx, dy, self.viewport);
        self.broadcast_transform();
    }

    pub fn graph_center_changed(&mut self, x: f32, y: f32) {
        self.transform.graph_center_changed(x, y, self.viewport);
        self.broadcast_transform();
    }

    pub fn client_to_graph(&self, p: Vec2) -> Vec2 {
        self.transform.client_to_graph(p, self.viewport)
    }

    pub fn graph_to_client(&self, p: Vec2) -> Vec2 {
        self.transform.graph_to_client(p, self.viewport)
    }

    /// First placed node for which `hit_test(ui, node_position,
    /// graph_point)` holds, where `graph_point` is `client` in layout
    /// coordinates. Linear in the node count.
    pub fn node_at_client_pos<F>(&self, client: Vec2, mut hit_test: F) -> Option<u64>
    where
        F: FnMut(&NodeUi, Vec2, Vec2) -> bool,
    {
        let point = self.client_to_graph(client);
        self.node_ids
            .iter()
            .zip(&self.node_positions)
            .enumerate()
            .find_map(|(slot, (&id, pos))| {
                let pos = (*pos)?;
                let ui = self.nodes.ui(slot)?;
                hit_test(ui, pos, point).then_some(id)
            })
    }

    fn broadcast_transform(&mut self) {
        let transform = self.transform;
        self.nodes.update_transform(transform);
        self.straight.update_transform(transform);
        self.curved.update_transform(transform);
        self.arrows.update_transform(transform);
    }
}

/// Hit test treating a node as a square of side `ui.size`.
pub fn square_hit_test(ui: &NodeUi, node: Vec2, point: Vec2) -> bool {
    let half = ui.size / 2.0;
    (point.x - node.x).abs() <= half && (point.y - node.y).abs() <= half
}

/// Endpoints of a link whose nodes are both registered. The layout's own
/// link position wins over the two node positions.
fn resolve_link<L: LayoutProvider + ?Sized>(
    layout: &L,
    node_slots: &HashMap<u64, usize>,
    id: u64,
    entry: &LinkEntry,
) -> Option<LinkPosition> {
    if !node_slots.contains_key(&entry.from) || !node_slots.contains_key(&entry.to) {
        return None;
    }
    layout.link_position(id).or_else(|| {
        Some(LinkPosition {
            from: layout.node_position(entry.from)?,
            to: layout.node_position(entry.to)?,
        })
    })
}

fn clear_link(
    straight: &mut StraightLinkRenderer,
    curved: &mut CurvedLinkRenderer,
    arrows: &mut ArrowRenderer,
    entry: &LinkEntry,
) -> Result<()> {
    if let Some(arrow_slot) = entry.arrow {
        arrows.clear_geometry(arrow_slot)?;
    }
    match entry.kind {
        LinkKind::Straight => straight.clear_geometry(entry.slot),
        LinkKind::Curved => curved.clear_geometry(entry.slot),
    }
}

/// Mirror a store's swap-removal in a slot -> id table and tell the caller
/// which id moved into which slot.
fn relocate(
    ids: &mut Vec<u64>,
    removed: usize,
    moved: Option<Relocation>,
    mut on_move: impl FnMut(u64, usize),
) {
    if removed >= ids.len() {
        return;
    }
    ids.swap_remove(removed);
    if let Some(Relocation { to, .. }) = moved {
        if let Some(&id) = ids.get(to) {
            on_move(id, to);
        }
    }
}

fn apply_swap(ids: &mut [u64], swap: Option<SlotSwap>, mut on_move: impl FnMut(u64, usize)) {
    let Some(SlotSwap { a, b }) = swap else {
        return;
    };
    ids.swap(a, b);
    on_move(ids[a], a);
    on_move(ids[b], b);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DepthVertex, FlatVertex, PackedColor, ProgramKind, RecordingSink};
    use crate::layout::{FixedLayout, GraphRect};
    use crate::node::PointVertex;

    fn scene() -> GraphScene {
        GraphScene::new(GraphicsOptions {
            curve_resolution: 4,
            arrow_size: 2.0,
            ..GraphicsOptions::default()
        })
        .unwrap()
    }

    fn straight(arrow: bool) -> LinkUi {
        LinkUi::new(PackedColor::LINK_DEFAULT, 0, arrow)
    }

    fn curved(level: u32, arrow: bool) -> LinkUi {
        LinkUi::new(PackedColor::LINK_DEFAULT, level, arrow)
    }

    /// Layout with `n` nodes laid out on the x axis at 0, 10, 20, ...
    fn line_layout(n: u64) -> FixedLayout {
        let mut layout = FixedLayout::new((0..n).map(|i| (i, Vec2::new(i as f32, 0.0))), 1.0);
        let scale = layout.scale();
        layout.set_new_positions((0..n).map(|i| (i, Vec2::new(i as f32 * 10.0 / scale, 0.0))));
        layout
    }

    #[test]
    fn links_are_routed_by_level() {
        let mut scene = scene();
        assert_eq!(scene.add_link(1, 0, 1, straight(false)).unwrap(), LinkKind::Straight);
        assert_eq!(scene.add_link(2, 0, 1, curved(1, true)).unwrap(), LinkKind::Curved);
        assert_eq!(scene.add_link(3, 1, 0, curved(2, false)).unwrap(), LinkKind::Curved);

        let stats = scene.stats();
        assert_eq!(stats.straight_links, 1);
        assert_eq!(stats.curved_links, 2);
        assert_eq!(stats.arrows, 1);
        assert_eq!(scene.link_slot(3), Some((LinkKind::Curved, 1)));
        assert_eq!(scene.arrow_slot(2), Some(0));
        assert_eq!(scene.arrow_slot(3), None);
    }

    #[test]
    fn duplicates_and_unknown_ids_are_rejected() {
        let mut scene = scene();
        scene.add_node(1, NodeUi::default()).unwrap();
        assert!(matches!(
            scene.add_node(1, NodeUi::default()),
            Err(RenderError::DuplicateNode(1))
        ));
        scene.add_link(5, 1, 1, straight(false)).unwrap();
        assert!(matches!(
            scene.add_link(5, 1, 1, straight(false)),
            Err(RenderError::DuplicateLink(5))
        ));
        assert!(matches!(scene.remove_node(2), Err(RenderError::UnknownNode(2))));
        assert!(matches!(scene.remove_link(6), Err(RenderError::UnknownLink(6))));
        assert!(matches!(
            scene.bring_link_to_front(6),
            Err(RenderError::UnknownLink(6))
        ));
    }

    #[test]
    fn node_removal_relocates_last_node() {
        let mut scene = scene();
        for id in 10..14 {
            scene.add_node(id, NodeUi::default()).unwrap();
        }
        scene.remove_node(11).unwrap();
        assert_eq!(scene.node_slot(13), Some(1));
        assert_eq!(scene.node_slot(11), None);

        scene.remove_node(12).unwrap();
        assert_eq!(scene.node_slot(10), Some(0));
        assert_eq!(scene.node_slot(13), Some(1));
        assert_eq!(scene.stats().nodes, 2);
    }

    #[test]
    fn link_removal_keeps_links_and_arrows_mapped() {
        let mut scene = scene();
        scene.add_link(1, 0, 1, straight(true)).unwrap();
        scene.add_link(2, 0, 1, straight(false)).unwrap();
        scene.add_link(3, 0, 1, straight(true)).unwrap();

        scene.remove_link(1).unwrap();
        assert_eq!(scene.link_slot(3), Some((LinkKind::Straight, 0)));
        assert_eq!(scene.link_slot(2), Some((LinkKind::Straight, 1)));
        assert_eq!(scene.arrow_slot(3), Some(0));
        assert_eq!(scene.stats().arrows, 1);

        scene.remove_link(3).unwrap();
        scene.remove_link(2).unwrap();
        assert_eq!(scene.stats(), SceneStats::default());
    }

    #[test]
    fn bring_to_front_updates_both_slots() {
        let mut scene = scene();
        for id in 0..3 {
            scene.add_link(id, 0, 1, curved(1, true)).unwrap();
        }
        scene.bring_link_to_front(0).unwrap();
        assert_eq!(scene.link_slot(0), Some((LinkKind::Curved, 2)));
        assert_eq!(scene.link_slot(2), Some((LinkKind::Curved, 0)));
        assert_eq!(scene.arrow_slot(0), Some(2));
        assert_eq!(scene.arrow_slot(2), Some(0));

        // removal after promotion still finds the right records
        // link 0 sits in the last slots and fills the hole
        scene.remove_link(2).unwrap();
        assert_eq!(scene.link_slot(0), Some((LinkKind::Curved, 0)));
        assert_eq!(scene.link_slot(1), Some((LinkKind::Curved, 1)));
        assert_eq!(scene.arrow_slot(0), Some(0));
    }

    #[test]
    fn positions_flip_links_and_clip_at_destination() {
        let mut scene = scene();
        scene
            .add_node(
                0,
                NodeUi {
                    size: 4.0,
                    ..NodeUi::default()
                },
            )
            .unwrap();
        scene
            .add_node(
                1,
                NodeUi {
                    size: 6.0,
                    ..NodeUi::default()
                },
            )
            .unwrap();
        scene.add_link(7, 0, 1, straight(true)).unwrap();
        // 2 nodes * width 50 -> scale 10
        let layout = FixedLayout::new([(0, Vec2::ZERO), (1, Vec2::new(0.0, 1.0))], 50.0);
        scene.update_positions(&layout).unwrap();

        let mut sink = RecordingSink::new();
        scene.render(&mut sink).unwrap();

        // node 1 at layout (0, 10); links are flipped to (0, -10) and stop
        // 3 units short of it
        let straight = sink.find(ProgramKind::StraightLinks).unwrap();
        let start: DepthVertex = bytemuck::pod_read_unaligned(&straight.vertices[..16]);
        let end: DepthVertex = bytemuck::pod_read_unaligned(&straight.vertices[16..32]);
        assert_eq!(start.position(), Vec2::ZERO);
        assert!((end.position() - Vec2::new(0.0, -7.0)).length() < 1e-5);

        let arrows = sink.find(ProgramKind::Arrows).unwrap();
        let tip: FlatVertex = bytemuck::pod_read_unaligned(&arrows.vertices[..12]);
        assert!((tip.position() - end.position()).length() < 1e-5);
    }

    fn all_zero(bytes: &[u8]) -> bool {
        bytes.iter().all(|&b| b == 0)
    }

    #[test]
    fn removed_link_bytes_are_not_drawn_again() {
        let mut scene = scene();
        scene.add_node(0, NodeUi::default()).unwrap();
        scene.add_node(1, NodeUi::default()).unwrap();
        let layout = line_layout(2);

        scene
            .add_link(1, 0, 1, LinkUi::new(PackedColor(0x11), 0, false))
            .unwrap();
        scene.update_positions(&layout).unwrap();
        scene.remove_link(1).unwrap();

        // reuses slot 0, but node 99 is not registered
        scene
            .add_link(2, 0, 99, LinkUi::new(PackedColor(0x22), 0, false))
            .unwrap();
        scene.update_positions(&layout).unwrap();
        let mut sink = RecordingSink::new();
        scene.render(&mut sink).unwrap();

        let draw = sink.find(ProgramKind::StraightLinks).unwrap();
        assert_eq!(draw.element_count, 2);
        assert!(all_zero(&draw.vertices));
    }

    #[test]
    fn links_of_removed_nodes_collapse() {
        let mut scene = scene();
        scene.add_node(0, NodeUi::default()).unwrap();
        scene.add_node(1, NodeUi::default()).unwrap();
        scene.add_link(1, 0, 1, straight(true)).unwrap();
        let layout = line_layout(2);
        scene.update_positions(&layout).unwrap();

        let mut sink = RecordingSink::new();
        scene.render(&mut sink).unwrap();
        assert!(!all_zero(&sink.find(ProgramKind::StraightLinks).unwrap().vertices));

        scene.remove_node(1).unwrap();
        sink.clear();
        scene.render(&mut sink).unwrap();
        assert!(all_zero(&sink.find(ProgramKind::StraightLinks).unwrap().vertices));
        assert!(all_zero(&sink.find(ProgramKind::Arrows).unwrap().vertices));

        // the layout still knows node 1; the scene does not
        scene.update_positions(&layout).unwrap();
        sink.clear();
        scene.render(&mut sink).unwrap();
        assert!(all_zero(&sink.find(ProgramKind::StraightLinks).unwrap().vertices));

        scene.add_node(1, NodeUi::default()).unwrap();
        scene.update_positions(&layout).unwrap();
        sink.clear();
        scene.render(&mut sink).unwrap();
        assert!(!all_zero(&sink.find(ProgramKind::StraightLinks).unwrap().vertices));
    }

    #[test]
    fn unplaced_nodes_draw_nothing() {
        let mut scene = scene();
        scene.add_node(0, NodeUi::default()).unwrap();
        scene.add_node(42, NodeUi::default()).unwrap();
        scene.update_positions(&line_layout(1)).unwrap();

        let mut sink = RecordingSink::new();
        scene.render(&mut sink).unwrap();
        let draw = sink.find(ProgramKind::Nodes(scene.options().node_shape)).unwrap();
        let size = std::mem::size_of::<PointVertex>();
        assert!(!all_zero(&draw.vertices[..size]));
        assert!(all_zero(&draw.vertices[size..2 * size]));

        scene.update_size(100.0, 100.0);
        assert_eq!(
            scene.node_at_client_pos(Vec2::new(50.0, 50.0), square_hit_test),
            Some(0)
        );
    }

    /// Nodes on the x axis every 10 units; link 7 is routed at y = 5.
    struct RoutedLayout;

    impl LayoutProvider for RoutedLayout {
        fn node_position(&self, node: u64) -> Option<Vec2> {
            Some(Vec2::new(node as f32 * 10.0, 0.0))
        }

        fn link_position(&self, link: u64) -> Option<LinkPosition> {
            (link == 7).then_some(LinkPosition {
                from: Vec2::new(0.0, 5.0),
                to: Vec2::new(20.0, 5.0),
            })
        }

        fn graph_rect(&self) -> GraphRect {
            GraphRect::EMPTY
        }
    }

    #[test]
    fn layout_link_positions_take_precedence() {
        let mut scene = scene();
        scene.add_node(0, NodeUi::default()).unwrap();
        scene.add_node(1, NodeUi::default()).unwrap();
        scene.add_link(7, 0, 1, straight(false)).unwrap();
        scene.add_link(8, 0, 1, straight(false)).unwrap();
        scene.update_positions(&RoutedLayout).unwrap();

        let mut sink = RecordingSink::new();
        scene.render(&mut sink).unwrap();
        let bytes = &sink.find(ProgramKind::StraightLinks).unwrap().vertices;
        let vertex = |i: usize| -> DepthVertex {
            bytemuck::pod_read_unaligned(&bytes[i * 16..(i + 1) * 16])
        };

        assert_eq!(vertex(0).position(), Vec2::new(0.0, -5.0));
        // node size 10 pulls the end back by 5
        assert!((vertex(1).position() - Vec2::new(15.0, -5.0)).length() < 1e-5);
        assert_eq!(vertex(2).position(), Vec2::ZERO);
        assert!((vertex(3).position() - Vec2::new(5.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn place_hooks_adjust_positions() {
        let mut scene = scene();
        scene.add_node(0, NodeUi::default()).unwrap();
        scene.add_node(1, NodeUi::default()).unwrap();
        scene.add_link(3, 0, 1, curved(1, false)).unwrap();
        scene.set_place_node(|_, _, pos| pos + Vec2::new(0.0, 1.0));
        scene.set_place_link(|id, ui, pos| {
            assert_eq!((id, ui.level), (3, 1));
            LinkPosition {
                from: pos.from + Vec2::new(0.0, 2.0),
                to: pos.to,
            }
        });
        scene.update_positions(&line_layout(2)).unwrap();

        let mut sink = RecordingSink::new();
        scene.render(&mut sink).unwrap();
        let nodes = sink.find(ProgramKind::Nodes(scene.options().node_shape)).unwrap();
        let first: PointVertex = bytemuck::pod_read_unaligned(&nodes.vertices[..20]);
        assert_eq!((first.x, first.y), (0.0, -1.0));

        let curve = sink.find(ProgramKind::CurvedLinks).unwrap();
        let start: FlatVertex = bytemuck::pod_read_unaligned(&curve.vertices[..12]);
        assert_eq!(start.position(), Vec2::new(0.0, -2.0));
    }

    struct Palette;

    impl UiBuilder for Palette {
        fn node_ui(&self, node: u64) -> NodeUi {
            NodeUi {
                size: node as f32,
                ..NodeUi::default()
            }
        }

        fn link_ui(&self, link: u64, _from: u64, _to: u64) -> LinkUi {
            LinkUi::new(PackedColor(link as u32), 2, true)
        }
    }

    #[test]
    fn builders_style_built_entities() {
        let mut plain = scene();
        plain.build_node(1).unwrap();
        assert_eq!(plain.node_ui(1), Some(&NodeUi::default()));
        assert_eq!(plain.build_link(1, 1, 1).unwrap(), LinkKind::Straight);

        let mut scene = GraphScene::with_ui_builder(GraphicsOptions::default(), Palette).unwrap();
        scene.build_node(3).unwrap();
        scene.build_node(4).unwrap();
        assert_eq!(scene.node_ui(3).unwrap().size, 3.0);
        assert!(matches!(scene.build_node(3), Err(RenderError::DuplicateNode(3))));

        assert_eq!(scene.build_link(9, 3, 4).unwrap(), LinkKind::Curved);
        assert_eq!(scene.link_ui(9).unwrap().color, PackedColor(9));
        assert_eq!(scene.arrow_slot(9), Some(0));
    }

    #[test]
    fn directed_mode_draws_triangles_along_gradients() {
        let mut points = scene();
        points.add_node(1, NodeUi::default()).unwrap();
        assert!(matches!(
            points.set_node_gradient(1, Gradient::default()),
            Err(RenderError::NotDirected(1))
        ));

        let mut scene = GraphScene::new(GraphicsOptions {
            directed_nodes: true,
            ..GraphicsOptions::default()
        })
        .unwrap();
        scene
            .add_node(
                0,
                NodeUi {
                    size: 8.0,
                    ..NodeUi::default()
                },
            )
            .unwrap();
        scene.set_node_gradient(0, Gradient::towards(Vec2::Y)).unwrap();
        assert!(matches!(
            scene.set_node_gradient(5, Gradient::default()),
            Err(RenderError::UnknownNode(5))
        ));
        scene
            .update_positions(&FixedLayout::new([(0, Vec2::ZERO)], 1.0))
            .unwrap();

        let mut sink = RecordingSink::new();
        scene.render(&mut sink).unwrap();
        assert!(sink
            .draws
            .iter()
            .all(|d| !matches!(d.program, ProgramKind::Nodes(_))));
        let draw = sink.find(ProgramKind::DirectedNodes).unwrap();
        assert_eq!(draw.element_count, 3);
        let apex: DepthVertex = bytemuck::pod_read_unaligned(&draw.vertices[..16]);
        assert!((apex.position() - Vec2::new(0.0, -4.0)).length() < 1e-5);

        scene.update_size(100.0, 100.0);
        assert_eq!(
            scene.node_at_client_pos(Vec2::new(50.0, 50.0), square_hit_test),
            Some(0)
        );
        scene.remove_node(0).unwrap();
        assert_eq!(scene.stats().nodes, 0);
    }

    #[test]
    fn render_order_and_empty_skip() {
        let mut scene = scene();
        let mut sink = RecordingSink::new();
        scene.render(&mut sink).unwrap();
        assert!(sink.draws.is_empty());

        scene.add_node(0, NodeUi::default()).unwrap();
        scene.add_node(1, NodeUi::default()).unwrap();
        scene.add_link(1, 0, 1, straight(false)).unwrap();
        scene.add_link(2, 1, 0, curved(3, true)).unwrap();
        scene.update_positions(&line_layout(2)).unwrap();
        scene.render(&mut sink).unwrap();

        let order: Vec<_> = sink.draws.iter().map(|d| d.program).collect();
        assert_eq!(
            order,
            vec![
                ProgramKind::Arrows,
                ProgramKind::CurvedLinks,
                ProgramKind::StraightLinks,
                ProgramKind::Nodes(scene.options().node_shape),
            ]
        );
    }

    #[test]
    fn transform_changes_reach_every_renderer_once() {
        let mut scene = scene();
        scene.add_node(0, NodeUi::default()).unwrap();
        scene.add_link(1, 0, 0, straight(false)).unwrap();
        let mut sink = RecordingSink::new();
        scene.render(&mut sink).unwrap();
        sink.clear();
        scene.render(&mut sink).unwrap();
        assert!(sink.draws.iter().all(|d| d.uniforms.is_none()));

        scene.update_size(800.0, 600.0);
        let zoom = scene.scale(2.0, Vec2::new(400.0, 300.0));
        assert_eq!(zoom, 2.0);
        sink.clear();
        scene.render(&mut sink).unwrap();
        for draw in &sink.draws {
            let uniforms = draw.uniforms.unwrap();
            assert_eq!(uniforms.screen_size, [400.0, 300.0]);
            assert_eq!(uniforms.transform[0][0], 2.0);
        }

        scene.reset_scale();
        assert_eq!(scene.transform().scale_factor(), 1.0);
    }

    #[test]
    fn hit_test_finds_node_under_cursor() {
        let mut scene = scene();
        scene.update_size(200.0, 200.0);
        scene.add_node(5, NodeUi::default()).unwrap();
        scene.add_node(6, NodeUi::default()).unwrap();
        let mut layout = FixedLayout::new([(5, Vec2::ZERO), (6, Vec2::ONE)], 0.5);
        layout.set_new_positions([(5, Vec2::ZERO), (6, Vec2::new(30.0, 40.0))]);
        scene.update_positions(&layout).unwrap();

        // layout (30, 40) is client (130, 140) in a 200x200 view
        assert_eq!(
            scene.node_at_client_pos(Vec2::new(131.0, 139.0), square_hit_test),
            Some(6)
        );
        assert_eq!(
            scene.node_at_client_pos(Vec2::new(100.0, 100.0), square_hit_test),
            Some(5)
        );
        assert_eq!(
            scene.node_at_client_pos(Vec2::new(10.0, 10.0), square_hit_test),
            None
        );
    }

    #[test]
    fn invalid_options_are_rejected() {
        let options = GraphicsOptions {
            curve_resolution: 0,
            ..GraphicsOptions::default()
        };
        assert!(matches!(
            GraphScene::new(options),
            Err(RenderError::InvalidOptions(_))
        ));
    }
}
