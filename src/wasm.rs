//! Browser bindings
//!
//! The host page owns the WebGL/WebGPU context. `WasmGraph::frame()` hands
//! back one plain object per draw (program name, typed arrays, counts and
//! uniforms when they changed) for the page to upload.

use std::collections::HashMap;

use glam::Vec2;
use js_sys::{Array, Float32Array, Object, Reflect, Uint32Array, Uint8Array};
use tracing::warn;
use wasm_bindgen::prelude::*;

use crate::core::{
    DrawCall, DrawSink, GraphicsOptions, PackedColor, RenderError, Result, Topology,
};
use crate::layout::{GraphRect, LayoutProvider, LinkPosition};
use crate::link::LinkUi;
use crate::node::{Gradient, NodeUi};
use crate::scene::{square_hit_test, GraphScene};

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Positions pushed by the host, one per node.
#[derive(Default)]
struct HostPositions {
    nodes: HashMap<u64, Vec2>,
    links: HashMap<u64, (u64, u64)>,
}

impl LayoutProvider for HostPositions {
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
        let mut rect = GraphRect::EMPTY;
        for p in self.nodes.values() {
            rect.include(*p);
        }
        rect
    }
}

/// Collects draws into JS objects.
struct JsFrame {
    draws: Array,
}

fn set(target: &Object, key: &str, value: &JsValue) -> std::result::Result<(), JsValue> {
    Reflect::set(target, &JsValue::from_str(key), value).map(|_| ())
}

impl JsFrame {
    fn draw_object(call: &DrawCall<'_>) -> std::result::Result<Object, JsValue> {
        let draw = Object::new();
        set(&draw, "program", &JsValue::from_str(call.program.label()))?;
        let topology = match call.topology {
            Topology::Points => "points",
            Topology::Lines => "lines",
            Topology::Triangles => "triangles",
        };
        set(&draw, "topology", &JsValue::from_str(topology))?;
        set(&draw, "stride", &JsValue::from(call.layout.stride as u32))?;
        set(&draw, "vertices", &Uint8Array::from(call.vertices).into())?;
        if let Some(indices) = call.indices {
            set(&draw, "indices", &Uint32Array::from(indices).into())?;
        }
        set(&draw, "count", &JsValue::from(call.element_count))?;
        if let Some(uniforms) = call.uniforms {
            let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&uniforms));
            set(&draw, "uniforms", &Float32Array::from(floats).into())?;
        }
        Ok(draw)
    }
}

impl DrawSink for JsFrame {
    fn submit(&mut self, call: DrawCall<'_>) -> Result<()> {
        let program = call.program.label();
        let draw = Self::draw_object(&call).map_err(|err| {
            warn!(program, ?err, "Draw export failed");
            RenderError::DrawExport {
                program,
                reason: format!("{err:?}"),
            }
        })?;
        self.draws.push(&draw);
        Ok(())
    }
}

#[wasm_bindgen]
pub struct WasmGraph {
    scene: GraphScene,
    positions: HostPositions,
}

#[wasm_bindgen]
impl WasmGraph {
    /// `options` is an optional JSON string of graphics options.
    #[wasm_bindgen(constructor)]
    pub fn new(options: Option<String>) -> std::result::Result<WasmGraph, JsValue> {
        let options = match options {
            Some(json) => GraphicsOptions::from_json_str(&json).map_err(js_error)?,
            None => GraphicsOptions::default(),
        };
        Ok(Self {
            scene: GraphScene::new(options).map_err(js_error)?,
            positions: HostPositions::default(),
        })
    }

    #[wasm_bindgen(js_name = addNode)]
    pub fn add_node(&mut self, id: u32, color: u32, size: f32) -> std::result::Result<(), JsValue> {
        let ui = NodeUi {
            color: PackedColor(color),
            size,
            ..NodeUi::default()
        };
        self.scene.add_node(id.into(), ui).map(|_| ()).map_err(js_error)
    }

    #[wasm_bindgen(js_name = removeNode)]
    pub fn remove_node(&mut self, id: u32) -> std::result::Result<(), JsValue> {
        self.positions.nodes.remove(&u64::from(id));
        self.scene.remove_node(id.into()).map_err(js_error)
    }

    #[wasm_bindgen(js_name = setNodePosition)]
    pub fn set_node_position(&mut self, id: u32, x: f32, y: f32) {
        self.positions.nodes.insert(id.into(), Vec2::new(x, y));
    }

    #[wasm_bindgen(js_name = addLink)]
    pub fn add_link(
        &mut self,
        id: u32,
        from: u32,
        to: u32,
        color: u32,
        level: u32,
        arrow: bool,
    ) -> std::result::Result<(), JsValue> {
        let ui = LinkUi::new(PackedColor(color), level, arrow);
        self.scene
            .add_link(id.into(), from.into(), to.into(), ui)
            .map_err(js_error)?;
        self.positions.links.insert(id.into(), (from.into(), to.into()));
        Ok(())
    }

    /// Like `addLink`, with a CSS-style hex color (`"#rrggbb"`, `"#rgb"`,
    /// `"#rrggbbaa"`).
    #[wasm_bindgen(js_name = addLinkHex)]
    pub fn add_link_hex(
        &mut self,
        id: u32,
        from: u32,
        to: u32,
        color: &str,
        level: u32,
        arrow: bool,
    ) -> std::result::Result<(), JsValue> {
        let color = PackedColor::from_hex_str(color)
            .ok_or_else(|| JsValue::from_str(&format!("invalid hex color {color:?}")))?;
        self.add_link(id, from, to, color.0, level, arrow)
    }

    /// Point a directed node along `(dx, dy)`. Fails unless the graph was
    /// created with `directedNodes`.
    #[wasm_bindgen(js_name = setNodeGradient)]
    pub fn set_node_gradient(
        &mut self,
        id: u32,
        dx: f32,
        dy: f32,
    ) -> std::result::Result<(), JsValue> {
        self.scene
            .set_node_gradient(id.into(), Gradient::towards(Vec2::new(dx, dy)))
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = removeLink)]
    pub fn remove_link(&mut self, id: u32) -> std::result::Result<(), JsValue> {
        self.positions.links.remove(&u64::from(id));
        self.scene.remove_link(id.into()).map_err(js_error)
    }

    #[wasm_bindgen(js_name = bringLinkToFront)]
    pub fn bring_link_to_front(&mut self, id: u32) -> std::result::Result<(), JsValue> {
        self.scene.bring_link_to_front(id.into()).map_err(js_error)
    }

    #[wasm_bindgen(js_name = updateSize)]
    pub fn update_size(&mut self, width: f32, height: f32) {
        self.scene.update_size(width, height);
    }

    #[wasm_bindgen(js_name = resetScale)]
    pub fn reset_scale(&mut self) {
        self.scene.reset_scale();
    }

    pub fn scale(&mut self, factor: f32, x: f32, y: f32) -> f32 {
        self.scene.scale(factor, Vec2::new(x, y))
    }

    #[wasm_bindgen(js_name = translateRel)]
    pub fn translate_rel(&mut self, dx: f32, dy: f32) {
        self.scene.translate_rel(dx, dy);
    }

    #[wasm_bindgen(js_name = graphCenterChanged)]
    pub fn graph_center_changed(&mut self, x: f32, y: f32) {
        self.scene.graph_center_changed(x, y);
    }

    /// Node under a client point, treating nodes as squares.
    #[wasm_bindgen(js_name = nodeAtClientPos)]
    pub fn node_at_client_pos(&self, x: f32, y: f32) -> Option<u32> {
        self.scene
            .node_at_client_pos(Vec2::new(x, y), square_hit_test)
            .and_then(|id| u32::try_from(id).ok())
    }

    /// `[x1, y1, x2, y2]` of the placed nodes.
    #[wasm_bindgen(js_name = graphRect)]
    pub fn graph_rect(&self) -> Vec<f32> {
        let rect = self.positions.graph_rect();
        vec![rect.x1, rect.y1, rect.x2, rect.y2]
    }

    /// Reposition everything and return this frame's draws.
    pub fn frame(&mut self) -> std::result::Result<Array, JsValue> {
        self.scene
            .update_positions(&self.positions)
            .map_err(js_error)?;
        let mut frame = JsFrame { draws: Array::new() };
        self.scene.render(&mut frame).map_err(js_error)?;
        Ok(frame.draws)
    }
}
