//! Headless churn simulation
//!
//! Builds a random graph on a fixed layout, then adds, removes and promotes
//! links and nodes every frame while rendering into a recording sink (or the
//! wgpu backend with `NODELINK_GPU=1`).
//!
//! Run with: cargo run --features cli --bin nodelink-cli

use std::error::Error;

use glam::Vec2;
use nodelink_gpu::core::{DrawSink, RecordingSink};
use nodelink_gpu::link::LinkUi;
use nodelink_gpu::node::{Gradient, NodeUi};
use nodelink_gpu::{
    FixedLayout, GraphScene, GraphicsOptions, LayoutProvider, PackedColor, UiBuilder,
};
use oorandom::Rand32;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

const STATS_INTERVAL: u64 = 100;
const LAYOUT_WIDTH: f32 = 400.0;

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn load_options() -> Result<GraphicsOptions, Box<dyn Error>> {
    match std::env::var("NODELINK_CONFIG") {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)?;
            info!(path = %path, "Loading graphics options");
            Ok(GraphicsOptions::from_json_str(&json)?)
        }
        Err(_) => Ok(GraphicsOptions::default()),
    }
}

/// Node sizes spread over 4..16 by id, so a re-added node keeps its size.
struct SizedNodes;

impl UiBuilder for SizedNodes {
    fn node_ui(&self, node: u64) -> NodeUi {
        NodeUi {
            size: 4.0 + (node.wrapping_mul(2_654_435_761) % 13) as f32,
            ..NodeUi::default()
        }
    }
}

/// Random graph traffic on top of a scene.
struct Churn {
    rng: Rand32,
    node_count: u64,
    live_links: Vec<u64>,
    next_link: u64,
}

impl Churn {
    fn random_link(&mut self) -> LinkUi {
        let level = match self.rng.rand_range(0..10) {
            0..=5 => 0,
            6..=7 => 1,
            8 => 2,
            _ => 3,
        };
        let color = PackedColor::from_rgba(
            self.rng.rand_range(0..256) as u8,
            self.rng.rand_range(0..256) as u8,
            self.rng.rand_range(0..256) as u8,
            0xff,
        );
        LinkUi::new(color, level, self.rng.rand_range(0..4) == 0)
    }

    fn add_link(&mut self, scene: &mut GraphScene) -> Result<(), Box<dyn Error>> {
        let from = self.rng.rand_range(0..self.node_count as u32) as u64;
        let to = self.rng.rand_range(0..self.node_count as u32) as u64;
        if from == to {
            return Ok(());
        }
        let id = self.next_link;
        self.next_link += 1;
        let ui = self.random_link();
        scene.add_link(id, from, to, ui)?;
        self.live_links.push(id);
        Ok(())
    }

    fn remove_link(&mut self, scene: &mut GraphScene) -> Result<(), Box<dyn Error>> {
        if self.live_links.is_empty() {
            return Ok(());
        }
        let index = self.rng.rand_range(0..self.live_links.len() as u32) as usize;
        let id = self.live_links.swap_remove(index);
        scene.remove_link(id)?;
        Ok(())
    }

    fn promote_link(&mut self, scene: &mut GraphScene) -> Result<(), Box<dyn Error>> {
        if self.live_links.is_empty() {
            return Ok(());
        }
        let index = self.rng.rand_range(0..self.live_links.len() as u32) as usize;
        scene.bring_link_to_front(self.live_links[index])?;
        Ok(())
    }

    /// Drop a node and put it back, which relocates two node slots.
    fn cycle_node(&mut self, scene: &mut GraphScene) -> Result<(), Box<dyn Error>> {
        let id = self.rng.rand_range(0..self.node_count as u32) as u64;
        scene.remove_node(id)?;
        scene.build_node(id)?;
        if scene.options().directed_nodes {
            self.point_node(scene, id)?;
        }
        Ok(())
    }

    fn point_node(&mut self, scene: &mut GraphScene, id: u64) -> Result<(), Box<dyn Error>> {
        let angle = self.rng.rand_float() * std::f32::consts::TAU;
        scene.set_node_gradient(id, Gradient::towards(Vec2::from_angle(angle)))?;
        Ok(())
    }

    fn step(&mut self, scene: &mut GraphScene) -> Result<(), Box<dyn Error>> {
        for _ in 0..self.rng.rand_range(0..8) {
            self.add_link(scene)?;
        }
        for _ in 0..self.rng.rand_range(0..8) {
            self.remove_link(scene)?;
        }
        if self.rng.rand_range(0..4) == 0 {
            self.promote_link(scene)?;
        }
        if self.rng.rand_range(0..16) == 0 {
            self.cycle_node(scene)?;
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,nodelink_gpu=debug"));
    fmt().with_env_filter(filter).with_target(true).init();

    let options = load_options()?;
    let node_count = env_or::<u64>("NODELINK_NODES", 1000).max(2);
    let frames = env_or::<u64>("NODELINK_FRAMES", 600);
    let seed = env_or::<u64>("NODELINK_SEED", 42);

    info!(nodes = node_count, frames, seed, "Starting churn simulation");

    let mut rng = Rand32::new(seed);
    let positions: Vec<(u64, Vec2)> = (0..node_count)
        .map(|id| {
            let p = Vec2::new(rng.rand_float() * 2.0 - 1.0, rng.rand_float() * 2.0 - 1.0);
            (id, p)
        })
        .collect();
    let layout = FixedLayout::new(positions, LAYOUT_WIDTH);
    let rect = layout.graph_rect();
    debug!(x1 = rect.x1, y1 = rect.y1, x2 = rect.x2, y2 = rect.y2, "Layout bounds");

    let mut scene = GraphScene::with_ui_builder(options.clone(), SizedNodes)?;
    scene.update_size(1280.0, 720.0);

    let mut churn = Churn {
        rng,
        node_count,
        live_links: Vec::new(),
        next_link: 0,
    };
    for id in 0..node_count {
        scene.build_node(id)?;
        if options.directed_nodes {
            churn.point_node(&mut scene, id)?;
        }
    }
    for _ in 0..node_count * 2 {
        churn.add_link(&mut scene)?;
    }

    let mut sink = RecordingSink::new();
    #[cfg(feature = "gpu")]
    let mut gpu = gpu_backend(&options)?;

    for frame in 1..=frames {
        churn.step(&mut scene)?;
        scene.update_positions(&layout)?;

        sink.clear();
        #[cfg(feature = "gpu")]
        let target: &mut dyn DrawSink = match gpu.as_mut() {
            Some(backend) => backend,
            None => &mut sink,
        };
        #[cfg(not(feature = "gpu"))]
        let target: &mut dyn DrawSink = &mut sink;
        scene.render(target)?;

        #[cfg(feature = "gpu")]
        {
            if let Some(backend) = gpu.as_mut() {
                if !backend.render_offscreen(1280, 720) {
                    debug!(frame, "GPU queue not drained after frame");
                }
            }
        }

        if frame % STATS_INTERVAL == 0 || frame == frames {
            let stats = scene.stats();
            info!(
                frame,
                nodes = stats.nodes,
                straight = stats.straight_links,
                curved = stats.curved_links,
                arrows = stats.arrows,
                draws = sink.draws.len(),
                bytes = sink.bytes_submitted,
                "stats"
            );
        }
    }

    #[cfg(feature = "gpu")]
    {
        if let Some(backend) = &gpu {
            info!(bytes = backend.bytes_uploaded(), "GPU upload total");
        }
    }

    info!(frames, "Simulation finished");
    Ok(())
}

/// wgpu backend when `NODELINK_GPU=1`, acquired synchronously.
#[cfg(feature = "gpu")]
fn gpu_backend(
    options: &GraphicsOptions,
) -> Result<Option<nodelink_gpu::gpu::GpuBackend>, Box<dyn Error>> {
    use std::sync::Arc;

    if std::env::var("NODELINK_GPU").as_deref() != Ok("1") {
        return Ok(None);
    }
    let (device, queue) = pollster::block_on(nodelink_gpu::gpu::request_device())?;
    Ok(Some(nodelink_gpu::gpu::GpuBackend::new(
        Arc::new(device),
        Arc::new(queue),
        wgpu::TextureFormat::Rgba8Unorm,
        options,
    )))
}
