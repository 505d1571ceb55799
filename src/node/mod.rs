//! Node renderers
//!
//! Point nodes (one sized point each, shape chosen by a precompiled
//! fragment variant) and directed nodes (one triangle each).

mod data;
mod directed;
mod renderer;
pub mod texture;

pub use data::{DirectedNodeUi, Gradient, NodeUi, PointVertex};
pub use directed::DirectedNodeRenderer;
pub use renderer::NodeRenderer;
