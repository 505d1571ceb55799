//! Arrowhead renderer
//!
//! Arrowheads live in their own store, independent of the link renderers:
//! a link with `arrow = true` owns one arrow slot in addition to its link
//! slot, and the two are compacted separately.

mod renderer;

pub use renderer::{ArrowRenderer, ArrowUi};
