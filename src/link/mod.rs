//! Link renderers
//!
//! Level-0 links are drawn as straight 2-vertex lines, higher levels as
//! sampled quadratic curves. Both keep a front tracker so a highlighted
//! link can be drawn on top without reordering the whole store.

mod curved;
mod data;
mod straight;

pub use curved::CurvedLinkRenderer;
pub use data::LinkUi;
pub use straight::StraightLinkRenderer;
