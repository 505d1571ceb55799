//! Error type shared by the stores, renderers and the scene

use thiserror::Error;

/// Errors surfaced by the rendering core.
///
/// Degenerate geometry (coincident endpoints) is not an error: the affected
/// entity gets NaN vertices.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A slot id outside `[0, count)` was passed to a non-empty store.
    #[error("slot {slot} is out of range (store holds {count} records)")]
    SlotOutOfRange { slot: usize, count: usize },

    /// No GPU adapter/device could be acquired. Fatal for setup.
    #[error("rendering backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("unknown node {0}")]
    UnknownNode(u64),

    #[error("unknown link {0}")]
    UnknownLink(u64),

    #[error("node {0} is already registered")]
    DuplicateNode(u64),

    #[error("link {0} is already registered")]
    DuplicateLink(u64),

    /// Gradients only exist when nodes are drawn as directed triangles.
    #[error("node {0} is not drawn as a directed node")]
    NotDirected(u64),

    /// A draw could not be handed to the host (browser bindings).
    #[error("draw export failed for {program}: {reason}")]
    DrawExport {
        program: &'static str,
        reason: String,
    },

    #[error("invalid graphics options: {0}")]
    InvalidOptions(String),

    #[error("failed to parse graphics options: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;
