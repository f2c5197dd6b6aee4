//! Error types.
//!
//! Almost nothing in the engine is fatal. Bounds problems are clamped and
//! stale ids are no-ops; the variants here cover the cases a caller can
//! act on.

use std::io;

use thiserror::Error;

use crate::state::focus::ScopeId;
use crate::tree::NodeId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("unknown node `{0}`")]
    UnknownNode(NodeId),

    #[error("node `{0}` already exists")]
    DuplicateNode(NodeId),

    #[error("unknown focus scope `{0}`")]
    UnknownScope(ScopeId),

    #[error("focus scope `{0}` has no CONTAINER focusable")]
    NoContainer(ScopeId),

    #[error("paint failed for node `{node}`: {message}")]
    Paint { node: NodeId, message: String },

    #[error("layout failed: {0}")]
    Layout(String),
}

impl Error {
    /// Build a paint error from inside a `Renderable`.
    pub fn paint(node: &NodeId, message: impl Into<String>) -> Self {
        Self::Paint {
            node: node.clone(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
