//! Tagged node variants.
//!
//! Node capability queries go through [`NodeKind`] rather than runtime type
//! identity; link filtering and traversal only ever ask "is this a
//! clip/viewer-kind node".

use uuid::Uuid;

use crate::node::{ClipBlock, SourceNode, ViewerNode};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Clip,
    Source,
    Viewer,
}

pub enum Node {
    Clip(ClipBlock),
    Source(SourceNode),
    Viewer(ViewerNode),
}

impl Node {
    pub fn id(&self) -> Uuid {
        match self {
            Node::Clip(clip) => clip.id(),
            Node::Source(source) => source.id(),
            Node::Viewer(viewer) => viewer.id(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Clip(_) => NodeKind::Clip,
            Node::Source(_) => NodeKind::Source,
            Node::Viewer(_) => NodeKind::Viewer,
        }
    }

    pub fn as_clip(&self) -> Option<&ClipBlock> {
        match self {
            Node::Clip(clip) => Some(clip),
            _ => None,
        }
    }

    pub fn as_clip_mut(&mut self) -> Option<&mut ClipBlock> {
        match self {
            Node::Clip(clip) => Some(clip),
            _ => None,
        }
    }

    pub fn as_source(&self) -> Option<&SourceNode> {
        match self {
            Node::Source(source) => Some(source),
            _ => None,
        }
    }

    pub fn as_source_mut(&mut self) -> Option<&mut SourceNode> {
        match self {
            Node::Source(source) => Some(source),
            _ => None,
        }
    }

    pub fn as_viewer(&self) -> Option<&ViewerNode> {
        match self {
            Node::Viewer(viewer) => Some(viewer),
            _ => None,
        }
    }

    pub fn as_viewer_mut(&mut self) -> Option<&mut ViewerNode> {
        match self {
            Node::Viewer(viewer) => Some(viewer),
            _ => None,
        }
    }

    /// Input slots this node accepts connections on.
    pub fn input_names(&self) -> &'static [&'static str] {
        match self {
            Node::Clip(_) => &[ClipBlock::BUFFER_IN],
            Node::Source(_) => &[SourceNode::SOURCE_IN],
            Node::Viewer(_) => &[],
        }
    }
}

/// The value carried on a node's output. A clip passes its buffer input's
/// value through unchanged; only the time placement differs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeValue {
    /// No value / unconnected input.
    None,
    /// A media buffer originating from the given source node.
    Buffer(Uuid),
}
