//! Node types that plug into the graph: the clip block, its upstream
//! source, and viewer surfaces.

pub mod block;
pub mod clip;
pub mod source;
pub mod viewer;

pub use block::{Block, TrackKind};
pub use clip::ClipBlock;
pub use source::SourceNode;
pub use viewer::{Marker, MarkerList, ViewerNode};
