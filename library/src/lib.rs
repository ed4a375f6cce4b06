//! Timeline clip core for a node-graph media pipeline.
//!
//! Maps a clip's consumer-facing sequence-time axis onto the media-time axis
//! of an upstream source under speed/reverse/offset transforms, and drives
//! the range-level invalidation and render-request protocol of the caches
//! attached to that source (video frames, audio playback, thumbnails,
//! waveforms).

pub mod cache;
pub mod error;
pub mod graph;
pub mod node;
pub mod time;
