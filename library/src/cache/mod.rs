//! Time-keyed caches attached to upstream source nodes.

pub mod playback;

pub use playback::{CacheEvent, Passthrough, PlaybackCache};

/// The four cache kinds every source node exposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheKind {
    VideoFrame,
    AudioPlayback,
    Thumbnail,
    Waveform,
}

impl CacheKind {
    pub const ALL: [CacheKind; 4] = [
        CacheKind::VideoFrame,
        CacheKind::AudioPlayback,
        CacheKind::Thumbnail,
        CacheKind::Waveform,
    ];
}
