//! Upstream source node owning the four time-keyed caches.

use uuid::Uuid;

use crate::cache::{CacheKind, PlaybackCache};

/// An output-providing node a clip's buffer input can connect to. It owns
/// one [`PlaybackCache`] per cache kind; the caches are shared state for
/// every clip reading from this source and are only touched through the
/// invalidate/request protocol.
pub struct SourceNode {
    id: Uuid,
    name: String,
    video_frame_cache: PlaybackCache,
    audio_playback_cache: PlaybackCache,
    thumbnail_cache: PlaybackCache,
    waveform_cache: PlaybackCache,
}

impl SourceNode {
    /// Optional upstream input. A nested sequence's viewer connects here,
    /// which is how a clip's viewer traversal can resolve through chained
    /// indirections instead of only direct connections.
    pub const SOURCE_IN: &'static str = "source_in";

    pub fn new(id: Uuid, name: &str) -> SourceNode {
        SourceNode {
            id,
            name: name.to_string(),
            video_frame_cache: PlaybackCache::new(),
            audio_playback_cache: PlaybackCache::new(),
            thumbnail_cache: PlaybackCache::new(),
            waveform_cache: PlaybackCache::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cache(&self, kind: CacheKind) -> &PlaybackCache {
        match kind {
            CacheKind::VideoFrame => &self.video_frame_cache,
            CacheKind::AudioPlayback => &self.audio_playback_cache,
            CacheKind::Thumbnail => &self.thumbnail_cache,
            CacheKind::Waveform => &self.waveform_cache,
        }
    }

    pub fn cache_mut(&mut self, kind: CacheKind) -> &mut PlaybackCache {
        match kind {
            CacheKind::VideoFrame => &mut self.video_frame_cache,
            CacheKind::AudioPlayback => &mut self.audio_playback_cache,
            CacheKind::Thumbnail => &mut self.thumbnail_cache,
            CacheKind::Waveform => &mut self.waveform_cache,
        }
    }
}
