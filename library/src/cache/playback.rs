//! Range-keyed playback cache protocol.
//!
//! A [`PlaybackCache`] tracks which time ranges of one cache kind (video
//! frames, audio samples, thumbnails, waveforms) are stale and which have
//! finished computing. The actual storage engine and its background workers
//! live outside this core; they drain the cache's event queue and feed
//! completions back in through [`PlaybackCache::validate`].

use std::collections::VecDeque;

use log::debug;
use uuid::Uuid;

use crate::time::{TimeRange, TimeRangeList};

/// Signals a cache emits toward its backing renderer/decoder.
///
/// Requests are fire-and-forget: the core never blocks on them, and
/// `CancelAll` is advisory to whatever work is in flight.
#[derive(Clone, Debug, PartialEq)]
pub enum CacheEvent {
    /// The given range should be (re)computed.
    Request(TimeRange),
    /// Abort all outstanding background work for this cache.
    CancelAll,
    /// The given range finished computing.
    Validated(TimeRange),
}

/// A region of this cache satisfied by another clip's cache (e.g. a
/// transition overlap), exempt from recomputation here.
#[derive(Clone, Debug, PartialEq)]
pub struct Passthrough {
    pub range: TimeRange,
    /// Identity of the cache that owns the computed data.
    pub source: Uuid,
}

pub struct PlaybackCache {
    id: Uuid,
    invalidated: TimeRangeList,
    validated: TimeRangeList,
    passthroughs: Vec<Passthrough>,
    events: VecDeque<CacheEvent>,
}

impl PlaybackCache {
    pub fn new() -> PlaybackCache {
        PlaybackCache {
            id: Uuid::new_v4(),
            invalidated: TimeRangeList::new(),
            validated: TimeRangeList::new(),
            passthroughs: Vec::new(),
            events: VecDeque::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Mark `range` stale. Known-stale data is recomputed lazily unless a
    /// request for the same range follows.
    pub fn invalidate(&mut self, range: TimeRange) {
        if range.is_empty() {
            return;
        }
        debug!("cache {}: invalidate {:?}", self.id, range);
        self.invalidated.insert(range);
        self.validated.remove(&range);
        self.trim_passthroughs(&range);
    }

    /// A stale region is no longer satisfied by anyone's data; keep only
    /// the passthrough coverage outside it.
    fn trim_passthroughs(&mut self, range: &TimeRange) {
        let mut trimmed = Vec::with_capacity(self.passthroughs.len());
        for p in self.passthroughs.drain(..) {
            if !p.range.intersects(range) {
                trimmed.push(p);
                continue;
            }
            if p.range.r#in() < range.r#in() {
                trimmed.push(Passthrough {
                    range: TimeRange::new(p.range.r#in(), range.r#in()),
                    source: p.source,
                });
            }
            if range.out() < p.range.out() {
                trimmed.push(Passthrough {
                    range: TimeRange::new(range.out(), p.range.out()),
                    source: p.source,
                });
            }
        }
        self.passthroughs = trimmed;
    }

    /// Ask the backing worker to (re)compute `range`.
    pub fn request(&mut self, range: TimeRange) {
        if range.is_empty() {
            return;
        }
        self.events.push_back(CacheEvent::Request(range));
    }

    /// Record a completed range and notify subscribers through the queue.
    pub fn validate(&mut self, range: TimeRange) {
        if range.is_empty() {
            return;
        }
        debug!("cache {}: validated {:?}", self.id, range);
        self.invalidated.remove(&range);
        self.validated.insert(range);
        self.events.push_back(CacheEvent::Validated(range));
    }

    /// Advise outstanding background work to stop.
    pub fn cancel_all(&mut self) {
        self.events.push_back(CacheEvent::CancelAll);
    }

    /// Stale sub-ranges within `bound`.
    pub fn invalidated_ranges(&self, bound: &TimeRange) -> TimeRangeList {
        self.invalidated.intersected(bound)
    }

    pub fn validated_ranges(&self) -> &TimeRangeList {
        &self.validated
    }

    pub fn passthroughs(&self) -> &[Passthrough] {
        &self.passthroughs
    }

    /// Adopt the other cache's currently computed coverage as passthrough
    /// regions. One-directional; the other cache keeps ownership of its
    /// data. Re-adopting the same coverage is a no-op.
    pub fn set_passthrough(&mut self, other: &PlaybackCache) {
        for range in other.validated.iter() {
            let entry = Passthrough {
                range: *range,
                source: other.id,
            };
            if !self.passthroughs.contains(&entry) {
                self.passthroughs.push(entry);
            }
        }
    }

    /// Drain the queued signals, in emission order. Consumed by the backing
    /// worker (and by tests observing the protocol).
    pub fn drain_events(&mut self) -> Vec<CacheEvent> {
        self.events.drain(..).collect()
    }
}

impl Default for PlaybackCache {
    fn default() -> PlaybackCache {
        PlaybackCache::new()
    }
}
