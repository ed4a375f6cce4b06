//! Graph orchestrator: owns the nodes, the connection list, and the
//! subscription registry, and drives the clip's invalidation and cache
//! coordination protocol.
//!
//! Node-specific invalidation handling is explicit composition rather than
//! an override chain: the clip hook transforms what it must and then always
//! hands the result to the generic [`Graph::propagate_invalidate`] default,
//! with or without a pre-transform.

pub mod analysis;
pub mod connection;
pub mod node;
pub mod subscription;

pub use connection::{Connection, InputId};
pub use node::{Node, NodeKind, NodeValue};
pub use subscription::{EventKind, SubscriptionRegistry};

use std::collections::{HashMap, HashSet, VecDeque};

use log::{debug, info};
use uuid::Uuid;

use crate::cache::{CacheEvent, CacheKind, PlaybackCache};
use crate::error::ClipError;
use crate::node::clip::fuzzy_zero;
use crate::node::{ClipBlock, Marker, SourceNode, TrackKind, ViewerNode};
use crate::time::{Rational, TimeRange, TIME_MAX, TIME_MIN};

/// Node-level signals surfaced to the embedding engine.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphEvent {
    /// The node's output is stale over the given range of its own time axis.
    Invalidated { node: Uuid, range: TimeRange },
    /// Something affecting the node's preview decoration changed (a cache
    /// range validated, or a resolved viewer's markers moved).
    PreviewChanged { node: Uuid },
}

pub struct Graph {
    nodes: HashMap<Uuid, Node>,
    connections: Vec<Connection>,
    links: HashMap<Uuid, HashSet<Uuid>>,
    subscriptions: SubscriptionRegistry,
    events: Vec<GraphEvent>,
    /// Engine-level switch for background caching; when off, invalidations
    /// still propagate but no render requests are issued.
    caches_enabled: bool,
}

impl Graph {
    pub fn new() -> Graph {
        Graph {
            nodes: HashMap::new(),
            connections: Vec::new(),
            links: HashMap::new(),
            subscriptions: SubscriptionRegistry::new(),
            events: Vec::new(),
            caches_enabled: true,
        }
    }

    pub fn caches_enabled(&self) -> bool {
        self.caches_enabled
    }

    pub fn set_caches_enabled(&mut self, enabled: bool) {
        self.caches_enabled = enabled;
    }

    // --- Node management ---

    pub fn add_clip(&mut self, track: TrackKind) -> Uuid {
        let id = Uuid::new_v4();
        self.nodes.insert(id, Node::Clip(ClipBlock::new(id, track)));
        id
    }

    pub fn add_source(&mut self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.nodes.insert(id, Node::Source(SourceNode::new(id, name)));
        id
    }

    pub fn add_viewer(&mut self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.nodes.insert(id, Node::Viewer(ViewerNode::new(id, name)));
        id
    }

    /// Remove a node and every relation that referred to it. Non-owning
    /// handles held elsewhere (links, viewer back-references, transitions)
    /// are cleared rather than left dangling.
    pub fn remove_node(&mut self, id: Uuid) -> Result<(), ClipError> {
        if !self.nodes.contains_key(&id) {
            return Err(ClipError::UnknownNode(id));
        }

        let edges: Vec<InputId> = self
            .connections
            .iter()
            .filter(|c| c.from == id || c.to.node == id)
            .map(|c| c.to.clone())
            .collect();
        for input in edges {
            self.disconnect(&input)?;
        }

        self.subscriptions.remove_subscriber(id);
        if let Some(source) = self.nodes.get(&id).and_then(Node::as_source) {
            for kind in CacheKind::ALL {
                let cache_id = source.cache(kind).id();
                self.subscriptions.remove_emitter(cache_id);
            }
        }
        self.subscriptions.remove_emitter(id);

        if let Some(linked) = self.links.remove(&id) {
            for other in linked {
                if let Some(set) = self.links.get_mut(&other) {
                    set.remove(&id);
                }
                self.link_change_event(other);
            }
        }

        for node in self.nodes.values_mut() {
            if let Some(clip) = node.as_clip_mut() {
                if clip.connected_viewer() == Some(id) {
                    clip.set_connected_viewer(None);
                }
                if clip.in_transition() == Some(id) {
                    clip.set_in_transition(None);
                }
                if clip.out_transition() == Some(id) {
                    clip.set_out_transition(None);
                }
            }
        }

        self.nodes.remove(&id);
        Ok(())
    }

    pub fn node(&self, id: Uuid) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn clip(&self, id: Uuid) -> Result<&ClipBlock, ClipError> {
        self.nodes
            .get(&id)
            .ok_or(ClipError::UnknownNode(id))?
            .as_clip()
            .ok_or(ClipError::KindMismatch {
                node: id,
                expected: "clip",
            })
    }

    fn clip_mut(&mut self, id: Uuid) -> Result<&mut ClipBlock, ClipError> {
        self.nodes
            .get_mut(&id)
            .ok_or(ClipError::UnknownNode(id))?
            .as_clip_mut()
            .ok_or(ClipError::KindMismatch {
                node: id,
                expected: "clip",
            })
    }

    pub fn source(&self, id: Uuid) -> Result<&SourceNode, ClipError> {
        self.nodes
            .get(&id)
            .ok_or(ClipError::UnknownNode(id))?
            .as_source()
            .ok_or(ClipError::KindMismatch {
                node: id,
                expected: "source",
            })
    }

    fn source_mut(&mut self, id: Uuid) -> Result<&mut SourceNode, ClipError> {
        self.nodes
            .get_mut(&id)
            .ok_or(ClipError::UnknownNode(id))?
            .as_source_mut()
            .ok_or(ClipError::KindMismatch {
                node: id,
                expected: "source",
            })
    }

    fn viewer_mut(&mut self, id: Uuid) -> Result<&mut ViewerNode, ClipError> {
        self.nodes
            .get_mut(&id)
            .ok_or(ClipError::UnknownNode(id))?
            .as_viewer_mut()
            .ok_or(ClipError::KindMismatch {
                node: id,
                expected: "viewer",
            })
    }

    pub fn cache(&self, source: Uuid, kind: CacheKind) -> Result<&PlaybackCache, ClipError> {
        Ok(self.source(source)?.cache(kind))
    }

    /// Drain the fire-and-forget signals a cache has queued for its worker.
    pub fn drain_cache_events(
        &mut self,
        source: Uuid,
        kind: CacheKind,
    ) -> Result<Vec<CacheEvent>, ClipError> {
        Ok(self.source_mut(source)?.cache_mut(kind).drain_events())
    }

    /// Drain the node-level signals emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<GraphEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.subscriptions
    }

    // --- Connections ---

    pub fn connected_output(&self, input: &InputId) -> Option<Uuid> {
        self.connections
            .iter()
            .find(|c| c.to == *input)
            .map(|c| c.from)
    }

    pub fn connect(&mut self, from: Uuid, to: InputId) -> Result<(), ClipError> {
        if !self.nodes.contains_key(&from) {
            return Err(ClipError::UnknownNode(from));
        }
        let target = self
            .nodes
            .get(&to.node)
            .ok_or(ClipError::UnknownNode(to.node))?;
        if !target.input_names().contains(&to.input.as_str()) {
            return Err(ClipError::UnknownInput {
                node: to.node,
                input: to.input,
            });
        }

        // Propagation and value resolution recurse through edges, so the
        // graph must stay acyclic. A self-loop is the degenerate case.
        if self.depends_on(from, to.node) {
            return Err(ClipError::InvalidArgument(format!(
                "connecting {} to {}.{} would create a cycle",
                from, to.node, to.input
            )));
        }

        // Single-slot inputs: replace any existing edge first so the old
        // output's notifications are detached before the new ones attach.
        if self.connected_output(&to).is_some() {
            self.disconnect(&to)?;
        }

        info!("connect {} -> {}.{}", from, to.node, to.input);
        self.connections.push(Connection::new(from, to.clone()));
        self.input_connected_event(&to, from);
        Ok(())
    }

    pub fn disconnect(&mut self, input: &InputId) -> Result<(), ClipError> {
        let Some(pos) = self.connections.iter().position(|c| c.to == *input) else {
            return Err(ClipError::UnknownInput {
                node: input.node,
                input: input.input.clone(),
            });
        };
        let connection = self.connections.remove(pos);
        info!(
            "disconnect {} -x- {}.{}",
            connection.from, input.node, input.input
        );
        self.input_disconnected_event(input, connection.from);
        Ok(())
    }

    /// Attach preview notifications when a clip gains its buffer: the four
    /// upstream caches report `Validated`, forwarded as `PreviewChanged`.
    fn input_connected_event(&mut self, input: &InputId, output: Uuid) {
        if !self.is_clip_buffer(input) {
            return;
        }
        for cache_id in self.source_cache_ids(output) {
            self.subscriptions
                .subscribe(cache_id, EventKind::CacheValidated, input.node);
        }
    }

    fn input_disconnected_event(&mut self, input: &InputId, output: Uuid) {
        if !self.is_clip_buffer(input) {
            return;
        }
        for cache_id in self.source_cache_ids(output) {
            self.subscriptions
                .unsubscribe(cache_id, EventKind::CacheValidated, input.node);
        }
    }

    /// Whether `target` is reachable walking upstream from `node` through
    /// its inputs (a node trivially depends on itself).
    fn depends_on(&self, node: Uuid, target: Uuid) -> bool {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([node]);
        while let Some(id) = queue.pop_front() {
            if id == target {
                return true;
            }
            if !visited.insert(id) {
                continue;
            }
            let Some(n) = self.node(id) else {
                continue;
            };
            for input_name in n.input_names() {
                if let Some(upstream) = self.connected_output(&InputId::new(id, input_name)) {
                    queue.push_back(upstream);
                }
            }
        }
        false
    }

    fn is_clip_buffer(&self, input: &InputId) -> bool {
        input.input == ClipBlock::BUFFER_IN
            && self
                .nodes
                .get(&input.node)
                .is_some_and(|n| n.kind() == NodeKind::Clip)
    }

    fn source_cache_ids(&self, node: Uuid) -> Vec<Uuid> {
        match self.nodes.get(&node).and_then(Node::as_source) {
            Some(source) => CacheKind::ALL
                .iter()
                .map(|kind| source.cache(*kind).id())
                .collect(),
            None => Vec::new(),
        }
    }

    /// The source node feeding a clip's buffer input, if any.
    fn connected_source(&self, clip: Uuid) -> Option<Uuid> {
        let output = self.connected_output(&InputId::new(clip, ClipBlock::BUFFER_IN))?;
        self.nodes
            .get(&output)
            .and_then(Node::as_source)
            .map(SourceNode::id)
    }

    // --- Time adjustment across the buffer input ---

    /// Transform a request for this clip's output into the time domain of
    /// the given input. Only the buffer input adjusts time; other inputs
    /// pass through. With reverse active the mapped endpoints come back
    /// flipped, so callers re-normalize before range math.
    pub fn input_time_adjustment(
        &self,
        clip: Uuid,
        input: &str,
        range: TimeRange,
    ) -> Result<TimeRange, ClipError> {
        let clip = self.clip(clip)?;
        if input == ClipBlock::BUFFER_IN {
            Ok(TimeRange::new(
                clip.sequence_to_media_time(range.r#in()),
                clip.sequence_to_media_time(range.out()),
            ))
        } else {
            Ok(range)
        }
    }

    /// Inverse of [`Graph::input_time_adjustment`].
    pub fn output_time_adjustment(
        &self,
        clip: Uuid,
        input: &str,
        range: TimeRange,
    ) -> Result<TimeRange, ClipError> {
        let clip = self.clip(clip)?;
        if input == ClipBlock::BUFFER_IN {
            Ok(TimeRange::new(
                clip.media_to_sequence_time(range.r#in()),
                clip.media_to_sequence_time(range.out()),
            ))
        } else {
            Ok(range)
        }
    }

    /// The media-time domain the upstream source actually covers for this
    /// clip: `[0, length)` pushed through the buffer adjustment.
    fn media_domain(&self, clip: Uuid) -> Result<TimeRange, ClipError> {
        let length = self.clip(clip)?.length();
        let domain = TimeRange::new(Rational::ZERO, length);
        Ok(self
            .input_time_adjustment(clip, ClipBlock::BUFFER_IN, domain)?
            .normalized())
    }

    // --- Values ---

    /// A clip's output is its buffer input's value passed through unchanged;
    /// only the time placement differs. Unconnected buffers yield nothing.
    pub fn value(&self, node: Uuid) -> Result<NodeValue, ClipError> {
        match self.nodes.get(&node) {
            None => Err(ClipError::UnknownNode(node)),
            Some(Node::Source(source)) => Ok(NodeValue::Buffer(source.id())),
            Some(Node::Viewer(_)) => Ok(NodeValue::None),
            Some(Node::Clip(_)) => {
                match self.connected_output(&InputId::new(node, ClipBlock::BUFFER_IN)) {
                    Some(upstream) => self.value(upstream),
                    None => Ok(NodeValue::None),
                }
            }
        }
    }

    // --- Invalidation ---

    /// Entry point for a stale range on a node's own time axis. Clip nodes
    /// get the clip-specific handling; everything else takes the default
    /// path directly.
    pub fn invalidate_cache(
        &mut self,
        node: Uuid,
        range: TimeRange,
        from: Option<&str>,
    ) -> Result<(), ClipError> {
        match self.nodes.get(&node).map(Node::kind) {
            None => Err(ClipError::UnknownNode(node)),
            Some(NodeKind::Clip) => self.clip_invalidated(node, range, from),
            Some(_) => {
                self.propagate_invalidate(node, range);
                Ok(())
            }
        }
    }

    /// Generic default: record the stale range and forward it to every
    /// downstream input fed by this node.
    fn propagate_invalidate(&mut self, node: Uuid, range: TimeRange) {
        self.events.push(GraphEvent::Invalidated { node, range });
        let downstream: Vec<InputId> = self
            .connections
            .iter()
            .filter(|c| c.from == node)
            .map(|c| c.to.clone())
            .collect();
        for input in downstream {
            // The node was present a moment ago; a failure here would mean
            // a dangling edge, which connect/disconnect rule out.
            let _ = self.invalidate_cache(input.node, range, Some(&input.input));
        }
    }

    /// Clip-specific invalidation. A range arriving through the buffer
    /// input is in media time: refresh caches for it, convert it to
    /// sequence time, re-resolve the preview viewer, then hand off to the
    /// default. Ranges from any other origin are already in sequence time
    /// and pass through untouched.
    fn clip_invalidated(
        &mut self,
        clip_id: Uuid,
        range: TimeRange,
        from: Option<&str>,
    ) -> Result<(), ClipError> {
        if from != Some(ClipBlock::BUFFER_IN) {
            self.propagate_invalidate(clip_id, range);
            return Ok(());
        }

        debug!("clip {}: media range {:?} invalidated", clip_id, range);

        if self.caches_enabled {
            self.request_range_from_connected(clip_id, range)?;
        }

        let adjusted = {
            let clip = self.clip(clip_id)?;
            if fuzzy_zero(clip.speed()) {
                // A frozen frame is displayed everywhere; invalidate the
                // whole clip.
                TimeRange::new(TIME_MIN, TIME_MAX)
            } else {
                let r#in = clip.media_to_sequence_time(range.r#in());
                let out = clip.media_to_sequence_time(range.out());
                if r#in.is_nan() || out.is_nan() {
                    // Safe superset when the mapping has no answer.
                    TimeRange::new(TIME_MIN, TIME_MAX)
                } else {
                    TimeRange::new(r#in, out).normalized()
                }
            }
        };

        self.resolve_connected_viewer(clip_id)?;
        self.propagate_invalidate(clip_id, adjusted);
        Ok(())
    }

    /// Re-resolve which upstream viewer's markers decorate this clip, and
    /// move the marker subscription only if the answer changed.
    fn resolve_connected_viewer(&mut self, clip_id: Uuid) -> Result<(), ClipError> {
        let input = InputId::new(clip_id, ClipBlock::BUFFER_IN);
        let new_viewer = analysis::find_upstream_viewers(self, &input)
            .into_iter()
            .next();
        let old_viewer = self.clip(clip_id)?.connected_viewer();

        if new_viewer != old_viewer {
            debug!(
                "clip {}: connected viewer {:?} -> {:?}",
                clip_id, old_viewer, new_viewer
            );
            if let Some(old) = old_viewer {
                self.subscriptions
                    .unsubscribe(old, EventKind::MarkerChanged, clip_id);
            }
            if let Some(new) = new_viewer {
                self.subscriptions
                    .subscribe(new, EventKind::MarkerChanged, clip_id);
            }
            self.clip_mut(clip_id)?.set_connected_viewer(new_viewer);
        }
        Ok(())
    }

    // --- Cache coordination ---

    fn request_range_for_cache(
        cache: &mut PlaybackCache,
        max_range: &TimeRange,
        range: &TimeRange,
        invalidate: bool,
        request: bool,
    ) {
        let clipped = range.intersected(max_range);
        if clipped.is_empty() {
            return;
        }
        // Stale-mark-then-refill: never request before invalidating.
        if invalidate {
            cache.invalidate(clipped);
        }
        if request {
            cache.request(clipped);
        }
    }

    /// Pull fresh renders/decodes for a stale media range from the
    /// connected source. Thumbnails and waveforms always refresh; the heavy
    /// frame/audio caches only when this clip autocaches. No connection or
    /// no track kind means nothing to do.
    pub fn request_range_from_connected(
        &mut self,
        clip_id: Uuid,
        range: TimeRange,
    ) -> Result<(), ClipError> {
        let clip = self.clip(clip_id)?;
        let track = clip.track();
        let autocache = clip.is_autocaching();
        if track == TrackKind::None {
            return Ok(());
        }
        let Some(connected) = self.connected_source(clip_id) else {
            return Ok(());
        };
        let max_range = self.media_domain(clip_id)?;

        let source = self.source_mut(connected)?;
        match track {
            TrackKind::Video => {
                Self::request_range_for_cache(
                    source.cache_mut(CacheKind::Thumbnail),
                    &max_range,
                    &range,
                    true,
                    true,
                );
                Self::request_range_for_cache(
                    source.cache_mut(CacheKind::VideoFrame),
                    &max_range,
                    &range,
                    true,
                    autocache,
                );
            }
            TrackKind::Audio => {
                Self::request_range_for_cache(
                    source.cache_mut(CacheKind::Waveform),
                    &max_range,
                    &range,
                    true,
                    true,
                );
                Self::request_range_for_cache(
                    source.cache_mut(CacheKind::AudioPlayback),
                    &max_range,
                    &range,
                    true,
                    autocache,
                );
            }
            TrackKind::None => {}
        }
        Ok(())
    }

    /// Catch up on everything already marked stale: request-only calls for
    /// the invalidated ranges within the clip's media domain, minus regions
    /// another clip's cache already covers (passthroughs).
    pub fn request_invalidated_from_connected(&mut self, clip_id: Uuid) -> Result<(), ClipError> {
        let clip = self.clip(clip_id)?;
        let track = clip.track();
        let autocache = clip.is_autocaching();
        if track == TrackKind::None {
            return Ok(());
        }
        let Some(connected) = self.connected_source(clip_id) else {
            return Ok(());
        };
        let max_range = self.media_domain(clip_id)?;

        let kinds: [(CacheKind, bool); 2] = match track {
            TrackKind::Video => [
                (CacheKind::Thumbnail, true),
                (CacheKind::VideoFrame, autocache),
            ],
            TrackKind::Audio => [
                (CacheKind::Waveform, true),
                (CacheKind::AudioPlayback, autocache),
            ],
            TrackKind::None => return Ok(()),
        };

        let source = self.source_mut(connected)?;
        for (kind, enabled) in kinds {
            if !enabled {
                continue;
            }
            let cache = source.cache_mut(kind);
            let mut invalid = cache.invalidated_ranges(&max_range);
            let passthroughs: Vec<TimeRange> =
                cache.passthroughs().iter().map(|p| p.range).collect();
            for range in &passthroughs {
                invalid.remove(range);
            }
            for range in &invalid {
                Self::request_range_for_cache(cache, &max_range, range, false, true);
            }
        }
        Ok(())
    }

    /// Declare that ranges computed by `other`'s caches satisfy this clip's
    /// caches too (transition overlap, linked clips). One-directional.
    pub fn add_cache_passthrough_from(
        &mut self,
        clip_id: Uuid,
        other_id: Uuid,
    ) -> Result<(), ClipError> {
        self.clip(clip_id)?;
        self.clip(other_id)?;
        let (Some(this_source), Some(other_source)) = (
            self.connected_source(clip_id),
            self.connected_source(other_id),
        ) else {
            return Ok(());
        };
        if this_source == other_source {
            // Same caches on both sides; nothing to link.
            return Ok(());
        }

        let [Some(this_node), Some(other_node)] =
            self.nodes.get_disjoint_mut([&this_source, &other_source])
        else {
            return Ok(());
        };
        let (Some(this_source), Some(other_source)) =
            (this_node.as_source_mut(), other_node.as_source())
        else {
            return Ok(());
        };
        for kind in CacheKind::ALL {
            this_source
                .cache_mut(kind)
                .set_passthrough(other_source.cache(kind));
        }
        Ok(())
    }

    /// Worker completion path: a cache range finished computing. Fans out
    /// `PreviewChanged` to every clip subscribed to that cache.
    pub fn validate_cache(
        &mut self,
        source: Uuid,
        kind: CacheKind,
        range: TimeRange,
    ) -> Result<(), ClipError> {
        let cache_id = {
            let cache = self.source_mut(source)?.cache_mut(kind);
            cache.validate(range);
            cache.id()
        };
        for subscriber in self
            .subscriptions
            .subscribers(cache_id, EventKind::CacheValidated)
        {
            self.events.push(GraphEvent::PreviewChanged { node: subscriber });
        }
        Ok(())
    }

    /// The clip became part of the active preview surface: eagerly fill its
    /// caches.
    pub fn connected_to_preview(&mut self, clip_id: Uuid) -> Result<(), ClipError> {
        self.request_invalidated_from_connected(clip_id)
    }

    // --- Parameter setters (each owns its invalidation cascade) ---

    pub fn set_media_in(&mut self, clip_id: Uuid, media_in: Rational) -> Result<(), ClipError> {
        self.clip_mut(clip_id)?.set_media_in(media_in);
        self.invalidate_cache(
            clip_id,
            TimeRange::new(TIME_MIN, TIME_MAX),
            Some(ClipBlock::MEDIA_IN_IN),
        )
    }

    pub fn set_speed(&mut self, clip_id: Uuid, speed: f64) -> Result<(), ClipError> {
        self.clip_mut(clip_id)?.set_speed(speed);
        self.invalidate_cache(
            clip_id,
            TimeRange::new(TIME_MIN, TIME_MAX),
            Some(ClipBlock::SPEED_IN),
        )
    }

    pub fn set_reverse(&mut self, clip_id: Uuid, reverse: bool) -> Result<(), ClipError> {
        self.clip_mut(clip_id)?.set_reverse(reverse);
        self.invalidate_cache(
            clip_id,
            TimeRange::new(TIME_MIN, TIME_MAX),
            Some(ClipBlock::REVERSE_IN),
        )
    }

    pub fn set_maintain_audio_pitch(
        &mut self,
        clip_id: Uuid,
        maintain: bool,
    ) -> Result<(), ClipError> {
        self.clip_mut(clip_id)?.set_maintain_audio_pitch(maintain);
        self.invalidate_cache(
            clip_id,
            TimeRange::new(TIME_MIN, TIME_MAX),
            Some(ClipBlock::MAINTAIN_AUDIO_PITCH_IN),
        )
    }

    pub fn set_length(&mut self, clip_id: Uuid, length: Rational) -> Result<(), ClipError> {
        let clip = self.clip_mut(clip_id)?;
        if length == clip.length() {
            return Ok(());
        }
        clip.set_length(length);
        self.invalidate_cache(clip_id, TimeRange::new(TIME_MIN, TIME_MAX), None)
    }

    pub fn set_length_and_media_in(
        &mut self,
        clip_id: Uuid,
        length: Rational,
    ) -> Result<(), ClipError> {
        let clip = self.clip_mut(clip_id)?;
        if length == clip.length() {
            return Ok(());
        }
        clip.set_length_and_media_in(length);
        self.invalidate_cache(clip_id, TimeRange::new(TIME_MIN, TIME_MAX), None)
    }

    pub fn set_length_and_media_out(
        &mut self,
        clip_id: Uuid,
        length: Rational,
    ) -> Result<(), ClipError> {
        let clip = self.clip_mut(clip_id)?;
        if length == clip.length() {
            return Ok(());
        }
        clip.set_length_and_media_out(length);
        self.invalidate_cache(clip_id, TimeRange::new(TIME_MIN, TIME_MAX), None)
    }

    /// Autocache toggle. Turning on catches up on invalidated-but-never-
    /// requested ranges; turning off sends one advisory cancel-all to the
    /// heavy cache of the clip's track kind. No cascade beyond that.
    pub fn set_autocache(&mut self, clip_id: Uuid, enabled: bool) -> Result<(), ClipError> {
        let (changed, track) = {
            let clip = self.clip_mut(clip_id)?;
            let changed = clip.is_autocaching() != enabled;
            clip.set_autocache(enabled);
            (changed, clip.track())
        };
        if !changed {
            return Ok(());
        }
        info!("clip {}: autocache {}", clip_id, enabled);
        if enabled {
            return self.request_invalidated_from_connected(clip_id);
        }
        let Some(connected) = self.connected_source(clip_id) else {
            return Ok(());
        };
        let source = self.source_mut(connected)?;
        match track {
            TrackKind::Video => source.cache_mut(CacheKind::VideoFrame).cancel_all(),
            TrackKind::Audio => source.cache_mut(CacheKind::AudioPlayback).cancel_all(),
            TrackKind::None => {}
        }
        Ok(())
    }

    // --- Markers ---

    pub fn add_marker(&mut self, viewer: Uuid, marker: Marker) -> Result<(), ClipError> {
        self.viewer_mut(viewer)?.markers_mut().add(marker);
        self.notify_marker_change(viewer);
        Ok(())
    }

    pub fn remove_marker(&mut self, viewer: Uuid, index: usize) -> Result<Option<Marker>, ClipError> {
        let removed = self.viewer_mut(viewer)?.markers_mut().remove(index);
        if removed.is_some() {
            self.notify_marker_change(viewer);
        }
        Ok(removed)
    }

    pub fn update_marker(
        &mut self,
        viewer: Uuid,
        index: usize,
        marker: Marker,
    ) -> Result<bool, ClipError> {
        let updated = self.viewer_mut(viewer)?.markers_mut().update(index, marker);
        if updated {
            self.notify_marker_change(viewer);
        }
        Ok(updated)
    }

    /// A viewer's markers moved; every clip that resolved this viewer as its
    /// preview decoration redraws.
    fn notify_marker_change(&mut self, viewer: Uuid) {
        for subscriber in self.subscriptions.subscribers(viewer, EventKind::MarkerChanged) {
            self.events.push(GraphEvent::PreviewChanged { node: subscriber });
        }
    }

    // --- Transitions ---

    pub fn set_in_transition(
        &mut self,
        clip_id: Uuid,
        transition: Option<Uuid>,
    ) -> Result<(), ClipError> {
        self.clip_mut(clip_id)?.set_in_transition(transition);
        Ok(())
    }

    pub fn set_out_transition(
        &mut self,
        clip_id: Uuid,
        transition: Option<Uuid>,
    ) -> Result<(), ClipError> {
        self.clip_mut(clip_id)?.set_out_transition(transition);
        Ok(())
    }

    /// A transition now bridges `outgoing` into `incoming`. Both clips keep
    /// a handle to it, and the frames the incoming clip already computed for
    /// the overlap satisfy the outgoing clip's caches too.
    pub fn join_with_transition(
        &mut self,
        outgoing: Uuid,
        incoming: Uuid,
        transition: Uuid,
    ) -> Result<(), ClipError> {
        self.clip_mut(outgoing)?.set_out_transition(Some(transition));
        self.clip_mut(incoming)?.set_in_transition(Some(transition));
        self.add_cache_passthrough_from(outgoing, incoming)
    }

    // --- Links ---

    /// Symmetric generic link relation between two nodes. Clip nodes react
    /// by recomputing their clip-only sibling list.
    pub fn link(&mut self, a: Uuid, b: Uuid) -> Result<(), ClipError> {
        if a == b {
            return Err(ClipError::InvalidArgument(
                "cannot link a node to itself".to_string(),
            ));
        }
        if !self.nodes.contains_key(&a) {
            return Err(ClipError::UnknownNode(a));
        }
        if !self.nodes.contains_key(&b) {
            return Err(ClipError::UnknownNode(b));
        }
        self.links.entry(a).or_default().insert(b);
        self.links.entry(b).or_default().insert(a);
        self.link_change_event(a);
        self.link_change_event(b);
        Ok(())
    }

    pub fn unlink(&mut self, a: Uuid, b: Uuid) -> Result<(), ClipError> {
        if !self.nodes.contains_key(&a) {
            return Err(ClipError::UnknownNode(a));
        }
        if !self.nodes.contains_key(&b) {
            return Err(ClipError::UnknownNode(b));
        }
        if let Some(set) = self.links.get_mut(&a) {
            set.remove(&b);
        }
        if let Some(set) = self.links.get_mut(&b) {
            set.remove(&a);
        }
        self.link_change_event(a);
        self.link_change_event(b);
        Ok(())
    }

    /// Rebuild a clip's sibling list from the generic relation, keeping
    /// only clip-kind nodes.
    fn link_change_event(&mut self, node: Uuid) {
        if self.nodes.get(&node).map(Node::kind) != Some(NodeKind::Clip) {
            return;
        }
        let mut siblings: Vec<Uuid> = self
            .links
            .get(&node)
            .map(|set| {
                set.iter()
                    .filter(|id| self.nodes.get(*id).map(Node::kind) == Some(NodeKind::Clip))
                    .copied()
                    .collect()
            })
            .unwrap_or_default();
        siblings.sort_unstable();
        if let Ok(clip) = self.clip_mut(node) {
            clip.set_links(siblings);
        }
    }
}

impl Default for Graph {
    fn default() -> Graph {
        Graph::new()
    }
}
