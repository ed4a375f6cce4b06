use clipcore::cache::{CacheEvent, CacheKind};
use clipcore::graph::{EventKind, Graph, GraphEvent, InputId};
use clipcore::node::{ClipBlock, TrackKind};
use clipcore::time::{Rational, TimeRange};
use uuid::Uuid;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn t(v: i64) -> Rational {
    Rational::from_int(v)
}

fn range(r#in: i64, out: i64) -> TimeRange {
    TimeRange::new(t(r#in), t(out))
}

/// A video clip of the given length wired to a fresh source.
fn clip_with_source(graph: &mut Graph, track: TrackKind, length: i64) -> (Uuid, Uuid) {
    let clip = graph.add_clip(track);
    graph.set_length(clip, t(length)).unwrap();
    let source = graph.add_source("footage");
    graph
        .connect(source, InputId::new(clip, ClipBlock::BUFFER_IN))
        .unwrap();
    graph.drain_events();
    graph.drain_cache_events(source, CacheKind::Thumbnail).unwrap();
    graph.drain_cache_events(source, CacheKind::VideoFrame).unwrap();
    graph.drain_cache_events(source, CacheKind::Waveform).unwrap();
    graph.drain_cache_events(source, CacheKind::AudioPlayback).unwrap();
    (clip, source)
}

#[test]
fn upstream_invalidation_refreshes_thumbnails_but_not_frames() {
    init_logging();
    let mut graph = Graph::new();
    let (clip, source) = clip_with_source(&mut graph, TrackKind::Video, 100);

    graph
        .invalidate_cache(clip, range(10, 20), Some(ClipBlock::BUFFER_IN))
        .unwrap();

    // Thumbnails always refresh: stale-mark first, then a request.
    let thumb = graph.drain_cache_events(source, CacheKind::Thumbnail).unwrap();
    assert_eq!(thumb, vec![CacheEvent::Request(range(10, 20))]);

    // Frames are marked stale but not requested while autocache is off.
    let frames = graph.drain_cache_events(source, CacheKind::VideoFrame).unwrap();
    assert!(frames.is_empty());
    let stale = graph
        .cache(source, CacheKind::VideoFrame)
        .unwrap()
        .invalidated_ranges(&range(0, 100));
    assert_eq!(stale.iter().copied().collect::<Vec<_>>(), vec![range(10, 20)]);

    // Audio-side caches stay untouched on a video track.
    assert!(graph.drain_cache_events(source, CacheKind::Waveform).unwrap().is_empty());

    // With identity mapping the clip reports the same range in sequence time.
    assert!(graph
        .drain_events()
        .contains(&GraphEvent::Invalidated { node: clip, range: range(10, 20) }));
}

#[test]
fn audio_track_drives_waveform_and_playback_caches() {
    init_logging();
    let mut graph = Graph::new();
    let (clip, source) = clip_with_source(&mut graph, TrackKind::Audio, 100);
    graph.set_autocache(clip, true).unwrap();
    graph.drain_cache_events(source, CacheKind::AudioPlayback).unwrap();

    graph
        .invalidate_cache(clip, range(0, 30), Some(ClipBlock::BUFFER_IN))
        .unwrap();

    let waveform = graph.drain_cache_events(source, CacheKind::Waveform).unwrap();
    assert_eq!(waveform, vec![CacheEvent::Request(range(0, 30))]);
    let playback = graph.drain_cache_events(source, CacheKind::AudioPlayback).unwrap();
    assert_eq!(playback, vec![CacheEvent::Request(range(0, 30))]);
    assert!(graph.drain_cache_events(source, CacheKind::Thumbnail).unwrap().is_empty());
}

#[test]
fn requests_are_clipped_to_the_clip_media_domain() {
    init_logging();
    let mut graph = Graph::new();
    let (clip, source) = clip_with_source(&mut graph, TrackKind::Video, 100);
    graph.set_media_in(clip, t(50)).unwrap();
    graph.drain_cache_events(source, CacheKind::Thumbnail).unwrap();

    // Media domain is [50, 150); everything below it is someone else's data.
    graph
        .invalidate_cache(clip, range(0, 60), Some(ClipBlock::BUFFER_IN))
        .unwrap();

    let thumb = graph.drain_cache_events(source, CacheKind::Thumbnail).unwrap();
    assert_eq!(thumb, vec![CacheEvent::Request(range(50, 60))]);
}

#[test]
fn out_of_domain_invalidation_requests_nothing() {
    init_logging();
    let mut graph = Graph::new();
    let (clip, source) = clip_with_source(&mut graph, TrackKind::Video, 10);

    graph
        .invalidate_cache(clip, range(100, 200), Some(ClipBlock::BUFFER_IN))
        .unwrap();

    assert!(graph.drain_cache_events(source, CacheKind::Thumbnail).unwrap().is_empty());
}

#[test]
fn enabling_autocache_catches_up_with_request_only_calls() {
    init_logging();
    let mut graph = Graph::new();
    let (clip, source) = clip_with_source(&mut graph, TrackKind::Video, 100);

    graph
        .invalidate_cache(clip, range(10, 20), Some(ClipBlock::BUFFER_IN))
        .unwrap();
    graph
        .invalidate_cache(clip, range(40, 50), Some(ClipBlock::BUFFER_IN))
        .unwrap();
    graph.drain_cache_events(source, CacheKind::Thumbnail).unwrap();
    assert!(graph.drain_cache_events(source, CacheKind::VideoFrame).unwrap().is_empty());

    graph.set_autocache(clip, true).unwrap();

    // Catch-up issues requests without re-invalidating: the stale set is
    // unchanged and the events are pure requests.
    let frames = graph.drain_cache_events(source, CacheKind::VideoFrame).unwrap();
    assert_eq!(
        frames,
        vec![CacheEvent::Request(range(10, 20)), CacheEvent::Request(range(40, 50))]
    );
    let stale = graph
        .cache(source, CacheKind::VideoFrame)
        .unwrap()
        .invalidated_ranges(&range(0, 100));
    assert_eq!(stale.len(), 2);
}

#[test]
fn disabling_autocache_sends_a_single_cancel() {
    init_logging();
    let mut graph = Graph::new();
    let (clip, source) = clip_with_source(&mut graph, TrackKind::Video, 100);
    graph.set_autocache(clip, true).unwrap();
    graph.drain_cache_events(source, CacheKind::VideoFrame).unwrap();

    graph.set_autocache(clip, false).unwrap();
    let frames = graph.drain_cache_events(source, CacheKind::VideoFrame).unwrap();
    assert_eq!(frames, vec![CacheEvent::CancelAll]);

    // Toggling to the value already set is a no-op.
    graph.set_autocache(clip, false).unwrap();
    assert!(graph.drain_cache_events(source, CacheKind::VideoFrame).unwrap().is_empty());
}

#[test]
fn passthrough_regions_are_excluded_from_catch_up() {
    init_logging();
    let mut graph = Graph::new();
    let (clip, source) = clip_with_source(&mut graph, TrackKind::Video, 100);
    let (other_clip, other_source) = clip_with_source(&mut graph, TrackKind::Video, 100);

    // The neighbouring clip already computed [10, 20) of everything.
    graph
        .invalidate_cache(other_clip, range(0, 100), Some(ClipBlock::BUFFER_IN))
        .unwrap();
    for kind in CacheKind::ALL {
        graph.validate_cache(other_source, kind, range(10, 20)).unwrap();
        graph.drain_cache_events(other_source, kind).unwrap();
    }

    graph
        .invalidate_cache(clip, range(0, 30), Some(ClipBlock::BUFFER_IN))
        .unwrap();
    graph.drain_cache_events(source, CacheKind::VideoFrame).unwrap();

    // The overlap handoff happens once the neighbour's coverage exists.
    graph.add_cache_passthrough_from(clip, other_clip).unwrap();
    graph.set_autocache(clip, true).unwrap();

    let frames = graph.drain_cache_events(source, CacheKind::VideoFrame).unwrap();
    assert_eq!(
        frames,
        vec![CacheEvent::Request(range(0, 10)), CacheEvent::Request(range(20, 30))]
    );
}

#[test]
fn transition_join_records_handles_and_wires_passthroughs() {
    init_logging();
    let mut graph = Graph::new();
    let (outgoing, out_source) = clip_with_source(&mut graph, TrackKind::Video, 100);
    let (incoming, in_source) = clip_with_source(&mut graph, TrackKind::Video, 100);
    let transition = Uuid::new_v4();

    graph
        .invalidate_cache(incoming, range(0, 100), Some(ClipBlock::BUFFER_IN))
        .unwrap();
    graph
        .validate_cache(in_source, CacheKind::VideoFrame, range(90, 100))
        .unwrap();

    graph.join_with_transition(outgoing, incoming, transition).unwrap();

    assert_eq!(graph.clip(outgoing).unwrap().out_transition(), Some(transition));
    assert_eq!(graph.clip(incoming).unwrap().in_transition(), Some(transition));
    let passthroughs = graph
        .cache(out_source, CacheKind::VideoFrame)
        .unwrap()
        .passthroughs();
    assert_eq!(passthroughs.len(), 1);
    assert_eq!(passthroughs[0].range, range(90, 100));
}

#[test]
fn passthrough_to_the_same_source_is_a_no_op() {
    init_logging();
    let mut graph = Graph::new();
    let clip_a = graph.add_clip(TrackKind::Video);
    let clip_b = graph.add_clip(TrackKind::Video);
    graph.set_length(clip_a, t(100)).unwrap();
    graph.set_length(clip_b, t(100)).unwrap();
    let source = graph.add_source("shared");
    graph
        .connect(source, InputId::new(clip_a, ClipBlock::BUFFER_IN))
        .unwrap();
    graph
        .connect(source, InputId::new(clip_b, ClipBlock::BUFFER_IN))
        .unwrap();

    graph.add_cache_passthrough_from(clip_a, clip_b).unwrap();
    assert!(graph
        .cache(source, CacheKind::VideoFrame)
        .unwrap()
        .passthroughs()
        .is_empty());
}

#[test]
fn freeze_frame_invalidation_widens_to_the_whole_clip() {
    init_logging();
    let mut graph = Graph::new();
    let (clip, _source) = clip_with_source(&mut graph, TrackKind::Video, 100);
    graph.set_speed(clip, 0.0).unwrap();
    graph.drain_events();

    graph
        .invalidate_cache(clip, range(10, 20), Some(ClipBlock::BUFFER_IN))
        .unwrap();

    let events = graph.drain_events();
    let reported = events
        .iter()
        .find_map(|e| match e {
            GraphEvent::Invalidated { node, range } if *node == clip => Some(*range),
            _ => None,
        })
        .unwrap();
    assert!(reported.contains(t(-1_000_000)));
    assert!(reported.contains(t(1_000_000)));
}

#[test]
fn cache_validation_notifies_connected_clips() {
    init_logging();
    let mut graph = Graph::new();
    let (clip, source) = clip_with_source(&mut graph, TrackKind::Video, 100);

    graph.validate_cache(source, CacheKind::VideoFrame, range(0, 10)).unwrap();
    assert!(graph
        .drain_events()
        .contains(&GraphEvent::PreviewChanged { node: clip }));

    // After disconnecting, validations no longer reach the clip.
    graph.disconnect(&InputId::new(clip, ClipBlock::BUFFER_IN)).unwrap();
    graph.validate_cache(source, CacheKind::VideoFrame, range(10, 20)).unwrap();
    assert!(graph.drain_events().is_empty());
}

#[test]
fn reconnecting_moves_cache_subscriptions() {
    init_logging();
    let mut graph = Graph::new();
    let (clip, source_a) = clip_with_source(&mut graph, TrackKind::Video, 100);
    let source_b = graph.add_source("replacement");

    // Connecting over the occupied slot replaces the edge.
    graph
        .connect(source_b, InputId::new(clip, ClipBlock::BUFFER_IN))
        .unwrap();

    graph.validate_cache(source_a, CacheKind::VideoFrame, range(0, 10)).unwrap();
    assert!(graph.drain_events().is_empty());
    graph.validate_cache(source_b, CacheKind::VideoFrame, range(0, 10)).unwrap();
    assert!(graph
        .drain_events()
        .contains(&GraphEvent::PreviewChanged { node: clip }));
}

#[test]
fn disabled_caches_suppress_requests_but_not_propagation() {
    init_logging();
    let mut graph = Graph::new();
    let (clip, source) = clip_with_source(&mut graph, TrackKind::Video, 100);
    graph.set_caches_enabled(false);

    graph
        .invalidate_cache(clip, range(10, 20), Some(ClipBlock::BUFFER_IN))
        .unwrap();

    assert!(graph.drain_cache_events(source, CacheKind::Thumbnail).unwrap().is_empty());
    assert!(graph
        .drain_events()
        .contains(&GraphEvent::Invalidated { node: clip, range: range(10, 20) }));
}

#[test]
fn invalidation_resolves_the_upstream_viewer() {
    init_logging();
    let mut graph = Graph::new();
    let (clip, source) = clip_with_source(&mut graph, TrackKind::Video, 100);
    let viewer = graph.add_viewer("nested sequence");
    graph
        .connect(viewer, InputId::new(source, clipcore::node::SourceNode::SOURCE_IN))
        .unwrap();

    assert_eq!(graph.clip(clip).unwrap().connected_viewer(), None);
    graph
        .invalidate_cache(clip, range(0, 10), Some(ClipBlock::BUFFER_IN))
        .unwrap();
    assert_eq!(graph.clip(clip).unwrap().connected_viewer(), Some(viewer));
    assert!(graph
        .subscriptions()
        .is_subscribed(viewer, EventKind::MarkerChanged, clip));

    // Marker edits now redraw the clip's preview.
    graph.drain_events();
    graph
        .add_marker(viewer, clipcore::node::Marker::new(range(1, 2), "beat"))
        .unwrap();
    assert!(graph
        .drain_events()
        .contains(&GraphEvent::PreviewChanged { node: clip }));

    // Removing the viewer connection resolves back to none.
    graph
        .disconnect(&InputId::new(source, clipcore::node::SourceNode::SOURCE_IN))
        .unwrap();
    graph
        .invalidate_cache(clip, range(0, 10), Some(ClipBlock::BUFFER_IN))
        .unwrap();
    assert_eq!(graph.clip(clip).unwrap().connected_viewer(), None);
    assert!(!graph
        .subscriptions()
        .is_subscribed(viewer, EventKind::MarkerChanged, clip));
}

#[test]
fn cycle_creating_connections_are_rejected() {
    init_logging();
    let mut graph = Graph::new();
    let clip_a = graph.add_clip(TrackKind::Video);
    let clip_b = graph.add_clip(TrackKind::Video);
    graph.set_length(clip_a, t(10)).unwrap();
    graph.set_length(clip_b, t(10)).unwrap();

    graph
        .connect(clip_a, InputId::new(clip_b, ClipBlock::BUFFER_IN))
        .unwrap();
    // Closing the loop, directly or via a self-loop, must fail.
    assert!(graph
        .connect(clip_b, InputId::new(clip_a, ClipBlock::BUFFER_IN))
        .is_err());
    assert!(graph
        .connect(clip_a, InputId::new(clip_a, ClipBlock::BUFFER_IN))
        .is_err());

    // The graph stayed acyclic, so propagation and value resolution
    // terminate.
    graph.drain_events();
    graph
        .invalidate_cache(clip_a, range(0, 5), Some(ClipBlock::BUFFER_IN))
        .unwrap();
    assert!(graph
        .drain_events()
        .contains(&GraphEvent::Invalidated { node: clip_b, range: range(0, 5) }));
    graph.value(clip_b).unwrap();
}

#[test]
fn links_keep_only_clip_siblings() {
    init_logging();
    let mut graph = Graph::new();
    let clip_a = graph.add_clip(TrackKind::Video);
    let clip_b = graph.add_clip(TrackKind::Audio);
    let viewer = graph.add_viewer("sequence");

    graph.link(clip_a, clip_b).unwrap();
    graph.link(clip_a, viewer).unwrap();

    assert_eq!(graph.clip(clip_a).unwrap().links(), &[clip_b]);
    assert_eq!(graph.clip(clip_b).unwrap().links(), &[clip_a]);

    graph.unlink(clip_a, clip_b).unwrap();
    assert!(graph.clip(clip_a).unwrap().links().is_empty());
    assert!(graph.link(clip_a, clip_a).is_err());
}

#[test]
fn removing_a_node_clears_every_reference_to_it() {
    init_logging();
    let mut graph = Graph::new();
    let (clip, source) = clip_with_source(&mut graph, TrackKind::Video, 100);
    let sibling = graph.add_clip(TrackKind::Video);
    graph.link(clip, sibling).unwrap();

    graph.remove_node(sibling).unwrap();
    assert!(graph.clip(clip).unwrap().links().is_empty());

    graph.remove_node(source).unwrap();
    assert!(graph.cache(source, CacheKind::VideoFrame).is_err());
    // The buffer input is free again after the source went away.
    let source2 = graph.add_source("replacement");
    graph
        .connect(source2, InputId::new(clip, ClipBlock::BUFFER_IN))
        .unwrap();
}

#[test]
fn clip_value_passes_the_connected_buffer_through() {
    init_logging();
    let mut graph = Graph::new();
    let (clip, source) = clip_with_source(&mut graph, TrackKind::Video, 100);
    assert_eq!(
        graph.value(clip).unwrap(),
        clipcore::graph::NodeValue::Buffer(source)
    );

    graph.disconnect(&InputId::new(clip, ClipBlock::BUFFER_IN)).unwrap();
    assert_eq!(graph.value(clip).unwrap(), clipcore::graph::NodeValue::None);
}

#[test]
fn connecting_to_preview_triggers_catch_up() {
    init_logging();
    let mut graph = Graph::new();
    let (clip, source) = clip_with_source(&mut graph, TrackKind::Video, 100);
    graph.set_autocache(clip, true).unwrap();
    graph
        .invalidate_cache(clip, range(0, 10), Some(ClipBlock::BUFFER_IN))
        .unwrap();
    graph.drain_cache_events(source, CacheKind::VideoFrame).unwrap();

    graph.connected_to_preview(clip).unwrap();
    let frames = graph.drain_cache_events(source, CacheKind::VideoFrame).unwrap();
    assert_eq!(frames, vec![CacheEvent::Request(range(0, 10))]);
}
