//! The timeline clip block: parameters and the sequence/media time algebra.
//!
//! A clip places a window of upstream media on the timeline. Its parameters
//! (media-in offset, speed, reverse, pitch hint, autocache) are plain fields
//! mutated only through setters — none of them is keyframable — and the
//! mapping between the two time axes is a pure function of those fields.
//! Cache coordination lives in [`crate::graph`], which snapshots this state
//! and drives the connected source's caches.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::block::{Block, TrackKind};
use crate::time::Rational;

/// Tolerance-based float comparison; `speed` is a plain f64 and exact
/// equality against 1.0 would misfire after UI round-trips.
pub(crate) fn fuzzy_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-12 * a.abs().max(b.abs()).max(1.0)
}

pub(crate) fn fuzzy_zero(a: f64) -> bool {
    a.abs() <= 1e-12
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClipBlock {
    id: Uuid,
    block: Block,
    media_in: Rational,
    speed: f64,
    reverse: bool,
    maintain_audio_pitch: bool,
    autocache: bool,
    /// Sibling clips from the generic link relation, filtered to clip-kind
    /// nodes. Recomputed on link changes, never owned.
    links: Vec<Uuid>,
    /// Resolved upstream viewer whose markers decorate the preview.
    /// Re-resolved on every invalidation arriving through the buffer input.
    connected_viewer: Option<Uuid>,
    in_transition: Option<Uuid>,
    out_transition: Option<Uuid>,
}

impl ClipBlock {
    /// The single connectable input carrying the upstream buffer. The
    /// parameter inputs below are not connectable and carry no value flow;
    /// their names only identify the origin of an invalidation cascade.
    pub const BUFFER_IN: &'static str = "buffer_in";
    pub const MEDIA_IN_IN: &'static str = "media_in_in";
    pub const SPEED_IN: &'static str = "speed_in";
    pub const REVERSE_IN: &'static str = "reverse_in";
    pub const MAINTAIN_AUDIO_PITCH_IN: &'static str = "maintain_audio_pitch_in";
    pub const AUTOCACHE_IN: &'static str = "autocache_in";

    pub fn new(id: Uuid, track: TrackKind) -> ClipBlock {
        ClipBlock {
            id,
            block: Block::new(track),
            media_in: Rational::ZERO,
            speed: 1.0,
            reverse: false,
            maintain_audio_pitch: false,
            autocache: false,
            links: Vec::new(),
            connected_viewer: None,
            in_transition: None,
            out_transition: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn type_id(&self) -> &'static str {
        "core.clip"
    }

    pub fn name(&self) -> &'static str {
        match self.block.track() {
            TrackKind::Video => "Video Clip",
            TrackKind::Audio => "Audio Clip",
            TrackKind::None => "Clip",
        }
    }

    pub fn description(&self) -> &'static str {
        "A time-based node that represents a media source."
    }

    pub fn track(&self) -> TrackKind {
        self.block.track()
    }

    pub fn length(&self) -> Rational {
        self.block.length()
    }

    pub fn set_length(&mut self, length: Rational) {
        self.block.set_length(length);
    }

    pub fn media_in(&self) -> Rational {
        self.media_in
    }

    pub fn set_media_in(&mut self, media_in: Rational) {
        self.media_in = media_in;
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Speed below zero is out of domain; the input boundary clamps to 0.
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed.max(0.0);
    }

    pub fn reverse(&self) -> bool {
        self.reverse
    }

    pub fn set_reverse(&mut self, reverse: bool) {
        self.reverse = reverse;
    }

    pub fn maintain_audio_pitch(&self) -> bool {
        self.maintain_audio_pitch
    }

    pub fn set_maintain_audio_pitch(&mut self, maintain: bool) {
        self.maintain_audio_pitch = maintain;
    }

    pub fn is_autocaching(&self) -> bool {
        self.autocache
    }

    pub fn set_autocache(&mut self, autocache: bool) {
        self.autocache = autocache;
    }

    pub fn links(&self) -> &[Uuid] {
        &self.links
    }

    pub fn set_links(&mut self, links: Vec<Uuid>) {
        self.links = links;
    }

    pub fn connected_viewer(&self) -> Option<Uuid> {
        self.connected_viewer
    }

    pub fn set_connected_viewer(&mut self, viewer: Option<Uuid>) {
        self.connected_viewer = viewer;
    }

    pub fn in_transition(&self) -> Option<Uuid> {
        self.in_transition
    }

    pub fn set_in_transition(&mut self, transition: Option<Uuid>) {
        self.in_transition = transition;
    }

    pub fn out_transition(&self) -> Option<Uuid> {
        self.out_transition
    }

    pub fn set_out_transition(&mut self, transition: Option<Uuid>) {
        self.out_transition = transition;
    }

    /// Map a sequence-time value into media time.
    ///
    /// Zero speed holds the frame at the in point: every sequence time maps
    /// to `media_in`. The sentinels pass through untouched.
    pub fn sequence_to_media_time(&self, sequence_time: Rational) -> Rational {
        self.sequence_to_media_time_with(sequence_time, false, false)
    }

    /// Mapping with parts of the transform suppressed; the trim operations
    /// use this to anchor the untouched edge.
    pub fn sequence_to_media_time_with(
        &self,
        sequence_time: Rational,
        ignore_reverse: bool,
        ignore_speed: bool,
    ) -> Rational {
        // The sentinels are not values; they pass through every transform.
        if !sequence_time.is_finite() {
            return sequence_time;
        }

        let mut media_time = sequence_time;

        if self.reverse && !ignore_reverse {
            media_time = self.length() - media_time;
        }

        if !ignore_speed {
            if fuzzy_zero(self.speed) {
                // Effectively holds the frame at the in point.
                media_time = Rational::ZERO;
            } else if !fuzzy_eq(self.speed, 1.0) {
                media_time = Rational::from_f64(media_time.to_f64() * self.speed);
            }
        }

        media_time + self.media_in
    }

    /// Inverse mapping: media time back into sequence time.
    ///
    /// Not defined for zero speed — the freeze frame maps everything to one
    /// media time, so the inverse returns [`Rational::NAN`] and callers must
    /// check before using the result positionally.
    pub fn media_to_sequence_time(&self, media_time: Rational) -> Rational {
        if !media_time.is_finite() && !media_time.is_nan() {
            return media_time;
        }

        let mut sequence_time = media_time - self.media_in;

        if fuzzy_zero(self.speed) {
            sequence_time = Rational::NAN;
        } else if !fuzzy_eq(self.speed, 1.0) {
            sequence_time = Rational::from_f64(sequence_time.to_f64() / self.speed);
        }

        if self.reverse {
            sequence_time = self.length() - sequence_time;
        }

        sequence_time
    }

    /// Out-point trim. Under reverse the out edge shows the earliest media,
    /// so `media_in` shifts to keep the in edge's visible frame stable.
    pub fn set_length_and_media_out(&mut self, length: Rational) {
        if length == self.length() {
            return;
        }

        if self.reverse {
            let proposed_media_in =
                self.sequence_to_media_time_with(self.length() - length, true, false);
            self.set_media_in(proposed_media_in);
        }

        self.block.set_length(length);
    }

    /// In-point trim. Forward playback anchors the out edge by shifting
    /// `media_in`; speed is ignored so the shift stays in unscaled media
    /// units.
    pub fn set_length_and_media_in(&mut self, length: Rational) {
        if length == self.length() {
            return;
        }

        if !self.reverse {
            let proposed_media_in =
                self.sequence_to_media_time_with(self.length() - length, false, true);
            self.set_media_in(proposed_media_in);
        }

        self.block.set_length(length);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(track: TrackKind) -> ClipBlock {
        ClipBlock::new(Uuid::new_v4(), track)
    }

    fn t(v: i64) -> Rational {
        Rational::from_int(v)
    }

    #[test]
    fn identity_mapping_at_defaults() {
        let mut c = clip(TrackKind::Video);
        c.set_length(t(10));
        assert_eq!(c.sequence_to_media_time(t(3)), t(3));
        assert_eq!(c.media_to_sequence_time(t(3)), t(3));
    }

    #[test]
    fn media_in_offsets_both_directions() {
        let mut c = clip(TrackKind::Video);
        c.set_length(t(10));
        c.set_media_in(t(2));
        assert_eq!(c.sequence_to_media_time(t(3)), t(5));
        assert_eq!(c.media_to_sequence_time(t(5)), t(3));
    }

    #[test]
    fn reverse_flips_around_length() {
        let mut c = clip(TrackKind::Video);
        c.set_length(t(10));
        c.set_reverse(true);
        assert_eq!(c.sequence_to_media_time(t(0)), t(10));
        assert_eq!(c.sequence_to_media_time(t(10)), t(0));
        assert_eq!(c.media_to_sequence_time(t(10)), t(0));
    }

    #[test]
    fn speed_scales_media_time() {
        let mut c = clip(TrackKind::Video);
        c.set_length(t(10));
        c.set_speed(2.0);
        assert_eq!(c.sequence_to_media_time(t(3)), t(6));
        assert_eq!(c.media_to_sequence_time(t(6)), t(3));
        c.set_speed(0.5);
        assert_eq!(c.sequence_to_media_time(t(3)), Rational::new(3, 2));
    }

    #[test]
    fn freeze_frame_maps_everything_to_media_in() {
        let mut c = clip(TrackKind::Video);
        c.set_length(t(10));
        c.set_media_in(t(4));
        c.set_speed(0.0);
        for v in [0, 1, 5, 9] {
            assert_eq!(c.sequence_to_media_time(t(v)), t(4));
        }
        // Reverse does not change where the freeze resolves.
        c.set_reverse(true);
        assert_eq!(c.sequence_to_media_time(t(7)), t(4));
    }

    #[test]
    fn freeze_frame_inverse_is_unrepresentable() {
        let mut c = clip(TrackKind::Video);
        c.set_length(t(10));
        c.set_speed(0.0);
        assert!(c.media_to_sequence_time(t(5)).is_nan());
        // Reverse must not turn NaN back into a positional value.
        c.set_reverse(true);
        assert!(c.media_to_sequence_time(t(5)).is_nan());
    }

    #[test]
    fn speed_setter_clamps_at_zero() {
        let mut c = clip(TrackKind::Video);
        c.set_speed(-2.0);
        assert_eq!(c.speed(), 0.0);
    }

    #[test]
    fn name_follows_track_kind() {
        assert_eq!(clip(TrackKind::Video).name(), "Video Clip");
        assert_eq!(clip(TrackKind::Audio).name(), "Audio Clip");
        assert_eq!(clip(TrackKind::None).name(), "Clip");
    }
}
