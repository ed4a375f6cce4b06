//! Timeline-block base shared by time-based nodes.

use serde::{Deserialize, Serialize};

use crate::time::Rational;

/// Which track a block sits on. Determines which cache kinds its
/// invalidation cascade touches; `None` makes cache operations no-ops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
    #[default]
    None,
}

/// Base state of a timeline block: its duration in sequence time and the
/// track it belongs to. Length is mutated by trim/resize operations; node
/// types compose this and layer their own adjustments on top.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Block {
    length: Rational,
    track: TrackKind,
}

impl Block {
    pub fn new(track: TrackKind) -> Block {
        Block {
            length: Rational::ZERO,
            track,
        }
    }

    pub fn length(&self) -> Rational {
        self.length
    }

    pub fn set_length(&mut self, length: Rational) {
        self.length = length;
    }

    pub fn track(&self) -> TrackKind {
        self.track
    }

    pub fn set_track(&mut self, track: TrackKind) {
        self.track = track;
    }
}
