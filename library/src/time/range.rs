//! Time ranges and coalesced range sets.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::rational::Rational;

/// Half-open span `[in, out)` on a time axis.
///
/// Constructors keep endpoints as given; a transform that flips ordering
/// (e.g. mapping through a reversed clip) leaves `in > out` and callers
/// re-normalize with [`TimeRange::normalized`] before doing range math.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    r#in: Rational,
    out: Rational,
}

impl TimeRange {
    pub fn new(r#in: Rational, out: Rational) -> TimeRange {
        TimeRange { r#in, out }
    }

    pub fn r#in(&self) -> Rational {
        self.r#in
    }

    pub fn out(&self) -> Rational {
        self.out
    }

    pub fn length(&self) -> Rational {
        self.out - self.r#in
    }

    /// Endpoints ordered so that `in <= out`.
    pub fn normalized(self) -> TimeRange {
        if matches!(self.r#in.partial_cmp(&self.out), Some(Ordering::Greater)) {
            TimeRange::new(self.out, self.r#in)
        } else {
            self
        }
    }

    pub fn is_empty(&self) -> bool {
        !matches!(self.r#in.partial_cmp(&self.out), Some(Ordering::Less))
    }

    pub fn contains(&self, time: Rational) -> bool {
        self.r#in <= time && time < self.out
    }

    /// Whether the half-open spans share any time.
    pub fn intersects(&self, other: &TimeRange) -> bool {
        self.r#in < other.out && other.r#in < self.out
    }

    /// Overlap of the two spans; degenerate (empty) when they are disjoint.
    pub fn intersected(&self, other: &TimeRange) -> TimeRange {
        let r#in = self.r#in.max(other.r#in);
        let out = self.out.min(other.out);
        if matches!(r#in.partial_cmp(&out), Some(Ordering::Less)) {
            TimeRange::new(r#in, out)
        } else {
            TimeRange::new(r#in, r#in)
        }
    }
}

/// Sorted set of disjoint, non-empty [`TimeRange`]s.
///
/// Insertions coalesce overlapping or touching spans; removals subtract,
/// splitting spans where necessary.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeRangeList {
    ranges: Vec<TimeRange>,
}

impl TimeRangeList {
    pub fn new() -> TimeRangeList {
        TimeRangeList::default()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeRange> {
        self.ranges.iter()
    }

    pub fn contains(&self, time: Rational) -> bool {
        self.ranges.iter().any(|r| r.contains(time))
    }

    pub fn insert(&mut self, range: TimeRange) {
        if range.is_empty() {
            return;
        }
        let mut r#in = range.r#in();
        let mut out = range.out();
        // Absorb every span that overlaps or touches the new one.
        self.ranges.retain(|r| {
            let touches = r.r#in() <= out && r#in <= r.out();
            if touches {
                r#in = r#in.min(r.r#in());
                out = out.max(r.out());
            }
            !touches
        });
        let merged = TimeRange::new(r#in, out);
        let pos = self
            .ranges
            .iter()
            .position(|r| matches!(merged.r#in().partial_cmp(&r.r#in()), Some(Ordering::Less)))
            .unwrap_or(self.ranges.len());
        self.ranges.insert(pos, merged);
    }

    pub fn remove(&mut self, range: &TimeRange) {
        if range.is_empty() {
            return;
        }
        let mut result = Vec::with_capacity(self.ranges.len() + 1);
        for r in self.ranges.drain(..) {
            if !r.intersects(range) {
                result.push(r);
                continue;
            }
            if r.r#in() < range.r#in() {
                result.push(TimeRange::new(r.r#in(), range.r#in()));
            }
            if range.out() < r.out() {
                result.push(TimeRange::new(range.out(), r.out()));
            }
        }
        self.ranges = result;
    }

    /// Sub-ranges of this set that fall within `bound`.
    pub fn intersected(&self, bound: &TimeRange) -> TimeRangeList {
        let ranges = self
            .ranges
            .iter()
            .map(|r| r.intersected(bound))
            .filter(|r| !r.is_empty())
            .collect();
        TimeRangeList { ranges }
    }
}

impl FromIterator<TimeRange> for TimeRangeList {
    fn from_iter<I: IntoIterator<Item = TimeRange>>(iter: I) -> TimeRangeList {
        let mut list = TimeRangeList::new();
        for range in iter {
            list.insert(range);
        }
        list
    }
}

impl<'a> IntoIterator for &'a TimeRangeList {
    type Item = &'a TimeRange;
    type IntoIter = std::slice::Iter<'a, TimeRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{TIME_MAX, TIME_MIN};

    fn range(r#in: i64, out: i64) -> TimeRange {
        TimeRange::new(Rational::from_int(r#in), Rational::from_int(out))
    }

    #[test]
    fn normalized_swaps_reversed_endpoints() {
        let r = TimeRange::new(Rational::from_int(8), Rational::from_int(2));
        assert_eq!(r.normalized(), range(2, 8));
        assert_eq!(range(2, 8).normalized(), range(2, 8));
    }

    #[test]
    fn intersection_is_half_open() {
        assert!(range(0, 10).intersects(&range(5, 15)));
        assert!(!range(0, 10).intersects(&range(10, 20)));
        assert_eq!(range(0, 10).intersected(&range(5, 15)), range(5, 10));
        assert!(range(0, 10).intersected(&range(20, 30)).is_empty());
    }

    #[test]
    fn unbounded_range_intersects_everything() {
        let all = TimeRange::new(TIME_MIN, TIME_MAX);
        assert_eq!(all.intersected(&range(3, 9)), range(3, 9));
        assert!(all.contains(Rational::from_int(-1_000_000)));
    }

    #[test]
    fn insert_coalesces() {
        let mut list = TimeRangeList::new();
        list.insert(range(0, 5));
        list.insert(range(10, 15));
        assert_eq!(list.len(), 2);
        // Touching spans merge.
        list.insert(range(5, 10));
        assert_eq!(list.len(), 1);
        assert_eq!(list.iter().next(), Some(&range(0, 15)));
    }

    #[test]
    fn remove_splits() {
        let mut list = TimeRangeList::new();
        list.insert(range(0, 20));
        list.remove(&range(5, 10));
        let got: Vec<_> = list.iter().copied().collect();
        assert_eq!(got, vec![range(0, 5), range(10, 20)]);
        list.remove(&range(0, 100));
        assert!(list.is_empty());
    }

    #[test]
    fn intersected_clips_to_bound() {
        let mut list = TimeRangeList::new();
        list.insert(range(0, 5));
        list.insert(range(8, 12));
        let clipped = list.intersected(&range(3, 10));
        let got: Vec<_> = clipped.iter().copied().collect();
        assert_eq!(got, vec![range(3, 5), range(8, 10)]);
    }
}
