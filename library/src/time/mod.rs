//! Rational-time primitives: exact time values and range bookkeeping.

pub mod range;
pub mod rational;

pub use range::{TimeRange, TimeRangeList};
pub use rational::{Rational, TIME_MAX, TIME_MIN};
