//! Exact rational time values.
//!
//! All timeline positions are rationals so that frame boundaries stay exact
//! under arithmetic. Three non-finite values exist: [`Rational::NAN`] for
//! unrepresentable results (e.g. inverting a freeze frame) and the
//! [`TIME_MIN`]/[`TIME_MAX`] sentinels standing for unbounded past/future in
//! the invalidation domain. Sentinels are fixed points of every time
//! transform and must never be fed through arithmetic that would "move" them.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Unbounded past. `den == 0`, `num < 0`.
pub const TIME_MIN: Rational = Rational { num: -1, den: 0 };

/// Unbounded future. `den == 0`, `num > 0`.
pub const TIME_MAX: Rational = Rational { num: 1, den: 0 };

/// An exact `num/den` time value.
///
/// Finite values are kept normalized: `den > 0`, `gcd(|num|, den) == 1`,
/// sign carried by `num`. `den == 0` encodes the non-finite values.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Rational {
    num: i64,
    den: i64,
}

impl Rational {
    pub const ZERO: Rational = Rational { num: 0, den: 1 };

    /// Not-a-time. Produced when an operation has no representable result.
    pub const NAN: Rational = Rational { num: 0, den: 0 };

    /// Largest denominator `from_f64` will produce.
    const MAX_APPROX_DEN: i64 = 1 << 30;

    pub fn new(num: i64, den: i64) -> Rational {
        if den == 0 {
            return match num.signum() {
                1 => TIME_MAX,
                -1 => TIME_MIN,
                _ => Rational::NAN,
            };
        }
        let negative = (num < 0) != (den < 0);
        let mut n = num.unsigned_abs();
        let mut d = den.unsigned_abs();
        let g = gcd(n, d);
        n /= g;
        d /= g;
        Rational {
            num: if negative { -(n as i64) } else { n as i64 },
            den: d as i64,
        }
    }

    pub fn from_int(value: i64) -> Rational {
        Rational { num: value, den: 1 }
    }

    /// Best rational approximation of `value` with a bounded denominator
    /// (continued-fraction expansion, same approach as ffmpeg's `av_d2q`).
    pub fn from_f64(value: f64) -> Rational {
        if value.is_nan() {
            return Rational::NAN;
        }
        if value.is_infinite() {
            return if value > 0.0 { TIME_MAX } else { TIME_MIN };
        }
        let negative = value < 0.0;
        let mut x = value.abs();
        // Convergent recurrence: p_k = a_k * p_{k-1} + p_{k-2}.
        let (mut n0, mut d0, mut n1, mut d1) = (0i64, 1i64, 1i64, 0i64);
        loop {
            let a = x.floor();
            if a > i64::MAX as f64 {
                return if negative { TIME_MIN } else { TIME_MAX };
            }
            let a = a as i64;
            let next = (
                a.checked_mul(n1).and_then(|v| v.checked_add(n0)),
                a.checked_mul(d1).and_then(|v| v.checked_add(d0)),
            );
            match next {
                (Some(n2), Some(d2)) if d2 <= Self::MAX_APPROX_DEN => {
                    (n0, d0) = (n1, d1);
                    (n1, d1) = (n2, d2);
                }
                _ => break,
            }
            let frac = x - a as f64;
            if frac < 1e-12 {
                break;
            }
            x = 1.0 / frac;
        }
        Rational::new(if negative { -n1 } else { n1 }, d1)
    }

    pub fn to_f64(self) -> f64 {
        match (self.num.signum(), self.den) {
            (_, d) if d != 0 => self.num as f64 / self.den as f64,
            (1, _) => f64::INFINITY,
            (-1, _) => f64::NEG_INFINITY,
            _ => f64::NAN,
        }
    }

    pub fn numerator(self) -> i64 {
        self.num
    }

    pub fn denominator(self) -> i64 {
        self.den
    }

    pub fn is_nan(self) -> bool {
        self.den == 0 && self.num == 0
    }

    pub fn is_finite(self) -> bool {
        self.den != 0
    }

    /// Smaller of two values. NaN is contagious.
    pub fn min(self, other: Rational) -> Rational {
        match self.partial_cmp(&other) {
            Some(Ordering::Greater) => other,
            Some(_) => self,
            None => Rational::NAN,
        }
    }

    /// Larger of two values. NaN is contagious.
    pub fn max(self, other: Rational) -> Rational {
        match self.partial_cmp(&other) {
            Some(Ordering::Less) => other,
            Some(_) => self,
            None => Rational::NAN,
        }
    }

    /// Rebuild a normalized value from i128 intermediates, saturating to a
    /// sentinel when the reduced value no longer fits in i64.
    fn reduce(num: i128, den: i128) -> Rational {
        debug_assert!(den > 0);
        if num == 0 {
            return Rational::ZERO;
        }
        let g = gcd128(num.unsigned_abs(), den.unsigned_abs());
        let n = num / g as i128;
        let d = den / g as i128;
        match (i64::try_from(n), i64::try_from(d)) {
            (Ok(n), Ok(d)) => Rational { num: n, den: d },
            _ if num > 0 => TIME_MAX,
            _ => TIME_MIN,
        }
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.max(1)
}

fn gcd128(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.max(1)
}

impl PartialEq for Rational {
    fn eq(&self, other: &Rational) -> bool {
        // NaN compares unequal to everything, itself included.
        if self.is_nan() || other.is_nan() {
            return false;
        }
        // Normalized representation makes field equality sufficient; the
        // sentinels only ever exist in their canonical form.
        self.num == other.num && self.den == other.den
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Rational) -> Option<Ordering> {
        if self.is_nan() || other.is_nan() {
            return None;
        }
        if self.den == 0 || other.den == 0 {
            // Sentinel ranking: MIN < finite < MAX.
            let rank = |r: &Rational| match r.den {
                0 => r.num.signum() * 2,
                _ => 0,
            };
            return Some(rank(self).cmp(&rank(other)));
        }
        let lhs = self.num as i128 * other.den as i128;
        let rhs = other.num as i128 * self.den as i128;
        Some(lhs.cmp(&rhs))
    }
}

impl Add for Rational {
    type Output = Rational;

    fn add(self, rhs: Rational) -> Rational {
        if self.is_nan() || rhs.is_nan() {
            return Rational::NAN;
        }
        match (self.den == 0, rhs.den == 0) {
            // Opposite infinities have no meaningful sum.
            (true, true) => {
                if self.num.signum() == rhs.num.signum() {
                    self
                } else {
                    Rational::NAN
                }
            }
            (true, false) => self,
            (false, true) => rhs,
            (false, false) => Rational::reduce(
                self.num as i128 * rhs.den as i128 + rhs.num as i128 * self.den as i128,
                self.den as i128 * rhs.den as i128,
            ),
        }
    }
}

impl Sub for Rational {
    type Output = Rational;

    fn sub(self, rhs: Rational) -> Rational {
        self + (-rhs)
    }
}

impl Neg for Rational {
    type Output = Rational;

    fn neg(self) -> Rational {
        Rational {
            num: -self.num,
            den: self.den,
        }
    }
}

impl AddAssign for Rational {
    fn add_assign(&mut self, rhs: Rational) {
        *self = *self + rhs;
    }
}

impl SubAssign for Rational {
    fn sub_assign(&mut self, rhs: Rational) {
        *self = *self - rhs;
    }
}

impl From<i64> for Rational {
    fn from(value: i64) -> Rational {
        Rational::from_int(value)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.num.signum(), self.den) {
            (_, 1) => write!(f, "{}", self.num),
            (_, d) if d != 0 => write!(f, "{}/{}", self.num, self.den),
            (1, _) => write!(f, "+inf"),
            (-1, _) => write!(f, "-inf"),
            _ => write!(f, "NaN"),
        }
    }
}
