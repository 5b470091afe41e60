//! Integer intervals with independently open/closed and bounded/unbounded ends.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while parsing a range literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("empty range")]
    Empty,

    #[error("invalid integer '{0}' in range '{1}'")]
    InvalidInteger(String, String),

    #[error("invalid interval syntax: {0}")]
    InvalidInterval(String),

    #[error("infinite side must be open on the {0}: {1}")]
    InclusiveInfinity(&'static str, String),

    #[error("empty interval: {0}")]
    EmptyInterval(String),

    #[error("unrecognized range format: {0}")]
    Unrecognized(String),
}

/// A set of integers described by a lower and an upper end.
///
/// Each end is either unbounded (then its value is ignored and kept at 0) or
/// bounded, in which case it is inclusive or exclusive. A range that contains
/// no integer is *invalid*; every operation treats it as the empty set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IntRange {
    pub min: i64,
    pub min_inclusive: bool,
    pub min_unbounded: bool,
    pub max: i64,
    pub max_inclusive: bool,
    pub max_unbounded: bool,
}

impl Default for IntRange {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl IntRange {
    /// Parse a range literal.
    ///
    /// Accepted forms: `N`, `=N`, `>N`, `>=N`, `<N`, `<=N`, and interval
    /// notation such as `[1,3)`, `(,5]` or `(,)`. An empty side in interval
    /// notation is infinite and must use the open bracket. Whitespace is
    /// ignored around the literal and inside the brackets.
    ///
    /// An empty literal yields the unbounded range when
    /// `empty_means_unbounded` is set, and an error otherwise.
    pub fn parse(value: &str, empty_means_unbounded: bool) -> Result<IntRange, RangeError> {
        let s = value.trim();
        if s.is_empty() {
            return if empty_means_unbounded {
                Ok(IntRange::unbounded())
            } else {
                Err(RangeError::Empty)
            };
        }

        let int = |tok: &str| -> Result<i64, RangeError> {
            let tok = tok.trim();
            tok.parse::<i64>()
                .map_err(|_| RangeError::InvalidInteger(tok.to_string(), value.to_string()))
        };

        // ">=" and "<=" must be tried before their one-character prefixes
        if let Some(rest) = s.strip_prefix(">=") {
            return Ok(IntRange::at_least(int(rest)?));
        }
        if let Some(rest) = s.strip_prefix("<=") {
            return Ok(IntRange::at_most(int(rest)?));
        }
        if let Some(rest) = s.strip_prefix('=') {
            return Ok(IntRange::single(int(rest)?));
        }
        if let Some(rest) = s.strip_prefix('>') {
            return Ok(IntRange::greater_than(int(rest)?));
        }
        if let Some(rest) = s.strip_prefix('<') {
            return Ok(IntRange::less_than(int(rest)?));
        }

        if s.len() >= 2 && (s.starts_with('(') || s.starts_with('[')) {
            if !(s.ends_with(')') || s.ends_with(']')) {
                return Err(RangeError::InvalidInterval(value.to_string()));
            }
            return Self::parse_interval(s, value, int);
        }

        if let Ok(n) = s.parse::<i64>() {
            return Ok(IntRange::single(n));
        }

        Err(RangeError::Unrecognized(value.to_string()))
    }

    fn parse_interval(
        s: &str,
        literal: &str,
        int: impl Fn(&str) -> Result<i64, RangeError>,
    ) -> Result<IntRange, RangeError> {
        let left_inclusive = s.starts_with('[');
        let right_inclusive = s.ends_with(']');
        let inner = &s[1..s.len() - 1];
        let (left, right) = inner
            .split_once(',')
            .ok_or_else(|| RangeError::InvalidInterval(literal.to_string()))?;
        let (left, right) = (left.trim(), right.trim());

        let mut r = IntRange::unbounded();

        if left.is_empty() {
            if left_inclusive {
                return Err(RangeError::InclusiveInfinity("left", literal.to_string()));
            }
        } else {
            r.min = int(left)?;
            r.min_inclusive = left_inclusive;
            r.min_unbounded = false;
        }

        if right.is_empty() {
            if right_inclusive {
                return Err(RangeError::InclusiveInfinity("right", literal.to_string()));
            }
        } else {
            r.max = int(right)?;
            r.max_inclusive = right_inclusive;
            r.max_unbounded = false;
        }

        if !r.is_valid() {
            return Err(RangeError::EmptyInterval(literal.to_string()));
        }
        Ok(r)
    }

    /// The range containing every integer.
    pub fn unbounded() -> IntRange {
        IntRange {
            min: 0,
            min_inclusive: false,
            min_unbounded: true,
            max: 0,
            max_inclusive: false,
            max_unbounded: true,
        }
    }

    /// A canonical range containing nothing.
    pub fn empty() -> IntRange {
        IntRange::exclusive(0, 0)
    }

    pub fn single(n: i64) -> IntRange {
        IntRange::inclusive(n, n)
    }

    /// `(n, +∞)`
    pub fn greater_than(n: i64) -> IntRange {
        IntRange {
            min: n,
            min_inclusive: false,
            min_unbounded: false,
            ..IntRange::unbounded()
        }
    }

    /// `[n, +∞)`
    pub fn at_least(n: i64) -> IntRange {
        IntRange {
            min: n,
            min_inclusive: true,
            min_unbounded: false,
            ..IntRange::unbounded()
        }
    }

    /// `(-∞, n)`
    pub fn less_than(n: i64) -> IntRange {
        IntRange {
            max: n,
            max_inclusive: false,
            max_unbounded: false,
            ..IntRange::unbounded()
        }
    }

    /// `(-∞, n]`
    pub fn at_most(n: i64) -> IntRange {
        IntRange {
            max: n,
            max_inclusive: true,
            max_unbounded: false,
            ..IntRange::unbounded()
        }
    }

    /// `[min, max]`
    pub fn inclusive(min: i64, max: i64) -> IntRange {
        IntRange::bounded(min, true, max, true)
    }

    /// `(min, max)`
    pub fn exclusive(min: i64, max: i64) -> IntRange {
        IntRange::bounded(min, false, max, false)
    }

    pub fn bounded(min: i64, min_inclusive: bool, max: i64, max_inclusive: bool) -> IntRange {
        IntRange {
            min,
            min_inclusive,
            min_unbounded: false,
            max,
            max_inclusive,
            max_unbounded: false,
        }
    }

    /// Whether the range contains at least one integer.
    ///
    /// An unbounded side must be open. With both sides bounded, `min > max`
    /// is empty, `min == max` needs both ends inclusive, and `(n, n+1)` is
    /// empty because no integer lies strictly between.
    pub fn is_valid(&self) -> bool {
        if self.min_unbounded && self.min_inclusive {
            return false;
        }
        if self.max_unbounded && self.max_inclusive {
            return false;
        }
        // no integer lies beyond the i64 limits
        if !self.min_unbounded && !self.min_inclusive && self.min == i64::MAX {
            return false;
        }
        if !self.max_unbounded && !self.max_inclusive && self.max == i64::MIN {
            return false;
        }
        if !self.min_unbounded && !self.max_unbounded {
            if self.min > self.max {
                return false;
            }
            if self.min == self.max {
                return self.min_inclusive && self.max_inclusive;
            }
            if self.min.checked_add(1) == Some(self.max)
                && !self.min_inclusive
                && !self.max_inclusive
            {
                return false;
            }
        }
        true
    }

    pub fn is_not_empty(&self) -> bool {
        self.is_valid()
    }

    pub fn contains(&self, n: i64) -> bool {
        if !self.is_valid() {
            return false;
        }
        if !self.min_unbounded {
            let below = if self.min_inclusive {
                n < self.min
            } else {
                n <= self.min
            };
            if below {
                return false;
            }
        }
        if !self.max_unbounded {
            let above = if self.max_inclusive {
                n > self.max
            } else {
                n >= self.max
            };
            if above {
                return false;
            }
        }
        true
    }

    /// The smallest integer the lower end admits, `None` when unbounded below
    /// or when the open end `(i64::MAX, ..` admits nothing.
    pub fn lowest(&self) -> Option<i64> {
        if self.min_unbounded {
            None
        } else if self.min_inclusive {
            Some(self.min)
        } else {
            self.min.checked_add(1)
        }
    }

    /// The largest integer the upper end admits, `None` when unbounded above
    /// or when the open end `.., i64::MIN)` admits nothing.
    pub fn highest(&self) -> Option<i64> {
        if self.max_unbounded {
            None
        } else if self.max_inclusive {
            Some(self.max)
        } else {
            self.max.checked_sub(1)
        }
    }

    /// Whether some integer lies in both ranges.
    pub fn has_intersect(&self, other: &IntRange) -> bool {
        if !self.is_valid() || !other.is_valid() {
            return false;
        }
        if let (Some(hi), Some(lo)) = (self.highest(), other.lowest()) {
            if hi < lo {
                return false;
            }
        }
        if let (Some(lo), Some(hi)) = (self.lowest(), other.highest()) {
            if lo > hi {
                return false;
            }
        }
        true
    }

    /// The range of integers lying in both ranges.
    ///
    /// The result is empty (invalid) when either operand is empty or the two
    /// do not overlap.
    pub fn intersect(&self, other: &IntRange) -> IntRange {
        if !self.is_valid() || !other.is_valid() {
            return IntRange::empty();
        }

        let mut r = IntRange::unbounded();

        match (self.min_unbounded, other.min_unbounded) {
            (true, true) => {}
            (true, false) => {
                r.min = other.min;
                r.min_inclusive = other.min_inclusive;
                r.min_unbounded = false;
            }
            (false, true) => {
                r.min = self.min;
                r.min_inclusive = self.min_inclusive;
                r.min_unbounded = false;
            }
            (false, false) => {
                r.min_unbounded = false;
                if self.min > other.min {
                    r.min = self.min;
                    r.min_inclusive = self.min_inclusive;
                } else if self.min < other.min {
                    r.min = other.min;
                    r.min_inclusive = other.min_inclusive;
                } else {
                    r.min = self.min;
                    r.min_inclusive = self.min_inclusive && other.min_inclusive;
                }
            }
        }

        match (self.max_unbounded, other.max_unbounded) {
            (true, true) => {}
            (true, false) => {
                r.max = other.max;
                r.max_inclusive = other.max_inclusive;
                r.max_unbounded = false;
            }
            (false, true) => {
                r.max = self.max;
                r.max_inclusive = self.max_inclusive;
                r.max_unbounded = false;
            }
            (false, false) => {
                r.max_unbounded = false;
                if self.max < other.max {
                    r.max = self.max;
                    r.max_inclusive = self.max_inclusive;
                } else if self.max > other.max {
                    r.max = other.max;
                    r.max_inclusive = other.max_inclusive;
                } else {
                    r.max = self.max;
                    r.max_inclusive = self.max_inclusive && other.max_inclusive;
                }
            }
        }

        r
    }

    /// The parts of `self` not covered by `other`: at most a left and a
    /// right remainder, each omitted when empty.
    pub fn subtract(&self, other: &IntRange) -> Vec<IntRange> {
        if !self.is_valid() {
            return Vec::new();
        }
        if !self.has_intersect(other) {
            return vec![*self];
        }

        let mut results = Vec::with_capacity(2);

        if let Some(other_lo) = other.lowest() {
            let covers_left = matches!(self.lowest(), Some(lo) if lo >= other_lo);
            if !covers_left {
                let left = IntRange {
                    min: self.min,
                    min_inclusive: self.min_inclusive,
                    min_unbounded: self.min_unbounded,
                    max: other.min,
                    max_inclusive: !other.min_inclusive,
                    max_unbounded: false,
                };
                if left.is_valid() {
                    results.push(left);
                }
            }
        }

        if let Some(other_hi) = other.highest() {
            let covers_right = matches!(self.highest(), Some(hi) if hi <= other_hi);
            if !covers_right {
                let right = IntRange {
                    min: other.max,
                    min_inclusive: !other.max_inclusive,
                    min_unbounded: false,
                    max: self.max,
                    max_inclusive: self.max_inclusive,
                    max_unbounded: self.max_unbounded,
                };
                if right.is_valid() {
                    results.push(right);
                }
            }
        }

        results
    }

    /// Re-express the range with closed ends only: `[lo,hi]`, `[lo,+∞)`,
    /// `(-∞,hi]` or fully unbounded.
    pub fn try_my_best_to_closed_interval(&self) -> IntRange {
        if !self.is_valid() {
            return IntRange::empty();
        }
        match (self.lowest(), self.highest()) {
            (Some(lo), Some(hi)) => IntRange::inclusive(lo, hi),
            (Some(lo), None) => IntRange::at_least(lo),
            (None, Some(hi)) => IntRange::at_most(hi),
            (None, None) => IntRange::unbounded(),
        }
    }

    /// Whether every member is `< n`.
    pub fn all_less_than(&self, n: i64) -> bool {
        self.is_valid() && matches!(self.highest(), Some(hi) if hi < n)
    }

    /// Whether every member is `<= n`.
    pub fn all_less_or_equal_than(&self, n: i64) -> bool {
        self.is_valid() && matches!(self.highest(), Some(hi) if hi <= n)
    }

    /// Whether every member is `> n`.
    pub fn all_greater_than(&self, n: i64) -> bool {
        self.is_valid() && matches!(self.lowest(), Some(lo) if lo > n)
    }

    /// Whether every member is `>= n`.
    pub fn all_greater_or_equal_than(&self, n: i64) -> bool {
        self.is_valid() && matches!(self.lowest(), Some(lo) if lo >= n)
    }

    pub fn is_single_value(&self) -> bool {
        !self.min_unbounded
            && !self.max_unbounded
            && self.min == self.max
            && self.min_inclusive
            && self.max_inclusive
    }

    pub fn single_value(&self) -> Option<i64> {
        self.is_single_value().then_some(self.min)
    }

    /// Shape `(-∞, n)`.
    pub fn is_less_than(&self) -> bool {
        self.min_unbounded && !self.max_unbounded && !self.max_inclusive
    }

    /// Shape `(-∞, n]`.
    pub fn is_less_or_equal_than(&self) -> bool {
        self.min_unbounded && !self.max_unbounded && self.max_inclusive
    }

    /// Shape `(n, +∞)`.
    pub fn is_greater_than(&self) -> bool {
        !self.min_unbounded && !self.min_inclusive && self.max_unbounded
    }

    /// Shape `[n, +∞)`.
    pub fn is_greater_or_equal_than(&self) -> bool {
        !self.min_unbounded && self.min_inclusive && self.max_unbounded
    }

    pub fn is_lower_bounded(&self) -> bool {
        !self.min_unbounded
    }

    pub fn is_upper_bounded(&self) -> bool {
        !self.max_unbounded
    }

    pub fn is_unbounded(&self) -> bool {
        self.min_unbounded && self.max_unbounded
    }

    /// A literal that [`IntRange::parse`] reads back to an equal range.
    pub fn to_parseable_string(&self) -> String {
        self.format(false)
    }

    fn format(&self, show_infinity: bool) -> String {
        if self.is_single_value() {
            return self.min.to_string();
        }

        if self.min_unbounded && !self.max_unbounded {
            let op = if self.max_inclusive { "<=" } else { "<" };
            return format!("{}{}", op, self.max);
        }
        if self.max_unbounded && !self.min_unbounded {
            let op = if self.min_inclusive { ">=" } else { ">" };
            return format!("{}{}", op, self.min);
        }

        let left_bracket = if self.min_inclusive { '[' } else { '(' };
        let right_bracket = if self.max_inclusive { ']' } else { ')' };
        let left = match (self.min_unbounded, show_infinity) {
            (true, true) => "-∞".to_string(),
            (true, false) => String::new(),
            (false, _) => self.min.to_string(),
        };
        let right = match (self.max_unbounded, show_infinity) {
            (true, true) => "∞".to_string(),
            (true, false) => String::new(),
            (false, _) => self.max.to_string(),
        };

        format!("{}{},{}{}", left_bracket, left, right, right_bracket)
    }
}

impl fmt::Display for IntRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(true))
    }
}

impl FromStr for IntRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IntRange::parse(s, false)
    }
}
