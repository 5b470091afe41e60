//! Unions of integer ranges over the natural numbers, with a compact
//! `_`-separated grammar such as `0_3-5_7-`.

use crate::range::IntRange;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while parsing a filter literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("empty token at position {0}")]
    EmptyToken(usize),

    #[error("invalid token {0:?}")]
    InvalidToken(String),

    #[error("invalid token {0:?}: not natural number: {1:?}")]
    NotNatural(String, String),

    #[error("invalid range {0:?}: min > max")]
    Reversed(String),

    #[error("numbers must be non-decreasing: {0} < {1}")]
    NotNonDecreasing(i64, i64),
}

/// A set of natural numbers expressed as the union of [`IntRange`]s.
///
/// Negative numbers never match. An empty filter matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NaturalRangeFilter {
    ranges: Vec<IntRange>,
}

impl NaturalRangeFilter {
    /// Parse a filter literal.
    ///
    /// Tokens are separated by `_`:
    ///
    /// - `all`: every natural number (only as the whole literal)
    /// - `N`: a single number
    /// - `N-M`: the closed interval `[N, M]`
    /// - `N-`: `N` and above
    /// - `-M`: `M` and below
    ///
    /// Numbers must not decrease when read left to right, so `1_3-5_7-7`
    /// parses while `3_1-4` does not.
    pub fn parse(value: &str) -> Result<NaturalRangeFilter, FilterError> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(NaturalRangeFilter::default());
        }
        if value == "all" {
            return Ok(NaturalRangeFilter::all());
        }

        let mut ranges = Vec::new();
        let mut prev = 0i64;

        for (i, tok) in value.split('_').enumerate() {
            let tok = tok.trim();
            if tok.is_empty() {
                return Err(FilterError::EmptyToken(i));
            }

            if tok.matches('-').count() > 1 {
                // "-N-" says "at most N or at least N", which is everything
                if tok != "--" && tok.starts_with('-') && tok.ends_with('-') {
                    parse_natural(tok, &tok[1..tok.len() - 1])?;
                    return Ok(NaturalRangeFilter::all());
                }
                return Err(FilterError::InvalidToken(tok.to_string()));
            }

            let Some((left, right)) = tok.split_once('-') else {
                let n = parse_natural(tok, tok)?;
                advance(n, &mut prev)?;
                ranges.push(IntRange::single(n));
                continue;
            };

            match (left.is_empty(), right.is_empty()) {
                (true, true) => return Err(FilterError::InvalidToken(tok.to_string())),
                (false, false) => {
                    let lo = parse_natural(tok, left)?;
                    let hi = parse_natural(tok, right)?;
                    if lo > hi {
                        return Err(FilterError::Reversed(tok.to_string()));
                    }
                    advance(lo, &mut prev)?;
                    advance(hi, &mut prev)?;
                    ranges.push(IntRange::inclusive(lo, hi));
                }
                (false, true) => {
                    let lo = parse_natural(tok, left)?;
                    advance(lo, &mut prev)?;
                    ranges.push(IntRange::at_least(lo));
                }
                (true, false) => {
                    let hi = parse_natural(tok, right)?;
                    advance(hi, &mut prev)?;
                    ranges.push(IntRange::at_most(hi));
                }
            }
        }

        Ok(NaturalRangeFilter { ranges })
    }

    /// The filter matching every natural number.
    pub fn all() -> NaturalRangeFilter {
        NaturalRangeFilter {
            ranges: vec![IntRange::at_least(0)],
        }
    }

    pub fn from_ranges(ranges: Vec<IntRange>) -> NaturalRangeFilter {
        NaturalRangeFilter { ranges }
    }

    pub fn ranges(&self) -> &[IntRange] {
        &self.ranges
    }

    /// Whether `n` is accepted by any member range.
    pub fn test(&self, n: i64) -> bool {
        n >= 0 && self.ranges.iter().any(|r| r.contains(n))
    }

    /// Whether at least one natural number is accepted.
    pub fn is_not_empty(&self) -> bool {
        let naturals = IntRange::at_least(0);
        self.ranges.iter().any(|r| r.has_intersect(&naturals))
    }

    /// Whether every natural number is accepted.
    pub fn is_all_natural(&self) -> bool {
        if self.ranges.is_empty() {
            return false;
        }
        let mut uncovered = vec![IntRange::at_least(0)];
        let mut next = Vec::new();
        for r in &self.ranges {
            next.clear();
            for left in &uncovered {
                next.extend(left.subtract(r).into_iter().filter(IntRange::is_valid));
            }
            if next.is_empty() {
                return true;
            }
            std::mem::swap(&mut uncovered, &mut next);
        }
        false
    }

    /// The same set as a minimal, sorted list of closed ranges where no two
    /// members overlap or touch.
    pub fn normalize(&self) -> NaturalRangeFilter {
        // (start, end) with None as an unbounded end
        let mut closed: Vec<(i64, Option<i64>)> = Vec::new();
        let mut unbounded_start: Option<i64> = None;

        for r in self.ranges.iter().filter(|r| r.is_valid()) {
            let c = r.try_my_best_to_closed_interval();
            let start = c.lowest().map_or(0, |lo| lo.max(0));
            match c.highest() {
                None => {
                    unbounded_start = Some(unbounded_start.map_or(start, |s| s.min(start)));
                }
                Some(end) if end >= start => closed.push((start, Some(end))),
                Some(_) => {}
            }
        }
        if let Some(start) = unbounded_start {
            closed.push((start, None));
        }

        closed.sort_by(|a, b| {
            a.0.cmp(&b.0).then_with(|| match (a.1, b.1) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            })
        });

        let mut merged: Vec<(i64, Option<i64>)> = Vec::with_capacity(closed.len());
        for cur in closed {
            if let Some(last) = merged.last_mut() {
                let Some(last_end) = last.1 else {
                    // an unbounded member covers everything sorted after it
                    break;
                };
                if last_end.saturating_add(1) >= cur.0 {
                    last.1 = cur.1.map(|end| end.max(last_end));
                    continue;
                }
            }
            merged.push(cur);
        }

        let ranges = merged
            .into_iter()
            .map(|(start, end)| match end {
                None => IntRange::at_least(start),
                Some(end) => IntRange::inclusive(start, end),
            })
            .collect();
        NaturalRangeFilter { ranges }
    }
}

fn advance(n: i64, prev: &mut i64) -> Result<(), FilterError> {
    if n < *prev {
        return Err(FilterError::NotNonDecreasing(n, *prev));
    }
    *prev = n;
    Ok(())
}

fn parse_natural(tok: &str, s: &str) -> Result<i64, FilterError> {
    match s.parse::<i64>() {
        Ok(n) if n >= 0 => Ok(n),
        _ => Err(FilterError::NotNatural(tok.to_string(), s.to_string())),
    }
}

impl fmt::Display for NaturalRangeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let norm = self.normalize();
        if norm.ranges == [IntRange::at_least(0)] {
            return f.write_str("all");
        }
        let parts: Vec<String> = norm
            .ranges
            .iter()
            .map(|r| {
                if !r.is_upper_bounded() {
                    format!("{}-", r.min)
                } else if r.min == r.max {
                    r.min.to_string()
                } else {
                    format!("{}-{}", r.min, r.max)
                }
            })
            .collect();
        f.write_str(&parts.join("_"))
    }
}

impl FromStr for NaturalRangeFilter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaturalRangeFilter::parse(s)
    }
}
