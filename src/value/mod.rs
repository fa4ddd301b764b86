//! Rule values: parsed protocol, port and address fields.
//!
//! Every field of a rule is parsed into a [`RangeSet`], a union of closed
//! intervals over a totally ordered domain:
//!
//! - protocols: `u8` (one single-point interval per protocol number)
//! - ports: `u16`
//! - addresses: [`Address`], where every IPv4 address sorts before every IPv6 address
//!
//! Range sets are kept sorted with overlapping and adjacent intervals merged,
//! which lets matchers use binary search and lets [`RangeSet::shrink`] detect
//! when a constraint already covers the admissible bound of a tree path.

mod address;
mod port;
mod protocol;

pub use address::{Address, IpValue};
pub use port::PortValue;
pub use protocol::ProtocolValue;

use std::fmt;

use crate::error::ValueError;

/// A totally ordered, finite value domain.
pub trait Ordinal: Copy + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Smallest value of the domain
    const MIN: Self;
    /// Largest value of the domain
    const MAX: Self;

    /// The next value, or `None` at the end of the domain.
    fn successor(self) -> Option<Self>;
}

impl Ordinal for u8 {
    const MIN: Self = u8::MIN;
    const MAX: Self = u8::MAX;

    fn successor(self) -> Option<Self> {
        self.checked_add(1)
    }
}

impl Ordinal for u16 {
    const MIN: Self = u16::MIN;
    const MAX: Self = u16::MAX;

    fn successor(self) -> Option<Self> {
        self.checked_add(1)
    }
}

/// A closed interval `[begin, end]` with `begin <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval<T> {
    begin: T,
    end: T,
}

/// Admissible range of one aspect along a decision tree path.
pub type Bound<T> = Interval<T>;

impl<T: Ordinal> Interval<T> {
    /// The interval spanning the whole domain.
    pub const ANY: Self = Interval {
        begin: T::MIN,
        end: T::MAX,
    };

    /// Create an interval, or `None` if `begin > end`.
    pub fn new(begin: T, end: T) -> Option<Self> {
        (begin <= end).then_some(Self { begin, end })
    }

    /// Create a single-point interval.
    pub fn point(value: T) -> Self {
        Self {
            begin: value,
            end: value,
        }
    }

    pub fn begin(&self) -> T {
        self.begin
    }

    pub fn end(&self) -> T {
        self.end
    }

    pub fn contains(&self, value: T) -> bool {
        self.begin <= value && value <= self.end
    }

    /// Intersection of two intervals, `None` if they are disjoint.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        Self::new(self.begin.max(other.begin), self.end.min(other.end))
    }

    /// Whether `threshold` splits this interval into two non-empty halves.
    pub fn can_split_at(&self, threshold: T) -> bool {
        self.begin <= threshold && threshold < self.end
    }

    /// Split into `[begin, threshold]` and `(threshold, end]`.
    ///
    /// Returns `None` unless [`can_split_at`](Self::can_split_at) holds.
    pub fn split_at(&self, threshold: T) -> Option<(Self, Self)> {
        if !self.can_split_at(threshold) {
            return None;
        }
        let next = threshold.successor()?;
        Some((
            Self {
                begin: self.begin,
                end: threshold,
            },
            Self {
                begin: next,
                end: self.end,
            },
        ))
    }
}

impl<T: fmt::Display> fmt::Display for Interval<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.begin, self.end)
    }
}

/// Outcome of shrinking a range set against a bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shrunk<T> {
    /// No part of the set lies within the bound; the rule can never match there.
    Disjoint,
    /// The set covers the whole bound; no matcher is needed.
    Covered,
    /// The part of the set within the bound still has to be checked.
    Partial(RangeSet<T>),
}

/// A non-empty union of closed intervals, stored sorted and merged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RangeSet<T> {
    ranges: Vec<Interval<T>>,
}

impl<T: Ordinal> RangeSet<T> {
    /// Build a set from intervals in any order, possibly overlapping.
    ///
    /// Returns `None` if `ranges` is empty.
    pub fn from_intervals(ranges: Vec<Interval<T>>) -> Option<Self> {
        if ranges.is_empty() {
            return None;
        }
        Some(Self {
            ranges: normalize(ranges),
        })
    }

    /// The sorted, merged intervals of this set.
    pub fn ranges(&self) -> &[Interval<T>] {
        &self.ranges
    }

    /// Smallest interval containing the whole set.
    pub fn envelope(&self) -> Interval<T> {
        let begin = self.ranges.first().map_or(T::MIN, |r| r.begin);
        let end = self.ranges.last().map_or(T::MAX, |r| r.end);
        Interval { begin, end }
    }

    pub fn contains(&self, value: T) -> bool {
        let idx = self.ranges.partition_point(|r| r.end < value);
        self.ranges.get(idx).is_some_and(|r| r.begin <= value)
    }

    /// Begin and end of every interval, in ascending order.
    pub fn boundaries(&self) -> impl Iterator<Item = T> + '_ {
        self.ranges.iter().flat_map(|r| [r.begin, r.end])
    }

    /// Restrict this set to `bound`.
    pub fn shrink(&self, bound: &Bound<T>) -> Shrunk<T> {
        let kept: Vec<Interval<T>> = self
            .ranges
            .iter()
            .filter_map(|r| r.intersect(bound))
            .collect();
        match kept.as_slice() {
            [] => Shrunk::Disjoint,
            [only] if only == bound => Shrunk::Covered,
            _ => Shrunk::Partial(Self { ranges: kept }),
        }
    }

    /// Whether any value of this set lies within `bound`.
    pub fn overlaps(&self, bound: &Bound<T>) -> bool {
        let idx = self.ranges.partition_point(|r| r.end < bound.begin);
        self.ranges.get(idx).is_some_and(|r| r.begin <= bound.end)
    }

    /// Envelope of the part of this set within `bound`.
    pub fn envelope_within(&self, bound: &Bound<T>) -> Option<Interval<T>> {
        let first = self.ranges.partition_point(|r| r.end < bound.begin);
        let last = self.ranges.partition_point(|r| r.begin <= bound.end);
        if first >= last {
            return None;
        }
        Interval::new(
            self.ranges[first].begin.max(bound.begin),
            self.ranges[last - 1].end.min(bound.end),
        )
    }
}

impl<T: fmt::Display> fmt::Display for RangeSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, r) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", r)?;
        }
        Ok(())
    }
}

/// Sort intervals and merge the overlapping or adjacent ones.
fn normalize<T: Ordinal>(mut ranges: Vec<Interval<T>>) -> Vec<Interval<T>> {
    ranges.sort();
    let mut merged: Vec<Interval<T>> = Vec::with_capacity(ranges.len());
    for r in ranges {
        if let Some(last) = merged.last_mut() {
            let touches = match last.end.successor() {
                Some(next) => r.begin <= next,
                None => true,
            };
            if touches {
                last.end = last.end.max(r.end);
                continue;
            }
        }
        merged.push(r);
    }
    merged
}

/// Split a field into its comma-separated, trimmed, non-empty tokens.
pub(crate) fn tokens(input: &str) -> Result<Vec<&str>, ValueError> {
    if input.contains('*') {
        return Err(ValueError::Wildcard(input.to_string()));
    }
    let tokens: Vec<&str> = input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() {
        return Err(ValueError::Empty(input.to_string()));
    }
    Ok(tokens)
}

/// Split an `A-B` token into its two trimmed halves.
///
/// Returns `Ok(None)` for tokens without a dash.
pub(crate) fn range_parts(token: &str) -> Result<Option<(&str, &str)>, ValueError> {
    if !token.contains('-') {
        return Ok(None);
    }
    let parts: Vec<&str> = token.split('-').map(str::trim).collect();
    match parts.as_slice() {
        [begin, end] if !begin.is_empty() && !end.is_empty() => Ok(Some((begin, end))),
        _ => Err(ValueError::InvalidRange(token.to_string())),
    }
}
