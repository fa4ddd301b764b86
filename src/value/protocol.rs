use super::{tokens, Interval, RangeSet};
use crate::error::ValueError;
use crate::protocols;

/// Set of protocol numbers a rule accepts.
pub type ProtocolValue = RangeSet<u8>;

impl RangeSet<u8> {
    /// Parse a comma-separated list of protocol numbers or IANA keywords.
    ///
    /// An unknown keyword makes the whole value invalid.
    pub fn parse(input: &str) -> Result<Self, ValueError> {
        let mut points = Vec::new();
        for token in tokens(input)? {
            let decimal = protocols::resolve(token)
                .ok_or_else(|| ValueError::UnknownProtocol(token.to_string()))?;
            points.push(Interval::point(decimal));
        }
        Self::from_intervals(points).ok_or_else(|| ValueError::Empty(input.to_string()))
    }

    /// The distinct protocol numbers in ascending order.
    pub fn protocols(&self) -> impl Iterator<Item = u8> + '_ {
        self.ranges()
            .iter()
            .flat_map(|r| r.begin()..=r.end())
    }
}
