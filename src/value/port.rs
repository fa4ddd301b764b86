use super::{range_parts, tokens, Interval, RangeSet};
use crate::error::ValueError;

/// Set of transport ports a rule accepts.
pub type PortValue = RangeSet<u16>;

fn parse_port(token: &str) -> Result<u16, ValueError> {
    token
        .parse::<u16>()
        .map_err(|_| ValueError::InvalidPort(token.to_string()))
}

impl RangeSet<u16> {
    /// Parse a comma-separated list of ports and `A-B` port ranges.
    pub fn parse(input: &str) -> Result<Self, ValueError> {
        let mut ranges = Vec::new();
        for token in tokens(input)? {
            let range = match range_parts(token)? {
                Some((begin, end)) => Interval::new(parse_port(begin)?, parse_port(end)?)
                    .ok_or_else(|| ValueError::InvalidRange(token.to_string()))?,
                None => Interval::point(parse_port(token)?),
            };
            ranges.push(range);
        }
        Self::from_intervals(ranges).ok_or_else(|| ValueError::Empty(input.to_string()))
    }
}
