use std::fmt;

use crate::aspect::Aspect;
use crate::request::ClassificationRequest;
use crate::value::Address;

/// A split value for one aspect.
///
/// Thresholds order by aspect first and value second, which is also the
/// order in which the tree builder breaks ties between equally good splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Threshold {
    Protocol(u8),
    SrcPort(u16),
    DstPort(u16),
    SrcAddress(Address),
    DstAddress(Address),
}

impl Threshold {
    pub fn aspect(&self) -> Aspect {
        match self {
            Threshold::Protocol(_) => Aspect::Protocol,
            Threshold::SrcPort(_) => Aspect::SrcPort,
            Threshold::DstPort(_) => Aspect::DstPort,
            Threshold::SrcAddress(_) => Aspect::SrcAddress,
            Threshold::DstAddress(_) => Aspect::DstAddress,
        }
    }

    /// Whether the request's value for this aspect is at or below the threshold.
    ///
    /// Returns `None` if the request carries no value for the aspect.
    #[inline]
    pub fn is_low(&self, request: &ClassificationRequest) -> Option<bool> {
        match *self {
            Threshold::Protocol(t) => request.protocol.map(|v| v <= t),
            Threshold::SrcPort(t) => request.src_port.map(|v| v <= t),
            Threshold::DstPort(t) => request.dst_port.map(|v| v <= t),
            Threshold::SrcAddress(t) => request.src_address.map(|v| v <= t),
            Threshold::DstAddress(t) => request.dst_address.map(|v| v <= t),
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::Protocol(v) => write!(f, "{} <= {}", self.aspect(), v),
            Threshold::SrcPort(v) | Threshold::DstPort(v) => write!(f, "{} <= {}", self.aspect(), v),
            Threshold::SrcAddress(v) | Threshold::DstAddress(v) => write!(f, "{} <= {}", self.aspect(), v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_low() {
        let request = ClassificationRequest::new()
            .with_dst_port(80)
            .with_src_address("10.0.0.1".parse().unwrap());
        assert_eq!(Threshold::DstPort(80).is_low(&request), Some(true));
        assert_eq!(Threshold::DstPort(79).is_low(&request), Some(false));
        assert_eq!(Threshold::SrcPort(79).is_low(&request), None);
        let v6: Address = "::1".parse().unwrap();
        assert_eq!(Threshold::SrcAddress(v6).is_low(&request), Some(true));
    }

    #[test]
    fn test_ordering_follows_aspects() {
        let mut thresholds = vec![
            Threshold::DstAddress(Address::V4(1)),
            Threshold::DstPort(5),
            Threshold::Protocol(200),
            Threshold::DstPort(1),
        ];
        thresholds.sort();
        assert_eq!(
            thresholds,
            vec![
                Threshold::Protocol(200),
                Threshold::DstPort(1),
                Threshold::DstPort(5),
                Threshold::DstAddress(Address::V4(1)),
            ]
        );
    }
}
