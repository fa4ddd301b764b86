use super::Threshold;
use crate::value::{Address, Bound};

/// Admissible ranges of all aspects along a path through the decision tree.
///
/// Bounds start as [`Bounds::ANY`] at the root and narrow at every split. They
/// are used to filter candidate thresholds and to simplify classifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub protocol: Bound<u8>,
    pub src_port: Bound<u16>,
    pub dst_port: Bound<u16>,
    pub src_address: Bound<Address>,
    pub dst_address: Bound<Address>,
}

impl Bounds {
    pub const ANY: Bounds = Bounds {
        protocol: Bound::ANY,
        src_port: Bound::ANY,
        dst_port: Bound::ANY,
        src_address: Bound::ANY,
        dst_address: Bound::ANY,
    };

    /// Whether `threshold` lies strictly inside these bounds, i.e. splitting
    /// at it leaves both halves non-empty.
    pub fn admits(&self, threshold: &Threshold) -> bool {
        match *threshold {
            Threshold::Protocol(t) => self.protocol.can_split_at(t),
            Threshold::SrcPort(t) => self.src_port.can_split_at(t),
            Threshold::DstPort(t) => self.dst_port.can_split_at(t),
            Threshold::SrcAddress(t) => self.src_address.can_split_at(t),
            Threshold::DstAddress(t) => self.dst_address.can_split_at(t),
        }
    }

    /// Narrow these bounds into the `<= threshold` and `> threshold` halves.
    pub fn split(&self, threshold: &Threshold) -> Option<(Bounds, Bounds)> {
        let (mut low, mut high) = (*self, *self);
        match *threshold {
            Threshold::Protocol(t) => {
                (low.protocol, high.protocol) = self.protocol.split_at(t)?;
            }
            Threshold::SrcPort(t) => {
                (low.src_port, high.src_port) = self.src_port.split_at(t)?;
            }
            Threshold::DstPort(t) => {
                (low.dst_port, high.dst_port) = self.dst_port.split_at(t)?;
            }
            Threshold::SrcAddress(t) => {
                (low.src_address, high.src_address) = self.src_address.split_at(t)?;
            }
            Threshold::DstAddress(t) => {
                (low.dst_address, high.dst_address) = self.dst_address.split_at(t)?;
            }
        }
        Some((low, high))
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Bounds::ANY
    }
}
