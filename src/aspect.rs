//! Classification aspects.

use bitflags::bitflags;
use std::fmt;

/// Aspect represents one dimension of a flow quintuple that rules can constrain.
///
/// The declaration order is the enumeration order used to break ties when
/// the tree builder compares candidate splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Aspect {
    /// IP protocol number
    Protocol,
    /// Source transport port
    SrcPort,
    /// Destination transport port
    DstPort,
    /// Source IP address
    SrcAddress,
    /// Destination IP address
    DstAddress,
}

impl Aspect {
    /// All aspects in enumeration order.
    pub const ALL: [Aspect; 5] = [
        Aspect::Protocol,
        Aspect::SrcPort,
        Aspect::DstPort,
        Aspect::SrcAddress,
        Aspect::DstAddress,
    ];

    /// Get the canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Aspect::Protocol => "protocol",
            Aspect::SrcPort => "srcPort",
            Aspect::DstPort => "dstPort",
            Aspect::SrcAddress => "srcAddress",
            Aspect::DstAddress => "dstAddress",
        }
    }

    /// Get the single-bit set for this aspect.
    pub fn flag(&self) -> Aspects {
        match self {
            Aspect::Protocol => Aspects::PROTOCOL,
            Aspect::SrcPort => Aspects::SRC_PORT,
            Aspect::DstPort => Aspects::DST_PORT,
            Aspect::SrcAddress => Aspects::SRC_ADDRESS,
            Aspect::DstAddress => Aspects::DST_ADDRESS,
        }
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

bitflags! {
    /// A set of aspects, e.g. the aspects a rule constrains or a request lacks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Aspects: u8 {
        const PROTOCOL = 0b0000_0001;
        const SRC_PORT = 0b0000_0010;
        const DST_PORT = 0b0000_0100;
        const SRC_ADDRESS = 0b0000_1000;
        const DST_ADDRESS = 0b0001_0000;
    }
}

impl Aspects {
    /// Number of aspects in this set.
    pub fn count(&self) -> u32 {
        self.bits().count_ones()
    }
}
