//! Classification requests built from flow records.

use std::net::IpAddr;

use crate::aspect::{Aspect, Aspects};
use crate::value::Address;

/// The flow attributes a classification is based on.
///
/// Every field is optional. A rule constraining an aspect the request does
/// not carry never matches that request.
///
/// # Example
///
/// ```
/// use flowclass::ClassificationRequest;
///
/// let request = ClassificationRequest::new()
///     .with_protocol(6)
///     .with_src_address("10.0.0.1".parse().unwrap())
///     .with_src_port(54321)
///     .with_dst_address("93.184.216.34".parse().unwrap())
///     .with_dst_port(80);
/// assert_eq!(request.dst_port, Some(80));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ClassificationRequest {
    /// Monitoring location of the exporter
    pub location: Option<String>,
    /// IP protocol number
    pub protocol: Option<u8>,
    pub src_address: Option<Address>,
    pub src_port: Option<u16>,
    pub dst_address: Option<Address>,
    pub dst_port: Option<u16>,
    /// Address of the device that exported the flow
    pub exporter_address: Option<Address>,
}

impl ClassificationRequest {
    /// Create an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn with_protocol(mut self, protocol: u8) -> Self {
        self.protocol = Some(protocol);
        self
    }

    #[must_use]
    pub fn with_src_address(mut self, address: IpAddr) -> Self {
        self.src_address = Some(address.into());
        self
    }

    #[must_use]
    pub fn with_src_port(mut self, port: u16) -> Self {
        self.src_port = Some(port);
        self
    }

    #[must_use]
    pub fn with_dst_address(mut self, address: IpAddr) -> Self {
        self.dst_address = Some(address.into());
        self
    }

    #[must_use]
    pub fn with_dst_port(mut self, port: u16) -> Self {
        self.dst_port = Some(port);
        self
    }

    #[must_use]
    pub fn with_exporter_address(mut self, address: IpAddr) -> Self {
        self.exporter_address = Some(address.into());
        self
    }

    /// The same flow seen from the opposite direction.
    #[must_use]
    pub fn mirrored(&self) -> Self {
        Self {
            src_address: self.dst_address,
            src_port: self.dst_port,
            dst_address: self.src_address,
            dst_port: self.src_port,
            ..self.clone()
        }
    }

    /// The aspects this request carries no value for.
    pub fn missing_aspects(&self) -> Aspects {
        let mut missing = Aspects::empty();
        for aspect in Aspect::ALL {
            let present = match aspect {
                Aspect::Protocol => self.protocol.is_some(),
                Aspect::SrcPort => self.src_port.is_some(),
                Aspect::DstPort => self.dst_port.is_some(),
                Aspect::SrcAddress => self.src_address.is_some(),
                Aspect::DstAddress => self.dst_address.is_some(),
            };
            if !present {
                missing |= aspect.flag();
            }
        }
        missing
    }
}
