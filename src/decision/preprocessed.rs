use std::sync::Arc;

use super::{Bounds, Threshold};
use crate::aspect::{Aspect, Aspects};
use crate::error::RuleError;
use crate::rule::Rule;
use crate::value::{IpValue, PortValue, ProtocolValue};

/// A rule with every defined field parsed into a range set.
///
/// `None` means the rule places no constraint on that aspect.
#[derive(Debug, Clone)]
pub struct PreprocessedRule {
    /// The rule as delivered by the provider
    pub rule: Rule,
    /// Shared name handed out by every classifier built from this rule
    pub name: Arc<str>,
    pub protocol: Option<ProtocolValue>,
    pub src_port: Option<PortValue>,
    pub dst_port: Option<PortValue>,
    pub src_address: Option<IpValue>,
    pub dst_address: Option<IpValue>,
    /// Candidate split values derived from the range boundaries, sorted and deduplicated
    pub thresholds: Vec<Threshold>,
}

fn parse_field<T, F>(
    defined: bool,
    field: &'static str,
    input: &str,
    parse: F,
) -> Result<Option<T>, RuleError>
where
    F: FnOnce(&str) -> Result<T, crate::error::ValueError>,
{
    if !defined {
        return Ok(None);
    }
    parse(input)
        .map(Some)
        .map_err(|e| RuleError::new(field, e))
}

impl PreprocessedRule {
    /// Parse every defined field of `rule`.
    pub fn of(rule: Rule) -> Result<Self, RuleError> {
        let protocol = parse_field(
            rule.has_protocol_definition(),
            "protocol",
            &rule.protocol,
            ProtocolValue::parse,
        )?;
        let src_port = parse_field(
            rule.has_src_port_definition(),
            "srcPort",
            &rule.src_port,
            PortValue::parse,
        )?;
        let dst_port = parse_field(
            rule.has_dst_port_definition(),
            "dstPort",
            &rule.dst_port,
            PortValue::parse,
        )?;
        let src_address = parse_field(
            rule.has_src_address_definition(),
            "srcAddress",
            &rule.src_address,
            IpValue::parse,
        )?;
        let dst_address = parse_field(
            rule.has_dst_address_definition(),
            "dstAddress",
            &rule.dst_address,
            IpValue::parse,
        )?;

        let mut preprocessed = Self {
            name: Arc::from(rule.name.as_str()),
            rule,
            protocol,
            src_port,
            dst_port,
            src_address,
            dst_address,
            thresholds: Vec::new(),
        };
        preprocessed.thresholds = preprocessed.collect_thresholds();
        Ok(preprocessed)
    }

    /// The mirrored rule, matching the opposite direction of a conversation.
    pub fn reverse(&self) -> Self {
        let mut reversed = Self {
            rule: self.rule.reversed(),
            name: Arc::clone(&self.name),
            protocol: self.protocol.clone(),
            src_port: self.dst_port.clone(),
            dst_port: self.src_port.clone(),
            src_address: self.dst_address.clone(),
            dst_address: self.src_address.clone(),
            thresholds: Vec::new(),
        };
        reversed.thresholds = reversed.collect_thresholds();
        reversed
    }

    fn collect_thresholds(&self) -> Vec<Threshold> {
        let mut thresholds = Vec::new();
        if let Some(v) = &self.protocol {
            thresholds.extend(v.protocols().map(Threshold::Protocol));
        }
        if let Some(v) = &self.src_port {
            thresholds.extend(v.boundaries().map(Threshold::SrcPort));
        }
        if let Some(v) = &self.dst_port {
            thresholds.extend(v.boundaries().map(Threshold::DstPort));
        }
        if let Some(v) = &self.src_address {
            thresholds.extend(v.boundaries().map(Threshold::SrcAddress));
        }
        if let Some(v) = &self.dst_address {
            thresholds.extend(v.boundaries().map(Threshold::DstAddress));
        }
        thresholds.sort_unstable();
        thresholds.dedup();
        thresholds
    }

    /// The aspects this rule constrains.
    pub fn aspects(&self) -> Aspects {
        Aspect::ALL
            .into_iter()
            .filter(|a| self.constrains(*a))
            .fold(Aspects::empty(), |acc, a| acc | a.flag())
    }

    pub fn constrains(&self, aspect: Aspect) -> bool {
        match aspect {
            Aspect::Protocol => self.protocol.is_some(),
            Aspect::SrcPort => self.src_port.is_some(),
            Aspect::DstPort => self.dst_port.is_some(),
            Aspect::SrcAddress => self.src_address.is_some(),
            Aspect::DstAddress => self.dst_address.is_some(),
        }
    }

    /// Whether some request within `bounds` could satisfy this rule's
    /// constraint on `aspect`. Always true for unconstrained aspects.
    pub fn overlaps(&self, bounds: &Bounds, aspect: Aspect) -> bool {
        match aspect {
            Aspect::Protocol => self
                .protocol
                .as_ref()
                .map_or(true, |v| v.overlaps(&bounds.protocol)),
            Aspect::SrcPort => self
                .src_port
                .as_ref()
                .map_or(true, |v| v.overlaps(&bounds.src_port)),
            Aspect::DstPort => self
                .dst_port
                .as_ref()
                .map_or(true, |v| v.overlaps(&bounds.dst_port)),
            Aspect::SrcAddress => self
                .src_address
                .as_ref()
                .map_or(true, |v| v.overlaps(&bounds.src_address)),
            Aspect::DstAddress => self
                .dst_address
                .as_ref()
                .map_or(true, |v| v.overlaps(&bounds.dst_address)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValueError;
    use crate::value::Address;

    #[test]
    fn test_of_parses_defined_fields() {
        let rule = Rule::new("web")
            .with_protocol("tcp")
            .with_dst_port("80,443")
            .with_dst_address("10.0.0.0/24");
        let pre = PreprocessedRule::of(rule).unwrap();
        assert!(pre.protocol.is_some());
        assert!(pre.src_port.is_none());
        assert!(pre.src_address.is_none());
        assert_eq!(
            pre.aspects(),
            Aspects::PROTOCOL | Aspects::DST_PORT | Aspects::DST_ADDRESS
        );
        assert_eq!(&*pre.name, "web");
    }

    #[test]
    fn test_thresholds_are_deduplicated() {
        let rule = Rule::new("ports").with_dst_port("80,443,1000-2000");
        let pre = PreprocessedRule::of(rule).unwrap();
        assert_eq!(
            pre.thresholds,
            vec![
                Threshold::DstPort(80),
                Threshold::DstPort(443),
                Threshold::DstPort(1000),
                Threshold::DstPort(2000),
            ]
        );

        let rule = Rule::new("host").with_src_address("10.0.0.1");
        let pre = PreprocessedRule::of(rule).unwrap();
        assert_eq!(
            pre.thresholds,
            vec![Threshold::SrcAddress(Address::V4(0x0a00_0001))]
        );
    }

    #[test]
    fn test_protocol_thresholds_cover_every_number() {
        let rule = Rule::new("low").with_protocol("1,2,3");
        let pre = PreprocessedRule::of(rule).unwrap();
        assert_eq!(
            pre.thresholds,
            vec![
                Threshold::Protocol(1),
                Threshold::Protocol(2),
                Threshold::Protocol(3),
            ]
        );
    }

    #[test]
    fn test_of_names_failing_field() {
        let rule = Rule::new("bad").with_dst_port("80").with_src_port("http");
        let err = PreprocessedRule::of(rule).unwrap_err();
        assert_eq!(err.field, "srcPort");
        assert!(matches!(err.source, ValueError::InvalidPort(_)));

        let rule = Rule::new("bad").with_protocol("nope");
        let err = PreprocessedRule::of(rule).unwrap_err();
        assert_eq!(err.field, "protocol");
    }

    #[test]
    fn test_reverse_swaps_values_and_thresholds() {
        let rule = Rule::new("omni")
            .with_src_port("8080")
            .with_dst_port("8443")
            .with_omnidirectional(true);
        let pre = PreprocessedRule::of(rule).unwrap();
        let rev = pre.reverse();
        assert_eq!(rev.src_port, pre.dst_port);
        assert_eq!(rev.dst_port, pre.src_port);
        assert_eq!(rev.rule.src_port, "8443");
        assert_eq!(
            rev.thresholds,
            vec![Threshold::SrcPort(8443), Threshold::DstPort(8080)]
        );
        assert!(Arc::ptr_eq(&pre.name, &rev.name));
    }

    #[test]
    fn test_overlaps() {
        let pre = PreprocessedRule::of(Rule::new("x").with_dst_port("80")).unwrap();
        let (low, high) = Bounds::ANY.split(&Threshold::DstPort(80)).unwrap();
        assert!(pre.overlaps(&low, Aspect::DstPort));
        assert!(!pre.overlaps(&high, Aspect::DstPort));
        assert!(pre.overlaps(&high, Aspect::SrcPort));
    }
}
