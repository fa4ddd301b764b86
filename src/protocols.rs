//! IANA assigned internet protocol numbers.

use ahash::AHashMap;
use once_cell::sync::Lazy;
use std::fmt;

/// A protocol entry from the IANA protocol-number registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Protocol {
    /// Protocol number as carried in the IP header
    pub decimal: u8,
    /// Registry keyword
    pub keyword: &'static str,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.keyword, self.decimal)
    }
}

pub const ICMP: u8 = 1;
pub const TCP: u8 = 6;
pub const UDP: u8 = 17;
pub const SCTP: u8 = 132;

static TABLE: &[(u8, &str)] = &[
    (0, "HOPOPT"),
    (1, "ICMP"),
    (2, "IGMP"),
    (3, "GGP"),
    (4, "IPv4"),
    (5, "ST"),
    (6, "TCP"),
    (7, "CBT"),
    (8, "EGP"),
    (9, "IGP"),
    (10, "BBN-RCC-MON"),
    (11, "NVP-II"),
    (12, "PUP"),
    (13, "ARGUS"),
    (14, "EMCON"),
    (15, "XNET"),
    (16, "CHAOS"),
    (17, "UDP"),
    (18, "MUX"),
    (19, "DCN-MEAS"),
    (20, "HMP"),
    (21, "PRM"),
    (22, "XNS-IDP"),
    (23, "TRUNK-1"),
    (24, "TRUNK-2"),
    (25, "LEAF-1"),
    (26, "LEAF-2"),
    (27, "RDP"),
    (28, "IRTP"),
    (29, "ISO-TP4"),
    (30, "NETBLT"),
    (31, "MFE-NSP"),
    (32, "MERIT-INP"),
    (33, "DCCP"),
    (34, "3PC"),
    (35, "IDPR"),
    (36, "XTP"),
    (37, "DDP"),
    (38, "IDPR-CMTP"),
    (39, "TP++"),
    (40, "IL"),
    (41, "IPv6"),
    (42, "SDRP"),
    (43, "IPv6-Route"),
    (44, "IPv6-Frag"),
    (45, "IDRP"),
    (46, "RSVP"),
    (47, "GRE"),
    (48, "DSR"),
    (49, "BNA"),
    (50, "ESP"),
    (51, "AH"),
    (52, "I-NLSP"),
    (53, "SWIPE"),
    (54, "NARP"),
    (55, "MOBILE"),
    (56, "TLSP"),
    (57, "SKIP"),
    (58, "IPv6-ICMP"),
    (59, "IPv6-NoNxt"),
    (60, "IPv6-Opts"),
    (62, "CFTP"),
    (64, "SAT-EXPAK"),
    (65, "KRYPTOLAN"),
    (66, "RVD"),
    (67, "IPPC"),
    (69, "SAT-MON"),
    (70, "VISA"),
    (71, "IPCV"),
    (72, "CPNX"),
    (73, "CPHB"),
    (74, "WSN"),
    (75, "PVP"),
    (76, "BR-SAT-MON"),
    (77, "SUN-ND"),
    (78, "WB-MON"),
    (79, "WB-EXPAK"),
    (80, "ISO-IP"),
    (81, "VMTP"),
    (82, "SECURE-VMTP"),
    (83, "VINES"),
    (84, "TTP"),
    (85, "NSFNET-IGP"),
    (86, "DGP"),
    (87, "TCF"),
    (88, "EIGRP"),
    (89, "OSPFIGP"),
    (90, "Sprite-RPC"),
    (91, "LARP"),
    (92, "MTP"),
    (93, "AX.25"),
    (94, "IPIP"),
    (95, "MICP"),
    (96, "SCC-SP"),
    (97, "ETHERIP"),
    (98, "ENCAP"),
    (100, "GMTP"),
    (101, "IFMP"),
    (102, "PNNI"),
    (103, "PIM"),
    (104, "ARIS"),
    (105, "SCPS"),
    (106, "QNX"),
    (107, "A/N"),
    (108, "IPComp"),
    (109, "SNP"),
    (110, "Compaq-Peer"),
    (111, "IPX-in-IP"),
    (112, "VRRP"),
    (113, "PGM"),
    (115, "L2TP"),
    (116, "DDX"),
    (117, "IATP"),
    (118, "STP"),
    (119, "SRP"),
    (120, "UTI"),
    (121, "SMP"),
    (122, "SM"),
    (123, "PTP"),
    (124, "ISIS"),
    (125, "FIRE"),
    (126, "CRTP"),
    (127, "CRUDP"),
    (128, "SSCOPMCE"),
    (129, "IPLT"),
    (130, "SPS"),
    (131, "PIPE"),
    (132, "SCTP"),
    (133, "FC"),
    (134, "RSVP-E2E-IGNORE"),
    (135, "Mobility-Header"),
    (136, "UDPLite"),
    (137, "MPLS-in-IP"),
    (138, "manet"),
    (139, "HIP"),
    (140, "Shim6"),
    (141, "WESP"),
    (142, "ROHC"),
    (143, "Ethernet"),
    (255, "Reserved"),
];

static BY_KEYWORD: Lazy<AHashMap<String, Protocol>> = Lazy::new(|| {
    TABLE
        .iter()
        .map(|&(decimal, keyword)| (keyword.to_lowercase(), Protocol { decimal, keyword }))
        .collect()
});

static BY_NUMBER: Lazy<AHashMap<u8, Protocol>> = Lazy::new(|| {
    TABLE
        .iter()
        .map(|&(decimal, keyword)| (decimal, Protocol { decimal, keyword }))
        .collect()
});

/// Look up a protocol by its keyword (case-insensitive).
pub fn by_keyword(keyword: &str) -> Option<Protocol> {
    BY_KEYWORD.get(&keyword.trim().to_lowercase()).copied()
}

/// Look up a protocol by its number.
pub fn by_number(decimal: u8) -> Option<Protocol> {
    BY_NUMBER.get(&decimal).copied()
}

/// Resolve a protocol token: either a decimal number in 0..=255 or a keyword.
///
/// Numbers without a registry entry are still accepted.
pub fn resolve(token: &str) -> Option<u8> {
    let token = token.trim();
    if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
        return token.parse::<u8>().ok();
    }
    by_keyword(token).map(|p| p.decimal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup_is_case_insensitive() {
        assert_eq!(by_keyword("tcp").map(|p| p.decimal), Some(TCP));
        assert_eq!(by_keyword("TCP").map(|p| p.decimal), Some(TCP));
        assert_eq!(by_keyword("Udp").map(|p| p.decimal), Some(UDP));
        assert_eq!(by_keyword("ipv6-icmp").map(|p| p.decimal), Some(58));
        assert!(by_keyword("not-a-protocol").is_none());
    }

    #[test]
    fn test_number_lookup() {
        assert_eq!(by_number(SCTP).map(|p| p.keyword), Some("SCTP"));
        assert!(by_number(250).is_none());
    }

    #[test]
    fn test_resolve() {
        assert_eq!(resolve("6"), Some(6));
        assert_eq!(resolve(" 17 "), Some(17));
        assert_eq!(resolve("250"), Some(250));
        assert_eq!(resolve("256"), None);
        assert_eq!(resolve("icmp"), Some(ICMP));
        assert_eq!(resolve("-1"), None);
        assert_eq!(resolve(""), None);
    }
}
