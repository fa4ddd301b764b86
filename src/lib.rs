//! flowclass - Application classification for network flows.
//!
//! This crate labels flow records (protocol, addresses and ports) with an
//! application name, using an operator-authored, priority-ordered list of
//! matching rules. The rule list is compiled into a decision tree so a flow
//! is classified by a short descent plus a handful of range checks,
//! independent of how many rules are configured.
//!
//! # Features
//!
//! - **Rich rule values**: single values, `A-B` ranges, CIDR and comma lists
//! - **IPv4 and IPv6**: one address order with every IPv4 address before IPv6
//! - **Omnidirectional rules**: one rule covers both directions of a conversation
//! - **Hot reload**: rules are rebuilt off to the side and swapped in atomically
//! - **Thread-safe**: classification never blocks, even during a reload
//! - **Invalid rule isolation**: a malformed rule is reported, not fatal
//!
//! # Quick Start
//!
//! ```
//! use flowclass::{ClassificationEngine, ClassificationRequest, Rule, StaticRuleProvider};
//!
//! let engine = ClassificationEngine::with_rules(StaticRuleProvider::new(vec![
//!     Rule::new("DNS")
//!         .with_protocol("udp")
//!         .with_dst_port("53")
//!         .with_omnidirectional(true),
//! ]))
//! .unwrap();
//!
//! // The reply direction matches through the derived reversed rule.
//! let request = ClassificationRequest::new().with_protocol(17).with_src_port(53);
//! assert_eq!(engine.classify(&request).as_deref(), Some("DNS"));
//! ```
//!
//! # Rule Values
//!
//! - **protocol**: decimal numbers or IANA keywords (`tcp`, `udp`, `icmp`, ...)
//! - **ports**: `80`, `8000-9000`, `80,443,8080`
//! - **addresses**: `10.0.0.1`, `10.0.0.0/8`, `10.0.0.1-10.0.0.99`, `2001:db8::/32`
//!
//! An empty field places no constraint on its aspect.
//!
//! # Matching Priority
//!
//! Among all rules matching a flow, the one with the lowest
//! `(group_position, position)` wins. Equal positions prefer the rule
//! constraining more aspects, then the rule the provider listed first.

mod aspect;
mod config;
mod engine;
mod error;
mod provider;
mod request;
mod rule;

pub mod decision;
pub mod protocols;
pub mod value;

// Re-export core types
pub use aspect::{Aspect, Aspects};
pub use error::{Error, Result, RuleError, ValueError};
pub use request::ClassificationRequest;
pub use rule::Rule;

// Re-export engine types
pub use config::EngineConfig;
pub use engine::{ClassificationEngine, ReloadListener};
pub use provider::{ClassificationRuleProvider, FileRuleProvider, StaticRuleProvider};

// Re-export tree types for diagnostics
pub use decision::{ClassificationResult, Tree, TreeInfo};
