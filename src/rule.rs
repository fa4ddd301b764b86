//! Operator-authored classification rules.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A classification rule as delivered by a rule provider.
///
/// Every matching field is textual; an empty (or whitespace-only) field places
/// no constraint on its aspect. Rules are evaluated by ascending
/// `(group_position, position)`.
///
/// # Examples
/// ```
/// use flowclass::Rule;
///
/// let rule = Rule::new("DNS")
///     .with_protocol("udp")
///     .with_dst_port("53")
///     .with_omnidirectional(true);
/// assert!(rule.can_be_reversed());
/// assert_eq!(rule.reversed().src_port, "53");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Rule {
    /// Application name assigned to matching flows
    pub name: String,
    /// Protocol numbers or IANA keywords
    #[serde(deserialize_with = "text_or_number")]
    pub protocol: String,
    pub src_address: String,
    #[serde(deserialize_with = "text_or_number")]
    pub src_port: String,
    pub dst_address: String,
    #[serde(deserialize_with = "text_or_number")]
    pub dst_port: String,
    /// Exporter filter expression, carried but not evaluated
    pub exporter_filter: String,
    pub group_position: i32,
    /// Order within the group; lower positions go first
    pub position: i32,
    /// Whether the rule also matches the opposite direction of a conversation
    pub omnidirectional: bool,
}

/// Accept `80` as well as `"80"` (and `null` as empty) in rule files.
///
/// Negative and fractional numbers are kept as text so the field parser
/// rejects only the offending rule.
fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Field {
        Text(String),
        Number(u64),
        Signed(i64),
        Float(f64),
    }

    Ok(match Option::<Field>::deserialize(deserializer)? {
        Some(Field::Text(text)) => text,
        Some(Field::Number(n)) => n.to_string(),
        Some(Field::Signed(n)) => n.to_string(),
        Some(Field::Float(n)) => n.to_string(),
        None => String::new(),
    })
}

fn is_defined(value: &str) -> bool {
    !value.trim().is_empty()
}

impl Rule {
    /// Create an unconstrained rule with the given application name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    #[must_use]
    pub fn with_src_address(mut self, address: impl Into<String>) -> Self {
        self.src_address = address.into();
        self
    }

    #[must_use]
    pub fn with_src_port(mut self, port: impl Into<String>) -> Self {
        self.src_port = port.into();
        self
    }

    #[must_use]
    pub fn with_dst_address(mut self, address: impl Into<String>) -> Self {
        self.dst_address = address.into();
        self
    }

    #[must_use]
    pub fn with_dst_port(mut self, port: impl Into<String>) -> Self {
        self.dst_port = port.into();
        self
    }

    #[must_use]
    pub fn with_exporter_filter(mut self, filter: impl Into<String>) -> Self {
        self.exporter_filter = filter.into();
        self
    }

    #[must_use]
    pub fn with_group_position(mut self, group_position: i32) -> Self {
        self.group_position = group_position;
        self
    }

    #[must_use]
    pub fn with_position(mut self, position: i32) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn with_omnidirectional(mut self, omnidirectional: bool) -> Self {
        self.omnidirectional = omnidirectional;
        self
    }

    pub fn has_protocol_definition(&self) -> bool {
        is_defined(&self.protocol)
    }

    pub fn has_src_address_definition(&self) -> bool {
        is_defined(&self.src_address)
    }

    pub fn has_src_port_definition(&self) -> bool {
        is_defined(&self.src_port)
    }

    pub fn has_dst_address_definition(&self) -> bool {
        is_defined(&self.dst_address)
    }

    pub fn has_dst_port_definition(&self) -> bool {
        is_defined(&self.dst_port)
    }

    pub fn has_exporter_filter_definition(&self) -> bool {
        is_defined(&self.exporter_filter)
    }

    /// Whether any field of the rule is defined.
    pub fn has_definition(&self) -> bool {
        self.has_protocol_definition()
            || self.has_src_address_definition()
            || self.has_src_port_definition()
            || self.has_dst_address_definition()
            || self.has_dst_port_definition()
            || self.has_exporter_filter_definition()
    }

    /// Whether a mirrored rule should be derived from this one.
    ///
    /// Only omnidirectional rules with at least one address or port constraint
    /// have a distinct mirror image.
    pub fn can_be_reversed(&self) -> bool {
        self.omnidirectional
            && (self.has_src_port_definition()
                || self.has_src_address_definition()
                || self.has_dst_port_definition()
                || self.has_dst_address_definition())
    }

    /// The same rule with source and destination swapped.
    pub fn reversed(&self) -> Rule {
        Rule {
            src_address: self.dst_address.clone(),
            src_port: self.dst_port.clone(),
            dst_address: self.src_address.clone(),
            dst_port: self.src_port.clone(),
            ..self.clone()
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[protocol={}, src={}:{}, dst={}:{}, group={}, position={}{}]",
            self.name,
            self.protocol,
            self.src_address,
            self.src_port,
            self.dst_address,
            self.dst_port,
            self.group_position,
            self.position,
            if self.omnidirectional { ", omnidirectional" } else { "" },
        )
    }
}
