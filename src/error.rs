//! Error types for flowclass.

use thiserror::Error;

/// Error type for flowclass operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The rule provider could not produce a rule list
    #[error("rule provider error: {0}")]
    Provider(String),

    /// A single rule could not be preprocessed
    #[error("invalid rule '{name}': {source}")]
    InvalidRule {
        name: String,
        #[source]
        source: RuleError,
    },

    /// Internal invariant violated while building a decision tree
    #[error("tree construction error: {0}")]
    Construction(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for flowclass operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for parsing a single rule field value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// Field was defined but contained no values (e.g. ",")
    #[error("no values in '{0}'")]
    Empty(String),

    /// Wildcards are not supported
    #[error("wildcards not supported: {0}")]
    Wildcard(String),

    /// Unknown protocol keyword or number out of range
    #[error("unknown protocol: {0}")]
    UnknownProtocol(String),

    /// Port is not a number in 0..=65535
    #[error("invalid port: {0}")]
    InvalidPort(String),

    /// Address literal could not be parsed
    #[error("invalid IP address: {0}")]
    InvalidAddress(String),

    /// CIDR expression could not be parsed
    #[error("invalid CIDR expression: {0}")]
    InvalidCidr(String),

    /// Range is malformed or its beginning lies after its end
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// Range bounds belong to different address families
    #[error("range mixes IPv4 and IPv6 addresses: {0}")]
    MixedFamilies(String),
}

/// Error type for rule preprocessing, naming the offending field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("field {field}: {source}")]
pub struct RuleError {
    /// Name of the rule field that failed to parse
    pub field: &'static str,
    #[source]
    pub source: ValueError,
}

impl RuleError {
    pub(crate) fn new(field: &'static str, source: ValueError) -> Self {
        Self { field, source }
    }
}
