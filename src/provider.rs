//! Rule providers.
//!
//! The engine pulls its rule list from a [`ClassificationRuleProvider`] on
//! every reload. Providers are expected to be cheap to call repeatedly and to
//! have no side effects beyond reading their source.

use log::debug;
use std::path::{Path, PathBuf};

use crate::config::is_json;
use crate::error::{Error, Result};
use crate::rule::Rule;

/// Supplies the current rule list.
pub trait ClassificationRuleProvider: Send + Sync {
    fn rules(&self) -> Result<Vec<Rule>>;
}

/// A provider serving a fixed rule list.
#[derive(Debug, Clone, Default)]
pub struct StaticRuleProvider {
    rules: Vec<Rule>,
}

impl StaticRuleProvider {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }
}

impl ClassificationRuleProvider for StaticRuleProvider {
    fn rules(&self) -> Result<Vec<Rule>> {
        Ok(self.rules.clone())
    }
}

impl ClassificationRuleProvider for Vec<Rule> {
    fn rules(&self) -> Result<Vec<Rule>> {
        Ok(self.clone())
    }
}

impl<F> ClassificationRuleProvider for F
where
    F: Fn() -> Result<Vec<Rule>> + Send + Sync,
{
    fn rules(&self) -> Result<Vec<Rule>> {
        self()
    }
}

/// A provider reading a rule list from a YAML or JSON file on every call.
///
/// The file holds a sequence of rules using camelCase field names:
///
/// ```yaml
/// - name: HTTP
///   protocol: tcp
///   dstPort: "80,8080"
///   position: 1
/// - name: DNS
///   protocol: udp
///   dstPort: 53
///   omnidirectional: true
/// ```
#[derive(Debug, Clone)]
pub struct FileRuleProvider {
    path: PathBuf,
}

impl FileRuleProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ClassificationRuleProvider for FileRuleProvider {
    fn rules(&self) -> Result<Vec<Rule>> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::Provider(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        let rules: Vec<Rule> = if is_json(&self.path) {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        debug!("Read {} rules from {:?}", rules.len(), self.path);
        Ok(rules)
    }
}
