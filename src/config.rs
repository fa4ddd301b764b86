//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::decision::{TreeOptions, DEFAULT_MAX_DEPTH, DEFAULT_MAX_LEAF_SIZE};
use crate::error::{Error, Result};

/// Configuration for a [`ClassificationEngine`](crate::ClassificationEngine).
///
/// # Example
///
/// ```
/// use flowclass::EngineConfig;
///
/// let config = EngineConfig::from_yaml("maxLeafSize: 4\n").unwrap();
/// assert_eq!(config.max_leaf_size, 4);
/// assert!(config.reload_on_start);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Maximum number of rules in a leaf before the tree builder splits it.
    /// Zero is treated as one.
    pub max_leaf_size: usize,
    /// Depth at which nodes become leaves regardless of their size.
    pub max_depth: usize,
    /// Whether [`start`](crate::ClassificationEngine::start) performs an initial reload.
    pub reload_on_start: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_leaf_size: DEFAULT_MAX_LEAF_SIZE,
            max_depth: DEFAULT_MAX_DEPTH,
            reload_on_start: true,
        }
    }
}

impl EngineConfig {
    /// Create a configuration with the given leaf size.
    pub fn with_max_leaf_size(max_leaf_size: usize) -> Self {
        Self {
            max_leaf_size,
            ..Self::default()
        }
    }

    /// Parse a configuration from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validated()
    }

    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validated()
    }

    /// Load a configuration file; `.json` files are read as JSON, anything
    /// else as YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        if is_json(path) {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    fn validated(self) -> Result<Self> {
        if self.max_depth == 0 {
            return Err(Error::Config("maxDepth must be at least 1".to_string()));
        }
        Ok(self)
    }

    /// Tree builder limits derived from this configuration.
    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            max_leaf_size: self.max_leaf_size.max(1),
            max_depth: self.max_depth,
        }
    }
}

pub(crate) fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_leaf_size, 8);
        assert_eq!(config.max_depth, 128);
        assert!(config.reload_on_start);
        assert_eq!(EngineConfig::from_yaml("{}").unwrap(), config);
    }

    #[test]
    fn test_zero_leaf_size_is_one() {
        let config = EngineConfig::with_max_leaf_size(0);
        assert_eq!(config.tree_options().max_leaf_size, 1);
    }

    #[test]
    fn test_from_json() {
        let config =
            EngineConfig::from_json(r#"{"maxLeafSize": 16, "reloadOnStart": false}"#).unwrap();
        assert_eq!(config.max_leaf_size, 16);
        assert!(!config.reload_on_start);
    }

    #[test]
    fn test_rejects_zero_depth() {
        assert!(matches!(
            EngineConfig::from_yaml("maxDepth: 0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_yaml("maxLeafSize: many"),
            Err(Error::Yaml(_))
        ));
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("engine.json");
        let mut file = std::fs::File::create(&json_path).unwrap();
        file.write_all(br#"{"maxLeafSize": 2}"#).unwrap();
        assert_eq!(EngineConfig::load(&json_path).unwrap().max_leaf_size, 2);

        let yaml_path = dir.path().join("engine.yaml");
        std::fs::write(&yaml_path, "maxLeafSize: 3\nreloadOnStart: false\n").unwrap();
        let config = EngineConfig::load(&yaml_path).unwrap();
        assert_eq!(config.max_leaf_size, 3);
        assert!(!config.reload_on_start);

        assert!(matches!(
            EngineConfig::load(&dir.path().join("missing.yaml")),
            Err(Error::Io(_))
        ));
    }
}
